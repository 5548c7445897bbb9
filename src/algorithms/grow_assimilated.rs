//! Assimilation: after a cut was found, grow the settled source side to
//! everything reachable through non-cut hyperedges, collecting the new cut
//! hyperedges and border nodes along the way. The traversal is the settled
//! twin of the flow BFS: a saturated edge without received flow only lets
//! its flow-sending pins through, and is a cut candidate.

use crate::algorithms::CutterState;
use crate::algorithms::FlowAlgorithm;
use crate::datastructure::FlowHypergraph;
use crate::datastructure::LayeredQueue;
use crate::datastructure::ReachableHyperedges;
use crate::datastructure::ReachableNodes;
use crate::basic_types::Node;

pub(crate) fn grow<FA: FlowAlgorithm>(
    hg: &FlowHypergraph,
    cs: &mut CutterState<FA>,
    nodes_to_scan: &mut LayeredQueue<Node>,
) {
    nodes_to_scan.clear();

    for i in 0..cs.source_piercing_nodes.len() {
        let s = cs.source_piercing_nodes[i].node;
        debug_assert!(cs.n.is_source(s), "piercing node {} not settled", s);
        debug_assert!(!cs.n.is_target(s));
        debug_assert!(!cs.n.is_target_reachable(s));
        nodes_to_scan.push(s);
    }

    while !nodes_to_scan.is_empty() {
        let u = nodes_to_scan.pop();
        for he_it in hg.incident_hyperedge_indices(u) {
            let he_inc = *hg.get_in_he(he_it);
            let e = he_inc.e;
            if cs.h.are_all_pins_sources(e) {
                continue;
            }

            let scan_all_pins = !hg.is_saturated(e) || hg.flow_received(&he_inc) > 0;
            if scan_all_pins {
                cs.h.settle_all_pins(e);
            } else {
                if cs.should_be_added_to_cut(hg, e) {
                    cs.add_to_cut(hg, e);
                }
                if cs.h.are_flow_sending_pins_sources(e) {
                    continue;
                }
                cs.h.settle_flow_sending_pins(e);
            }

            let pins = if scan_all_pins {
                hg.pin_indices(e)
            } else {
                hg.pins_sending_flow_indices(e)
            };
            for pi in pins {
                let v = hg.get_pin(pi).pin;
                debug_assert!(
                    !cs.n.is_target_reachable(v),
                    "settling node {} reachable from the target side",
                    v
                );
                debug_assert!(cs.n.is_source_reachable(v) || cs.is_isolated(hg, v));
                if !cs.n.is_source(v) && !cs.is_isolated(hg, v) {
                    cs.settle_node(hg, v);
                    nodes_to_scan.push(v);
                }
            }
        }
    }
}
