//! One-sided Dinic blocking flow on the pin-partitioned hypergraph.
//!
//! Each outer iteration builds a layered network by BFS from the source
//! piercing nodes and then pushes a blocking flow with an iterative DFS.
//! Neighbors of a node `u` through a hyperedge `e` are visited along two
//! semantic sub-arcs: the *flow-sending* pins of `e` (whose pending flow
//! can be rerouted) and *all* pins (when the edge has slack or `u` itself
//! receives flow from `e`). Per-edge pin cursors persist across the DFS so
//! each pin is scanned at most once per phase.

use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use log::debug;

use crate::algorithms::CutterState;
use crate::algorithms::FlowAlgorithm;
use crate::basic_types::Flow;
use crate::basic_types::InHeIndex;
use crate::basic_types::Node;
use crate::basic_types::PinIndex;
use crate::basic_types::INVALID_IN_HE_INDEX;
use crate::basic_types::INVALID_NODE;
use crate::basic_types::MAX_FLOW;
use crate::datastructure::distance_reachable_sets::UNREACHABLE_DISTANCE;
use crate::datastructure::DistanceReachableHyperedges;
use crate::datastructure::DistanceReachableNodes;
use crate::datastructure::FixedCapacityStack;
use crate::datastructure::FlowHypergraph;
use crate::datastructure::LayeredQueue;
use crate::datastructure::ReachableHyperedges;
use crate::datastructure::ReachableNodes;

#[derive(Debug, Clone, Copy)]
pub(crate) struct StackFrame {
    pub u: Node,
    pub parent_he_it: InHeIndex,
}

/// Search state shared by the one-sided Dinic variants: BFS queue, DFS
/// stack and the per-node/per-edge scan cursors.
#[derive(Debug)]
pub(crate) struct DinicCore {
    pub queue: LayeredQueue<Node>,
    pub stack: FixedCapacityStack<StackFrame>,
    pub direction: usize,
    pub current_flow_sending_pin: Vec<PinIndex>,
    pub current_flow_receiving_pin: Vec<PinIndex>,
    pub current_pin: Vec<PinIndex>,
    pub current_hyperedge: Vec<InHeIndex>,
    pub upper_flow_bound: Flow,
    pub shall_terminate: Option<Arc<AtomicBool>>,
}

impl DinicCore {
    pub fn new(hg: &FlowHypergraph) -> Self {
        DinicCore {
            queue: LayeredQueue::new(hg.num_nodes()),
            stack: FixedCapacityStack::new(hg.num_nodes()),
            direction: 0,
            current_flow_sending_pin: vec![0; hg.num_hyperedges()],
            current_flow_receiving_pin: vec![0; hg.num_hyperedges()],
            current_pin: vec![0; hg.num_hyperedges()],
            current_hyperedge: vec![0; hg.num_nodes()],
            upper_flow_bound: MAX_FLOW,
            shall_terminate: None,
        }
    }

    /// The cursor arrays are direction-dependent; swap them whenever the
    /// cutter state was flipped since the last search.
    pub fn align_direction(&mut self, view_direction: usize) {
        if self.direction != view_direction {
            std::mem::swap(
                &mut self.current_flow_sending_pin,
                &mut self.current_flow_receiving_pin,
            );
            self.direction = view_direction;
        }
    }

    pub fn is_terminated(&self) -> bool {
        self.shall_terminate
            .as_ref()
            .is_some_and(|f| f.load(Ordering::Relaxed))
    }
}

fn visit(
    hg: &FlowHypergraph,
    n: &mut DistanceReachableNodes,
    queue: &mut LayeredQueue<Node>,
    current_hyperedge: &mut [InHeIndex],
    v: Node,
    found_target: &mut bool,
) {
    *found_target |= n.is_target(v);
    if !n.is_target(v) && !n.is_source_reachable_unsafe(v) {
        n.reach(hg, v);
        queue.push(v);
        current_hyperedge[v] = hg.begin_index_hyperedges(v);
    }
}

#[derive(Debug)]
pub struct Dinic {
    pub(crate) core: DinicCore,
}

impl Dinic {
    fn reset_source_piercing_node_distances(cs: &mut CutterState<Self>, reset: bool) {
        for sp in &cs.source_piercing_nodes {
            cs.n.set_piercing_node_distance(sp.node, reset);
        }
    }

    /// Layered BFS from the source piercing nodes. Returns whether the
    /// target side was reached; if not, the source-reachable sets describe
    /// the cut.
    fn build_layered_network(
        &mut self,
        hg: &FlowHypergraph,
        cs: &mut CutterState<Self>,
        augment_flow: bool,
    ) -> bool {
        let _ = augment_flow;
        self.core.align_direction(cs.view_direction);
        cs.clear_for_search(hg);
        let core = &mut self.core;
        core.queue.clear();
        let mut found_target = false;

        for sp in &cs.source_piercing_nodes {
            cs.n.set_piercing_node_distance(sp.node, false);
            debug_assert!(cs.n.is_source_reachable(sp.node));
            core.queue.push(sp.node);
            core.current_hyperedge[sp.node] = hg.begin_index_hyperedges(sp.node);
        }
        let _ = cs.n.hop();
        let _ = cs.h.hop();
        core.queue.finish_next_layer();

        while !core.queue.is_empty() {
            while !core.queue.current_layer_empty() {
                let u = core.queue.pop();
                for he_it in hg.incident_hyperedge_indices(u) {
                    let inc_u = *hg.get_in_he(he_it);
                    let e = inc_u.e;
                    if cs.h.are_all_pins_source_reachable_unsafe(e) {
                        continue;
                    }
                    let scan_all_pins = !hg.is_saturated(e) || hg.flow_received(&inc_u) > 0;
                    if !scan_all_pins && cs.h.are_flow_sending_pins_source_reachable_unsafe(e) {
                        continue;
                    }

                    if scan_all_pins {
                        cs.h.reach_all_pins(e);
                        core.current_pin[e] = hg.pins_not_sending_flow_indices(e).start;
                    }

                    let scan_flow_sending = !cs.h.are_flow_sending_pins_source_reachable_unsafe(e);
                    if scan_flow_sending {
                        cs.h.reach_flow_sending_pins(e);
                        core.current_flow_sending_pin[e] = hg.pins_sending_flow_indices(e).start;
                    }

                    if scan_flow_sending {
                        for i in hg.pins_sending_flow_indices(e) {
                            let v = hg.get_pin(i).pin;
                            visit(
                                hg,
                                &mut cs.n,
                                &mut core.queue,
                                &mut core.current_hyperedge,
                                v,
                                &mut found_target,
                            );
                        }
                    }
                    if scan_all_pins {
                        for i in hg.pins_not_sending_flow_indices(e) {
                            let v = hg.get_pin(i).pin;
                            visit(
                                hg,
                                &mut cs.n,
                                &mut core.queue,
                                &mut core.current_hyperedge,
                                v,
                                &mut found_target,
                            );
                        }
                    }
                }
            }
            let _ = cs.n.hop();
            let _ = cs.h.hop();
            core.queue.finish_next_layer();
        }

        cs.n.lock_in_source_distance();
        cs.h.lock_in_source_distance();
        debug!(
            "layered network: found_target={} layers={}",
            found_target,
            cs.n.s.upper_bound - cs.n.s.base
        );
        found_target
    }

    /// DFS blocking flow in the layered network built by the last BFS.
    fn augment_flow_in_layered_network(
        &mut self,
        hg: &mut FlowHypergraph,
        cs: &mut CutterState<Self>,
    ) -> Flow {
        self.core.align_direction(cs.view_direction);
        let mut total = 0;

        for sp_index in 0..cs.source_piercing_nodes.len() {
            let sp = cs.source_piercing_nodes[sp_index].node;
            debug_assert!(self.core.stack.is_empty());
            self.core.stack.push(StackFrame {
                u: sp,
                parent_he_it: INVALID_IN_HE_INDEX,
            });

            while !self.core.stack.is_empty() {
                let u = self.core.stack.top().u;
                debug_assert!(!cs.n.is_distance_stale(u));
                let req_dist = cs.n.distance[u] + 1;
                let mut v = INVALID_NODE;
                let mut inc_v_it = INVALID_IN_HE_INDEX;

                while self.core.current_hyperedge[u] < hg.end_index_hyperedges(u) {
                    let he_it = self.core.current_hyperedge[u];
                    let inc_u = *hg.get_in_he(he_it);
                    let e = inc_u.e;
                    let residual = hg.residual_capacity(e) + hg.absolute_flow_received(&inc_u);
                    debug_assert_eq!(
                        residual > 0,
                        !hg.is_saturated(e) || hg.absolute_flow_received(&inc_u) > 0
                    );
                    let scan_all = req_dist == cs.h.out_distance[e] && residual > 0;
                    let scan_flow_sending = req_dist == cs.h.in_distance[e];

                    if scan_flow_sending {
                        let first_invalid = hg.pins_sending_flow_indices(e).end;
                        while self.core.current_flow_sending_pin[e] < first_invalid {
                            let pv = *hg.get_pin(self.core.current_flow_sending_pin[e]);
                            if residual + hg.absolute_flow_sent(hg.get_in_he(pv.he_inc_iter)) > 0
                                && (cs.n.is_target(pv.pin) || cs.n.distance[pv.pin] == req_dist)
                            {
                                v = pv.pin;
                                inc_v_it = pv.he_inc_iter;
                                break;
                            }
                            self.core.current_flow_sending_pin[e] += 1;
                        }
                    }

                    if scan_all && v == INVALID_NODE {
                        let first_invalid = hg.pins_not_sending_flow_indices(e).end;
                        while self.core.current_pin[e] < first_invalid {
                            let pv = *hg.get_pin(self.core.current_pin[e]);
                            if cs.n.is_target(pv.pin) || cs.n.distance[pv.pin] == req_dist {
                                v = pv.pin;
                                inc_v_it = pv.he_inc_iter;
                                break;
                            }
                            self.core.current_pin[e] += 1;
                        }
                    }

                    if v != INVALID_NODE {
                        break; // keep the hyperedge cursor on e
                    }
                    self.core.current_hyperedge[u] += 1;
                }

                if v == INVALID_NODE {
                    let _ = self.core.stack.pop();
                    // The parent's cursor still points at u; marking u
                    // unreachable keeps the search from pushing it again.
                    cs.n.distance[u] = UNREACHABLE_DISTANCE;
                } else if cs.n.is_target(v) {
                    total += augment_from_target(&mut self.core, hg, inc_v_it);
                } else {
                    self.core.stack.push(StackFrame {
                        u: v,
                        parent_he_it: inc_v_it,
                    });
                }
            }
        }
        debug_assert!(total > 0);
        total
    }

    /// When the previous phase only grew reachability and the pierced node
    /// was reachable from the opposite side, the opposite layered network
    /// is still intact; run one blocking-flow pass in the flipped view to
    /// reuse it.
    fn recycle_datastructures_from_grow_reachable_phase(
        &mut self,
        hg: &mut FlowHypergraph,
        cs: &mut CutterState<Self>,
    ) -> Flow {
        if !cs.augmenting_path_available_from_piercing
            || cs
                .source_piercing_nodes
                .iter()
                .all(|sp| !sp.is_reachable_from_opposite_side)
        {
            return 0;
        }
        cs.flip_view_direction(hg);
        Self::reset_source_piercing_node_distances(cs, false);
        let f = self.augment_flow_in_layered_network(hg, cs);
        Self::reset_source_piercing_node_distances(cs, true);
        cs.flip_view_direction(hg);
        f
    }
}

/// Routes the bottleneck along the DFS stack and pops back to the frame
/// holding the bottleneck.
pub(crate) fn augment_from_target(
    core: &mut DinicCore,
    hg: &mut FlowHypergraph,
    inc_target_it: InHeIndex,
) -> Flow {
    let mut bottleneck = MAX_FLOW;
    let mut lowest_bottleneck = usize::MAX;
    let mut inc_v_it = inc_target_it;
    for sp in (0..core.stack.len()).rev() {
        let frame = core.stack.at(sp);
        let inc_u_it = core.current_hyperedge[frame.u];
        let residual = hg.residual_capacity_between(hg.get_in_he(inc_u_it), hg.get_in_he(inc_v_it));
        if residual <= bottleneck {
            bottleneck = residual;
            lowest_bottleneck = sp;
        }
        inc_v_it = frame.parent_he_it;
    }
    debug_assert!(bottleneck > 0);

    inc_v_it = inc_target_it;
    for sp in (0..core.stack.len()).rev() {
        let frame = core.stack.at(sp);
        hg.route_flow(core.current_hyperedge[frame.u], inc_v_it, bottleneck);
        inc_v_it = frame.parent_he_it;
    }
    core.stack.pop_down_to(lowest_bottleneck);
    bottleneck
}

impl FlowAlgorithm for Dinic {
    type ReachableNodes = DistanceReachableNodes;
    type ReachableHyperedges = DistanceReachableHyperedges;

    const NAME: &'static str = "Dinic";

    fn new(hg: &FlowHypergraph) -> Self {
        Dinic {
            core: DinicCore::new(hg),
        }
    }

    fn exhaust_flow(&mut self, hg: &mut FlowHypergraph, cs: &mut CutterState<Self>) -> bool {
        cs.flow_value += self.recycle_datastructures_from_grow_reachable_phase(hg, cs);
        let mut has_cut = false;
        while cs.flow_value <= self.core.upper_flow_bound {
            if self.core.is_terminated() {
                has_cut = false;
                break;
            }
            has_cut = !self.build_layered_network(hg, cs, true);
            if has_cut || cs.flow_value >= self.core.upper_flow_bound {
                break;
            }
            cs.flow_value += self.augment_flow_in_layered_network(hg, cs);
        }
        Self::reset_source_piercing_node_distances(cs, true);
        has_cut
    }

    fn grow_flow_or_source_reachable(
        &mut self,
        hg: &mut FlowHypergraph,
        cs: &mut CutterState<Self>,
    ) -> Flow {
        let mut f = 0;
        if self.build_layered_network(hg, cs, true) {
            f += self.augment_flow_in_layered_network(hg, cs);
        }
        Self::reset_source_piercing_node_distances(cs, true);
        f
    }

    fn grow_reachable(&mut self, hg: &mut FlowHypergraph, cs: &mut CutterState<Self>) {
        let found_target = self.build_layered_network(hg, cs, false);
        debug_assert!(!found_target);
        Self::reset_source_piercing_node_distances(cs, true);
    }

    fn scan_list_mut(&mut self) -> &mut LayeredQueue<Node> {
        &mut self.core.queue
    }

    fn upper_flow_bound(&self) -> Flow {
        self.core.upper_flow_bound
    }

    fn set_upper_flow_bound(&mut self, bound: Flow) {
        self.core.upper_flow_bound = bound;
    }

    fn set_termination_flag(&mut self, flag: Arc<AtomicBool>) {
        self.core.shall_terminate = Some(flag);
    }
}
