//! Bidirectional Dinic: the layered network is grown simultaneously from
//! the source and the target piercing nodes, always advancing the frontier
//! with the smaller summed degree. When the frontiers meet, the
//! blocking-flow DFS runs from the source side and crosses the meeting
//! layer with a two-segment required-distance rule. When they cannot meet,
//! both searches run dry, which yields the cut together with the complete
//! reachability of both sides.
//!
//! Every phase relabels inside a fresh window above all labels used
//! before, so neither frontier needs a reset pass. Work per augmenting
//! phase is proportional to the smaller of the two search volumes, which
//! pays off for long-range cuts.

use std::sync::atomic::AtomicBool;
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
use crate::datastructure::distance_reachable_sets::Distance;
use crate::datastructure::distance_reachable_sets::UNREACHABLE_DISTANCE;
use crate::datastructure::DistanceReachableHyperedges;
use crate::datastructure::DistanceReachableNodes;
use crate::datastructure::FixedCapacityStack;
use crate::datastructure::FlowHypergraph;
use crate::datastructure::LayeredQueue;
use crate::datastructure::Pin;
use crate::datastructure::ReachableNodes;

/// Bounds of the label window of one bidirectional phase. Forward layers
/// grow upwards from `f_lb + 1`, backward layers downwards from `b_ub`;
/// `f_lb` doubles as the meeting label.
#[derive(Debug, Clone, Copy)]
struct Layers {
    f_lb: Distance,
    flayer: Distance,
    b_ub: Distance,
    blayer: Distance,
    only_forward: bool,
}

impl Layers {
    fn meeting_dist(&self) -> Distance {
        self.f_lb
    }

    fn node_is_source_reachable(&self, n: &DistanceReachableNodes, v: Node) -> bool {
        (n.distance[v] >= self.f_lb && n.distance[v] <= self.flayer) || n.is_source(v)
    }

    fn node_is_target_reachable(&self, n: &DistanceReachableNodes, v: Node) -> bool {
        if self.only_forward {
            // stale window of the previous phases still applies
            return n.is_target_reachable(v);
        }
        (n.distance[v] <= self.b_ub && n.distance[v] >= self.blayer)
            || n.distance[v] == self.meeting_dist()
            || n.is_target(v)
    }

    fn all_pins_source_reachable(&self, h: &DistanceReachableHyperedges, e: usize) -> bool {
        h.out_distance[e] == h.source_settled_distance
            || (h.out_distance[e] >= self.f_lb && h.out_distance[e] <= self.flayer)
    }

    fn flow_sending_pins_source_reachable(&self, h: &DistanceReachableHyperedges, e: usize) -> bool {
        h.in_distance[e] == h.source_settled_distance
            || (h.in_distance[e] >= self.f_lb && h.in_distance[e] <= self.flayer)
    }

    fn all_pins_target_reachable(&self, h: &DistanceReachableHyperedges, e: usize) -> bool {
        h.in_distance[e] == h.target_settled_distance
            || (h.in_distance[e] <= self.b_ub && h.in_distance[e] >= self.blayer)
    }

    fn flow_receiving_pins_target_reachable(
        &self,
        h: &DistanceReachableHyperedges,
        e: usize,
    ) -> bool {
        h.out_distance[e] == h.target_settled_distance
            || (h.out_distance[e] <= self.b_ub && h.out_distance[e] >= self.blayer)
    }
}

#[derive(Debug)]
pub struct BidirectionalDinic {
    fqueue: LayeredQueue<Node>,
    bqueue: LayeredQueue<Node>,
    stack: FixedCapacityStack<Pin>,
    previous_cutter_state_direction: usize,
    current_flow_sending_pin: Vec<PinIndex>,
    current_pin: Vec<PinIndex>,
    current_hyperedge: Vec<InHeIndex>,
    upper_flow_bound: Flow,
    shall_terminate: Option<Arc<AtomicBool>>,
}

impl BidirectionalDinic {
    /// The search only works in the forward orientation; flip the cutter
    /// state into it and remember how to restore it.
    fn prepare(&mut self, hg: &mut FlowHypergraph, cs: &mut CutterState<Self>) {
        self.previous_cutter_state_direction = cs.view_direction;
        if cs.view_direction != 0 {
            cs.flip_view_direction(hg);
        }
        debug_assert_eq!(cs.view_direction, 0);
    }

    fn finish(&mut self, hg: &mut FlowHypergraph, cs: &mut CutterState<Self>) {
        for i in 0..cs.source_piercing_nodes.len() {
            let u = cs.source_piercing_nodes[i].node;
            cs.n.distance[u] = cs.n.source_settled_distance;
        }
        for i in 0..cs.target_piercing_nodes.len() {
            let u = cs.target_piercing_nodes[i].node;
            cs.n.distance[u] = cs.n.target_settled_distance;
        }
        if self.previous_cutter_state_direction != 0 {
            cs.flip_view_direction(hg);
        }
        debug_assert_eq!(cs.view_direction, self.previous_cutter_state_direction);
    }

    fn is_terminated(&self) -> bool {
        self.shall_terminate
            .as_ref()
            .is_some_and(|f| f.load(std::sync::atomic::Ordering::Relaxed))
    }

    /// Simultaneous BFS. Returns whether the searches met; the distance
    /// windows of `cs.n` / `cs.h` are rewritten to the fresh layers.
    fn build_layered_network(
        &mut self,
        hg: &FlowHypergraph,
        cs: &mut CutterState<Self>,
        augment_flow: bool,
        only_forward: bool,
    ) -> bool {
        let _ = augment_flow;
        debug_assert_eq!(cs.view_direction, 0);

        let label_budget = 2 * hg.num_nodes() as u64 + 8;
        if cs.n.label_space_left() <= label_budget {
            cs.n.compact_labels();
            cs.h.compact_labels();
        }
        let anchor = cs.n.running_distance;
        let mut layers = Layers {
            f_lb: anchor + 1,
            flayer: anchor + 2,
            b_ub: anchor + 2 * hg.num_nodes() as Distance + 6,
            blayer: anchor + 2 * hg.num_nodes() as Distance + 6,
            only_forward,
        };

        self.fqueue.clear();
        self.bqueue.clear();
        let mut searches_met = false;
        let mut fdeg = 0usize;
        let mut bdeg = 0usize;

        for i in 0..cs.source_piercing_nodes.len() {
            let sp = cs.source_piercing_nodes[i].node;
            debug_assert!(!cs.n.is_target(sp));
            cs.n.distance[sp] = layers.flayer;
            fdeg += hg.degree(sp);
            self.fqueue.push(sp);
        }
        self.fqueue.finish_next_layer();
        layers.flayer += 1;

        if !only_forward {
            for i in 0..cs.target_piercing_nodes.len() {
                let tp = cs.target_piercing_nodes[i].node;
                debug_assert!(!cs.n.is_source(tp));
                cs.n.distance[tp] = layers.blayer;
                bdeg += hg.degree(tp);
                self.bqueue.push(tp);
            }
            self.bqueue.finish_next_layer();
            layers.blayer -= 1;
        }

        while !searches_met && (!self.fqueue.is_empty() || !self.bqueue.is_empty()) {
            let advance_forward = only_forward
                || self.bqueue.is_empty()
                || (!self.fqueue.is_empty() && fdeg < bdeg);
            if advance_forward {
                fdeg = 0;
                while !self.fqueue.current_layer_empty() {
                    let u = self.fqueue.pop();
                    for inc_u in hg.hyperedges_of(u) {
                        let e = inc_u.e;
                        if layers.all_pins_source_reachable(&cs.h, e) {
                            continue;
                        }
                        if !hg.is_saturated(e) || hg.flow_received(inc_u) > 0 {
                            // u -> in-node(e) -> out-node(e) -> all pins
                            cs.h.out_distance[e] = layers.flayer;
                            for pi in hg.pins_not_sending_flow_indices(e) {
                                let v = hg.get_pin(pi).pin;
                                debug_assert!(!cs.n.is_target(v));
                                if !layers.node_is_source_reachable(&cs.n, v) {
                                    if layers.node_is_target_reachable(&cs.n, v) {
                                        searches_met = true;
                                        cs.n.distance[v] = layers.meeting_dist();
                                    } else if !searches_met {
                                        cs.n.distance[v] = layers.flayer;
                                        fdeg += hg.degree(v);
                                        self.fqueue.push(v);
                                    }
                                }
                            }
                        }
                        if !layers.flow_sending_pins_source_reachable(&cs.h, e) {
                            // u -> in-node(e) -> pins sending flow into e
                            cs.h.in_distance[e] = layers.flayer;
                            for pi in hg.pins_sending_flow_indices(e) {
                                let v = hg.get_pin(pi).pin;
                                debug_assert!(!cs.n.is_target(v));
                                if !layers.node_is_source_reachable(&cs.n, v) {
                                    if layers.node_is_target_reachable(&cs.n, v) {
                                        searches_met = true;
                                        cs.n.distance[v] = layers.meeting_dist();
                                    } else if !searches_met {
                                        cs.n.distance[v] = layers.flayer;
                                        fdeg += hg.degree(v);
                                        self.fqueue.push(v);
                                    }
                                }
                            }
                        }
                    }
                }
                self.fqueue.finish_next_layer();
                layers.flayer += 1;
            } else {
                bdeg = 0;
                while !self.bqueue.current_layer_empty() {
                    let u = self.bqueue.pop();
                    for inc_u in hg.hyperedges_of(u) {
                        let e = inc_u.e;
                        if layers.all_pins_target_reachable(&cs.h, e) {
                            continue;
                        }
                        debug_assert!(!layers.all_pins_source_reachable(&cs.h, e));
                        if !hg.is_saturated(e) || hg.flow_sent(inc_u) > 0 {
                            // u <- in-node(e) <- out-node(e) <- all pins
                            cs.h.in_distance[e] = layers.blayer;
                            for pi in hg.pins_not_receiving_flow_indices(e) {
                                let v = hg.get_pin(pi).pin;
                                debug_assert!(!cs.n.is_source(v));
                                if !layers.node_is_target_reachable(&cs.n, v) {
                                    if layers.node_is_source_reachable(&cs.n, v) {
                                        searches_met = true;
                                        cs.n.distance[v] = layers.meeting_dist();
                                    } else if !searches_met {
                                        cs.n.distance[v] = layers.blayer;
                                        bdeg += hg.degree(v);
                                        self.bqueue.push(v);
                                    }
                                }
                            }
                        }
                        if !layers.flow_receiving_pins_target_reachable(&cs.h, e) {
                            // u <- out-node(e) <- pins receiving flow from e
                            cs.h.out_distance[e] = layers.blayer;
                            for pi in hg.pins_receiving_flow_indices(e) {
                                let v = hg.get_pin(pi).pin;
                                debug_assert!(!cs.n.is_source(v));
                                if !layers.node_is_target_reachable(&cs.n, v) {
                                    if layers.node_is_source_reachable(&cs.n, v) {
                                        searches_met = true;
                                        cs.n.distance[v] = layers.meeting_dist();
                                    } else if !searches_met {
                                        cs.n.distance[v] = layers.blayer;
                                        bdeg += hg.degree(v);
                                        self.bqueue.push(v);
                                    }
                                }
                            }
                        }
                    }
                }
                self.bqueue.finish_next_layer();
                layers.blayer -= 1;
            }
        }

        cs.n.s.base = layers.f_lb + 1;
        cs.n.s.upper_bound = layers.flayer;
        if !only_forward {
            cs.n.t.base = layers.blayer;
            cs.n.t.upper_bound = layers.b_ub;
        }
        cs.n.running_distance = layers.b_ub + 1;
        cs.h.s = cs.n.s;
        if !only_forward {
            cs.h.t = cs.n.t;
        }
        cs.h.running_distance = cs.n.running_distance;
        cs.n.recompute_reachable_weights(hg);

        debug!(
            "bidirectional BFS: met={} #flayers={} #blayers={}",
            searches_met,
            cs.n.s.upper_bound - cs.n.s.base,
            cs.n.t.upper_bound.saturating_sub(cs.n.t.base),
        );
        searches_met
    }

    fn augment_flow_in_layered_network(
        &mut self,
        hg: &mut FlowHypergraph,
        cs: &mut CutterState<Self>,
    ) -> Flow {
        debug_assert_eq!(cs.view_direction, 0);
        let meeting_dist = cs.n.s.base - 1;
        let mut total = 0;

        for u in 0..hg.num_nodes() {
            self.current_hyperedge[u] = hg.begin_index_hyperedges(u);
        }
        for e in 0..hg.num_hyperedges() {
            self.current_pin[e] = hg.pins_not_sending_flow_indices(e).start;
            self.current_flow_sending_pin[e] = hg.pins_sending_flow_indices(e).start;
        }

        for sp_index in 0..cs.source_piercing_nodes.len() {
            let sp = cs.source_piercing_nodes[sp_index].node;
            debug_assert!(self.stack.is_empty());
            self.stack.push(Pin {
                pin: sp,
                he_inc_iter: INVALID_IN_HE_INDEX,
            });

            while !self.stack.is_empty() {
                let u = self.stack.top().pin;
                let mut next = Pin {
                    pin: INVALID_NODE,
                    he_inc_iter: INVALID_IN_HE_INDEX,
                };

                let at_meeting_node = cs.n.distance[u] == meeting_dist;
                let in_forward_search = cs.n.distance[u] < cs.n.s.upper_bound;
                let (req_dist_node, req_dist_edge) = if in_forward_search && !at_meeting_node {
                    let req_dist_edge = cs.n.distance[u] + 1;
                    // the last forward layer only connects onward through
                    // the meeting layer
                    let req_dist_node = if cs.n.distance[u] == cs.n.s.upper_bound - 2 {
                        meeting_dist
                    } else {
                        req_dist_edge
                    };
                    (req_dist_node, req_dist_edge)
                } else {
                    // meeting nodes were visited in layer t.base + 1
                    let req_dist_node = if at_meeting_node {
                        cs.n.t.base + 2
                    } else {
                        cs.n.distance[u] + 1
                    };
                    (req_dist_node, req_dist_node - 1)
                };

                while self.current_hyperedge[u] < hg.end_index_hyperedges(u) {
                    let inc_u = *hg.get_in_he(self.current_hyperedge[u]);
                    let e = inc_u.e;
                    let residual = hg.residual_capacity(e) + hg.absolute_flow_received(&inc_u);

                    if req_dist_edge == cs.h.in_distance[e] {
                        let first_invalid = hg.pins_sending_flow_indices(e).end;
                        while self.current_flow_sending_pin[e] < first_invalid {
                            let pv = *hg.get_pin(self.current_flow_sending_pin[e]);
                            debug_assert!(hg.absolute_flow_sent(hg.get_in_he(pv.he_inc_iter)) > 0);
                            if cs.n.distance[pv.pin] == req_dist_node {
                                next = pv;
                                break;
                            }
                            self.current_flow_sending_pin[e] += 1;
                        }
                    }

                    if next.pin == INVALID_NODE
                        && residual > 0
                        && cs.h.out_distance[e] == req_dist_edge
                    {
                        let first_invalid = hg.pins_not_sending_flow_indices(e).end;
                        while self.current_pin[e] < first_invalid {
                            let pv = *hg.get_pin(self.current_pin[e]);
                            if cs.n.distance[pv.pin] == req_dist_node {
                                next = pv;
                                break;
                            }
                            self.current_pin[e] += 1;
                        }
                    }

                    if next.pin != INVALID_NODE {
                        break; // keep the hyperedge cursor on e
                    }
                    self.current_hyperedge[u] += 1;
                }

                if next.pin == INVALID_NODE {
                    let _ = self.stack.pop();
                    // The parent's cursor still points at u; marking u
                    // unreachable keeps the search from pushing it again.
                    cs.n.distance[u] = UNREACHABLE_DISTANCE;
                } else if cs
                    .target_piercing_nodes
                    .iter()
                    .any(|tp| tp.node == next.pin)
                {
                    total += self.augment_from_target(hg, next.he_inc_iter);
                } else {
                    self.stack.push(next);
                }
            }
        }
        cs.n.recompute_reachable_weights(hg);
        debug_assert!(total > 0);
        total
    }

    fn augment_from_target(&mut self, hg: &mut FlowHypergraph, inc_target_it: InHeIndex) -> Flow {
        let mut bottleneck = MAX_FLOW;
        let mut lowest_bottleneck = usize::MAX;
        let mut inc_v_it = inc_target_it;
        for sp in (0..self.stack.len()).rev() {
            let frame = self.stack.at(sp);
            let inc_u_it = self.current_hyperedge[frame.pin];
            let residual =
                hg.residual_capacity_between(hg.get_in_he(inc_u_it), hg.get_in_he(inc_v_it));
            if residual <= bottleneck {
                bottleneck = residual;
                lowest_bottleneck = sp;
            }
            inc_v_it = frame.he_inc_iter;
        }
        debug_assert!(bottleneck > 0);

        inc_v_it = inc_target_it;
        for sp in (0..self.stack.len()).rev() {
            let frame = self.stack.at(sp);
            hg.route_flow(self.current_hyperedge[frame.pin], inc_v_it, bottleneck);
            inc_v_it = frame.he_inc_iter;
        }
        self.stack.pop_down_to(lowest_bottleneck);
        bottleneck
    }
}

impl FlowAlgorithm for BidirectionalDinic {
    type ReachableNodes = DistanceReachableNodes;
    type ReachableHyperedges = DistanceReachableHyperedges;

    const NAME: &'static str = "BidirectionalDinic";

    fn new(hg: &FlowHypergraph) -> Self {
        BidirectionalDinic {
            fqueue: LayeredQueue::new(hg.num_nodes()),
            bqueue: LayeredQueue::new(hg.num_nodes()),
            stack: FixedCapacityStack::new(hg.num_nodes()),
            previous_cutter_state_direction: 0,
            current_flow_sending_pin: vec![0; hg.num_hyperedges()],
            current_pin: vec![0; hg.num_hyperedges()],
            current_hyperedge: vec![0; hg.num_nodes()],
            upper_flow_bound: MAX_FLOW,
            shall_terminate: None,
        }
    }

    fn exhaust_flow(&mut self, hg: &mut FlowHypergraph, cs: &mut CutterState<Self>) -> bool {
        self.prepare(hg, cs);
        let mut has_cut = false;
        while cs.flow_value <= self.upper_flow_bound {
            if self.is_terminated() {
                has_cut = false;
                break;
            }
            has_cut = !self.build_layered_network(hg, cs, true, false);
            if has_cut || cs.flow_value >= self.upper_flow_bound {
                break;
            }
            cs.flow_value += self.augment_flow_in_layered_network(hg, cs);
        }
        self.finish(hg, cs);
        has_cut
    }

    fn grow_flow_or_source_reachable(
        &mut self,
        hg: &mut FlowHypergraph,
        cs: &mut CutterState<Self>,
    ) -> Flow {
        self.prepare(hg, cs);
        let mut f = 0;
        if self.build_layered_network(hg, cs, true, false) {
            f += self.augment_flow_in_layered_network(hg, cs);
        }
        self.finish(hg, cs);
        f
    }

    fn grow_reachable(&mut self, hg: &mut FlowHypergraph, cs: &mut CutterState<Self>) {
        self.prepare(hg, cs);
        let found_target = self.build_layered_network(hg, cs, false, true);
        debug_assert!(!found_target);
        self.finish(hg, cs);
    }

    fn scan_list_mut(&mut self) -> &mut LayeredQueue<Node> {
        &mut self.fqueue
    }

    fn upper_flow_bound(&self) -> Flow {
        self.upper_flow_bound
    }

    fn set_upper_flow_bound(&mut self, bound: Flow) {
        self.upper_flow_bound = bound;
    }

    fn set_termination_flag(&mut self, flag: Arc<AtomicBool>) {
        self.shall_terminate = Some(flag);
    }
}
