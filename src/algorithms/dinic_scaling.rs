//! Capacity-scaling Dinic: only hyperedges with enough residual are
//! traversed until the scaling capacity bottoms out.
//!
//! The threshold starts at the largest power of two not above the maximum
//! hyperedge capacity and halves whenever no augmenting path exists at the
//! current threshold. Below the cutoff the search degenerates to the plain
//! blocking flow.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use crate::algorithms::dinic::augment_from_target;
use crate::algorithms::dinic::DinicCore;
use crate::algorithms::dinic::StackFrame;
use crate::algorithms::CutterState;
use crate::algorithms::FlowAlgorithm;
use crate::basic_types::Flow;
use crate::basic_types::Node;
use crate::basic_types::INVALID_IN_HE_INDEX;
use crate::basic_types::INVALID_NODE;
use crate::datastructure::distance_reachable_sets::UNREACHABLE_DISTANCE;
use crate::datastructure::DistanceReachableHyperedges;
use crate::datastructure::DistanceReachableNodes;
use crate::datastructure::FlowHypergraph;
use crate::datastructure::LayeredQueue;
use crate::datastructure::ReachableHyperedges;
use crate::datastructure::ReachableNodes;

const DEFAULT_INITIAL_CAPACITY: Flow = 1 << 24;
const CUT_OFF: Flow = 3;

/// The capacity threshold schedule.
#[derive(Debug, Clone, Copy)]
pub struct Scaling {
    initial_capacity: Flow,
    capacity: Flow,
    enabled: bool,
}

impl Scaling {
    fn new(max_scaling_capacity: Flow) -> Self {
        let max_cap = DEFAULT_INITIAL_CAPACITY.min(max_scaling_capacity.max(1));
        let mut initial_capacity = 1;
        while 2 * initial_capacity <= max_cap {
            initial_capacity *= 2;
        }
        Scaling {
            initial_capacity,
            capacity: initial_capacity,
            enabled: true,
        }
    }

    fn reduce_capacity(&mut self) {
        self.capacity /= 2;
    }

    fn reset(&mut self) {
        self.capacity = self.initial_capacity;
    }

    fn capacity(&self) -> Flow {
        if self.in_use() {
            self.capacity
        } else {
            1
        }
    }

    fn in_use(&self) -> bool {
        self.enabled && self.capacity > CUT_OFF
    }
}

#[derive(Debug)]
pub struct ScalingDinic {
    core: DinicCore,
    scaling: Scaling,
}

impl ScalingDinic {
    fn reset_source_piercing_node_distances(cs: &mut CutterState<Self>, reset: bool) {
        for sp in &cs.source_piercing_nodes {
            cs.n.set_piercing_node_distance(sp.node, reset);
        }
    }

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
        let scaling_capacity = self.scaling.capacity();
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

        let mut visit = |n: &mut DistanceReachableNodes,
                         queue: &mut LayeredQueue<Node>,
                         current_hyperedge: &mut [usize],
                         v: Node,
                         found_target: &mut bool| {
            *found_target |= n.is_target(v);
            if !n.is_target(v) && !n.is_source_reachable_unsafe(v) {
                n.reach(hg, v);
                queue.push(v);
                current_hyperedge[v] = hg.begin_index_hyperedges(v);
            }
        };

        while !core.queue.is_empty() {
            while !core.queue.current_layer_empty() {
                let u = core.queue.pop();
                for he_it in hg.incident_hyperedge_indices(u) {
                    let inc_u = *hg.get_in_he(he_it);
                    let e = inc_u.e;
                    if hg.capacity(e) < scaling_capacity
                        || cs.h.are_all_pins_source_reachable_unsafe(e)
                    {
                        continue;
                    }
                    let residual = hg.residual_capacity(e) + hg.absolute_flow_received(&inc_u);

                    if !cs.h.are_flow_sending_pins_source_reachable_unsafe(e) {
                        cs.h.reach_flow_sending_pins(e);
                        core.current_flow_sending_pin[e] = hg.pins_sending_flow_indices(e).start;
                        for i in hg.pins_sending_flow_indices(e) {
                            let pv = *hg.get_pin(i);
                            let residual_at_v =
                                residual + hg.absolute_flow_sent(hg.get_in_he(pv.he_inc_iter));
                            if residual_at_v >= scaling_capacity {
                                visit(
                                    &mut cs.n,
                                    &mut core.queue,
                                    &mut core.current_hyperedge,
                                    pv.pin,
                                    &mut found_target,
                                );
                            }
                        }
                    }

                    if residual >= scaling_capacity {
                        cs.h.reach_all_pins(e);
                        core.current_pin[e] = hg.pins_not_sending_flow_indices(e).start;
                        for i in hg.pins_not_sending_flow_indices(e) {
                            let v = hg.get_pin(i).pin;
                            visit(
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
        found_target
    }

    fn augment_flow_in_layered_network(
        &mut self,
        hg: &mut FlowHypergraph,
        cs: &mut CutterState<Self>,
    ) -> Flow {
        self.core.align_direction(cs.view_direction);
        let scaling_capacity = self.scaling.capacity();
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
                let req_dist = cs.n.distance[u] + 1;
                let mut v = INVALID_NODE;
                let mut inc_v_it = INVALID_IN_HE_INDEX;

                while self.core.current_hyperedge[u] < hg.end_index_hyperedges(u) {
                    let he_it = self.core.current_hyperedge[u];
                    let inc_u = *hg.get_in_he(he_it);
                    let e = inc_u.e;
                    if hg.capacity(e) < scaling_capacity {
                        self.core.current_hyperedge[u] += 1;
                        continue;
                    }
                    let residual = hg.residual_capacity(e) + hg.absolute_flow_received(&inc_u);

                    if cs.h.in_distance[e] == req_dist {
                        let first_invalid = hg.pins_sending_flow_indices(e).end;
                        while self.core.current_flow_sending_pin[e] < first_invalid {
                            let pv = *hg.get_pin(self.core.current_flow_sending_pin[e]);
                            if residual + hg.absolute_flow_sent(hg.get_in_he(pv.he_inc_iter))
                                >= scaling_capacity
                                && (cs.n.is_target(pv.pin) || cs.n.distance[pv.pin] == req_dist)
                            {
                                v = pv.pin;
                                inc_v_it = pv.he_inc_iter;
                                break;
                            }
                            self.core.current_flow_sending_pin[e] += 1;
                        }
                    }

                    if v == INVALID_NODE
                        && residual >= scaling_capacity
                        && cs.h.out_distance[e] == req_dist
                    {
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
                        break;
                    }
                    self.core.current_hyperedge[u] += 1;
                }

                if v == INVALID_NODE {
                    let _ = self.core.stack.pop();
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
        total
    }

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
        self.scaling.enabled = false;
        let f = self.augment_flow_in_layered_network(hg, cs);
        self.scaling.enabled = true;
        Self::reset_source_piercing_node_distances(cs, true);
        cs.flip_view_direction(hg);
        f
    }
}

impl FlowAlgorithm for ScalingDinic {
    type ReachableNodes = DistanceReachableNodes;
    type ReachableHyperedges = DistanceReachableHyperedges;

    const NAME: &'static str = "ScalingDinic";

    fn new(hg: &FlowHypergraph) -> Self {
        ScalingDinic {
            core: DinicCore::new(hg),
            scaling: Scaling::new(hg.max_hyperedge_capacity()),
        }
    }

    fn exhaust_flow(&mut self, hg: &mut FlowHypergraph, cs: &mut CutterState<Self>) -> bool {
        cs.flow_value += self.recycle_datastructures_from_grow_reachable_phase(hg, cs);

        self.scaling.reset();
        while cs.flow_value <= self.core.upper_flow_bound
            && self.scaling.in_use()
            && !self.core.is_terminated()
        {
            if self.build_layered_network(hg, cs, true) {
                cs.flow_value += self.augment_flow_in_layered_network(hg, cs);
            } else {
                self.scaling.reduce_capacity();
            }
        }

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
        while self.scaling.in_use() {
            if self.build_layered_network(hg, cs, true) {
                f += self.augment_flow_in_layered_network(hg, cs);
                break;
            }
            self.scaling.reduce_capacity();
        }
        if f == 0 {
            if self.build_layered_network(hg, cs, true) {
                f += self.augment_flow_in_layered_network(hg, cs);
            } else {
                self.scaling.reset();
            }
        }
        Self::reset_source_piercing_node_distances(cs, true);
        f
    }

    fn grow_reachable(&mut self, hg: &mut FlowHypergraph, cs: &mut CutterState<Self>) {
        self.scaling.enabled = false;
        let found_target = self.build_layered_network(hg, cs, false);
        self.scaling.enabled = true;
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
