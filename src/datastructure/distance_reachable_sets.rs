//! Distance-label based reachability, used by the augmenting-path flow
//! algorithms.
//!
//! A single monotonically growing distance value per node (and per
//! hyperedge, split into the all-pins and flow-sending-pins views) encodes
//! membership in the four reachability sets. The window
//! `[s.base, s.upper_bound)` denotes the current source layer; two reserved
//! sentinel values mark the permanently settled sides. Resetting the
//! source-reachable set to the settled set is then O(1): move `s.base`
//! forward to the running counter. When the counter would overflow, a
//! rebase pass renumbers the target-side labels and resets the counter.

use crate::basic_types::Hyperedge;
use crate::basic_types::Node;
use crate::basic_types::NodeWeight;
use crate::datastructure::FlowHypergraph;
use crate::datastructure::ReachableHyperedges;
use crate::datastructure::ReachableNodes;

pub type Distance = u32;

pub const UNREACHABLE_DISTANCE: Distance = 0;
const RESET_BASE_DISTANCE: Distance = 3;

/// Half-open window of distance values belonging to one side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DistanceRange {
    pub base: Distance,
    pub upper_bound: Distance,
}

impl DistanceRange {
    fn at(d: Distance) -> Self {
        DistanceRange {
            base: d,
            upper_bound: d,
        }
    }

    pub fn contains(&self, d: Distance) -> bool {
        d >= self.base && d < self.upper_bound
    }
}

#[derive(Debug, Clone)]
pub struct DistanceReachableNodes {
    pub distance: Vec<Distance>,
    pub source_settled_distance: Distance,
    pub target_settled_distance: Distance,
    pub running_distance: Distance,
    pub s: DistanceRange,
    pub t: DistanceRange,

    source_weight: NodeWeight,
    source_reachable_weight: NodeWeight,
    target_weight: NodeWeight,
    target_reachable_weight: NodeWeight,
}

impl DistanceReachableNodes {
    pub fn hop(&mut self) -> Distance {
        self.running_distance += 1;
        self.running_distance
    }

    pub fn lock_in_source_distance(&mut self) {
        self.s.upper_bound = self.running_distance;
    }

    /// Saves one comparison in the Dinic inner loops: valid only before the
    /// source layer has been locked in.
    pub fn is_source_reachable_unsafe(&self, u: Node) -> bool {
        self.is_source(u) || self.distance[u] >= self.s.base
    }

    pub fn is_distance_stale(&self, u: Node) -> bool {
        self.distance[u] < self.s.base
    }

    pub fn source_base_distance(&self) -> Distance {
        self.s.base
    }

    /// Piercing nodes temporarily drop from the settled distance to the
    /// current source base so the BFS treats them as the root layer.
    pub fn set_piercing_node_distance(&mut self, piercing_node: Node, reset: bool) {
        self.distance[piercing_node] = if reset {
            self.source_settled_distance
        } else {
            self.s.base
        };
    }

    fn is_base_distance_safe(&self, num_nodes: usize) -> bool {
        (num_nodes as u64) + u64::from(self.running_distance) < u64::from(Distance::MAX)
    }

    /// Re-derives both reachable weights from the labels. Used by searches
    /// that relabel whole frontiers instead of reaching nodes one by one.
    pub fn recompute_reachable_weights(&mut self, hg: &FlowHypergraph) {
        let mut srw = 0;
        let mut trw = 0;
        for u in 0..self.distance.len() {
            if self.is_source_reachable(u) {
                srw += hg.node_weight(u);
            } else if self.is_target_reachable(u) {
                trw += hg.node_weight(u);
            }
        }
        self.source_reachable_weight = srw;
        self.target_reachable_weight = trw;
    }

    /// Wipes all non-settled labels and restarts the counter. Gives a
    /// search fresh label space when the counter nears overflow.
    pub fn compact_labels(&mut self) {
        let source = self.source_settled_distance;
        let target = self.target_settled_distance;
        for d in self.distance.iter_mut() {
            if *d != source && *d != target {
                *d = UNREACHABLE_DISTANCE;
            }
        }
        self.running_distance = RESET_BASE_DISTANCE;
        self.s = DistanceRange::at(source);
        self.t = DistanceRange::at(target);
    }

    pub fn label_space_left(&self) -> u64 {
        u64::from(Distance::MAX) - u64::from(self.running_distance)
    }
}

impl ReachableNodes for DistanceReachableNodes {
    fn new(hg: &FlowHypergraph) -> Self {
        debug_assert!(4 + hg.num_nodes() * 2 < Distance::MAX as usize);
        DistanceReachableNodes {
            distance: vec![UNREACHABLE_DISTANCE; hg.num_nodes()],
            source_settled_distance: 1,
            target_settled_distance: 2,
            running_distance: RESET_BASE_DISTANCE,
            s: DistanceRange::at(1),
            t: DistanceRange::at(2),
            source_weight: 0,
            source_reachable_weight: 0,
            target_weight: 0,
            target_reachable_weight: 0,
        }
    }

    fn is_source(&self, u: Node) -> bool {
        self.distance[u] == self.source_settled_distance
    }

    fn is_source_reachable(&self, u: Node) -> bool {
        self.is_source(u) || self.s.contains(self.distance[u])
    }

    fn is_target(&self, u: Node) -> bool {
        self.distance[u] == self.target_settled_distance
    }

    fn is_target_reachable(&self, u: Node) -> bool {
        self.is_target(u) || self.t.contains(self.distance[u])
    }

    fn reach(&mut self, hg: &FlowHypergraph, u: Node) {
        debug_assert!(!self.is_source_reachable(u));
        self.distance[u] = self.running_distance;
        self.source_reachable_weight += hg.node_weight(u);
    }

    fn settle(&mut self, hg: &FlowHypergraph, u: Node) {
        debug_assert!(!self.is_source(u));
        self.distance[u] = self.source_settled_distance;
        self.source_weight += hg.node_weight(u);
    }

    fn unreach_source(&mut self, hg: &FlowHypergraph, u: Node) {
        debug_assert!(self.is_source_reachable(u) && !self.is_target_reachable(u));
        self.distance[u] = UNREACHABLE_DISTANCE;
        self.source_reachable_weight -= hg.node_weight(u);
    }

    fn unreach_target(&mut self, hg: &FlowHypergraph, u: Node) {
        debug_assert!(self.is_target_reachable(u) && !self.is_source_reachable(u));
        self.distance[u] = UNREACHABLE_DISTANCE;
        self.target_reachable_weight -= hg.node_weight(u);
    }

    fn flip_view_direction(&mut self) {
        std::mem::swap(
            &mut self.source_settled_distance,
            &mut self.target_settled_distance,
        );
        std::mem::swap(&mut self.s, &mut self.t);
        std::mem::swap(&mut self.source_weight, &mut self.target_weight);
        std::mem::swap(
            &mut self.source_reachable_weight,
            &mut self.target_reachable_weight,
        );
    }

    fn reset_source_reachable_to_source(
        &mut self,
        hg: &FlowHypergraph,
        _augmenting_path_available: bool,
    ) {
        if !self.is_base_distance_safe(hg.num_nodes()) {
            // rebase: keep target layers, renumbered onto the reset base
            for u in 0..hg.num_nodes() {
                if self.is_source(u) || self.is_target(u) {
                    continue;
                }
                if self.is_target_reachable(u) {
                    self.distance[u] = RESET_BASE_DISTANCE + (self.distance[u] - self.t.base);
                } else {
                    self.distance[u] = UNREACHABLE_DISTANCE;
                }
            }
            self.t.upper_bound = RESET_BASE_DISTANCE + (self.t.upper_bound - self.t.base);
            self.t.base = RESET_BASE_DISTANCE;
            self.running_distance = self.t.upper_bound;
        }
        debug_assert!(self.is_base_distance_safe(hg.num_nodes()));
        self.s.base = self.running_distance;
        self.s.upper_bound = Distance::MAX;
        self.source_reachable_weight = self.source_weight;
    }

    fn source_weight(&self) -> NodeWeight {
        self.source_weight
    }

    fn source_reachable_weight(&self) -> NodeWeight {
        self.source_reachable_weight
    }

    fn target_weight(&self) -> NodeWeight {
        self.target_weight
    }

    fn target_reachable_weight(&self) -> NodeWeight {
        self.target_reachable_weight
    }
}

#[derive(Debug, Clone)]
pub struct DistanceReachableHyperedges {
    /// Distance at which the flow-sending pins of the edge were reached.
    pub in_distance: Vec<Distance>,
    /// Distance at which all pins of the edge were reached.
    pub out_distance: Vec<Distance>,
    pub source_settled_distance: Distance,
    pub target_settled_distance: Distance,
    pub running_distance: Distance,
    pub s: DistanceRange,
    pub t: DistanceRange,
}

impl DistanceReachableHyperedges {
    pub fn hop(&mut self) -> Distance {
        self.running_distance += 1;
        self.running_distance
    }

    pub fn lock_in_source_distance(&mut self) {
        self.s.upper_bound = self.running_distance;
    }

    pub fn are_all_pins_source_reachable_unsafe(&self, e: Hyperedge) -> bool {
        self.are_all_pins_sources(e) || self.out_distance[e] >= self.s.base
    }

    pub fn are_flow_sending_pins_source_reachable_unsafe(&self, e: Hyperedge) -> bool {
        self.are_flow_sending_pins_sources(e) || self.in_distance[e] >= self.s.base
    }

    fn is_base_distance_safe(&self, num_nodes: usize) -> bool {
        (num_nodes as u64) + u64::from(self.running_distance) < u64::from(Distance::MAX)
    }

    /// See [`DistanceReachableNodes::compact_labels`].
    pub fn compact_labels(&mut self) {
        let source = self.source_settled_distance;
        let target = self.target_settled_distance;
        for d in self.in_distance.iter_mut().chain(self.out_distance.iter_mut()) {
            if *d != source && *d != target {
                *d = UNREACHABLE_DISTANCE;
            }
        }
        self.running_distance = RESET_BASE_DISTANCE;
        self.s = DistanceRange::at(source);
        self.t = DistanceRange::at(target);
    }
}

impl ReachableHyperedges for DistanceReachableHyperedges {
    fn new(hg: &FlowHypergraph) -> Self {
        DistanceReachableHyperedges {
            in_distance: vec![UNREACHABLE_DISTANCE; hg.num_hyperedges()],
            out_distance: vec![UNREACHABLE_DISTANCE; hg.num_hyperedges()],
            source_settled_distance: 1,
            target_settled_distance: 2,
            running_distance: RESET_BASE_DISTANCE,
            s: DistanceRange::at(1),
            t: DistanceRange::at(2),
        }
    }

    fn are_all_pins_sources(&self, e: Hyperedge) -> bool {
        self.out_distance[e] == self.source_settled_distance
    }

    fn are_all_pins_source_reachable(&self, e: Hyperedge) -> bool {
        self.are_all_pins_sources(e) || self.s.contains(self.out_distance[e])
    }

    fn are_flow_sending_pins_sources(&self, e: Hyperedge) -> bool {
        self.in_distance[e] == self.source_settled_distance
    }

    fn are_flow_sending_pins_source_reachable(&self, e: Hyperedge) -> bool {
        self.are_flow_sending_pins_sources(e) || self.s.contains(self.in_distance[e])
    }

    fn settle_all_pins(&mut self, e: Hyperedge) {
        debug_assert!(!self.are_all_pins_sources(e));
        self.out_distance[e] = self.source_settled_distance;
        self.in_distance[e] = self.source_settled_distance;
    }

    fn settle_flow_sending_pins(&mut self, e: Hyperedge) {
        debug_assert!(!self.are_flow_sending_pins_sources(e));
        self.in_distance[e] = self.source_settled_distance;
    }

    fn reach_all_pins(&mut self, e: Hyperedge) {
        debug_assert!(!self.are_all_pins_source_reachable(e));
        self.out_distance[e] = self.running_distance;
    }

    fn reach_flow_sending_pins(&mut self, e: Hyperedge) {
        debug_assert!(!self.are_flow_sending_pins_source_reachable(e));
        self.in_distance[e] = self.running_distance;
    }

    fn flip_view_direction(&mut self) {
        std::mem::swap(
            &mut self.source_settled_distance,
            &mut self.target_settled_distance,
        );
        std::mem::swap(&mut self.s, &mut self.t);
        std::mem::swap(&mut self.in_distance, &mut self.out_distance);
    }

    fn reset_source_reachable_to_source(
        &mut self,
        hg: &FlowHypergraph,
        _augmenting_path_available: bool,
    ) {
        if !self.is_base_distance_safe(hg.num_nodes()) {
            let source_settled = self.source_settled_distance;
            let target_settled = self.target_settled_distance;
            let t = self.t;
            let reset = |d: &mut Vec<Distance>| {
                for x in d.iter_mut() {
                    if *x == source_settled || *x == target_settled {
                        continue;
                    }
                    if t.contains(*x) {
                        *x = RESET_BASE_DISTANCE + (*x - t.base);
                    } else {
                        *x = UNREACHABLE_DISTANCE;
                    }
                }
            };
            reset(&mut self.in_distance);
            reset(&mut self.out_distance);
            self.t.upper_bound = RESET_BASE_DISTANCE + (self.t.upper_bound - self.t.base);
            self.t.base = RESET_BASE_DISTANCE;
            self.running_distance = self.t.upper_bound;
        }
        debug_assert!(self.is_base_distance_safe(hg.num_nodes()));
        self.s.base = self.running_distance;
        self.s.upper_bound = Distance::MAX;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datastructure::FlowHypergraphBuilder;

    #[test]
    fn reset_source_reachable_shrinks_to_settled() {
        let hg = FlowHypergraphBuilder::with_nodes(4).finalize();
        let mut n = DistanceReachableNodes::new(&hg);
        n.reach(&hg, 0);
        n.settle(&hg, 0);
        n.reset_source_reachable_to_source(&hg, true);
        let _ = n.hop();
        n.reach(&hg, 1);
        n.reach(&hg, 2);
        assert!(n.is_source_reachable(1));
        assert_eq!(n.source_reachable_weight(), 3);

        n.reset_source_reachable_to_source(&hg, true);
        assert!(n.is_source(0));
        assert!(n.is_source_reachable(0));
        assert!(!n.is_source_reachable(1));
        assert!(!n.is_source_reachable(2));
        assert_eq!(n.source_reachable_weight(), n.source_weight());
    }

    #[test]
    fn flip_swaps_settled_roles() {
        let hg = FlowHypergraphBuilder::with_nodes(2).finalize();
        let mut n = DistanceReachableNodes::new(&hg);
        n.reach(&hg, 0);
        n.settle(&hg, 0);
        n.flip_view_direction();
        assert!(n.is_target(0));
        assert!(!n.is_source(0));
        n.flip_view_direction();
        assert!(n.is_source(0));
    }
}
