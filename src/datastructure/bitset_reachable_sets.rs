//! Bitset based reachability, used by the push-relabel flow engines, which
//! keep their own distance labels on the expanded graph and only need the
//! plain set semantics on the hypergraph side.

use bitvec::vec::BitVec;

use crate::basic_types::Hyperedge;
use crate::basic_types::Node;
use crate::basic_types::NodeWeight;
use crate::datastructure::FlowHypergraph;
use crate::datastructure::ReachableHyperedges;
use crate::datastructure::ReachableNodes;

#[derive(Debug, Clone)]
pub struct BitsetReachableNodes {
    s: BitVec,
    sr: BitVec,
    t: BitVec,
    tr: BitVec,

    source_weight: NodeWeight,
    source_reachable_weight: NodeWeight,
    target_weight: NodeWeight,
    target_reachable_weight: NodeWeight,
}

impl BitsetReachableNodes {
    /// Target-side twins of `reach`/`settle`, for drivers that keep both
    /// sides in one orientation instead of flipping the view.
    pub fn reach_target(&mut self, hg: &FlowHypergraph, u: Node) {
        debug_assert!(!self.tr[u]);
        self.tr.set(u, true);
        self.target_reachable_weight += hg.node_weight(u);
    }

    pub fn settle_target(&mut self, hg: &FlowHypergraph, u: Node) {
        debug_assert!(!self.t[u]);
        self.t.set(u, true);
        self.target_weight += hg.node_weight(u);
    }
}

impl ReachableNodes for BitsetReachableNodes {
    fn new(hg: &FlowHypergraph) -> Self {
        let n = hg.num_nodes();
        BitsetReachableNodes {
            s: BitVec::repeat(false, n),
            sr: BitVec::repeat(false, n),
            t: BitVec::repeat(false, n),
            tr: BitVec::repeat(false, n),
            source_weight: 0,
            source_reachable_weight: 0,
            target_weight: 0,
            target_reachable_weight: 0,
        }
    }

    fn is_source(&self, u: Node) -> bool {
        self.s[u]
    }

    fn is_source_reachable(&self, u: Node) -> bool {
        self.sr[u]
    }

    fn is_target(&self, u: Node) -> bool {
        self.t[u]
    }

    fn is_target_reachable(&self, u: Node) -> bool {
        self.tr[u]
    }

    fn reach(&mut self, hg: &FlowHypergraph, u: Node) {
        debug_assert!(!self.sr[u]);
        self.sr.set(u, true);
        self.source_reachable_weight += hg.node_weight(u);
    }

    fn settle(&mut self, hg: &FlowHypergraph, u: Node) {
        debug_assert!(!self.s[u]);
        self.s.set(u, true);
        self.source_weight += hg.node_weight(u);
    }

    fn unreach_source(&mut self, hg: &FlowHypergraph, u: Node) {
        debug_assert!(self.sr[u] && !self.tr[u]);
        self.sr.set(u, false);
        self.source_reachable_weight -= hg.node_weight(u);
    }

    fn unreach_target(&mut self, hg: &FlowHypergraph, u: Node) {
        debug_assert!(self.tr[u] && !self.sr[u]);
        self.tr.set(u, false);
        self.target_reachable_weight -= hg.node_weight(u);
    }

    fn flip_view_direction(&mut self) {
        std::mem::swap(&mut self.s, &mut self.t);
        std::mem::swap(&mut self.sr, &mut self.tr);
        std::mem::swap(&mut self.source_weight, &mut self.target_weight);
        std::mem::swap(
            &mut self.source_reachable_weight,
            &mut self.target_reachable_weight,
        );
    }

    fn reset_source_reachable_to_source(
        &mut self,
        _hg: &FlowHypergraph,
        _augmenting_path_available: bool,
    ) {
        self.sr.copy_from_bitslice(&self.s);
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
pub struct BitsetReachableHyperedges {
    in_settled_s: BitVec,
    out_settled_s: BitVec,
    in_reached_s: BitVec,
    out_reached_s: BitVec,
    in_settled_t: BitVec,
    out_settled_t: BitVec,
    in_reached_t: BitVec,
    out_reached_t: BitVec,
}

impl ReachableHyperedges for BitsetReachableHyperedges {
    fn new(hg: &FlowHypergraph) -> Self {
        let m = hg.num_hyperedges();
        BitsetReachableHyperedges {
            in_settled_s: BitVec::repeat(false, m),
            out_settled_s: BitVec::repeat(false, m),
            in_reached_s: BitVec::repeat(false, m),
            out_reached_s: BitVec::repeat(false, m),
            in_settled_t: BitVec::repeat(false, m),
            out_settled_t: BitVec::repeat(false, m),
            in_reached_t: BitVec::repeat(false, m),
            out_reached_t: BitVec::repeat(false, m),
        }
    }

    fn are_all_pins_sources(&self, e: Hyperedge) -> bool {
        self.out_settled_s[e]
    }

    fn are_all_pins_source_reachable(&self, e: Hyperedge) -> bool {
        self.out_reached_s[e]
    }

    fn are_flow_sending_pins_sources(&self, e: Hyperedge) -> bool {
        self.in_settled_s[e]
    }

    fn are_flow_sending_pins_source_reachable(&self, e: Hyperedge) -> bool {
        self.in_reached_s[e]
    }

    fn settle_all_pins(&mut self, e: Hyperedge) {
        debug_assert!(!self.out_settled_s[e]);
        self.out_settled_s.set(e, true);
        self.in_settled_s.set(e, true);
    }

    fn settle_flow_sending_pins(&mut self, e: Hyperedge) {
        debug_assert!(!self.in_settled_s[e]);
        self.in_settled_s.set(e, true);
    }

    fn reach_all_pins(&mut self, e: Hyperedge) {
        debug_assert!(!self.out_reached_s[e]);
        self.out_reached_s.set(e, true);
        if !self.in_reached_s[e] {
            self.in_reached_s.set(e, true);
        }
    }

    fn reach_flow_sending_pins(&mut self, e: Hyperedge) {
        debug_assert!(!self.in_reached_s[e]);
        self.in_reached_s.set(e, true);
    }

    fn flip_view_direction(&mut self) {
        std::mem::swap(&mut self.in_settled_s, &mut self.out_settled_t);
        std::mem::swap(&mut self.out_settled_s, &mut self.in_settled_t);
        std::mem::swap(&mut self.in_reached_s, &mut self.out_reached_t);
        std::mem::swap(&mut self.out_reached_s, &mut self.in_reached_t);
    }

    fn reset_source_reachable_to_source(
        &mut self,
        _hg: &FlowHypergraph,
        _augmenting_path_available: bool,
    ) {
        self.in_reached_s.copy_from_bitslice(&self.in_settled_s);
        self.out_reached_s.copy_from_bitslice(&self.out_settled_s);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datastructure::FlowHypergraphBuilder;

    #[test]
    fn settled_survives_reset() {
        let mut b = FlowHypergraphBuilder::with_nodes(3);
        b.start_hyperedge(1);
        b.add_pin(0);
        b.add_pin(1);
        let hg = b.finalize();

        let mut n = BitsetReachableNodes::new(&hg);
        n.reach(&hg, 0);
        n.settle(&hg, 0);
        n.reach(&hg, 1);
        n.reset_source_reachable_to_source(&hg, true);
        assert!(n.is_source_reachable(0));
        assert!(!n.is_source_reachable(1));
        assert_eq!(n.source_reachable_weight(), 1);
    }
}
