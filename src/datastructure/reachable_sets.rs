//! Interfaces of the four reachability sets over nodes (`S`, `SR`, `T`,
//! `TR`) and their hyperedge counterparts, split into "all pins" and
//! "flow-sending pins" variants.
//!
//! Invariants maintained by implementations: `S ⊆ SR`, `T ⊆ TR` and
//! `SR ∩ TR = ∅`, except momentarily while a node reachable from the
//! opposite side is being pierced. A direction flip swaps the source and
//! target roles of every set.

use crate::basic_types::Node;
use crate::basic_types::NodeWeight;
use crate::datastructure::FlowHypergraph;
use crate::basic_types::Hyperedge;

pub trait ReachableNodes {
    fn new(hg: &FlowHypergraph) -> Self;

    fn is_source(&self, u: Node) -> bool;
    fn is_source_reachable(&self, u: Node) -> bool;
    fn is_target(&self, u: Node) -> bool;
    fn is_target_reachable(&self, u: Node) -> bool;

    /// Adds `u` to `SR`.
    fn reach(&mut self, hg: &FlowHypergraph, u: Node);
    /// Promotes `u` from `SR` to `S`.
    fn settle(&mut self, hg: &FlowHypergraph, u: Node);
    /// Removes a non-settled `u` from `SR`.
    fn unreach_source(&mut self, hg: &FlowHypergraph, u: Node);
    /// Removes a non-settled `u` from `TR`.
    fn unreach_target(&mut self, hg: &FlowHypergraph, u: Node);

    fn flip_view_direction(&mut self);

    /// Shrinks `SR` back to exactly `S` without touching the target side.
    fn reset_source_reachable_to_source(&mut self, hg: &FlowHypergraph, augmenting_path_available: bool);

    fn source_weight(&self) -> NodeWeight;
    fn source_reachable_weight(&self) -> NodeWeight;
    fn target_weight(&self) -> NodeWeight;
    fn target_reachable_weight(&self) -> NodeWeight;
}

pub trait ReachableHyperedges {
    fn new(hg: &FlowHypergraph) -> Self;

    fn are_all_pins_sources(&self, e: Hyperedge) -> bool;
    fn are_all_pins_source_reachable(&self, e: Hyperedge) -> bool;
    fn are_flow_sending_pins_sources(&self, e: Hyperedge) -> bool;
    fn are_flow_sending_pins_source_reachable(&self, e: Hyperedge) -> bool;

    fn settle_all_pins(&mut self, e: Hyperedge);
    fn settle_flow_sending_pins(&mut self, e: Hyperedge);
    fn reach_all_pins(&mut self, e: Hyperedge);
    fn reach_flow_sending_pins(&mut self, e: Hyperedge);

    fn flip_view_direction(&mut self);
    fn reset_source_reachable_to_source(&mut self, hg: &FlowHypergraph, augmenting_path_available: bool);
}
