//! Push-relabel max-flow engines on the directed hyperedge expansion.
//!
//! Each hyperedge `e` becomes a bridge arc `in(e) -> out(e)` of capacity
//! `c(e)`; every pin `v` contributes the arcs `v -> in(e)` (capped at
//! `c(e)`, pushing more into the in-node than the bridge can carry is
//! pointless) and `out(e) -> v` (uncapacitated). Expanded node ids are laid
//! out as `[hypernodes | in-nodes | out-nodes]`; flow slots as
//! `[pin->in | out->pin | bridges]`.
//!
//! Unlike the augmenting-path engines, both terminal sides are handled
//! natively: piercing a target-side node needs no view flip, it only
//! breaks the distance labels and banks the node's excess into the flow
//! value.

pub mod cutter;
pub mod parallel;
pub mod sequential;

pub use cutter::PushRelabelCutter;
pub use parallel::ParallelPushRelabel;
pub use sequential::SequentialPushRelabel;

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use crate::basic_types::Flow;
use crate::basic_types::Hyperedge;
use crate::basic_types::InHeIndex;
use crate::basic_types::Node;
use crate::datastructure::FlowHypergraph;

pub(crate) const GLOBAL_RELABEL_ALPHA: usize = 6;
pub(crate) const GLOBAL_RELABEL_FREQUENCY: usize = 5;

/// Id and slot arithmetic of the expansion.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Expansion {
    pub num_nodes: usize,
    pub num_hyperedges: usize,
    pub num_pins: usize,
}

impl Expansion {
    pub fn new(hg: &FlowHypergraph) -> Self {
        Expansion {
            num_nodes: hg.num_nodes(),
            num_hyperedges: hg.num_hyperedges(),
            num_pins: hg.num_pins(),
        }
    }

    /// Number of expanded nodes; doubles as the unreachable level.
    pub fn max_level(&self) -> usize {
        self.num_nodes + 2 * self.num_hyperedges
    }

    pub fn num_flow_slots(&self) -> usize {
        2 * self.num_pins + self.num_hyperedges
    }

    pub fn global_relabel_work_threshold(&self) -> usize {
        (GLOBAL_RELABEL_ALPHA * self.max_level() + 2 * self.num_pins + self.num_hyperedges)
            / GLOBAL_RELABEL_FREQUENCY
    }

    pub fn is_hypernode(&self, u: Node) -> bool {
        u < self.num_nodes
    }

    pub fn is_in_node(&self, u: Node) -> bool {
        u >= self.num_nodes && u < self.num_nodes + self.num_hyperedges
    }

    pub fn is_out_node(&self, u: Node) -> bool {
        debug_assert!(u < self.max_level());
        u >= self.num_nodes + self.num_hyperedges
    }

    pub fn in_node_to_edge(&self, u: Node) -> Hyperedge {
        debug_assert!(self.is_in_node(u));
        u - self.num_nodes
    }

    pub fn out_node_to_edge(&self, u: Node) -> Hyperedge {
        debug_assert!(self.is_out_node(u));
        u - self.num_nodes - self.num_hyperedges
    }

    pub fn edge_to_in_node(&self, e: Hyperedge) -> Node {
        debug_assert!(e < self.num_hyperedges);
        e + self.num_nodes
    }

    pub fn edge_to_out_node(&self, e: Hyperedge) -> Node {
        debug_assert!(e < self.num_hyperedges);
        e + self.num_nodes + self.num_hyperedges
    }

    /// Slot of the flow going from a pin into the in-node.
    pub fn in_node_incidence_index(&self, inc: InHeIndex) -> usize {
        inc
    }

    /// Slot of the flow going from the out-node into a pin.
    pub fn out_node_incidence_index(&self, inc: InHeIndex) -> usize {
        inc + self.num_pins
    }

    /// Slot of the flow on the bridge arc.
    pub fn bridge_edge_index(&self, e: Hyperedge) -> usize {
        e + 2 * self.num_pins
    }
}

/// Wall-clock spent per engine phase, reported by the snapshot tester.
#[derive(Debug, Clone, Copy, Default)]
pub struct PushRelabelTimings {
    pub discharge: f64,
    pub global_relabel: f64,
    pub update: f64,
    pub source_cut: f64,
    pub saturate: f64,
}

/// Reachability and piercing state of an engine, captured at the first
/// balanced cut so most-balanced-cut refinement can rewind. The flow and
/// the distance labels are not part of it: refinement never changes the
/// flow, and labels are rebuilt by the next global relabel anyway.
#[derive(Debug, Clone)]
pub struct EngineStateSnapshot {
    reach: Vec<u32>,
    source_reachable_stamp: u32,
    target_reachable_stamp: u32,
    running_timestamp: u32,
    source_piercing_nodes: Vec<Node>,
    target_piercing_nodes: Vec<Node>,
    source_reachable_nodes: Vec<Node>,
    target_reachable_nodes: Vec<Node>,
    source_piercing_nodes_not_exhausted: bool,
    distance_labels_broken_from_target_side_piercing: bool,
}

/// A push-relabel engine drivable by [`PushRelabelCutter`]. Both terminal
/// sides are pierced natively; cut sides are derived by residual searches
/// that stamp reachability without touching the flow.
pub trait PushRelabelEngine {
    const NAME: &'static str;

    fn new(hg: &FlowHypergraph) -> Self;

    fn reset(&mut self, hg: &FlowHypergraph);

    /// Adds `u` to the piercing set of one side.
    fn pierce(&mut self, hg: &FlowHypergraph, u: Node, source_side: bool);

    /// Saturates the source piercing edges and discharges until no active
    /// node remains, or the flow bound is exceeded, or termination was
    /// requested (both of the latter return `false`). On success the cut
    /// sides are derived.
    fn find_min_cuts(&mut self, hg: &FlowHypergraph) -> bool;

    /// Re-derives the source-side reachability. With `flow_changed ==
    /// false` the previous stamp is kept, so only newly reachable nodes
    /// are appended to the reachable list.
    fn derive_source_side_cut(&mut self, hg: &FlowHypergraph, flow_changed: bool);

    fn derive_target_side_cut(&mut self, hg: &FlowHypergraph);

    /// Expanded nodes stamped source-reachable by the last derive,
    /// piercing nodes included.
    fn source_reachable_nodes(&self) -> &[Node];

    fn target_reachable_nodes(&self) -> &[Node];

    fn is_source_reachable(&self, u: Node) -> bool;
    fn is_target_reachable(&self, u: Node) -> bool;

    fn flow_value(&self) -> Flow;
    fn flow_on_bridge(&self, e: Hyperedge) -> Flow;
    fn capacity_on_bridge(&self, hg: &FlowHypergraph, e: Hyperedge) -> Flow {
        hg.capacity(e)
    }

    fn expansion(&self) -> Expansion;

    /// Captures the reachability and piercing state for a refinement
    /// rewind; [`PushRelabelEngine::restore_state`] brings it back. Only
    /// valid while the flow is unchanged.
    fn save_state(&self) -> EngineStateSnapshot;

    fn restore_state(&mut self, snapshot: &EngineStateSnapshot);

    fn upper_flow_bound(&self) -> Flow;
    fn set_upper_flow_bound(&mut self, bound: Flow);
    fn set_termination_flag(&mut self, flag: Arc<AtomicBool>);

    fn timings(&self) -> PushRelabelTimings;
}
