//! Max-flow engines and the cut-enumeration driver.

pub mod cutter_state;
pub mod dinic;
pub mod dinic_bidirectional;
pub mod dinic_scaling;
pub mod grow_assimilated;
pub mod hyperflowcutter;
pub mod piercing;
pub mod push_relabel;

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use crate::basic_types::Flow;
use crate::basic_types::Node;
use crate::datastructure::FlowHypergraph;
use crate::datastructure::LayeredQueue;
use crate::datastructure::ReachableHyperedges;
use crate::datastructure::ReachableNodes;

pub use cutter_state::CutterState;
pub use dinic::Dinic;
pub use dinic_bidirectional::BidirectionalDinic;
pub use dinic_scaling::ScalingDinic;
pub use hyperflowcutter::HyperFlowCutter;
pub use piercing::Piercer;
pub use push_relabel::ParallelPushRelabel;
pub use push_relabel::PushRelabelCutter;
pub use push_relabel::PushRelabelEngine;
pub use push_relabel::SequentialPushRelabel;

/// An incremental hypergraph max-flow engine usable by the cut-enumeration
/// driver. Implementations keep whatever per-search state they need between
/// calls; the reachability data lives in the [`CutterState`] under the
/// associated set types.
pub trait FlowAlgorithm: Sized {
    type ReachableNodes: ReachableNodes + Clone + std::fmt::Debug;
    type ReachableHyperedges: ReachableHyperedges + Clone + std::fmt::Debug;

    const NAME: &'static str;

    fn new(hg: &FlowHypergraph) -> Self;

    /// Pushes augmenting flow from the source piercing nodes until the
    /// target becomes unreachable (a minimum cut separates the piercing
    /// sets, returns `true`) or the flow value passes the upper flow bound
    /// (returns `false`). Updates `cs.flow_value`.
    fn exhaust_flow(&mut self, hg: &mut FlowHypergraph, cs: &mut CutterState<Self>) -> bool;

    /// Attempts one round of flow improvement; if no augmenting path
    /// exists, the source-reachable sets are left grown so the caller can
    /// still derive a cut. Returns the flow delta.
    fn grow_flow_or_source_reachable(
        &mut self,
        hg: &mut FlowHypergraph,
        cs: &mut CutterState<Self>,
    ) -> Flow;

    /// Propagates source reachability without augmenting. The flow value
    /// and the residual state are unchanged.
    fn grow_reachable(&mut self, hg: &mut FlowHypergraph, cs: &mut CutterState<Self>);

    /// Scratch queue reused by the assimilation BFS.
    fn scan_list_mut(&mut self) -> &mut LayeredQueue<Node>;

    fn upper_flow_bound(&self) -> Flow;
    fn set_upper_flow_bound(&mut self, bound: Flow);

    /// Cooperative cancellation, polled between search phases.
    fn set_termination_flag(&mut self, flag: Arc<AtomicBool>);
}
