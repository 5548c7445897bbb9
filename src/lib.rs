//! Balanced minimum s-t cuts on weighted flow hypergraphs.
//!
//! Given a hypergraph with node weights and hyperedge capacities, two
//! terminals, a maximum block weight and an optional upper flow bound, the
//! [`algorithms::HyperFlowCutter`] driver enumerates s-t cuts of increasing
//! capacity until one admits a balanced bipartition. Cuts are produced
//! incrementally by piercing: the lighter side is extended by one border
//! node, the residual flow is re-exhausted, and the new cut is assimilated.
//!
//! The max-flow engines come in two families: augmenting-path blocking-flow
//! variants ([`algorithms::Dinic`], [`algorithms::BidirectionalDinic`],
//! [`algorithms::ScalingDinic`]) which work directly on the pin-partitioned
//! hypergraph representation, and push-relabel variants
//! ([`algorithms::SequentialPushRelabel`],
//! [`algorithms::ParallelPushRelabel`]) which work on the directed
//! in-node/out-node expansion.

pub mod asserts;
pub mod basic_types;
pub mod datastructure;

pub mod algorithms;
pub mod io;

pub use basic_types::Bipartition;
pub use basic_types::Flow;
pub use basic_types::Hyperedge;
pub use basic_types::Node;
pub use basic_types::NodeWeight;
