//! Incremental construction of a [`FlowHypergraph`].

use crate::basic_types::Flow;
use crate::basic_types::Node;
use crate::basic_types::NodeWeight;
use crate::datastructure::FlowHypergraph;

/// Collects nodes, hyperedges and pins one at a time and produces the
/// arena representation in [`FlowHypergraphBuilder::finalize`]. Hyperedges
/// that end up with at most one pin are dropped; they cannot carry flow
/// between distinct nodes.
#[derive(Debug, Clone, Default)]
pub struct FlowHypergraphBuilder {
    node_weights: Vec<NodeWeight>,
    hyperedge_capacities: Vec<Flow>,
    hyperedge_sizes: Vec<usize>,
    pins: Vec<Node>,
    open_hyperedge: Option<Flow>,
    pins_at_hyperedge_start: usize,
}

impl FlowHypergraphBuilder {
    pub fn new() -> Self {
        FlowHypergraphBuilder::default()
    }

    /// Pre-creates `num_nodes` nodes of weight one.
    pub fn with_nodes(num_nodes: usize) -> Self {
        FlowHypergraphBuilder {
            node_weights: vec![1; num_nodes],
            ..FlowHypergraphBuilder::default()
        }
    }

    pub fn num_nodes(&self) -> usize {
        self.node_weights.len()
    }

    pub fn add_node(&mut self, weight: NodeWeight) -> Node {
        self.node_weights.push(weight);
        self.node_weights.len() - 1
    }

    pub fn set_node_weight(&mut self, u: Node, weight: NodeWeight) {
        self.node_weights[u] = weight;
    }

    pub fn start_hyperedge(&mut self, capacity: Flow) {
        self.finish_hyperedge();
        self.open_hyperedge = Some(capacity);
        self.pins_at_hyperedge_start = self.pins.len();
    }

    pub fn add_pin(&mut self, u: Node) {
        debug_assert!(self.open_hyperedge.is_some());
        debug_assert!(u < self.node_weights.len());
        self.pins.push(u);
    }

    pub fn current_hyperedge_size(&self) -> usize {
        self.pins.len() - self.pins_at_hyperedge_start
    }

    fn finish_hyperedge(&mut self) {
        if let Some(capacity) = self.open_hyperedge.take() {
            let size = self.current_hyperedge_size();
            if size <= 1 {
                self.pins.truncate(self.pins_at_hyperedge_start);
            } else {
                self.hyperedge_capacities.push(capacity);
                self.hyperedge_sizes.push(size);
            }
        }
    }

    pub fn finalize(mut self) -> FlowHypergraph {
        self.finish_hyperedge();
        FlowHypergraph::new(
            self.node_weights,
            self.hyperedge_capacities,
            self.hyperedge_sizes,
            self.pins,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::FlowHypergraphBuilder;

    #[test]
    fn single_pin_hyperedges_are_dropped() {
        let mut b = FlowHypergraphBuilder::with_nodes(3);
        b.start_hyperedge(1);
        b.add_pin(0);
        b.start_hyperedge(1);
        b.add_pin(1);
        b.add_pin(2);
        let hg = b.finalize();
        assert_eq!(hg.num_hyperedges(), 1);
        assert_eq!(hg.num_pins(), 2);
        assert_eq!(hg.pins_of(0)[0].pin, 1);
    }

    #[test]
    fn weights_are_summed() {
        let mut b = FlowHypergraphBuilder::new();
        let _ = b.add_node(2);
        let _ = b.add_node(3);
        let hg = b.finalize();
        assert_eq!(hg.total_node_weight(), 5);
        assert_eq!(hg.node_weight(1), 3);
    }
}
