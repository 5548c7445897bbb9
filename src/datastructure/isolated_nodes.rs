//! Nodes whose every incident hyperedge is mixed, and the subset-sum DP
//! over their weights.
//!
//! A node is isolated once each of its hyperedges has both a settled source
//! pin and a settled target pin; it can never carry flow between the sides
//! and may be assigned to either block. The reachable subset sums of the
//! isolated weights are kept as an ordered list of summable ranges
//! `[from, to]` (every integer in a range is reachable), with one witness
//! node per sum so a concrete subset can be extracted by walking back.

use crate::basic_types::Node;
use crate::basic_types::NodeWeight;
use crate::basic_types::INVALID_NODE;
use crate::datastructure::FlowHypergraph;

const INVALID_INDEX: usize = usize::MAX;

/// Maximal interval of consecutively reachable subset sums.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SummableRange {
    pub from: NodeWeight,
    pub to: NodeWeight,
}

impl SummableRange {
    pub fn in_range(&self, w: NodeWeight) -> bool {
        self.from <= w && w <= self.to
    }
}

#[derive(Debug, Clone, Copy)]
struct TableEntry {
    /// Witness: a node `u` with `sum - w(u)` reachable.
    node: Node,
    /// Index into the range list; stale everywhere except at range ends.
    sums_index: usize,
}

impl TableEntry {
    fn invalid() -> Self {
        TableEntry {
            node: INVALID_NODE,
            sums_index: INVALID_INDEX,
        }
    }

    fn summable(&self) -> bool {
        self.sums_index != INVALID_INDEX
    }
}

#[derive(Debug, Clone)]
pub struct IsolatedNodes {
    pub weight: NodeWeight,
    pub nodes: Vec<Node>,
    /// Per node, the number of incident hyperedges that are mixed.
    pub mixed_incident_hyperedges: Vec<usize>,

    in_set: bitvec::vec::BitVec,
    max_subset_sum_weight: NodeWeight,
    dp_table: Vec<TableEntry>,
    sum_ranges: Vec<SummableRange>,
    next_sum_ranges: Vec<SummableRange>,
    new_sum_available: bool,
    nodes_not_in_table: Vec<Node>,
}

impl IsolatedNodes {
    pub fn new(hg: &FlowHypergraph, max_block_weight: NodeWeight) -> Self {
        // one extra entry as a right-ward sentinel for the merge cases
        let mut dp_table = vec![TableEntry::invalid(); max_block_weight + 2];
        dp_table[0].sums_index = 0;
        IsolatedNodes {
            weight: 0,
            nodes: Vec::new(),
            mixed_incident_hyperedges: vec![0; hg.num_nodes()],
            in_set: bitvec::vec::BitVec::repeat(false, hg.num_nodes()),
            max_subset_sum_weight: max_block_weight,
            dp_table,
            sum_ranges: vec![SummableRange { from: 0, to: 0 }],
            next_sum_ranges: Vec::new(),
            new_sum_available: true,
            nodes_not_in_table: Vec::new(),
        }
    }

    pub fn sum_ranges(&self) -> &[SummableRange] {
        &self.sum_ranges
    }

    pub fn is_summable(&self, w: NodeWeight) -> bool {
        debug_assert!(w < self.dp_table.len());
        self.dp_table[w].summable()
    }

    pub fn is_candidate(&self, hg: &FlowHypergraph, u: Node) -> bool {
        self.mixed_incident_hyperedges[u] == hg.degree(u)
    }

    pub fn add(&mut self, hg: &FlowHypergraph, u: Node) {
        debug_assert!(!self.in_set[u]);
        self.in_set.set(u, true);
        self.nodes.push(u);
        self.nodes_not_in_table.push(u);
        self.weight += hg.node_weight(u);
    }

    /// Whether `u` was added to the isolated set. Candidates with zero
    /// degree are never added; they stay unclaimed.
    pub fn contains(&self, u: Node) -> bool {
        self.in_set[u]
    }

    pub fn is_dp_table_up_to_date(&self) -> bool {
        self.nodes_not_in_table.is_empty()
    }

    /// Folds all pending nodes into the DP table. Afterwards a sum `x` is
    /// marked reachable iff some subset of the isolated weights sums to
    /// `x` (capped at the maximum block weight).
    pub fn update_dp_table(&mut self, hg: &FlowHypergraph) {
        for node_idx in 0..self.nodes_not_in_table.len() {
            let u = self.nodes_not_in_table[node_idx];
            if self.new_sum_available {
                self.next_sum_ranges.clone_from(&self.sum_ranges);
            }
            debug_assert_eq!(self.next_sum_ranges, self.sum_ranges);
            self.new_sum_available = false;

            let wu = hg.node_weight(u);
            debug_assert!(wu > 0, "node has zero weight");

            for range_idx in 0..self.sum_ranges.len() {
                let sr = self.sum_ranges[range_idx];
                let end = (sr.to + wu).min(self.max_subset_sum_weight);
                let mut new_sum = sr.from + wu;
                while new_sum <= end {
                    if !self.is_summable(new_sum) {
                        self.new_sum_available = true;
                        self.insert_sum(new_sum, u);
                    }
                    new_sum += 1;
                }
            }

            std::mem::swap(&mut self.next_sum_ranges, &mut self.sum_ranges);
        }
        self.nodes_not_in_table.clear();
    }

    fn insert_sum(&mut self, new_sum: NodeWeight, witness: Node) {
        self.dp_table[new_sum].node = witness;

        let left = new_sum - 1;
        let right = new_sum + 1;
        let left_index = self.dp_table[left].sums_index;
        let right_index = self.dp_table[right].sums_index;
        let has_left = self.dp_table[left].summable();
        // the sentinel entry keeps the right lookup in bounds
        let has_right = self.dp_table[right].summable();

        if has_left && has_right {
            // bridge: extend the left range over the right one
            debug_assert_eq!(self.next_sum_ranges[left_index].to, left);
            debug_assert_eq!(self.next_sum_ranges[right_index].from, right);
            self.dp_table[new_sum].sums_index = left_index;

            let right_range = self.next_sum_ranges[right_index];
            self.dp_table[right_range.to].sums_index = left_index;
            self.next_sum_ranges[left_index].to = right_range.to;

            // delete the right range by swapping the last range into its slot
            let back = *self.next_sum_ranges.last().unwrap();
            let _ = self.next_sum_ranges.pop();
            if right_index < self.next_sum_ranges.len() {
                self.next_sum_ranges[right_index] = back;
                self.dp_table[back.from].sums_index = right_index;
                self.dp_table[back.to].sums_index = right_index;
            }
        } else if has_left {
            debug_assert_eq!(self.next_sum_ranges[left_index].to, left);
            self.next_sum_ranges[left_index].to = new_sum;
            self.dp_table[new_sum].sums_index = left_index;
        } else if has_right {
            debug_assert_eq!(self.next_sum_ranges[right_index].from, right);
            self.next_sum_ranges[right_index].from = new_sum;
            self.dp_table[new_sum].sums_index = right_index;
        } else {
            self.dp_table[new_sum].sums_index = self.next_sum_ranges.len();
            self.next_sum_ranges.push(SummableRange {
                from: new_sum,
                to: new_sum,
            });
        }
    }

    /// Collects a subset of isolated nodes whose weights sum to `sum` by
    /// walking the witness chain.
    pub fn extract_subset(&self, hg: &FlowHypergraph, mut sum: NodeWeight) -> Vec<Node> {
        debug_assert!(
            self.is_summable(sum) && self.is_dp_table_up_to_date(),
            "extracting subset for a sum that was not achieved"
        );
        let mut result = Vec::new();
        while sum > 0 {
            let u = self.dp_table[sum].node;
            result.push(u);
            sum -= hg.node_weight(u);
        }
        result
    }

    /// Splits the isolated nodes into a subset summing to `sum` and the
    /// rest.
    pub fn extract_bipartition(
        &self,
        hg: &FlowHypergraph,
        sum: NodeWeight,
    ) -> (Vec<Node>, Vec<Node>) {
        let first = self.extract_subset(hg, sum);
        let mut in_first: bitvec::vec::BitVec = bitvec::vec::BitVec::repeat(false, hg.num_nodes());
        for &u in &first {
            in_first.set(u, true);
        }
        let second = self
            .nodes
            .iter()
            .copied()
            .filter(|&u| !in_first[u])
            .collect();
        (first, second)
    }
}

#[cfg(test)]
mod tests {
    use super::IsolatedNodes;
    use super::SummableRange;
    use crate::datastructure::FlowHypergraphBuilder;
    use crate::datastructure::FlowHypergraph;

    fn no_hyperedges_given_node_weights(weights: &[usize]) -> FlowHypergraph {
        let mut b = FlowHypergraphBuilder::new();
        for &w in weights {
            let _ = b.add_node(w);
        }
        b.finalize()
    }

    fn sorted(mut v: Vec<SummableRange>) -> Vec<SummableRange> {
        v.sort();
        v
    }

    fn ranges(pairs: &[(usize, usize)]) -> Vec<SummableRange> {
        pairs
            .iter()
            .map(|&(from, to)| SummableRange { from, to })
            .collect()
    }

    #[test]
    fn summable_ranges_grow_merge_and_bridge() {
        let weights = [2, 2, 3, 4, 2, 5, 3];
        let hg = no_hyperedges_given_node_weights(&weights);
        let mut iso = IsolatedNodes::new(&hg, 12);

        assert!(iso.is_dp_table_up_to_date());
        iso.update_dp_table(&hg);
        assert_eq!(iso.sum_ranges(), ranges(&[(0, 0)]).as_slice());

        // items [3] -> sums {0, 3}
        iso.add(&hg, 2);
        iso.update_dp_table(&hg);
        assert!(iso.is_summable(3));
        assert_eq!(
            sorted(iso.sum_ranges().to_vec()),
            ranges(&[(0, 0), (3, 3)])
        );

        // items [3, 2] -> sums {0, 2, 3, 5}; extends a range on the left
        iso.add(&hg, 1);
        iso.update_dp_table(&hg);
        assert_eq!(
            sorted(iso.sum_ranges().to_vec()),
            ranges(&[(0, 0), (2, 3), (5, 5)])
        );

        // items [3, 2, 5] -> sums {0, 2, 3, 5, 7, 8, 10}; extends on the right
        iso.add(&hg, 5);
        iso.update_dp_table(&hg);
        assert_eq!(
            sorted(iso.sum_ranges().to_vec()),
            ranges(&[(0, 0), (2, 3), (5, 5), (7, 8), (10, 10)])
        );

        // items [2, 2, 3, 5] -> sums {0, 2, 3, 4, 5, 7, 8, 9, 10, 12}; merges
        iso.add(&hg, 0);
        iso.update_dp_table(&hg);
        assert_eq!(
            sorted(iso.sum_ranges().to_vec()),
            ranges(&[(0, 0), (2, 5), (7, 10), (12, 12)])
        );

        for x in 0..=12 {
            let expected = [0, 2, 3, 4, 5, 7, 8, 9, 10, 12].contains(&x);
            assert_eq!(iso.is_summable(x), expected, "sum {}", x);
        }
    }

    #[test]
    fn extracted_subsets_add_up() {
        let weights = [2, 2, 3, 4];
        let hg = no_hyperedges_given_node_weights(&weights);
        let mut iso = IsolatedNodes::new(&hg, 11);
        for u in 0..4 {
            iso.add(&hg, u);
        }
        iso.update_dp_table(&hg);

        for x in 0..=11 {
            if iso.is_summable(x) {
                let subset = iso.extract_subset(&hg, x);
                let total: usize = subset.iter().map(|&u| hg.node_weight(u)).sum();
                assert_eq!(total, x);

                let (first, second) = iso.extract_bipartition(&hg, x);
                assert_eq!(first.len() + second.len(), 4);
            }
        }
    }
}
