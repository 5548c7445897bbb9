//! Selection of the next source-side piercing node.
//!
//! Preference order among the border candidates: avoid nodes reachable
//! from the opposite side (piercing one of those may raise the cut), then
//! prefer larger hop distance from the original cut when distances were
//! supplied, and break remaining ties by a random score. During
//! most-balanced-cut refinement only strictly non-augmenting candidates
//! are eligible and they are consumed by random popping, persistent
//! entries first.

use rand::rngs::SmallRng;
use rand::Rng;
use rand::SeedableRng;

use crate::algorithms::CutterState;
use crate::algorithms::FlowAlgorithm;
use crate::basic_types::HopDistance;
use crate::basic_types::Node;
use crate::datastructure::FlowHypergraph;
use crate::datastructure::ReachableNodes;

/// A chosen piercing node and whether it was reachable from the opposite
/// side at selection time.
#[derive(Debug, Clone, Copy)]
pub struct PiercingChoice {
    pub node: Node,
    pub is_reachable_from_opposite_side: bool,
}

#[derive(Debug, Clone)]
pub struct Piercer {
    pub avoid_augmenting_paths: bool,
    pub use_distances_from_cut: bool,
    /// Hop distances from the original cut, supplied by the caller (e.g.
    /// the integrating partitioner). Empty means uniform.
    pub distances_from_cut: Vec<HopDistance>,
    rng: SmallRng,
}

impl Piercer {
    pub fn new(seed: u64) -> Self {
        Piercer {
            avoid_augmenting_paths: true,
            use_distances_from_cut: false,
            distances_from_cut: Vec::new(),
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    pub fn set_distances_from_cut(&mut self, distances: Vec<HopDistance>) {
        self.use_distances_from_cut = !distances.is_empty();
        self.distances_from_cut = distances;
    }

    fn distance_from_cut(&self, u: Node) -> HopDistance {
        if self.use_distances_from_cut {
            self.distances_from_cut.get(u).copied().unwrap_or(0)
        } else {
            0
        }
    }

    /// Scans the current source-side border for the best candidate. The
    /// border is left intact; settled and isolated entries are dropped by
    /// the next cleanup.
    pub fn find_piercing_node<FA: FlowAlgorithm>(
        &mut self,
        hg: &FlowHypergraph,
        cs: &CutterState<FA>,
    ) -> Option<PiercingChoice> {
        let mut best: Option<(PiercingChoice, (bool, HopDistance, u32))> = None;
        for u in cs.border_nodes.source_side.iter() {
            if !cs.can_be_settled(hg, u) {
                continue;
            }
            let reachable_from_opposite = cs.n.is_target_reachable(u);
            let score = (
                self.avoid_augmenting_paths && !reachable_from_opposite,
                self.distance_from_cut(u),
                self.rng.gen::<u32>(),
            );
            if best.as_ref().is_none_or(|(_, best_score)| score > *best_score) {
                best = Some((
                    PiercingChoice {
                        node: u,
                        is_reachable_from_opposite_side: reachable_from_opposite,
                    },
                    score,
                ));
            }
        }
        best.map(|(choice, _)| choice)
    }

    /// Piercing during most-balanced-cut refinement: candidates reachable
    /// from the opposite side are rejected outright, so the flow value
    /// cannot change. Consumes border entries.
    pub fn find_non_augmenting_piercing_node<FA: FlowAlgorithm>(
        &mut self,
        hg: &FlowHypergraph,
        cs: &mut CutterState<FA>,
    ) -> Option<PiercingChoice> {
        while let Some(u) = cs
            .border_nodes
            .source_side
            .pop_random_entry_preferring_persistent(&mut self.rng)
        {
            if !cs.can_be_settled(hg, u) || cs.n.is_target_reachable(u) {
                continue;
            }
            return Some(PiercingChoice {
                node: u,
                is_reachable_from_opposite_side: false,
            });
        }
        None
    }
}
