//! State of one cut enumeration: flow value, reachability, cut and border
//! sets, piercing nodes, isolated nodes and the balance check.

use log::debug;

use crate::algorithms::FlowAlgorithm;
use crate::basic_types::Bipartition;
use crate::basic_types::Flow;
use crate::basic_types::Hyperedge;
use crate::basic_types::Node;
use crate::basic_types::NodeWeight;
use crate::datastructure::Borders;
use crate::datastructure::FlowHypergraph;
use crate::datastructure::IsolatedNodes;
use crate::datastructure::PersistentSet;
use crate::datastructure::ReachableHyperedges;
use crate::datastructure::ReachableNodes;
use crate::datastructure::SummableRange;
use bitvec::vec::BitVec;

/// A node added to the source side to force the flow to find a new path.
#[derive(Debug, Clone, Copy)]
pub struct PiercingNode {
    pub node: Node,
    pub is_reachable_from_opposite_side: bool,
}

/// The cut hyperedges of both sides plus the per-edge settled-pin flags
/// used to detect mixed hyperedges.
#[derive(Debug, Clone)]
pub struct HyperedgeCut {
    pub has_settled_source_pins: BitVec,
    pub has_settled_target_pins: BitVec,
    pub source_side: PersistentSet,
    pub target_side: PersistentSet,
}

impl HyperedgeCut {
    pub(crate) fn new(num_hyperedges: usize) -> Self {
        HyperedgeCut {
            has_settled_source_pins: BitVec::repeat(false, num_hyperedges),
            has_settled_target_pins: BitVec::repeat(false, num_hyperedges),
            source_side: PersistentSet::new(num_hyperedges),
            target_side: PersistentSet::new(num_hyperedges),
        }
    }

    pub fn was_added(&self, e: Hyperedge) -> bool {
        self.source_side.was_added(e)
    }

    pub fn add(&mut self, e: Hyperedge) {
        self.source_side.add(e);
    }

    fn flip_view_direction(&mut self) {
        std::mem::swap(
            &mut self.has_settled_source_pins,
            &mut self.has_settled_target_pins,
        );
        std::mem::swap(&mut self.source_side, &mut self.target_side);
    }
}

/// A settle operation, replayable after a rewind. The view direction at
/// the time of the move pins down which side the node went to.
#[derive(Debug, Clone, Copy)]
pub struct Move {
    pub node: Node,
    pub view_direction: usize,
}

/// Outcome of simulating the best isolated/unclaimed assignment for the
/// current cut, used to compare cuts during most-balanced-cut refinement.
#[derive(Debug, Clone, Copy)]
pub struct SimulatedNodeAssignment {
    pub block_weight_diff: NodeWeight,
    pub assign_unclaimed_to_source: bool,
    pub assign_tracked_iso_weight_to_source: bool,
    pub tracked_iso_weight: NodeWeight,
    pub number_of_tracked_moves: usize,
}

impl SimulatedNodeAssignment {
    pub fn is_perfectly_balanced(&self, total_weight: NodeWeight) -> bool {
        self.block_weight_diff <= total_weight % 2
    }
}

/// Deep snapshot of the mutable cutter state, taken at the first balanced
/// cut so most-balanced-cut refinement can rewind and replay.
#[derive(Debug, Clone)]
pub struct NonDynamicCutterState<FA: FlowAlgorithm> {
    view_direction: usize,
    flow_value: Flow,
    n: FA::ReachableNodes,
    h: FA::ReachableHyperedges,
    source_piercing_nodes: Vec<PiercingNode>,
    target_piercing_nodes: Vec<PiercingNode>,
    augmenting_path_available_from_piercing: bool,
    has_cut: bool,
    cut: HyperedgeCut,
    border_nodes: Borders,
    isolated_nodes: IsolatedNodes,
}

#[derive(Debug)]
pub struct CutterState<FA: FlowAlgorithm> {
    pub view_direction: usize,
    pub flow_value: Flow,
    pub n: FA::ReachableNodes,
    pub h: FA::ReachableHyperedges,
    pub source_piercing_nodes: Vec<PiercingNode>,
    pub target_piercing_nodes: Vec<PiercingNode>,
    pub augmenting_path_available_from_piercing: bool,
    pub has_cut: bool,
    pub cut: HyperedgeCut,
    pub border_nodes: Borders,
    pub max_block_weight: NodeWeight,
    pub isolated_nodes: IsolatedNodes,
    pub partition_written: bool,
    pub track_moves: bool,
    pub tracked_moves: Vec<Move>,
}

impl<FA: FlowAlgorithm> CutterState<FA> {
    pub fn new(hg: &FlowHypergraph, max_block_weight: NodeWeight) -> Self {
        CutterState {
            view_direction: 0,
            flow_value: 0,
            n: FA::ReachableNodes::new(hg),
            h: FA::ReachableHyperedges::new(hg),
            source_piercing_nodes: Vec::new(),
            target_piercing_nodes: Vec::new(),
            augmenting_path_available_from_piercing: true,
            has_cut: false,
            cut: HyperedgeCut::new(hg.num_hyperedges()),
            border_nodes: Borders::new(hg.num_nodes()),
            max_block_weight,
            isolated_nodes: IsolatedNodes::new(hg, max_block_weight),
            partition_written: false,
            track_moves: false,
            tracked_moves: Vec::new(),
        }
    }

    pub fn initialize(&mut self, hg: &mut FlowHypergraph, s: Node, t: Node) {
        debug_assert!(self.source_piercing_nodes.is_empty() && self.target_piercing_nodes.is_empty());
        self.source_piercing_nodes.push(PiercingNode {
            node: s,
            is_reachable_from_opposite_side: false,
        });
        self.settle_node(hg, s);
        self.target_piercing_nodes.push(PiercingNode {
            node: t,
            is_reachable_from_opposite_side: false,
        });
        self.flip_view_direction(hg);
        self.settle_node(hg, t);
        self.flip_view_direction(hg);
    }

    pub fn is_isolated(&self, hg: &FlowHypergraph, u: Node) -> bool {
        !self.n.is_source(u) && !self.n.is_target(u) && self.isolated_nodes.is_candidate(hg, u)
    }

    pub fn can_be_settled(&self, hg: &FlowHypergraph, u: Node) -> bool {
        !self.n.is_source(u) && !self.n.is_target(u) && !self.isolated_nodes.is_candidate(hg, u)
    }

    pub fn unclaimed_node_weight(&self, hg: &FlowHypergraph) -> NodeWeight {
        hg.total_node_weight().saturating_sub(
            self.n.source_reachable_weight()
                + self.n.target_reachable_weight()
                + self.isolated_nodes.weight,
        )
    }

    pub fn has_source_pin(&self, e: Hyperedge) -> bool {
        self.cut.has_settled_source_pins[e]
    }

    pub fn has_target_pin(&self, e: Hyperedge) -> bool {
        self.cut.has_settled_target_pins[e]
    }

    pub fn should_be_added_to_cut(&self, hg: &FlowHypergraph, e: Hyperedge) -> bool {
        !self.h.are_all_pins_source_reachable(e) && !self.cut.was_added(e) && hg.is_saturated(e)
    }

    pub fn add_to_cut(&mut self, hg: &FlowHypergraph, e: Hyperedge) {
        debug_assert!(self.should_be_added_to_cut(hg, e));
        for px in hg.pins_of(e) {
            let p = px.pin;
            if self.can_be_settled(hg, p) && !self.border_nodes.source_side.was_added(p) {
                self.border_nodes.source_side.add(p);
            }
        }
        self.cut.add(e);
    }

    /// Promotes `u` to the settled source side. Hyperedges gaining their
    /// first settled source pin while already holding a settled target pin
    /// become mixed; their pins move closer to isolation.
    pub fn settle_node(&mut self, hg: &FlowHypergraph, u: Node) {
        debug_assert!(self.can_be_settled(hg, u));
        if !self.n.is_source_reachable(u) {
            self.n.reach(hg, u);
        }
        self.n.settle(hg, u);
        if self.track_moves {
            self.tracked_moves.push(Move {
                node: u,
                view_direction: self.view_direction,
            });
        }

        for he_inc in hg.hyperedges_of(u) {
            let e = he_inc.e;
            if !self.has_source_pin(e) {
                self.cut.has_settled_source_pins.set(e, true);
                if self.has_target_pin(e) {
                    // e just became mixed
                    for px in hg.pins_of(e) {
                        let p = px.pin;
                        self.isolated_nodes.mixed_incident_hyperedges[p] += 1;
                        if self.is_isolated(hg, p) {
                            self.isolated_nodes.add(hg, p);
                            if self.n.is_source_reachable(p) {
                                self.n.unreach_source(hg, p);
                            }
                            if self.n.is_target_reachable(p) {
                                self.n.unreach_target(hg, p);
                            }
                        }
                    }
                }
            }
        }
    }

    /// Swaps the source and target roles everywhere: hypergraph pin
    /// ranges, reachability, piercing sets, cut and border. Involution.
    pub fn flip_view_direction(&mut self, hg: &mut FlowHypergraph) {
        self.view_direction = 1 - self.view_direction;
        hg.flip_view_direction();
        self.n.flip_view_direction();
        self.h.flip_view_direction();
        std::mem::swap(
            &mut self.source_piercing_nodes,
            &mut self.target_piercing_nodes,
        );
        self.cut.flip_view_direction();
        self.border_nodes.flip_view_direction();
    }

    /// Replaces the source piercing set by `u`. If `u` was reachable from
    /// the opposite side, an augmenting path may exist and the flow must
    /// be re-exhausted; otherwise the cut capacity is unchanged.
    pub fn pierce_node(&mut self, hg: &FlowHypergraph, u: Node, reachable_from_opposite: bool) {
        if self.n.is_target_reachable(u) {
            self.n.unreach_target(hg, u);
        }
        self.settle_node(hg, u);
        self.source_piercing_nodes.clear();
        self.source_piercing_nodes.push(PiercingNode {
            node: u,
            is_reachable_from_opposite_side: reachable_from_opposite,
        });
        self.augmenting_path_available_from_piercing = reachable_from_opposite;
        self.has_cut = false;
    }

    pub fn clear_for_search(&mut self, hg: &FlowHypergraph) {
        if self.augmenting_path_available_from_piercing {
            self.n.reset_source_reachable_to_source(hg, true);
            self.h.reset_source_reachable_to_source(hg, true);
        }
    }

    pub fn clean_up_border(&mut self, hg: &FlowHypergraph) {
        let n = &self.n;
        let iso = &self.isolated_nodes;
        self.border_nodes
            .source_side
            .clean_up(|u| n.is_source(u) || n.is_target(u) || iso.is_candidate(hg, u));
    }

    pub fn clean_up_cut(&mut self) {
        let h = &self.h;
        self.cut
            .source_side
            .clean_up(|e| h.are_all_pins_sources(e));
    }

    /// True if growing the target side next would keep the sides more even.
    pub fn should_grow_target_side(&self) -> bool {
        self.n.target_reachable_weight() < self.n.source_reachable_weight()
    }

    /// The four-stage balance check. Stages short-circuit so the
    /// subset-sum table is only refreshed when the cheap bounds cannot
    /// decide.
    pub fn is_balanced(&mut self, hg: &FlowHypergraph) -> bool {
        let sw = self.n.source_reachable_weight();
        let tw = self.n.target_reachable_weight();
        let uw = self.unclaimed_node_weight(hg);
        let iso = self.isolated_nodes.weight;
        let mbw = self.max_block_weight;

        match quick_balance_check(sw, tw, uw, iso, mbw) {
            Some(balanced) => balanced,
            None => {
                self.isolated_nodes.update_dp_table(hg);
                range_balance_check(sw, tw, uw, iso, mbw, self.isolated_nodes.sum_ranges())
            }
        }
    }

    /// Picks the assignment of unclaimed and isolated weight minimizing
    /// the block weight difference over all summable ranges. Requires an
    /// up-to-date subset-sum table.
    pub fn most_balanced_assignment(&mut self, hg: &FlowHypergraph) -> SimulatedNodeAssignment {
        self.isolated_nodes.update_dp_table(hg);

        let sw = self.n.source_reachable_weight();
        let tw = self.n.target_reachable_weight();
        let uw = self.unclaimed_node_weight(hg);
        let iso = self.isolated_nodes.weight;
        let suw = sw + uw;
        let tuw = tw + uw;

        let mut best: Option<SimulatedNodeAssignment> = None;
        let mut consider = |diff: NodeWeight, unclaimed_to_source: bool, iso_to_source: bool, x: NodeWeight| {
            if best.map_or(true, |b| diff < b.block_weight_diff) {
                best = Some(SimulatedNodeAssignment {
                    block_weight_diff: diff,
                    assign_unclaimed_to_source: unclaimed_to_source,
                    assign_tracked_iso_weight_to_source: iso_to_source,
                    tracked_iso_weight: x,
                    number_of_tracked_moves: 0,
                });
            }
        };

        for sr in self.isolated_nodes.sum_ranges() {
            let (x, diff) = isolated_weight_assignment_to_first(suw, tw, iso, sr);
            consider(diff, true, true, x);
            let (x, diff) = isolated_weight_assignment_to_first(tw, suw, iso, sr);
            consider(diff, true, false, x);
            let (x, diff) = isolated_weight_assignment_to_first(sw, tuw, iso, sr);
            consider(diff, false, true, x);
            let (x, diff) = isolated_weight_assignment_to_first(tuw, sw, iso, sr);
            consider(diff, false, false, x);
        }

        let mut sol = best.expect("at least the zero range is always summable");
        sol.number_of_tracked_moves = self.tracked_moves.len();
        sol
    }

    /// Writes the bipartition for the chosen assignment. Block 0 holds the
    /// source side in the canonical (unflipped) orientation.
    pub fn write_partition(
        &mut self,
        hg: &mut FlowHypergraph,
        sol: &SimulatedNodeAssignment,
    ) -> Bipartition {
        debug_assert!(!self.partition_written, "partition was already written");
        if self.view_direction != 0 {
            self.flip_view_direction(hg);
        }
        self.isolated_nodes.update_dp_table(hg);

        let iso = self.isolated_nodes.weight;
        let (mut source_iso, mut target_iso) = self
            .isolated_nodes
            .extract_bipartition(hg, sol.tracked_iso_weight);
        if !sol.assign_tracked_iso_weight_to_source {
            std::mem::swap(&mut source_iso, &mut target_iso);
        }

        let mut partition = Bipartition::default();
        for u in 0..hg.num_nodes() {
            if self.n.is_source_reachable(u) {
                partition.block0.push(u);
            } else if self.n.is_target_reachable(u) {
                partition.block1.push(u);
            } else if self.isolated_nodes.contains(u) {
                // placed below via the extracted subset
            } else if sol.assign_unclaimed_to_source {
                partition.block0.push(u);
            } else {
                partition.block1.push(u);
            }
        }
        partition.block0.extend_from_slice(&source_iso);
        partition.block1.extend_from_slice(&target_iso);

        let sum = |nodes: &[Node]| nodes.iter().map(|&u| hg.node_weight(u)).sum::<NodeWeight>();
        let w0 = sum(&partition.block0);
        let w1 = sum(&partition.block1);
        debug!(
            "partition written: |B0| = {} (w = {}), |B1| = {} (w = {}), iso = {}",
            partition.block0.len(),
            w0,
            partition.block1.len(),
            w1,
            iso
        );
        assert!(
            w0 <= self.max_block_weight && w1 <= self.max_block_weight,
            "computed assignment violates the max block weight"
        );
        debug_assert_eq!(w0 + w1, hg.total_node_weight());

        self.partition_written = true;
        partition
    }

    /// Locks the current border and cut entries as persistent and captures
    /// the snapshot to rewind to between refinement rounds.
    pub fn enter_most_balanced_cut_mode(&mut self) -> NonDynamicCutterState<FA> {
        self.border_nodes.enter_most_balanced_cut_mode();
        self.cut.source_side.lock_in_persistent_entries();
        self.cut.target_side.lock_in_persistent_entries();
        self.track_moves = true;
        self.tracked_moves.clear();
        self.save_state()
    }

    fn save_state(&self) -> NonDynamicCutterState<FA> {
        NonDynamicCutterState {
            view_direction: self.view_direction,
            flow_value: self.flow_value,
            n: self.n.clone(),
            h: self.h.clone(),
            source_piercing_nodes: self.source_piercing_nodes.clone(),
            target_piercing_nodes: self.target_piercing_nodes.clone(),
            augmenting_path_available_from_piercing: self.augmenting_path_available_from_piercing,
            has_cut: self.has_cut,
            cut: self.cut.clone(),
            border_nodes: self.border_nodes.clone(),
            isolated_nodes: self.isolated_nodes.clone(),
        }
    }

    /// Rewinds to the first balanced state. The hypergraph flow is
    /// untouched during refinement, so only the cutter state is restored.
    pub fn reset_to_first_balanced_state(
        &mut self,
        hg: &mut FlowHypergraph,
        state: &NonDynamicCutterState<FA>,
    ) {
        if self.view_direction != state.view_direction {
            self.flip_view_direction(hg);
        }
        debug_assert_eq!(self.view_direction, state.view_direction);
        self.flow_value = state.flow_value;
        self.n.clone_from(&state.n);
        self.h.clone_from(&state.h);
        self.source_piercing_nodes.clone_from(&state.source_piercing_nodes);
        self.target_piercing_nodes.clone_from(&state.target_piercing_nodes);
        self.augmenting_path_available_from_piercing =
            state.augmenting_path_available_from_piercing;
        self.has_cut = state.has_cut;
        self.cut.clone_from(&state.cut);
        self.border_nodes.clone_from(&state.border_nodes);
        self.isolated_nodes.clone_from(&state.isolated_nodes);
        self.tracked_moves.clear();
    }

    /// Replays a move sequence recorded during refinement on top of the
    /// restored snapshot.
    pub fn apply_moves(&mut self, hg: &mut FlowHypergraph, moves: &[Move]) {
        self.track_moves = false;
        for m in moves {
            if self.view_direction != m.view_direction {
                self.flip_view_direction(hg);
            }
            if self.n.is_target_reachable(m.node) {
                self.n.unreach_target(hg, m.node);
            }
            if !self.n.is_source(m.node) && !self.is_isolated(hg, m.node) {
                self.settle_node(hg, m.node);
            }
        }
    }

    pub fn state_summary(&self, hg: &FlowHypergraph) -> String {
        format!(
            "cut={} s={}|{} t={}|{} iso={} total={}",
            self.flow_value,
            self.n.source_weight(),
            self.n.source_reachable_weight(),
            self.n.target_weight(),
            self.n.target_reachable_weight(),
            self.isolated_nodes.weight,
            hg.total_node_weight()
        )
    }

    /// Expensive postcondition checks on the cut, compiled only with the
    /// `debug-checks` feature or in tests.
    #[cfg(any(test, feature = "debug-checks"))]
    pub fn verify_cut_postconditions(&self, hg: &FlowHypergraph) {
        for e in self.cut.source_side.iter() {
            assert!(hg.is_saturated(e), "cut hyperedge {} is not saturated", e);
            assert!(
                hg.pins_of(e).iter().any(|p| self.n.is_source(p.pin)),
                "cut hyperedge {} has no settled source pin",
                e
            );
        }
        for u in 0..hg.num_nodes() {
            assert!(
                !(self.n.is_source_reachable(u) && self.n.is_target_reachable(u)),
                "node {} reachable from both sides",
                u
            );
        }
    }
}

/// Stages one to three of the balance check: rejects overloaded or
/// unsplittable configurations, accepts when all isolated weight fits on
/// one side. Returns `None` when only splitting the isolated nodes can
/// decide.
pub(crate) fn quick_balance_check(
    sw: NodeWeight,
    tw: NodeWeight,
    uw: NodeWeight,
    iso: NodeWeight,
    mbw: NodeWeight,
) -> Option<bool> {
    if sw > mbw || tw > mbw {
        return Some(false);
    }
    if sw + uw > mbw && tw + uw > mbw {
        return Some(false);
    }
    let balanced = sw + uw + iso <= mbw
        || tw + uw + iso <= mbw
        || (sw + uw <= mbw && tw + iso <= mbw)
        || (tw + uw <= mbw && sw + iso <= mbw);
    if balanced {
        Some(true)
    } else {
        None
    }
}

/// Stage four: for each summable range, try the four configurations of
/// where the unclaimed mass goes and how much isolated mass goes to the
/// source side.
pub(crate) fn range_balance_check(
    sw: NodeWeight,
    tw: NodeWeight,
    uw: NodeWeight,
    iso: NodeWeight,
    mbw: NodeWeight,
    sum_ranges: &[SummableRange],
) -> bool {
    debug_assert!(sw <= mbw && tw <= mbw);
    let s_rem = mbw - sw;
    let t_rem = mbw - tw;
    let suw = sw + uw;
    let tuw = tw + uw;
    let suw_rem = (suw <= mbw).then(|| mbw - suw);
    let tuw_rem = (tuw <= mbw).then(|| mbw - tuw);

    // sides: (S + U, T) + iso and (S, T + U) + iso
    for sr in sum_ranges {
        let mut balanced = false;
        if let Some(suw_rem) = suw_rem {
            // allocate as much isolated weight as possible to S + U, the
            // rest has to fit on T; then the other way around
            balanced |= suw_rem >= sr.from && tw + (iso - suw_rem.min(sr.to)) <= mbw;
            balanced |= t_rem >= sr.from && suw + (iso - t_rem.min(sr.to)) <= mbw;
        }
        if let Some(tuw_rem) = tuw_rem {
            balanced |= tuw_rem >= sr.from && sw + (iso - tuw_rem.min(sr.to)) <= mbw;
            balanced |= s_rem >= sr.from && tuw + (iso - s_rem.min(sr.to)) <= mbw;
        }
        if balanced {
            return true;
        }
    }
    false
}

/// Side of `a` gets `x` isolated weight, side of `b` the rest. Returns `x`
/// and the resulting block weight difference; `x` is the analytic
/// minimizer `(b - a) / 2` clamped into the summable range.
pub(crate) fn isolated_weight_assignment_to_first(
    a: NodeWeight,
    mut b: NodeWeight,
    iso: NodeWeight,
    sr: &SummableRange,
) -> (NodeWeight, NodeWeight) {
    b += iso;
    let x = if a < b {
        ((b - a) / 2).min(sr.to).max(sr.from)
    } else {
        sr.from
    };
    (x, (a + x).abs_diff(b - x))
}

#[cfg(test)]
mod tests {
    use super::isolated_weight_assignment_to_first;
    use super::quick_balance_check;
    use super::range_balance_check;
    use crate::datastructure::SummableRange;

    fn sr(from: usize, to: usize) -> SummableRange {
        SummableRange { from, to }
    }

    #[test]
    fn quick_checks_reject_overload_and_unsplittable_mass() {
        assert_eq!(quick_balance_check(11, 0, 0, 0, 10), Some(false));
        assert_eq!(quick_balance_check(6, 6, 9, 0, 10), Some(false));
        assert_eq!(quick_balance_check(4, 3, 2, 1, 10), Some(true));
    }

    #[test]
    fn isolated_split_makes_the_cut_balanced() {
        // sw = 6, tw = 0, uw = 3, iso = 4: one side can absorb all
        // isolated mass, so the quick stage already accepts
        assert_eq!(quick_balance_check(6, 0, 3, 4, 10), Some(true));
        assert!(range_balance_check(6, 0, 3, 4, 10, &[sr(0, 0), sr(2, 4)]));

        // sw = 6, tw = 5, iso = 7: neither side can take all of it, only
        // x in [3, 4] on the source side fits both blocks under 10
        assert_eq!(quick_balance_check(6, 5, 0, 7, 10), None);
        assert!(range_balance_check(6, 5, 0, 7, 10, &[sr(0, 0), sr(3, 4)]));
        assert!(!range_balance_check(6, 5, 0, 7, 10, &[sr(0, 0)]));
    }

    #[test]
    fn iso_assignment_clamps_into_the_summable_range() {
        // a = 2, b = 10 + 4: the unconstrained minimizer is 6, clamped to 4
        let (x, diff) = isolated_weight_assignment_to_first(2, 10, 4, &sr(0, 4));
        assert_eq!(x, 4);
        assert_eq!(diff, 4);

        // a heavier than b: give b everything beyond the forced minimum
        let (x, diff) = isolated_weight_assignment_to_first(12, 2, 4, &sr(1, 3));
        assert_eq!(x, 1);
        assert_eq!(diff, 8);

        // perfectly splittable
        let (x, diff) = isolated_weight_assignment_to_first(3, 3, 4, &sr(0, 4));
        assert_eq!(x, 2);
        assert_eq!(diff, 0);
    }
}
