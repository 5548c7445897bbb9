//! Cut enumeration on top of a push-relabel engine.
//!
//! The engine handles both terminal sides natively, so this driver never
//! flips the view: it tracks which side to pierce, asks the engine to
//! recompute flow when the pierced node could open an augmenting path and
//! to only re-derive the one-sided cut otherwise, then assimilates the
//! grown side and tests balance. Only the side being grown is assimilated;
//! the opposite side's settled set lags behind its reachable set until
//! piercing switches over. Once a balanced cut below the flow bound is
//! found, the same most-balanced-cut refinement as the flipping driver
//! runs: state snapshots rewind the cutter and the engine between rounds
//! while only nodes that cannot open augmenting paths are pierced, and
//! the best move sequence is replayed at the end.

use rand::rngs::SmallRng;
use rand::Rng;
use rand::SeedableRng;

use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Instant;

use log::debug;

use crate::algorithms::cutter_state::isolated_weight_assignment_to_first;
use crate::algorithms::cutter_state::quick_balance_check;
use crate::algorithms::cutter_state::range_balance_check;
use crate::algorithms::cutter_state::HyperedgeCut;
use crate::algorithms::cutter_state::SimulatedNodeAssignment;
use crate::algorithms::push_relabel::EngineStateSnapshot;
use crate::algorithms::push_relabel::PushRelabelEngine;
use crate::basic_types::Bipartition;
use crate::basic_types::Flow;
use crate::basic_types::Node;
use crate::basic_types::NodeWeight;
use crate::datastructure::BitsetReachableNodes;
use crate::datastructure::Borders;
use crate::datastructure::FlowHypergraph;
use crate::datastructure::IsolatedNodes;
use crate::datastructure::ReachableNodes;

const SOURCE_SIDE: usize = 0;
const TARGET_SIDE: usize = 1;

const MBC_ITERATIONS: usize = 7;

/// A settle operation recorded during refinement, replayable after a
/// rewind.
#[derive(Debug, Clone, Copy)]
struct TrackedMove {
    node: Node,
    side: usize,
}

/// Deep snapshot of the cutter bookkeeping at the first balanced cut,
/// restored together with the engine's [`EngineStateSnapshot`] between
/// refinement rounds.
#[derive(Debug, Clone)]
struct CutterSnapshot {
    n: BitsetReachableNodes,
    cut: HyperedgeCut,
    border: Borders,
    isolated_nodes: IsolatedNodes,
    source_reachable_weight: NodeWeight,
    target_reachable_weight: NodeWeight,
    side_to_pierce: usize,
    augmenting_path_available: bool,
}

#[derive(Debug)]
pub struct PushRelabelCutter<E: PushRelabelEngine> {
    pub hg: FlowHypergraph,
    pub engine: E,
    n: BitsetReachableNodes,
    cut: HyperedgeCut,
    border: Borders,
    isolated_nodes: IsolatedNodes,
    max_block_weight: NodeWeight,
    /// Settled weight plus the weight of reachable but unsettled
    /// hypernodes, per side. Kept in sync with the engine's derives.
    source_reachable_weight: NodeWeight,
    target_reachable_weight: NodeWeight,
    pub side_to_pierce: usize,
    pub has_cut: bool,
    augmenting_path_available: bool,
    rng: SmallRng,
    pub find_most_balanced: bool,
    track_moves: bool,
    tracked_moves: Vec<TrackedMove>,
    pub num_cuts: usize,
    pub assimilate_time: f64,
    pub pierce_time: f64,
    pub mbc_time: f64,
    pub partition: Option<Bipartition>,
    shall_terminate: Option<Arc<AtomicBool>>,
}

impl<E: PushRelabelEngine> PushRelabelCutter<E> {
    pub fn new(hg: FlowHypergraph, max_block_weight: NodeWeight, seed: u64) -> Self {
        let engine = E::new(&hg);
        let n = BitsetReachableNodes::new(&hg);
        let cut = HyperedgeCut::new(hg.num_hyperedges());
        let border = Borders::new(hg.num_nodes());
        let isolated_nodes = IsolatedNodes::new(&hg, max_block_weight);
        PushRelabelCutter {
            hg,
            engine,
            n,
            cut,
            border,
            isolated_nodes,
            max_block_weight,
            source_reachable_weight: 0,
            target_reachable_weight: 0,
            side_to_pierce: SOURCE_SIDE,
            has_cut: false,
            augmenting_path_available: true,
            rng: SmallRng::seed_from_u64(seed),
            find_most_balanced: true,
            track_moves: false,
            tracked_moves: Vec::new(),
            num_cuts: 0,
            assimilate_time: 0.0,
            pierce_time: 0.0,
            mbc_time: 0.0,
            partition: None,
            shall_terminate: None,
        }
    }

    pub fn set_flow_bound(&mut self, bound: Flow) {
        self.engine.set_upper_flow_bound(bound);
    }

    pub fn set_termination_flag(&mut self, flag: Arc<AtomicBool>) {
        self.engine.set_termination_flag(Arc::clone(&flag));
        self.shall_terminate = Some(flag);
    }

    fn is_terminated(&self) -> bool {
        self.shall_terminate
            .as_ref()
            .is_some_and(|f| f.load(Ordering::Relaxed))
    }

    pub fn flow_value(&self) -> Flow {
        self.engine.flow_value()
    }

    fn is_settled(&self, u: Node) -> bool {
        self.n.is_source(u) || self.n.is_target(u)
    }

    fn settle_on_side(&mut self, u: Node, side: usize) {
        debug_assert!(!self.is_settled(u) && !self.isolated_nodes.is_candidate(&self.hg, u));
        let source = side == SOURCE_SIDE;
        if source {
            self.n.reach(&self.hg, u);
            self.n.settle(&self.hg, u);
        } else {
            self.n.reach_target(&self.hg, u);
            self.n.settle_target(&self.hg, u);
        }
        if self.track_moves {
            self.tracked_moves.push(TrackedMove { node: u, side });
        }

        for he_it in self.hg.incident_hyperedge_indices(u) {
            let e = self.hg.get_in_he(he_it).e;
            let first_own_pin = if source {
                !self.cut.has_settled_source_pins[e]
            } else {
                !self.cut.has_settled_target_pins[e]
            };
            if !first_own_pin {
                continue;
            }
            if source {
                self.cut.has_settled_source_pins.set(e, true);
            } else {
                self.cut.has_settled_target_pins.set(e, true);
            }
            let became_mixed = if source {
                self.cut.has_settled_target_pins[e]
            } else {
                self.cut.has_settled_source_pins[e]
            };
            if became_mixed {
                for pi in self.hg.pin_indices(e) {
                    let p = self.hg.get_pin(pi).pin;
                    self.isolated_nodes.mixed_incident_hyperedges[p] += 1;
                    // the counter hits the degree exactly once per node
                    if !self.n.is_source(p)
                        && !self.n.is_target(p)
                        && self.isolated_nodes.is_candidate(&self.hg, p)
                    {
                        self.isolated_nodes.add(&self.hg, p);
                        let w = self.hg.node_weight(p);
                        if self.engine.is_source_reachable(p) {
                            self.source_reachable_weight -= w;
                        }
                        if self.engine.is_target_reachable(p) {
                            self.target_reachable_weight -= w;
                        }
                    }
                }
            }
        }
    }

    /// Refreshes one side's reachable weight from the engine's last
    /// derive. A full derive rebuilds the weight from the settled base;
    /// an incremental one only appends newly reached nodes.
    fn refresh_reachable_weight(&mut self, side: usize, full: bool) {
        let exp = self.engine.expansion();
        let (list, base) = if side == SOURCE_SIDE {
            (self.engine.source_reachable_nodes(), self.n.source_weight())
        } else {
            (self.engine.target_reachable_nodes(), self.n.target_weight())
        };
        let mut extra = 0;
        for &x in list {
            if exp.is_hypernode(x) && !self.is_settled(x) && !self.isolated_nodes.contains(x) {
                extra += self.hg.node_weight(x);
            }
        }
        let rw = if side == SOURCE_SIDE {
            &mut self.source_reachable_weight
        } else {
            &mut self.target_reachable_weight
        };
        if full {
            *rw = base + extra;
        } else {
            *rw += extra;
        }
    }

    /// Settles every hypernode the engine reached on `side`, then
    /// refreshes that side's cut hyperedges and border candidates.
    fn assimilate(&mut self, side: usize) {
        let start = Instant::now();
        let exp = self.engine.expansion();

        let reachable: Vec<Node> = if side == SOURCE_SIDE {
            self.engine.source_reachable_nodes().to_vec()
        } else {
            self.engine.target_reachable_nodes().to_vec()
        };

        for &x in &reachable {
            if exp.is_hypernode(x)
                && !self.is_settled(x)
                && !self.isolated_nodes.is_candidate(&self.hg, x)
            {
                self.settle_on_side(x, side);
            }
        }

        // a bridge crossed by the cut has its tail reachable and its head
        // not; the unsettled pins of such edges form the border
        for &x in &reachable {
            if side == SOURCE_SIDE && exp.is_in_node(x) {
                let e = exp.in_node_to_edge(x);
                if !self.engine.is_source_reachable(exp.edge_to_out_node(e))
                    && !self.cut.source_side.was_added(e)
                {
                    self.cut.source_side.add(e);
                    for pi in self.hg.pin_indices(e) {
                        let p = self.hg.get_pin(pi).pin;
                        if !self.is_settled(p)
                            && !self.isolated_nodes.is_candidate(&self.hg, p)
                            && !self.border.source_side.was_added(p)
                        {
                            self.border.source_side.add(p);
                        }
                    }
                }
            } else if side == TARGET_SIDE && exp.is_out_node(x) {
                let e = exp.out_node_to_edge(x);
                if !self.engine.is_target_reachable(exp.edge_to_in_node(e))
                    && !self.cut.target_side.was_added(e)
                {
                    self.cut.target_side.add(e);
                    for pi in self.hg.pin_indices(e) {
                        let p = self.hg.get_pin(pi).pin;
                        if !self.is_settled(p)
                            && !self.isolated_nodes.is_candidate(&self.hg, p)
                            && !self.border.target_side.was_added(p)
                        {
                            self.border.target_side.add(p);
                        }
                    }
                }
            }
        }

        // drop swallowed cut edges and consumed border candidates
        let engine = &self.engine;
        if side == SOURCE_SIDE {
            self.cut
                .source_side
                .clean_up(|e| engine.is_source_reachable(exp.edge_to_out_node(e)));
        } else {
            self.cut
                .target_side
                .clean_up(|e| engine.is_target_reachable(exp.edge_to_in_node(e)));
        }
        let n = &self.n;
        let iso = &self.isolated_nodes;
        let hg = &self.hg;
        let border_side = if side == SOURCE_SIDE {
            &mut self.border.source_side
        } else {
            &mut self.border.target_side
        };
        border_side.clean_up(|u| n.is_source(u) || n.is_target(u) || iso.is_candidate(hg, u));

        self.assimilate_time += start.elapsed().as_secs_f64();
    }

    /// Picks a border node of `side_to_pierce`, preferring candidates not
    /// reachable from the opposite side; random tie-break. Assimilates the
    /// side first if its border was never grown.
    fn pierce(&mut self) -> bool {
        let start = Instant::now();
        let side = self.side_to_pierce;
        let border_empty = if side == SOURCE_SIDE {
            self.border.source_side.is_empty()
        } else {
            self.border.target_side.is_empty()
        };
        if border_empty {
            self.assimilate(side);
        }

        let mut best: Option<(Node, (bool, u32))> = None;
        {
            let border_side = if side == SOURCE_SIDE {
                &self.border.source_side
            } else {
                &self.border.target_side
            };
            for u in border_side.iter() {
                if self.n.is_source(u)
                    || self.n.is_target(u)
                    || self.isolated_nodes.is_candidate(&self.hg, u)
                {
                    continue;
                }
                let opposite_reachable = if side == SOURCE_SIDE {
                    self.engine.is_target_reachable(u)
                } else {
                    self.engine.is_source_reachable(u)
                };
                let score = (!opposite_reachable, self.rng.gen::<u32>());
                if best.as_ref().is_none_or(|(_, s)| score > *s) {
                    best = Some((u, score));
                }
            }
        }

        let picked = match best {
            Some((u, (not_opposite, _))) => {
                debug!("pierce {} on side {}", u, side);
                self.augmenting_path_available = !not_opposite;
                let w = self.hg.node_weight(u);
                if side == SOURCE_SIDE {
                    self.source_reachable_weight += w;
                    if self.engine.is_target_reachable(u) {
                        self.target_reachable_weight -= w;
                    }
                } else {
                    self.target_reachable_weight += w;
                    if self.engine.is_source_reachable(u) {
                        self.source_reachable_weight -= w;
                    }
                }
                self.engine.pierce(&self.hg, u, side == SOURCE_SIDE);
                self.settle_on_side(u, side);
                self.has_cut = false;
                true
            }
            None => false,
        };
        self.pierce_time += start.elapsed().as_secs_f64();
        picked
    }

    fn unclaimed_node_weight(&self) -> NodeWeight {
        self.hg.total_node_weight().saturating_sub(
            self.source_reachable_weight + self.target_reachable_weight + self.isolated_nodes.weight,
        )
    }

    fn is_balanced(&mut self) -> bool {
        let sw = self.source_reachable_weight;
        let tw = self.target_reachable_weight;
        let uw = self.unclaimed_node_weight();
        let iso = self.isolated_nodes.weight;
        match quick_balance_check(sw, tw, uw, iso, self.max_block_weight) {
            Some(balanced) => balanced,
            None => {
                self.isolated_nodes.update_dp_table(&self.hg);
                range_balance_check(
                    sw,
                    tw,
                    uw,
                    iso,
                    self.max_block_weight,
                    self.isolated_nodes.sum_ranges(),
                )
            }
        }
    }

    /// Runs the piercing loop until a balanced cut below the flow bound is
    /// found. `on_cut` is invoked after every assimilated cut; returning
    /// `false` aborts.
    pub fn enumerate_cuts_until_balanced_or_flow_bound_exceeded(
        &mut self,
        s: Node,
        t: Node,
        mut on_cut: impl FnMut(&Self) -> bool,
    ) -> bool {
        self.engine.pierce(&self.hg, s, true);
        self.settle_on_side(s, SOURCE_SIDE);
        self.source_reachable_weight = self.n.source_weight();
        self.engine.pierce(&self.hg, t, false);
        self.settle_on_side(t, TARGET_SIDE);
        self.target_reachable_weight = self.n.target_weight();

        let mut last_flow = -1;
        loop {
            if self.is_terminated() {
                return false;
            }
            if self.has_cut {
                self.side_to_pierce =
                    if self.target_reachable_weight < self.source_reachable_weight {
                        TARGET_SIDE
                    } else {
                        SOURCE_SIDE
                    };
                if !self.pierce() {
                    // the other border may still have candidates
                    self.side_to_pierce = 1 - self.side_to_pierce;
                    if !self.pierce() {
                        return false;
                    }
                }
            }

            if self.augmenting_path_available {
                self.has_cut = self.engine.find_min_cuts(&self.hg);
                if self.has_cut {
                    self.refresh_reachable_weight(SOURCE_SIDE, true);
                    self.refresh_reachable_weight(TARGET_SIDE, true);
                }
            } else {
                if self.side_to_pierce == SOURCE_SIDE {
                    self.engine.derive_source_side_cut(&self.hg, false);
                } else {
                    self.engine.derive_target_side_cut(&self.hg);
                }
                self.refresh_reachable_weight(self.side_to_pierce, self.side_to_pierce == TARGET_SIDE);
                self.has_cut = true; // the flow did not change
            }

            if self.has_cut {
                self.assimilate(self.side_to_pierce);
                debug!(
                    "cut={} srw={} trw={} iso={}",
                    self.engine.flow_value(),
                    self.source_reachable_weight,
                    self.target_reachable_weight,
                    self.isolated_nodes.weight
                );
                if self.engine.flow_value() != last_flow {
                    last_flow = self.engine.flow_value();
                    self.num_cuts += 1;
                }
                if !on_cut(self) {
                    return false;
                }
            }
            if self.engine.flow_value() > self.engine.upper_flow_bound() {
                return false;
            }
            if self.has_cut && self.is_balanced() {
                break;
            }
        }

        if self.find_most_balanced {
            self.most_balanced_cut();
        } else {
            let sol = self.most_balanced_assignment();
            self.write_partition(&sol);
        }
        true
    }

    /// Picks the assignment of unclaimed and isolated weight minimizing
    /// the block weight difference over all summable ranges.
    fn most_balanced_assignment(&mut self) -> SimulatedNodeAssignment {
        self.isolated_nodes.update_dp_table(&self.hg);

        let sw = self.source_reachable_weight;
        let tw = self.target_reachable_weight;
        let uw = self.unclaimed_node_weight();
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

    /// Piercing inside already reachable territory cannot change the
    /// flow, so cuts of equal capacity are enumerated from the first
    /// balanced state, keeping the most balanced assignment seen.
    fn most_balanced_cut(&mut self) {
        let start = Instant::now();
        debug!("most balanced cut mode");
        let total = self.hg.total_node_weight();

        // assimilate the missing side so the moves don't have to track it
        if self.side_to_pierce == SOURCE_SIDE {
            self.assimilate(TARGET_SIDE);
        } else {
            self.assimilate(SOURCE_SIDE);
        }

        self.border.enter_most_balanced_cut_mode();
        self.cut.source_side.lock_in_persistent_entries();
        self.cut.target_side.lock_in_persistent_entries();
        self.track_moves = true;
        self.tracked_moves.clear();
        let first_balanced_state = self.save_state();
        let engine_state = self.engine.save_state();

        let initial_sol = self.most_balanced_assignment();
        let mut best_sol = initial_sol;
        let mut best_moves: Vec<TrackedMove> = Vec::new();

        for iteration in 0..MBC_ITERATIONS {
            if best_sol.is_perfectly_balanced(total) {
                break;
            }
            debug!("refinement round {}", iteration);
            let mut sol = best_sol;

            loop {
                if sol.is_perfectly_balanced(total) {
                    break;
                }
                if !self.pierce_without_augmenting() {
                    break;
                }
                if self.side_to_pierce == SOURCE_SIDE {
                    self.engine.derive_source_side_cut(&self.hg, false);
                } else {
                    self.engine.derive_target_side_cut(&self.hg);
                }
                self.refresh_reachable_weight(
                    self.side_to_pierce,
                    self.side_to_pierce == TARGET_SIDE,
                );
                self.has_cut = true; // the flow did not change
                self.assimilate(self.side_to_pierce);

                let sim = self.most_balanced_assignment();
                if sim.block_weight_diff < sol.block_weight_diff {
                    sol = sim;
                }
            }

            if sol.block_weight_diff < best_sol.block_weight_diff {
                best_sol = sol;
                best_moves = self.tracked_moves[..sol.number_of_tracked_moves].to_vec();
            }
            self.restore_state(&first_balanced_state);
            self.engine.restore_state(&engine_state);
        }

        self.apply_moves(&best_moves);
        self.write_partition(&best_sol);
        self.mbc_time += start.elapsed().as_secs_f64();
    }

    /// Refinement piercing: candidates reachable from the opposite side
    /// are rejected outright, so the flow value cannot change. Consumes
    /// border entries, persistent ones first.
    fn pierce_without_augmenting(&mut self) -> bool {
        let start = Instant::now();
        self.side_to_pierce = if self.target_reachable_weight < self.source_reachable_weight {
            TARGET_SIDE
        } else {
            SOURCE_SIDE
        };
        let mut picked = false;
        'sides: for _ in 0..2 {
            let side = self.side_to_pierce;
            loop {
                let popped = if side == SOURCE_SIDE {
                    self.border
                        .source_side
                        .pop_random_entry_preferring_persistent(&mut self.rng)
                } else {
                    self.border
                        .target_side
                        .pop_random_entry_preferring_persistent(&mut self.rng)
                };
                let Some(u) = popped else { break };
                if self.is_settled(u) || self.isolated_nodes.is_candidate(&self.hg, u) {
                    continue;
                }
                let opposite_reachable = if side == SOURCE_SIDE {
                    self.engine.is_target_reachable(u)
                } else {
                    self.engine.is_source_reachable(u)
                };
                if opposite_reachable {
                    continue;
                }
                debug!("refinement pierce {} on side {}", u, side);
                self.augmenting_path_available = false;
                let w = self.hg.node_weight(u);
                if side == SOURCE_SIDE {
                    self.source_reachable_weight += w;
                } else {
                    self.target_reachable_weight += w;
                }
                self.engine.pierce(&self.hg, u, side == SOURCE_SIDE);
                self.settle_on_side(u, side);
                self.has_cut = false;
                picked = true;
                break 'sides;
            }
            self.side_to_pierce = 1 - self.side_to_pierce;
        }
        self.pierce_time += start.elapsed().as_secs_f64();
        picked
    }

    fn save_state(&self) -> CutterSnapshot {
        CutterSnapshot {
            n: self.n.clone(),
            cut: self.cut.clone(),
            border: self.border.clone(),
            isolated_nodes: self.isolated_nodes.clone(),
            source_reachable_weight: self.source_reachable_weight,
            target_reachable_weight: self.target_reachable_weight,
            side_to_pierce: self.side_to_pierce,
            augmenting_path_available: self.augmenting_path_available,
        }
    }

    fn restore_state(&mut self, snapshot: &CutterSnapshot) {
        self.n.clone_from(&snapshot.n);
        self.cut.clone_from(&snapshot.cut);
        self.border.clone_from(&snapshot.border);
        self.isolated_nodes.clone_from(&snapshot.isolated_nodes);
        self.source_reachable_weight = snapshot.source_reachable_weight;
        self.target_reachable_weight = snapshot.target_reachable_weight;
        self.side_to_pierce = snapshot.side_to_pierce;
        self.augmenting_path_available = snapshot.augmenting_path_available;
        self.has_cut = true;
        self.tracked_moves.clear();
    }

    /// Replays a move sequence recorded during refinement on top of the
    /// restored snapshot.
    fn apply_moves(&mut self, moves: &[TrackedMove]) {
        self.track_moves = false;
        for m in moves {
            if !self.is_settled(m.node) && !self.isolated_nodes.is_candidate(&self.hg, m.node) {
                self.settle_on_side(m.node, m.side);
            }
        }
    }

    fn write_partition(&mut self, sol: &SimulatedNodeAssignment) {
        self.isolated_nodes.update_dp_table(&self.hg);

        let (mut source_iso, mut target_iso) = self
            .isolated_nodes
            .extract_bipartition(&self.hg, sol.tracked_iso_weight);
        if !sol.assign_tracked_iso_weight_to_source {
            std::mem::swap(&mut source_iso, &mut target_iso);
        }

        let mut partition = Bipartition::default();
        for u in 0..self.hg.num_nodes() {
            if self.isolated_nodes.contains(u) {
                // placed via the extracted subset
            } else if self.n.is_source(u) {
                partition.block0.push(u);
            } else if self.n.is_target(u) {
                partition.block1.push(u);
            } else if self.engine.is_source_reachable(u) {
                partition.block0.push(u);
            } else if self.engine.is_target_reachable(u) {
                partition.block1.push(u);
            } else if sol.assign_unclaimed_to_source {
                partition.block0.push(u);
            } else {
                partition.block1.push(u);
            }
        }
        partition.block0.extend_from_slice(&source_iso);
        partition.block1.extend_from_slice(&target_iso);

        let weight = |b: &[Node]| b.iter().map(|&u| self.hg.node_weight(u)).sum::<NodeWeight>();
        assert!(weight(&partition.block0) <= self.max_block_weight);
        assert!(weight(&partition.block1) <= self.max_block_weight);
        self.partition = Some(partition);
    }
}
