//! The outer cut-enumeration loop: pierce, recompute flow or reachability,
//! assimilate, test balance. Once a balanced cut below the flow bound is
//! found, an optional refinement phase searches for the most balanced cut
//! of the same capacity by piercing only nodes that cannot create
//! augmenting paths.

use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use log::debug;

use crate::algorithms::cutter_state::Move;
use crate::algorithms::grow_assimilated;
use crate::algorithms::CutterState;
use crate::algorithms::FlowAlgorithm;
use crate::algorithms::Piercer;
use crate::basic_types::Bipartition;
use crate::basic_types::Flow;
use crate::basic_types::Node;
use crate::basic_types::NodeWeight;
use crate::datastructure::FlowHypergraph;

const MBC_ITERATIONS: usize = 7;

#[derive(Debug)]
pub struct HyperFlowCutter<FA: FlowAlgorithm> {
    pub hg: FlowHypergraph,
    pub cs: CutterState<FA>,
    pub flow_algo: FA,
    pub piercer: Piercer,
    pub find_most_balanced: bool,
    pub partition: Option<Bipartition>,
    shall_terminate: Option<Arc<AtomicBool>>,
}

impl<FA: FlowAlgorithm> HyperFlowCutter<FA> {
    pub fn new(hg: FlowHypergraph, max_block_weight: NodeWeight, seed: u64) -> Self {
        let cs = CutterState::new(&hg, max_block_weight);
        let flow_algo = FA::new(&hg);
        HyperFlowCutter {
            hg,
            cs,
            flow_algo,
            piercer: Piercer::new(seed),
            find_most_balanced: true,
            partition: None,
            shall_terminate: None,
        }
    }

    pub fn set_flow_bound(&mut self, bound: Flow) {
        self.flow_algo.set_upper_flow_bound(bound);
    }

    pub fn set_termination_flag(&mut self, flag: Arc<AtomicBool>) {
        self.flow_algo.set_termination_flag(Arc::clone(&flag));
        self.shall_terminate = Some(flag);
    }

    fn is_terminated(&self) -> bool {
        self.shall_terminate
            .as_ref()
            .is_some_and(|f| f.load(Ordering::Relaxed))
    }

    /// Flips toward the lighter side and picks a piercing node from its
    /// border, falling back to the other side when the border ran dry.
    fn pierce(&mut self) -> bool {
        if self.cs.should_grow_target_side() {
            self.cs.flip_view_direction(&mut self.hg);
        }
        for _ in 0..2 {
            if let Some(choice) = self.piercer.find_piercing_node(&self.hg, &self.cs) {
                debug!(
                    "pierce {} (reachable from opposite: {})",
                    choice.node, choice.is_reachable_from_opposite_side
                );
                self.cs.pierce_node(
                    &self.hg,
                    choice.node,
                    choice.is_reachable_from_opposite_side,
                );
                return true;
            }
            self.cs.flip_view_direction(&mut self.hg);
        }
        false
    }

    fn assimilate(&mut self) {
        grow_assimilated::grow(&self.hg, &mut self.cs, self.flow_algo.scan_list_mut());
        self.cs.clean_up_border(&self.hg);
        self.cs.clean_up_cut();
        self.cs.has_cut = true;
    }

    pub fn enumerate_cuts_until_balanced_or_flow_bound_exceeded(
        &mut self,
        s: Node,
        t: Node,
    ) -> bool {
        self.enumerate_cuts_with_callback(s, t, |_, _| true)
    }

    /// Runs the piercing loop until a balanced cut below the flow bound
    /// appears. `on_cut` is invoked for every cut; returning `false`
    /// aborts (timeouts are realized this way). Returns whether a
    /// balanced cut was found; on success the partition is stored.
    pub fn enumerate_cuts_with_callback(
        &mut self,
        s: Node,
        t: Node,
        mut on_cut: impl FnMut(&CutterState<FA>, &FlowHypergraph) -> bool,
    ) -> bool {
        self.cs.initialize(&mut self.hg, s, t);

        loop {
            if self.is_terminated() {
                return false;
            }
            if self.cs.has_cut && !self.pierce() {
                return false;
            }

            let flow_may_have_changed = self.cs.augmenting_path_available_from_piercing;
            if flow_may_have_changed {
                self.cs.has_cut = self.flow_algo.exhaust_flow(&mut self.hg, &mut self.cs);
            } else {
                self.flow_algo.grow_reachable(&mut self.hg, &mut self.cs);
                self.cs.has_cut = true;
            }

            if self.cs.has_cut {
                self.assimilate();
                if flow_may_have_changed {
                    // the new flow invalidated the opposite side's
                    // reachability; rederive it so both borders are usable
                    self.cs.flip_view_direction(&mut self.hg);
                    self.flow_algo.grow_reachable(&mut self.hg, &mut self.cs);
                    self.assimilate();
                    self.cs.flip_view_direction(&mut self.hg);
                }
                debug!("{}", self.cs.state_summary(&self.hg));
                if !on_cut(&self.cs, &self.hg) {
                    return false;
                }
            }
            if self.cs.flow_value > self.flow_algo.upper_flow_bound() {
                return false;
            }
            if self.cs.has_cut && self.cs.is_balanced(&self.hg) {
                break;
            }
        }

        if self.find_most_balanced {
            self.most_balanced_cut();
        } else {
            let sol = self.cs.most_balanced_assignment(&self.hg);
            self.partition = Some(self.cs.write_partition(&mut self.hg, &sol));
        }
        true
    }

    /// Piercing inside already source-reachable territory cannot change
    /// the flow, so cuts of equal capacity are enumerated from the first
    /// balanced state, keeping the most balanced assignment seen.
    fn most_balanced_cut(&mut self) {
        debug!("most balanced cut mode");
        let total = self.hg.total_node_weight();
        let first_balanced_state = self.cs.enter_most_balanced_cut_mode();
        let initial_sol = self.cs.most_balanced_assignment(&self.hg);
        let mut best_sol = initial_sol;
        let mut best_moves: Vec<Move> = Vec::new();

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
                self.flow_algo.grow_reachable(&mut self.hg, &mut self.cs);
                self.cs.has_cut = true;
                self.assimilate();
                #[cfg(feature = "debug-checks")]
                self.cs.verify_cut_postconditions(&self.hg);

                let sim = self.cs.most_balanced_assignment(&self.hg);
                if sim.block_weight_diff < sol.block_weight_diff {
                    sol = sim;
                }
            }

            if sol.block_weight_diff < best_sol.block_weight_diff {
                best_sol = sol;
                best_moves = self.cs.tracked_moves[..sol.number_of_tracked_moves].to_vec();
            }
            self.cs
                .reset_to_first_balanced_state(&mut self.hg, &first_balanced_state);
            self.cs.has_cut = true;
        }

        self.cs.apply_moves(&mut self.hg, &best_moves);
        self.partition = Some(self.cs.write_partition(&mut self.hg, &best_sol));
    }

    fn pierce_without_augmenting(&mut self) -> bool {
        if self.cs.should_grow_target_side() {
            self.cs.flip_view_direction(&mut self.hg);
        }
        for _ in 0..2 {
            if let Some(choice) = self
                .piercer
                .find_non_augmenting_piercing_node(&self.hg, &mut self.cs)
            {
                self.cs.pierce_node(&self.hg, choice.node, false);
                return true;
            }
            self.cs.flip_view_direction(&mut self.hg);
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::HyperFlowCutter;
    use crate::algorithms::Dinic;
    use crate::algorithms::FlowAlgorithm;
    use crate::datastructure::FlowHypergraphBuilder;

    fn chain(num_nodes: usize) -> crate::datastructure::FlowHypergraph {
        let mut b = FlowHypergraphBuilder::with_nodes(num_nodes);
        for u in 0..num_nodes - 1 {
            b.start_hyperedge(1);
            b.add_pin(u);
            b.add_pin(u + 1);
        }
        b.finalize()
    }

    #[test]
    fn assimilate_without_flow_changes_is_idempotent() {
        let hg = chain(4);
        let mut hfc: HyperFlowCutter<Dinic> = HyperFlowCutter::new(hg, 2, 7);
        hfc.cs.initialize(&mut hfc.hg, 0, 3);
        let has_cut = hfc.flow_algo.exhaust_flow(&mut hfc.hg, &mut hfc.cs);
        assert!(has_cut);
        assert_eq!(hfc.cs.flow_value, 1);

        hfc.assimilate();
        let before = hfc.cs.state_summary(&hfc.hg);
        let border_before: Vec<_> = hfc.cs.border_nodes.source_side.iter().collect();

        hfc.assimilate();
        assert_eq!(hfc.cs.state_summary(&hfc.hg), before);
        let border_after: Vec<_> = hfc.cs.border_nodes.source_side.iter().collect();
        assert_eq!(border_after, border_before);
    }
}
