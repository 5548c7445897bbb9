//! Block-synchronous parallel push-relabel.
//!
//! Every round discharges all currently active nodes in parallel. Excess
//! changes are accumulated into a per-node diff with relaxed atomic adds
//! and reconciled after the round; relabels become visible in the publish
//! phase, so a discharge never observes a level committed in its own
//! round. Two pushers racing for one endpoint are ordered by a three-state
//! per-node flag moved by compare-and-swap: a pusher must win the
//! destination to `EXPECT_STABLE`, a relabeler must win itself to
//! `IS_RELABELED`. Activations are deduplicated per round.

use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicI64;
use std::sync::atomic::AtomicU32;
use std::sync::atomic::AtomicU8;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Instant;

use rayon::iter::IntoParallelIterator;
use rayon::iter::ParallelIterator;

use crate::algorithms::push_relabel::EngineStateSnapshot;
use crate::algorithms::push_relabel::Expansion;
use crate::algorithms::push_relabel::PushRelabelEngine;
use crate::algorithms::push_relabel::PushRelabelTimings;
use crate::basic_types::Flow;
use crate::basic_types::Hyperedge;
use crate::basic_types::Node;
use crate::basic_types::MAX_FLOW;
use crate::datastructure::buffered_vector::LocalBuffer;
use crate::datastructure::BufferedVector;

use crate::datastructure::FlowHypergraph;

const SOURCE_STAMP: u32 = 1;
const TARGET_STAMP: u32 = 2;

const NOT_MODIFIED: u8 = 0;
const EXPECT_STABLE: u8 = 1;
const IS_RELABELED: u8 = 2;

#[derive(Debug)]
pub struct ParallelPushRelabel {
    exp: Expansion,
    max_level: usize,
    pub flow_value: Flow,

    flow: Vec<AtomicI64>,
    excess: Vec<AtomicI64>,
    excess_diff: Vec<AtomicI64>,
    level: Vec<AtomicUsize>,
    next_level: Vec<AtomicUsize>,
    node_state: Vec<AtomicU8>,
    last_activated: Vec<AtomicU32>,
    round: u32,

    active: BufferedVector<Node>,
    next_active: BufferedVector<Node>,

    reach: Vec<u32>,
    source_reachable_stamp: u32,
    target_reachable_stamp: u32,
    running_timestamp: u32,
    relabel_queue: Vec<Node>,
    source_reachable_nodes: Vec<Node>,

    source_piercing_nodes: Vec<Node>,
    target_piercing_nodes: Vec<Node>,
    source_piercing_nodes_not_exhausted: bool,
    distance_labels_broken_from_target_side_piercing: bool,

    work_since_last_global_relabel: usize,
    global_relabel_work_threshold: usize,

    upper_flow_bound: Flow,
    shall_terminate: Option<Arc<AtomicBool>>,
    timings: PushRelabelTimings,
}

impl ParallelPushRelabel {
    fn is_source(&self, u: Node) -> bool {
        self.reach[u] == SOURCE_STAMP
    }

    fn is_target(&self, u: Node) -> bool {
        self.reach[u] == TARGET_STAMP
    }

    fn is_terminated(&self) -> bool {
        self.shall_terminate
            .as_ref()
            .is_some_and(|f| f.load(Ordering::Relaxed))
    }

    fn f(&self, slot: usize) -> Flow {
        self.flow[slot].load(Ordering::Relaxed)
    }

    fn lvl(&self, u: Node) -> usize {
        self.level[u].load(Ordering::Relaxed)
    }

    fn update_node_state(&self, u: Node, desired: u8) -> bool {
        self.node_state[u].load(Ordering::Relaxed) == desired
            || self.node_state[u]
                .compare_exchange(NOT_MODIFIED, desired, Ordering::AcqRel, Ordering::Relaxed)
                .is_ok()
    }

    fn activate(&self, u: Node) -> bool {
        let round = self.round;
        self.last_activated[u].load(Ordering::Relaxed) != round
            && self.last_activated[u].swap(round, Ordering::AcqRel) != round
    }

    fn push_activated(&self, buf: &mut LocalBuffer<'_, Node>, v: Node) {
        if !self.is_target(v) && self.activate(v) {
            buf.push_back(v);
        }
    }

    fn saturate_source_edges(&mut self, hg: &FlowHypergraph) {
        let start = Instant::now();
        self.bump_round();
        self.next_active.clear();
        for u in 0..self.max_level {
            if *self.excess[u].get_mut() > 0 && !self.is_source(u) && !self.is_target(u) {
                let _ = self.activate(u);
                self.next_active.push_back(u);
            }
        }

        if self.source_piercing_nodes_not_exhausted {
            for i in 0..self.source_piercing_nodes.len() {
                let source = self.source_piercing_nodes[i];
                for inc_iter in hg.incident_hyperedge_indices(source) {
                    let e = hg.get_in_he(inc_iter).e;
                    let e_in = self.exp.edge_to_in_node(e);
                    let e_out = self.exp.edge_to_out_node(e);
                    if !self.is_source(e_in) {
                        let j = self.exp.in_node_incidence_index(inc_iter);
                        let d = hg.capacity(e) - *self.flow[j].get_mut();
                        if d > 0 {
                            *self.excess[source].get_mut() -= d;
                            *self.excess[e_in].get_mut() += d;
                            *self.flow[j].get_mut() += d;
                            if self.activate(e_in) {
                                self.next_active.push_back(e_in);
                            }
                        }
                    }
                    if !self.is_source(e_out) {
                        let j = self.exp.out_node_incidence_index(inc_iter);
                        let d = *self.flow[j].get_mut();
                        if d > 0 {
                            *self.excess[source].get_mut() -= d;
                            *self.excess[e_out].get_mut() += d;
                            *self.flow[j].get_mut() -= d;
                            if self.activate(e_out) {
                                self.next_active.push_back(e_out);
                            }
                        }
                    }
                }
            }
            self.source_piercing_nodes_not_exhausted = false;
        }
        self.timings.saturate += start.elapsed().as_secs_f64();
    }

    fn bump_round(&mut self) {
        self.round = self.round.wrapping_add(1);
        if self.round == 0 {
            for a in &mut self.last_activated {
                *a.get_mut() = 0;
            }
            self.round = 1;
        }
    }

    fn discharge_active_nodes(&mut self, hg: &FlowHypergraph, num_active: usize) {
        let start = Instant::now();
        self.bump_round();
        self.next_active.clear();
        let this = &*self;
        let work: usize = (0..num_active)
            .into_par_iter()
            .map_init(
                || this.next_active.local_buffer(),
                |buf, i| {
                    let u = this.active.get(i);
                    debug_assert!(this.excess[u].load(Ordering::Relaxed) > 0);
                    if this.lvl(u) >= this.max_level {
                        return 0;
                    }
                    if this.exp.is_hypernode(u) {
                        this.discharge_hypernode(hg, u, buf)
                    } else if this.exp.is_out_node(u) {
                        this.discharge_out_node(hg, u, buf)
                    } else {
                        this.discharge_in_node(hg, u, buf)
                    }
                },
            )
            .sum();
        self.work_since_last_global_relabel += work;
        self.timings.discharge += start.elapsed().as_secs_f64();
    }

    fn apply_updates(&mut self, num_active: usize) {
        let start = Instant::now();
        let this = &*self;
        (0..num_active).into_par_iter().for_each(|i| {
            let u = this.active.get(i);
            if this.lvl(u) >= this.max_level {
                debug_assert_eq!(this.excess_diff[u].load(Ordering::Relaxed), 0);
                return;
            }
            this.level[u].store(this.next_level[u].load(Ordering::Relaxed), Ordering::Relaxed);
            let d = this.excess_diff[u].swap(0, Ordering::Relaxed);
            let _ = this.excess[u].fetch_add(d, Ordering::Relaxed);
            this.node_state[u].store(NOT_MODIFIED, Ordering::Release);
        });
        (0..self.next_active.len()).into_par_iter().for_each(|i| {
            let u = this.next_active.get(i);
            debug_assert_eq!(this.node_state[u].load(Ordering::Relaxed), NOT_MODIFIED);
            let d = this.excess_diff[u].swap(0, Ordering::Relaxed);
            let _ = this.excess[u].fetch_add(d, Ordering::Relaxed);
        });

        // target excess is never discharged, it is banked as flow
        for i in 0..self.target_piercing_nodes.len() {
            let t = self.target_piercing_nodes[i];
            self.flow_value += self.excess_diff[t].swap(0, Ordering::Relaxed);
        }
        self.timings.update += start.elapsed().as_secs_f64();
    }

    fn discharge_hypernode(
        &self,
        hg: &FlowHypergraph,
        u: Node,
        buf: &mut LocalBuffer<'_, Node>,
    ) -> usize {
        let mut work = 0;
        let mut my_excess = self.excess[u].load(Ordering::Relaxed);
        let mut my_level = self.lvl(u);

        while my_excess > 0 && my_level < self.max_level {
            let mut new_level = self.max_level;
            let mut skipped = false;

            // push to in-nodes of incident nets
            let mut i = hg.begin_index_hyperedges(u);
            while my_excess > 0 && i < hg.end_index_hyperedges(u) {
                let e = hg.get_in_he(i).e;
                let e_in = self.exp.edge_to_in_node(e);
                let j = self.exp.in_node_incidence_index(i);
                let d = my_excess.min(hg.capacity(e) - self.f(j));
                if my_level == self.lvl(e_in) + 1 && d > 0 {
                    if self.excess[e_in].load(Ordering::Relaxed) == 0
                        || self.update_node_state(e_in, EXPECT_STABLE)
                    {
                        let _ = self.flow[j].fetch_add(d, Ordering::Relaxed);
                        my_excess -= d;
                        let _ = self.excess_diff[e_in].fetch_add(d, Ordering::Relaxed);
                        self.push_activated(buf, e_in);
                    } else {
                        skipped = true;
                    }
                } else if my_level <= self.lvl(e_in) && d > 0 {
                    new_level = new_level.min(self.lvl(e_in));
                }
                i += 1;
            }
            work += i - hg.begin_index_hyperedges(u);
            if my_excess == 0 {
                break;
            }

            // push back to out-nodes of incident nets
            let mut i = hg.begin_index_hyperedges(u);
            while my_excess > 0 && i < hg.end_index_hyperedges(u) {
                let e = hg.get_in_he(i).e;
                let e_out = self.exp.edge_to_out_node(e);
                let j = self.exp.out_node_incidence_index(i);
                let d = my_excess.min(self.f(j));
                if my_level == self.lvl(e_out) + 1 && d > 0 {
                    if self.excess[e_out].load(Ordering::Relaxed) == 0
                        || self.update_node_state(e_out, EXPECT_STABLE)
                    {
                        let _ = self.flow[j].fetch_sub(d, Ordering::Relaxed);
                        my_excess -= d;
                        let _ = self.excess_diff[e_out].fetch_add(d, Ordering::Relaxed);
                        self.push_activated(buf, e_out);
                    } else {
                        skipped = true;
                    }
                } else if my_level <= self.lvl(e_out) && self.f(j) > 0 {
                    new_level = new_level.min(self.lvl(e_out));
                }
                i += 1;
            }
            work += i - hg.begin_index_hyperedges(u);

            if my_excess == 0 || skipped {
                break;
            }
            if self.update_node_state(u, IS_RELABELED) {
                my_level = new_level + 1;
            } else {
                break;
            }
        }

        self.next_level[u].store(my_level, Ordering::Relaxed);
        if my_level < self.max_level && my_excess > 0 {
            self.push_activated(buf, u);
        }
        let spent = self.excess[u].load(Ordering::Relaxed) - my_excess;
        let _ = self.excess_diff[u].fetch_sub(spent, Ordering::Relaxed);
        work
    }

    fn discharge_in_node(
        &self,
        hg: &FlowHypergraph,
        e_in: Node,
        buf: &mut LocalBuffer<'_, Node>,
    ) -> usize {
        let mut work = 0;
        let mut my_excess = self.excess[e_in].load(Ordering::Relaxed);
        let mut my_level = self.lvl(e_in);
        let e = self.exp.in_node_to_edge(e_in);
        let e_out = self.exp.edge_to_out_node(e);
        let bridge = self.exp.bridge_edge_index(e);
        self.next_level[e_in].store(my_level, Ordering::Relaxed);

        while my_excess > 0 && my_level < self.max_level {
            let mut new_level = self.max_level;
            let mut skipped = false;

            // push through the bridge arc
            let d = (hg.capacity(e) - self.f(bridge)).min(my_excess);
            if my_level == self.lvl(e_out) + 1 && d > 0 {
                if self.excess[e_out].load(Ordering::Relaxed) == 0
                    || self.update_node_state(e_out, EXPECT_STABLE)
                {
                    let _ = self.flow[bridge].fetch_add(d, Ordering::Relaxed);
                    my_excess -= d;
                    let _ = self.excess_diff[e_out].fetch_add(d, Ordering::Relaxed);
                    self.push_activated(buf, e_out);
                } else {
                    skipped = true;
                }
                work += 1;
            } else if my_level <= self.lvl(e_out) && self.f(bridge) < hg.capacity(e) {
                new_level = new_level.min(self.lvl(e_out));
            }

            // push back to pins
            for p in hg.pins_of(e) {
                if my_excess == 0 {
                    break;
                }
                let v = p.pin;
                let j = self.exp.in_node_incidence_index(p.he_inc_iter);
                let d = self.f(j);
                if my_level == self.lvl(v) + 1 && d > 0 {
                    if self.excess[v].load(Ordering::Relaxed) == 0
                        || self.update_node_state(v, EXPECT_STABLE)
                    {
                        let d = d.min(my_excess);
                        let _ = self.flow[j].fetch_sub(d, Ordering::Relaxed);
                        my_excess -= d;
                        let _ = self.excess_diff[v].fetch_add(d, Ordering::Relaxed);
                        self.push_activated(buf, v);
                    } else {
                        skipped = true;
                    }
                } else if d > 0 && my_level <= self.lvl(v) {
                    new_level = new_level.min(self.lvl(v));
                }
                work += 1;
            }

            if my_excess == 0 || skipped {
                break;
            }
            if self.update_node_state(e_in, IS_RELABELED) {
                my_level = new_level + 1;
            } else {
                break;
            }
        }

        self.next_level[e_in].store(my_level, Ordering::Relaxed);
        if my_level < self.max_level && my_excess > 0 {
            self.push_activated(buf, e_in);
        }
        let spent = self.excess[e_in].load(Ordering::Relaxed) - my_excess;
        let _ = self.excess_diff[e_in].fetch_sub(spent, Ordering::Relaxed);
        work
    }

    fn discharge_out_node(
        &self,
        hg: &FlowHypergraph,
        e_out: Node,
        buf: &mut LocalBuffer<'_, Node>,
    ) -> usize {
        let mut work = 0;
        let mut my_excess = self.excess[e_out].load(Ordering::Relaxed);
        let mut my_level = self.lvl(e_out);
        let e = self.exp.out_node_to_edge(e_out);
        let e_in = self.exp.edge_to_in_node(e);
        let bridge = self.exp.bridge_edge_index(e);
        debug_assert!(my_excess <= hg.capacity(e));

        while my_excess > 0 && my_level < self.max_level {
            let mut new_level = self.max_level;
            let mut skipped = false;

            // push out to pins
            for p in hg.pins_of(e) {
                if my_excess == 0 {
                    break;
                }
                let v = p.pin;
                let d = my_excess;
                if my_level == self.lvl(v) + 1 {
                    if self.excess[v].load(Ordering::Relaxed) == 0
                        || self.update_node_state(v, EXPECT_STABLE)
                    {
                        let j = self.exp.out_node_incidence_index(p.he_inc_iter);
                        let _ = self.flow[j].fetch_add(d, Ordering::Relaxed);
                        my_excess -= d;
                        let _ = self.excess_diff[v].fetch_add(d, Ordering::Relaxed);
                        self.push_activated(buf, v);
                    } else {
                        skipped = true;
                    }
                } else if my_level <= self.lvl(v) {
                    new_level = new_level.min(self.lvl(v));
                }
                work += 1;
            }

            if my_excess == 0 {
                break;
            }

            // push back through the bridge arc
            let d = self.f(bridge).min(my_excess);
            if my_level == self.lvl(e_in) + 1 && d > 0 {
                if self.excess[e_in].load(Ordering::Relaxed) == 0
                    || self.update_node_state(e_in, EXPECT_STABLE)
                {
                    let _ = self.flow[bridge].fetch_sub(d, Ordering::Relaxed);
                    my_excess -= d;
                    let _ = self.excess_diff[e_in].fetch_add(d, Ordering::Relaxed);
                    self.push_activated(buf, e_in);
                    work += 1;
                } else {
                    skipped = true;
                }
            } else if my_level <= self.lvl(e_in) && self.f(bridge) > 0 {
                new_level = new_level.min(self.lvl(e_in));
            }

            if my_excess == 0 || skipped {
                break;
            }
            if self.update_node_state(e_out, IS_RELABELED) {
                my_level = new_level + 1;
            } else {
                break;
            }
        }

        self.next_level[e_out].store(my_level, Ordering::Relaxed);
        if my_level < self.max_level && my_excess > 0 {
            self.push_activated(buf, e_out);
        }
        let spent = self.excess[e_out].load(Ordering::Relaxed) - my_excess;
        let _ = self.excess_diff[e_out].fetch_sub(spent, Ordering::Relaxed);
        work
    }

    /// Level-synchronous parallel reverse BFS from the target piercing
    /// nodes, assigning exact distances.
    fn global_relabel(&mut self, hg: &FlowHypergraph) {
        let start = Instant::now();
        let max_level = self.max_level;
        {
            let this = &*self;
            (0..max_level).into_par_iter().for_each(|i| {
                this.level[i].store(max_level, Ordering::Relaxed);
            });
        }

        self.next_active.clear();
        for i in 0..self.target_piercing_nodes.len() {
            let t = self.target_piercing_nodes[i];
            self.next_active.push_back(t);
            *self.level[t].get_mut() = 0;
        }

        let mut dist = 1usize;
        let mut first = 0usize;
        let mut last = self.next_active.len();
        while first != last {
            let this = &*self;
            (first..last).into_par_iter().for_each_init(
                || this.next_active.local_buffer(),
                |buf, i| {
                    let u = this.next_active.get(i);
                    let mut push = |v: Node| {
                        if !this.is_source(v)
                            && !this.is_target(v)
                            && this.lvl(v) == max_level
                            && this.level[v].swap(dist, Ordering::AcqRel) == max_level
                        {
                            buf.push_back(v);
                        }
                    };
                    if this.exp.is_hypernode(u) {
                        for inc in hg.incident_hyperedge_indices(u) {
                            let e = hg.get_in_he(inc).e;
                            if this.f(this.exp.in_node_incidence_index(inc)) > 0 {
                                push(this.exp.edge_to_in_node(e));
                            }
                            push(this.exp.edge_to_out_node(e));
                        }
                    } else if this.exp.is_out_node(u) {
                        let e = this.exp.out_node_to_edge(u);
                        if this.f(this.exp.bridge_edge_index(e)) < hg.capacity(e) {
                            push(this.exp.edge_to_in_node(e));
                        }
                        for p in hg.pins_of(e) {
                            if this.f(this.exp.out_node_incidence_index(p.he_inc_iter)) > 0 {
                                push(p.pin);
                            }
                        }
                    } else {
                        let e = this.exp.in_node_to_edge(u);
                        if this.f(this.exp.bridge_edge_index(e)) > 0 {
                            push(this.exp.edge_to_out_node(e));
                        }
                        for p in hg.pins_of(e) {
                            if this.f(this.exp.in_node_incidence_index(p.he_inc_iter))
                                < hg.capacity(e)
                            {
                                push(p.pin);
                            }
                        }
                    }
                },
            );
            first = last;
            last = self.next_active.len();
            dist += 1;
        }

        self.work_since_last_global_relabel = 0;
        self.distance_labels_broken_from_target_side_piercing = false;
        self.timings.global_relabel += start.elapsed().as_secs_f64();
    }

    fn reset_reachability(&mut self, forward: bool) {
        self.running_timestamp += 1;
        if self.running_timestamp == 0 {
            self.reach.iter_mut().for_each(|r| {
                if *r > TARGET_STAMP {
                    *r = 0;
                }
            });
            self.running_timestamp = TARGET_STAMP + 1;
        }
        if forward {
            self.source_reachable_stamp = self.running_timestamp;
        } else {
            self.target_reachable_stamp = self.running_timestamp;
        }
    }

    fn scan_forward(&mut self, hg: &FlowHypergraph, u: Node, mut push: impl FnMut(&mut Self, Node)) {
        let exp = self.exp;
        if exp.is_hypernode(u) {
            for inc in hg.incident_hyperedge_indices(u) {
                let e = hg.get_in_he(inc).e;
                push(self, exp.edge_to_in_node(e));
                if self.f(exp.out_node_incidence_index(inc)) > 0 {
                    push(self, exp.edge_to_out_node(e));
                }
            }
        } else if exp.is_out_node(u) {
            let e = exp.out_node_to_edge(u);
            if self.f(exp.bridge_edge_index(e)) > 0 {
                push(self, exp.edge_to_in_node(e));
            }
            for p in hg.pins_of(e) {
                push(self, p.pin);
            }
        } else {
            let e = exp.in_node_to_edge(u);
            if self.f(exp.bridge_edge_index(e)) < hg.capacity(e) {
                push(self, exp.edge_to_out_node(e));
            }
            for p in hg.pins_of(e) {
                if self.f(exp.in_node_incidence_index(p.he_inc_iter)) > 0 {
                    push(self, p.pin);
                }
            }
        }
    }

    fn scan_backward(
        &mut self,
        hg: &FlowHypergraph,
        u: Node,
        mut push: impl FnMut(&mut Self, Node),
    ) {
        let exp = self.exp;
        if exp.is_hypernode(u) {
            for inc in hg.incident_hyperedge_indices(u) {
                let e = hg.get_in_he(inc).e;
                if self.f(exp.in_node_incidence_index(inc)) > 0 {
                    push(self, exp.edge_to_in_node(e));
                }
                push(self, exp.edge_to_out_node(e));
            }
        } else if exp.is_out_node(u) {
            let e = exp.out_node_to_edge(u);
            if self.f(exp.bridge_edge_index(e)) < hg.capacity(e) {
                push(self, exp.edge_to_in_node(e));
            }
            for p in hg.pins_of(e) {
                if self.f(exp.out_node_incidence_index(p.he_inc_iter)) > 0 {
                    push(self, p.pin);
                }
            }
        } else {
            let e = exp.in_node_to_edge(u);
            if self.f(exp.bridge_edge_index(e)) > 0 {
                push(self, exp.edge_to_out_node(e));
            }
            for p in hg.pins_of(e) {
                if self.f(exp.in_node_incidence_index(p.he_inc_iter)) < hg.capacity(e) {
                    push(self, p.pin);
                }
            }
        }
    }
}

impl PushRelabelEngine for ParallelPushRelabel {
    const NAME: &'static str = "ParallelPushRelabel";

    fn new(hg: &FlowHypergraph) -> Self {
        let mut this = ParallelPushRelabel {
            exp: Expansion::default(),
            max_level: 0,
            flow_value: 0,
            flow: Vec::new(),
            excess: Vec::new(),
            excess_diff: Vec::new(),
            level: Vec::new(),
            next_level: Vec::new(),
            node_state: Vec::new(),
            last_activated: Vec::new(),
            round: 0,
            active: BufferedVector::new(0),
            next_active: BufferedVector::new(0),
            reach: Vec::new(),
            // unmatchable until the first derive opens a fresh stamp
            source_reachable_stamp: u32::MAX,
            target_reachable_stamp: u32::MAX,
            running_timestamp: TARGET_STAMP,
            relabel_queue: Vec::new(),
            source_reachable_nodes: Vec::new(),
            source_piercing_nodes: Vec::new(),
            target_piercing_nodes: Vec::new(),
            source_piercing_nodes_not_exhausted: true,
            distance_labels_broken_from_target_side_piercing: true,
            work_since_last_global_relabel: usize::MAX,
            global_relabel_work_threshold: 0,
            upper_flow_bound: MAX_FLOW,
            shall_terminate: None,
            timings: PushRelabelTimings::default(),
        };
        this.reset(hg);
        this
    }

    fn reset(&mut self, hg: &FlowHypergraph) {
        self.exp = Expansion::new(hg);
        self.max_level = self.exp.max_level();
        self.flow_value = 0;
        self.flow = (0..self.exp.num_flow_slots()).map(|_| AtomicI64::new(0)).collect();
        self.excess = (0..self.max_level).map(|_| AtomicI64::new(0)).collect();
        self.excess_diff = (0..self.max_level).map(|_| AtomicI64::new(0)).collect();
        self.level = (0..self.max_level).map(|_| AtomicUsize::new(0)).collect();
        self.next_level = (0..self.max_level).map(|_| AtomicUsize::new(0)).collect();
        self.node_state = (0..self.max_level).map(|_| AtomicU8::new(NOT_MODIFIED)).collect();
        self.last_activated = (0..self.max_level).map(|_| AtomicU32::new(0)).collect();
        self.round = 0;
        self.active = BufferedVector::new(self.max_level);
        self.next_active = BufferedVector::new(self.max_level);
        self.reach = vec![0; self.max_level];
        self.running_timestamp = TARGET_STAMP;
        self.source_reachable_stamp = u32::MAX;
        self.target_reachable_stamp = u32::MAX;
        self.relabel_queue.clear();
        self.source_reachable_nodes.clear();
        self.source_piercing_nodes.clear();
        self.target_piercing_nodes.clear();
        self.source_piercing_nodes_not_exhausted = true;
        self.distance_labels_broken_from_target_side_piercing = true;
        self.work_since_last_global_relabel = usize::MAX;
        self.global_relabel_work_threshold = self.exp.global_relabel_work_threshold();
        self.timings = PushRelabelTimings::default();
    }

    fn pierce(&mut self, _hg: &FlowHypergraph, u: Node, source_side: bool) {
        if source_side {
            self.reach[u] = SOURCE_STAMP;
            *self.level[u].get_mut() = self.max_level;
            self.source_piercing_nodes.push(u);
            self.source_piercing_nodes_not_exhausted = true;
        } else {
            self.reach[u] = TARGET_STAMP;
            *self.level[u].get_mut() = 0;
            self.target_piercing_nodes.push(u);
            self.flow_value += self.excess[u].swap(0, Ordering::Relaxed);
            self.distance_labels_broken_from_target_side_piercing = true;
        }
    }

    fn find_min_cuts(&mut self, hg: &FlowHypergraph) -> bool {
        self.saturate_source_edges(hg);
        if self.distance_labels_broken_from_target_side_piercing {
            // forces a global relabel in the first round, after the active
            // set was swapped out of the relabel scratch space
            self.work_since_last_global_relabel = usize::MAX;
        }

        // saturation seeded next_active directly
        while !self.next_active.is_empty() {
            if self.flow_value > self.upper_flow_bound || self.is_terminated() {
                return false;
            }
            let num_active = self.next_active.len();
            self.next_active.swap_container(&mut self.active);
            if self.work_since_last_global_relabel > 2 * self.global_relabel_work_threshold {
                self.global_relabel(hg);
            }
            self.discharge_active_nodes(hg, num_active);
            self.apply_updates(num_active);
        }
        if self.flow_value > self.upper_flow_bound {
            return false;
        }

        self.derive_source_side_cut(hg, true);
        self.derive_target_side_cut(hg);
        true
    }

    fn derive_source_side_cut(&mut self, hg: &FlowHypergraph, flow_changed: bool) {
        let start = Instant::now();
        self.source_reachable_nodes.clear();
        if flow_changed {
            self.reset_reachability(true);
            for u in 0..self.max_level {
                if !self.is_source(u)
                    && !self.is_target(u)
                    && self.excess[u].load(Ordering::Relaxed) > 0
                {
                    self.source_reachable_nodes.push(u);
                    self.reach[u] = self.source_reachable_stamp;
                }
            }
        }
        for i in 0..self.source_piercing_nodes.len() {
            self.source_reachable_nodes.push(self.source_piercing_nodes[i]);
        }

        let mut first = 0;
        let mut last = self.source_reachable_nodes.len();
        while first != last {
            for idx in first..last {
                let u = self.source_reachable_nodes[idx];
                let mut scratch = std::mem::take(&mut self.source_reachable_nodes);
                self.scan_forward(hg, u, |this, v| {
                    debug_assert!(!this.is_target(v));
                    if !this.is_source_reachable(v) {
                        this.reach[v] = this.source_reachable_stamp;
                        scratch.push(v);
                    }
                });
                self.source_reachable_nodes = scratch;
            }
            first = last;
            last = self.source_reachable_nodes.len();
        }
        self.timings.source_cut += start.elapsed().as_secs_f64();
    }

    fn derive_target_side_cut(&mut self, hg: &FlowHypergraph) {
        self.relabel_queue.clear();
        self.reset_reachability(false);
        for i in 0..self.target_piercing_nodes.len() {
            self.relabel_queue.push(self.target_piercing_nodes[i]);
        }

        let mut first = 0;
        let mut last = self.relabel_queue.len();
        while first != last {
            for idx in first..last {
                let u = self.relabel_queue[idx];
                let mut scratch = std::mem::take(&mut self.relabel_queue);
                self.scan_backward(hg, u, |this, v| {
                    debug_assert!(!this.is_source_reachable(v));
                    if !this.is_target_reachable(v) {
                        this.reach[v] = this.target_reachable_stamp;
                        scratch.push(v);
                    }
                });
                self.relabel_queue = scratch;
            }
            first = last;
            last = self.relabel_queue.len();
        }
    }

    fn source_reachable_nodes(&self) -> &[Node] {
        &self.source_reachable_nodes
    }

    fn target_reachable_nodes(&self) -> &[Node] {
        &self.relabel_queue
    }

    fn is_source_reachable(&self, u: Node) -> bool {
        self.is_source(u) || self.reach[u] == self.source_reachable_stamp
    }

    fn is_target_reachable(&self, u: Node) -> bool {
        self.is_target(u) || self.reach[u] == self.target_reachable_stamp
    }

    fn flow_value(&self) -> Flow {
        self.flow_value
    }

    fn flow_on_bridge(&self, e: Hyperedge) -> Flow {
        self.f(self.exp.bridge_edge_index(e))
    }

    fn expansion(&self) -> Expansion {
        self.exp
    }

    fn save_state(&self) -> EngineStateSnapshot {
        EngineStateSnapshot {
            reach: self.reach.clone(),
            source_reachable_stamp: self.source_reachable_stamp,
            target_reachable_stamp: self.target_reachable_stamp,
            running_timestamp: self.running_timestamp,
            source_piercing_nodes: self.source_piercing_nodes.clone(),
            target_piercing_nodes: self.target_piercing_nodes.clone(),
            source_reachable_nodes: self.source_reachable_nodes.clone(),
            target_reachable_nodes: self.relabel_queue.clone(),
            source_piercing_nodes_not_exhausted: self.source_piercing_nodes_not_exhausted,
            distance_labels_broken_from_target_side_piercing: self
                .distance_labels_broken_from_target_side_piercing,
        }
    }

    fn restore_state(&mut self, snapshot: &EngineStateSnapshot) {
        self.reach.clone_from(&snapshot.reach);
        self.source_reachable_stamp = snapshot.source_reachable_stamp;
        self.target_reachable_stamp = snapshot.target_reachable_stamp;
        self.running_timestamp = snapshot.running_timestamp;
        self.source_piercing_nodes.clone_from(&snapshot.source_piercing_nodes);
        self.target_piercing_nodes.clone_from(&snapshot.target_piercing_nodes);
        self.source_reachable_nodes.clone_from(&snapshot.source_reachable_nodes);
        self.relabel_queue.clone_from(&snapshot.target_reachable_nodes);
        self.source_piercing_nodes_not_exhausted = snapshot.source_piercing_nodes_not_exhausted;
        self.distance_labels_broken_from_target_side_piercing =
            snapshot.distance_labels_broken_from_target_side_piercing;
    }

    fn upper_flow_bound(&self) -> Flow {
        self.upper_flow_bound
    }

    fn set_upper_flow_bound(&mut self, bound: Flow) {
        self.upper_flow_bound = bound;
    }

    fn set_termination_flag(&mut self, flag: Arc<AtomicBool>) {
        self.shall_terminate = Some(flag);
    }

    fn timings(&self) -> PushRelabelTimings {
        self.timings
    }
}
