//! Sequential FIFO push-relabel on the hyperedge expansion.
//!
//! Discharging comes in three flavors depending on whether the node is a
//! hypernode, an in-node or an out-node, each enumerating its own arc
//! structure. Global relabeling recomputes exact distances to the target
//! by reverse BFS whenever the accumulated discharge work crosses the
//! threshold, and unconditionally after target-side piercing broke the
//! labels.

use std::collections::VecDeque;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Instant;

use log::debug;

use crate::algorithms::push_relabel::EngineStateSnapshot;
use crate::algorithms::push_relabel::Expansion;
use crate::algorithms::push_relabel::PushRelabelEngine;
use crate::algorithms::push_relabel::PushRelabelTimings;
use crate::basic_types::Flow;
use crate::basic_types::Hyperedge;
use crate::basic_types::Node;
use crate::basic_types::MAX_FLOW;
use crate::datastructure::FlowHypergraph;

const SOURCE_STAMP: u32 = 1;
const TARGET_STAMP: u32 = 2;

#[derive(Debug)]
pub struct SequentialPushRelabel {
    exp: Expansion,
    pub flow_value: Flow,
    flow: Vec<Flow>,
    excess: Vec<Flow>,
    level: Vec<usize>,
    max_level: usize,

    reach: Vec<u32>,
    source_reachable_stamp: u32,
    target_reachable_stamp: u32,
    running_timestamp: u32,

    active: VecDeque<Node>,
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

impl SequentialPushRelabel {
    fn is_source(&self, u: Node) -> bool {
        self.reach[u] == SOURCE_STAMP
    }

    fn is_target(&self, u: Node) -> bool {
        self.reach[u] == TARGET_STAMP
    }

    fn make_source(&mut self, u: Node) {
        self.reach[u] = SOURCE_STAMP;
        self.level[u] = self.max_level;
    }

    fn make_target(&mut self, u: Node) {
        self.reach[u] = TARGET_STAMP;
        self.level[u] = 0;
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

    fn is_terminated(&self) -> bool {
        self.shall_terminate
            .as_ref()
            .is_some_and(|f| f.load(Ordering::Relaxed))
    }

    fn push_active(&mut self, v: Node) {
        if !self.is_target(v) && self.excess[v] == 0 {
            self.active.push_back(v);
        }
    }

    /// Saturates the arcs of fresh source piercing nodes: the incoming
    /// pin arc to capacity, plus pulling back any flow those nodes still
    /// receive from the out-node.
    fn saturate_source_edges(&mut self, hg: &FlowHypergraph) {
        let start = Instant::now();
        self.active.clear();
        for u in 0..self.max_level {
            if self.excess[u] > 0 && !self.is_source(u) && !self.is_target(u) {
                self.active.push_back(u);
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
                        let d = hg.capacity(e) - self.flow[j];
                        if d > 0 {
                            self.excess[source] -= d;
                            self.push_active(e_in);
                            self.excess[e_in] += d;
                            self.flow[j] += d;
                        }
                        debug_assert_eq!(self.flow[j], hg.capacity(e));
                    }
                    if !self.is_source(e_out) {
                        let j = self.exp.out_node_incidence_index(inc_iter);
                        let d = self.flow[j];
                        if d > 0 {
                            self.excess[source] -= d;
                            self.push_active(e_out);
                            self.excess[e_out] += d;
                            self.flow[j] -= d;
                        }
                    }
                }
            }
            self.source_piercing_nodes_not_exhausted = false;
        }
        self.timings.saturate += start.elapsed().as_secs_f64();
    }

    fn discharge_hypernode(&mut self, hg: &FlowHypergraph, u: Node) -> usize {
        let mut work = 0;
        let mut my_excess = self.excess[u];
        let mut my_level = self.level[u];

        while my_excess > 0 && my_level < self.max_level {
            let mut new_level = self.max_level;

            // push to in-nodes of incident nets
            let mut i = hg.begin_index_hyperedges(u);
            while my_excess > 0 && i < hg.end_index_hyperedges(u) {
                let e = hg.get_in_he(i).e;
                let e_in = self.exp.edge_to_in_node(e);
                let j = self.exp.in_node_incidence_index(i);
                // (u, e_in) never usefully carries more than c(e)
                let d = my_excess.min(hg.capacity(e) - self.flow[j]);
                if my_level == self.level[e_in] + 1 {
                    if d > 0 {
                        self.flow[j] += d;
                        my_excess -= d;
                        if self.is_target(e_in) {
                            self.flow_value += d;
                        } else if self.excess[e_in] == 0 {
                            self.active.push_back(e_in);
                        }
                        self.excess[e_in] += d;
                    }
                } else if my_level <= self.level[e_in] && d > 0 {
                    new_level = new_level.min(self.level[e_in]);
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
                if my_level == self.level[e_out] + 1 {
                    debug_assert!(self.flow[j] <= hg.capacity(e));
                    let d = my_excess.min(self.flow[j]);
                    if d > 0 {
                        self.flow[j] -= d;
                        my_excess -= d;
                        if self.is_target(e_out) {
                            self.flow_value += d;
                        } else if self.excess[e_out] == 0 {
                            self.active.push_back(e_out);
                        }
                        self.excess[e_out] += d;
                    }
                } else if my_level <= self.level[e_out] && self.flow[j] > 0 {
                    new_level = new_level.min(self.level[e_out]);
                }
                i += 1;
            }
            work += i - hg.begin_index_hyperedges(u);

            if my_excess == 0 {
                break;
            }
            my_level = new_level + 1; // relabel
        }

        self.level[u] = my_level; // make the relabel visible
        if my_level < self.max_level && my_excess > 0 {
            self.active.push_back(u);
        }
        self.excess[u] = my_excess;
        work
    }

    fn discharge_in_node(&mut self, hg: &FlowHypergraph, e_in: Node) -> usize {
        let mut work = 0;
        let mut my_excess = self.excess[e_in];
        let mut my_level = self.level[e_in];
        let e = self.exp.in_node_to_edge(e_in);
        let e_out = self.exp.edge_to_out_node(e);
        let bridge = self.exp.bridge_edge_index(e);

        while my_excess > 0 && my_level < self.max_level {
            let mut new_level = self.max_level;

            // push through the bridge arc
            if my_level == self.level[e_out] + 1 {
                let d = (hg.capacity(e) - self.flow[bridge]).min(my_excess);
                if d > 0 {
                    self.flow[bridge] += d;
                    my_excess -= d;
                    if self.is_target(e_out) {
                        self.flow_value += d;
                    } else if self.excess[e_out] == 0 {
                        self.active.push_back(e_out);
                    }
                    self.excess[e_out] += d;
                }
            } else if my_level <= self.level[e_out] && self.flow[bridge] < hg.capacity(e) {
                new_level = new_level.min(self.level[e_out]);
            }

            // push back to pins
            for p in hg.pins_of(e) {
                if my_excess == 0 {
                    break;
                }
                let v = p.pin;
                let j = self.exp.in_node_incidence_index(p.he_inc_iter);
                let mut d = self.flow[j];
                debug_assert!(d <= hg.capacity(e));
                if my_level == self.level[v] + 1 {
                    if d > 0 {
                        d = d.min(my_excess);
                        self.flow[j] -= d;
                        my_excess -= d;
                        if self.is_target(v) {
                            self.flow_value += d;
                        } else if self.excess[v] == 0 {
                            self.active.push_back(v);
                        }
                        self.excess[v] += d;
                    }
                } else if my_level <= self.level[v] && d > 0 {
                    new_level = new_level.min(self.level[v]);
                }
            }
            work += hg.pin_count(e) + 6;

            if my_excess == 0 {
                break;
            }
            my_level = new_level + 1;
        }

        self.level[e_in] = my_level;
        if my_level < self.max_level && my_excess > 0 {
            self.active.push_back(e_in);
        }
        self.excess[e_in] = my_excess;
        work
    }

    fn discharge_out_node(&mut self, hg: &FlowHypergraph, e_out: Node) -> usize {
        let mut work = 0;
        let mut my_excess = self.excess[e_out];
        let mut my_level = self.level[e_out];
        let e = self.exp.out_node_to_edge(e_out);
        let e_in = self.exp.edge_to_in_node(e);
        let bridge = self.exp.bridge_edge_index(e);
        debug_assert!(my_excess <= hg.capacity(e));

        while my_excess > 0 && my_level < self.max_level {
            let mut new_level = self.max_level;

            // push out to pins
            for p in hg.pins_of(e) {
                if my_excess == 0 {
                    break;
                }
                let v = p.pin;
                let d = my_excess;
                if my_level == self.level[v] + 1 {
                    let j = self.exp.out_node_incidence_index(p.he_inc_iter);
                    self.flow[j] += d;
                    my_excess -= d;
                    if self.is_target(v) {
                        self.flow_value += d;
                    } else if self.excess[v] == 0 {
                        self.active.push_back(v);
                    }
                    self.excess[v] += d;
                } else if my_level <= self.level[v] {
                    new_level = new_level.min(self.level[v]);
                }
            }
            work += hg.pin_count(e) + 6;

            if my_excess == 0 {
                break;
            }

            // push back through the bridge arc
            if my_level == self.level[e_in] + 1 {
                let d = self.flow[bridge].min(my_excess);
                if d > 0 {
                    self.flow[bridge] -= d;
                    my_excess -= d;
                    if self.is_target(e_in) {
                        self.flow_value += d;
                    } else if self.excess[e_in] == 0 {
                        self.active.push_back(e_in);
                    }
                    self.excess[e_in] += d;
                }
            } else if my_level <= self.level[e_in] && self.flow[bridge] > 0 {
                new_level = new_level.min(self.level[e_in]);
            }

            if my_excess == 0 {
                break;
            }
            my_level = new_level + 1;
        }

        self.level[e_out] = my_level;
        if my_level < self.max_level && my_excess > 0 {
            self.active.push_back(e_out);
        }
        self.excess[e_out] = my_excess;
        work
    }

    fn global_relabel(&mut self, hg: &FlowHypergraph) {
        let start = Instant::now();
        for i in 0..self.max_level {
            self.level[i] = if self.is_target(i) { 0 } else { self.max_level };
        }
        self.relabel_queue.clear();
        for i in 0..self.target_piercing_nodes.len() {
            self.relabel_queue.push(self.target_piercing_nodes[i]);
        }

        let mut first = 0;
        let mut last = self.relabel_queue.len();
        let mut dist = 1usize;
        while first != last {
            for idx in first..last {
                let u = self.relabel_queue[idx];
                let mut scratch = std::mem::take(&mut self.relabel_queue);
                self.scan_backward(hg, u, |this, v| {
                    if !this.is_source(v) && !this.is_target(v) && this.level[v] == this.max_level
                    {
                        this.level[v] = dist;
                        scratch.push(v);
                    }
                });
                self.relabel_queue = scratch;
            }
            first = last;
            last = self.relabel_queue.len();
            dist += 1;
        }
        self.work_since_last_global_relabel = 0;
        self.distance_labels_broken_from_target_side_piercing = false;
        self.timings.global_relabel += start.elapsed().as_secs_f64();
    }

    /// Residual arcs pointing *into* `u`, i.e. the arcs a reverse search
    /// from the target crosses.
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
                if self.flow[exp.in_node_incidence_index(inc)] > 0 {
                    push(self, exp.edge_to_in_node(e));
                }
                push(self, exp.edge_to_out_node(e));
            }
        } else if exp.is_out_node(u) {
            let e = exp.out_node_to_edge(u);
            if self.flow[exp.bridge_edge_index(e)] < hg.capacity(e) {
                push(self, exp.edge_to_in_node(e));
            }
            for p in hg.pins_of(e) {
                if self.flow[exp.out_node_incidence_index(p.he_inc_iter)] > 0 {
                    push(self, p.pin);
                }
            }
        } else {
            let e = exp.in_node_to_edge(u);
            if self.flow[exp.bridge_edge_index(e)] > 0 {
                push(self, exp.edge_to_out_node(e));
            }
            for p in hg.pins_of(e) {
                if self.flow[exp.in_node_incidence_index(p.he_inc_iter)] < hg.capacity(e) {
                    push(self, p.pin);
                }
            }
        }
    }

    /// Residual arcs leaving `u`, for the forward search from the source.
    /// In-nodes are entered unconditionally so their cut bridges are
    /// discovered.
    fn scan_forward(&mut self, hg: &FlowHypergraph, u: Node, mut push: impl FnMut(&mut Self, Node)) {
        let exp = self.exp;
        if exp.is_hypernode(u) {
            for inc in hg.incident_hyperedge_indices(u) {
                let e = hg.get_in_he(inc).e;
                push(self, exp.edge_to_in_node(e));
                if self.flow[exp.out_node_incidence_index(inc)] > 0 {
                    push(self, exp.edge_to_out_node(e));
                }
            }
        } else if exp.is_out_node(u) {
            let e = exp.out_node_to_edge(u);
            if self.flow[exp.bridge_edge_index(e)] > 0 {
                push(self, exp.edge_to_in_node(e));
            }
            for p in hg.pins_of(e) {
                push(self, p.pin);
            }
        } else {
            let e = exp.in_node_to_edge(u);
            if self.flow[exp.bridge_edge_index(e)] < hg.capacity(e) {
                push(self, exp.edge_to_out_node(e));
            }
            for p in hg.pins_of(e) {
                if self.flow[exp.in_node_incidence_index(p.he_inc_iter)] > 0 {
                    push(self, p.pin);
                }
            }
        }
    }
}

impl PushRelabelEngine for SequentialPushRelabel {
    const NAME: &'static str = "SequentialPushRelabel";

    fn new(hg: &FlowHypergraph) -> Self {
        let mut this = SequentialPushRelabel {
            exp: Expansion::default(),
            flow_value: 0,
            flow: Vec::new(),
            excess: Vec::new(),
            level: Vec::new(),
            max_level: 0,
            reach: Vec::new(),
            // unmatchable until the first derive opens a fresh stamp
            source_reachable_stamp: u32::MAX,
            target_reachable_stamp: u32::MAX,
            running_timestamp: TARGET_STAMP,
            active: VecDeque::new(),
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
        self.flow = vec![0; self.exp.num_flow_slots()];
        self.excess = vec![0; self.max_level];
        self.level = vec![0; self.max_level];
        self.reach = vec![0; self.max_level];
        self.running_timestamp = TARGET_STAMP;
        self.source_reachable_stamp = u32::MAX;
        self.target_reachable_stamp = u32::MAX;
        self.active.clear();
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
            self.make_source(u);
            self.source_piercing_nodes.push(u);
            self.source_piercing_nodes_not_exhausted = true;
        } else {
            self.make_target(u);
            self.target_piercing_nodes.push(u);
            // excess parked on a node pierced to the target side becomes
            // flow
            self.flow_value += self.excess[u];
            self.distance_labels_broken_from_target_side_piercing = true;
        }
    }

    fn find_min_cuts(&mut self, hg: &FlowHypergraph) -> bool {
        self.saturate_source_edges(hg);
        // nodes parked at max_level need fresh labels before discharging
        self.global_relabel(hg);

        let discharge_start = Instant::now();
        while let Some(u) = self.active.pop_front() {
            if self.flow_value > self.upper_flow_bound || self.is_terminated() {
                self.timings.discharge += discharge_start.elapsed().as_secs_f64();
                return false;
            }
            if self.work_since_last_global_relabel > self.global_relabel_work_threshold {
                self.global_relabel(hg);
            }
            if self.excess[u] == 0 || self.level[u] >= self.max_level {
                continue;
            }
            self.work_since_last_global_relabel += if self.exp.is_hypernode(u) {
                self.discharge_hypernode(hg, u)
            } else if self.exp.is_out_node(u) {
                self.discharge_out_node(hg, u)
            } else {
                self.discharge_in_node(hg, u)
            };
        }
        self.timings.discharge += discharge_start.elapsed().as_secs_f64();
        debug!("push-relabel flow value {}", self.flow_value);
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
            // nodes left with excess sit on the source side even without
            // an augmenting path out of them
            for u in 0..self.max_level {
                if !self.is_source(u) && !self.is_target(u) && self.excess[u] > 0 {
                    debug_assert_eq!(self.level[u], self.max_level);
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
        self.flow[self.exp.bridge_edge_index(e)]
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
