//! The flow hypergraph: arena storage for nodes, hyperedges, pins and
//! incidences, plus the flow-routing primitive that keeps residual
//! iteration cheap.
//!
//! Every hyperedge partitions its pin array into three contiguous regions:
//! pins currently sending flow into the edge, pins without incidence flow,
//! and pins currently receiving flow from the edge. [`FlowHypergraph::route_flow`]
//! maintains this partition by swapping the affected pin with the boundary
//! pin of the region it enters or leaves, so iterating the flow-carrying
//! pins of an edge costs O(#flow-carrying pins).
//!
//! The view direction bit swaps the roles of "sending" and "receiving"
//! (and the sign convention of incidence flows), so search code only ever
//! has to be written for the source-to-target direction.

use crate::basic_types::Flow;
use crate::basic_types::Hyperedge;
#[allow(unused_imports)]
use crate::heavy_assert;
use crate::basic_types::InHeIndex;
use crate::basic_types::Node;
use crate::basic_types::NodeWeight;
use crate::basic_types::PinIndex;

/// One (node, hyperedge) incidence record as seen from the hyperedge side.
/// `he_inc_iter` points back to the corresponding [`InHe`].
#[derive(Debug, Clone, Copy)]
pub struct Pin {
    pub pin: Node,
    pub he_inc_iter: InHeIndex,
}

/// One (node, hyperedge) incidence record as seen from the node side.
/// `flow` is signed: in the forward view a positive value means the node
/// sends flow into the hyperedge. `pin_iter` points back to the [`Pin`].
#[derive(Debug, Clone, Copy)]
pub struct InHe {
    pub e: Hyperedge,
    pub flow: Flow,
    pub pin_iter: PinIndex,
}

#[derive(Debug, Clone, Copy)]
struct HyperedgeData {
    first_out: PinIndex,
    flow: Flow,
    capacity: Flow,
}

#[derive(Debug, Clone, Copy)]
struct NodeData {
    first_out: InHeIndex,
    weight: NodeWeight,
}

/// Half-open range of positions in the pin array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinIndexRange {
    pub begin: PinIndex,
    pub end: PinIndex,
}

impl PinIndexRange {
    fn empty_at(pos: PinIndex) -> Self {
        PinIndexRange {
            begin: pos,
            end: pos,
        }
    }

    pub fn contains(&self, i: PinIndex) -> bool {
        self.begin <= i && i < self.end
    }

    pub fn is_empty(&self) -> bool {
        self.begin == self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.begin
    }
}

#[derive(Debug, Clone)]
pub struct FlowHypergraph {
    nodes: Vec<NodeData>,           // one sentinel entry at the back
    hyperedges: Vec<HyperedgeData>, // one sentinel entry at the back
    pins: Vec<Pin>,
    incident_hyperedges: Vec<InHe>,

    // Indexed by hyperedge. In the forward view the sending range grows
    // rightwards from the first pin of the edge and the receiving range
    // grows leftwards from one past its last pin.
    pins_sending_flow: Vec<PinIndexRange>,
    pins_receiving_flow: Vec<PinIndexRange>,

    total_node_weight: NodeWeight,
    max_hyperedge_capacity: Flow,
    sends_multiplier: Flow,
    receives_multiplier: Flow,
}

impl FlowHypergraph {
    /// Builds the arena representation from per-hyperedge pin lists given
    /// as a flat array with `hyperedge_sizes[e]` pins per edge.
    pub fn new(
        node_weights: Vec<NodeWeight>,
        hyperedge_capacities: Vec<Flow>,
        hyperedge_sizes: Vec<usize>,
        flat_pins: Vec<Node>,
    ) -> Self {
        let n = node_weights.len();
        let m = hyperedge_capacities.len();
        debug_assert_eq!(hyperedge_sizes.len(), m);
        debug_assert_eq!(flat_pins.len(), hyperedge_sizes.iter().sum::<usize>());

        let mut hg = FlowHypergraph {
            nodes: vec![
                NodeData {
                    first_out: 0,
                    weight: 0
                };
                n + 1
            ],
            hyperedges: vec![
                HyperedgeData {
                    first_out: 0,
                    flow: 0,
                    capacity: 0
                };
                m + 1
            ],
            pins: Vec::with_capacity(flat_pins.len()),
            incident_hyperedges: vec![
                InHe {
                    e: 0,
                    flow: 0,
                    pin_iter: 0
                };
                flat_pins.len()
            ],
            pins_sending_flow: Vec::with_capacity(m),
            pins_receiving_flow: Vec::with_capacity(m),
            total_node_weight: node_weights.iter().sum(),
            max_hyperedge_capacity: hyperedge_capacities.iter().copied().max().unwrap_or(0),
            sends_multiplier: 1,
            receives_multiplier: -1,
        };

        // bucket sizes, then prefix sums over node incidence counts
        for &p in &flat_pins {
            hg.pins.push(Pin {
                pin: p,
                he_inc_iter: 0,
            });
            hg.nodes[p + 1].first_out += 1;
        }
        let mut running = 0;
        for (i, nd) in hg.nodes.iter_mut().enumerate() {
            nd.first_out += running;
            running = nd.first_out;
            if i < n {
                nd.weight = node_weights[i];
            }
        }

        let mut pin_pos = 0;
        for e in 0..m {
            hg.hyperedges[e].capacity = hyperedge_capacities[e];
            hg.hyperedges[e + 1].first_out = hg.hyperedges[e].first_out + hyperedge_sizes[e];
            for _ in 0..hyperedge_sizes[e] {
                let u = hg.pins[pin_pos].pin;
                // first_out is temporarily bumped per placed incidence and
                // restored by the shift below
                let ind_he = hg.nodes[u].first_out;
                hg.nodes[u].first_out += 1;
                hg.incident_hyperedges[ind_he] = InHe {
                    e,
                    flow: 0,
                    pin_iter: pin_pos,
                };
                hg.pins[pin_pos].he_inc_iter = ind_he;
                pin_pos += 1;
            }
        }
        for u in (1..=n).rev() {
            hg.nodes[u].first_out = hg.nodes[u - 1].first_out;
        }
        hg.nodes[0].first_out = 0;

        let mut x = 0;
        for e in 0..m {
            hg.pins_sending_flow.push(PinIndexRange::empty_at(x));
            x += hg.pin_count(e);
            hg.pins_receiving_flow.push(PinIndexRange::empty_at(x));
        }
        hg
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len() - 1
    }

    pub fn num_hyperedges(&self) -> usize {
        self.hyperedges.len() - 1
    }

    pub fn num_pins(&self) -> usize {
        self.pins.len()
    }

    pub fn pin_count(&self, e: Hyperedge) -> usize {
        self.hyperedges[e + 1].first_out - self.hyperedges[e].first_out
    }

    pub fn degree(&self, u: Node) -> usize {
        self.nodes[u + 1].first_out - self.nodes[u].first_out
    }

    pub fn total_node_weight(&self) -> NodeWeight {
        self.total_node_weight
    }

    pub fn node_weight(&self, u: Node) -> NodeWeight {
        self.nodes[u].weight
    }

    pub fn max_hyperedge_capacity(&self) -> Flow {
        self.max_hyperedge_capacity
    }

    pub fn begin_index_hyperedges(&self, u: Node) -> InHeIndex {
        self.nodes[u].first_out
    }

    pub fn end_index_hyperedges(&self, u: Node) -> InHeIndex {
        self.nodes[u + 1].first_out
    }

    pub fn incident_hyperedge_indices(&self, u: Node) -> std::ops::Range<InHeIndex> {
        self.begin_index_hyperedges(u)..self.end_index_hyperedges(u)
    }

    pub fn get_in_he(&self, ind: InHeIndex) -> &InHe {
        &self.incident_hyperedges[ind]
    }

    pub fn hyperedges_of(&self, u: Node) -> &[InHe] {
        &self.incident_hyperedges[self.nodes[u].first_out..self.nodes[u + 1].first_out]
    }

    pub fn begin_index_pins(&self, e: Hyperedge) -> PinIndex {
        self.hyperedges[e].first_out
    }

    pub fn end_index_pins(&self, e: Hyperedge) -> PinIndex {
        self.hyperedges[e + 1].first_out
    }

    pub fn pin_indices(&self, e: Hyperedge) -> std::ops::Range<PinIndex> {
        self.begin_index_pins(e)..self.end_index_pins(e)
    }

    pub fn get_pin(&self, ind: PinIndex) -> &Pin {
        &self.pins[ind]
    }

    pub fn pins_of(&self, e: Hyperedge) -> &[Pin] {
        &self.pins[self.hyperedges[e].first_out..self.hyperedges[e + 1].first_out]
    }

    pub fn pins_sending_flow_indices(&self, e: Hyperedge) -> std::ops::Range<PinIndex> {
        let r = self.pins_sending_flow[e];
        r.begin..r.end
    }

    pub fn pins_sending_flow_into(&self, e: Hyperedge) -> &[Pin] {
        let r = self.pins_sending_flow[e];
        &self.pins[r.begin..r.end]
    }

    pub fn pins_receiving_flow_indices(&self, e: Hyperedge) -> std::ops::Range<PinIndex> {
        let r = self.pins_receiving_flow[e];
        r.begin..r.end
    }

    pub fn pins_receiving_flow_from(&self, e: Hyperedge) -> &[Pin] {
        let r = self.pins_receiving_flow[e];
        &self.pins[r.begin..r.end]
    }

    /// Pins not currently sending flow into `e`: the no-flow region plus
    /// the receiving region, which are contiguous in either view.
    pub fn pins_not_sending_flow_indices(&self, e: Hyperedge) -> std::ops::Range<PinIndex> {
        if self.forward_view() {
            self.pins_sending_flow[e].end..self.end_index_pins(e)
        } else {
            self.begin_index_pins(e)..self.pins_sending_flow[e].begin
        }
    }

    pub fn pins_not_sending_flow_into(&self, e: Hyperedge) -> &[Pin] {
        let r = self.pins_not_sending_flow_indices(e);
        &self.pins[r]
    }

    pub fn pins_not_receiving_flow_indices(&self, e: Hyperedge) -> std::ops::Range<PinIndex> {
        if self.forward_view() {
            self.begin_index_pins(e)..self.pins_receiving_flow[e].begin
        } else {
            self.pins_receiving_flow[e].end..self.end_index_pins(e)
        }
    }

    pub fn pins_not_receiving_flow_from(&self, e: Hyperedge) -> &[Pin] {
        let r = self.pins_not_receiving_flow_indices(e);
        &self.pins[r]
    }

    pub fn forward_view(&self) -> bool {
        self.sends_multiplier == 1
    }

    /// Swaps the roles of sending and receiving pins. Involution.
    pub fn flip_view_direction(&mut self) {
        std::mem::swap(&mut self.pins_sending_flow, &mut self.pins_receiving_flow);
        std::mem::swap(&mut self.sends_multiplier, &mut self.receives_multiplier);
    }

    pub fn capacity(&self, e: Hyperedge) -> Flow {
        self.hyperedges[e].capacity
    }

    pub fn flow(&self, e: Hyperedge) -> Flow {
        self.hyperedges[e].flow
    }

    pub fn residual_capacity(&self, e: Hyperedge) -> Flow {
        self.capacity(e) - self.flow(e)
    }

    pub fn is_saturated(&self, e: Hyperedge) -> bool {
        debug_assert!(self.flow(e) <= self.capacity(e));
        self.flow(e) == self.capacity(e)
    }

    /// Flow that the pin behind `inc_u` sends into its hyperedge under the
    /// current view direction.
    pub fn flow_sent(&self, inc_u: &InHe) -> Flow {
        inc_u.flow * self.sends_multiplier
    }

    pub fn absolute_flow_sent(&self, inc_u: &InHe) -> Flow {
        self.flow_sent(inc_u).max(0)
    }

    /// Flow that the pin behind `inc_u` receives from its hyperedge under
    /// the current view direction.
    pub fn flow_received(&self, inc_u: &InHe) -> Flow {
        inc_u.flow * self.receives_multiplier
    }

    pub fn absolute_flow_received(&self, inc_u: &InHe) -> Flow {
        self.flow_received(inc_u).max(0)
    }

    /// Residual capacity of the path step `u -> e -> v`: `u`'s pending flow
    /// out of `e`, `v`'s pending flow into `e`, plus the edge's own slack.
    pub fn residual_capacity_between(&self, inc_u: &InHe, inc_v: &InHe) -> Flow {
        self.absolute_flow_received(inc_u) + self.absolute_flow_sent(inc_v)
            + self.residual_capacity(inc_u.e)
    }

    /// Routes `flow` units from the pin behind `inc_u_it` through their
    /// common hyperedge to the pin behind `inc_v_it`.
    ///
    /// Contract: `0 < flow <= residual_capacity_between(u, v)`. Afterwards
    /// both pins sit in the pin region matching the sign of their new
    /// incidence flow and all back-pointers are consistent.
    pub fn route_flow(&mut self, inc_u_it: InHeIndex, inc_v_it: InHeIndex, flow: Flow) {
        let e = self.incident_hyperedges[inc_u_it].e;
        debug_assert_eq!(
            e, self.incident_hyperedges[inc_v_it].e,
            "routing flow but incident hyperedges differ"
        );
        debug_assert!(flow > 0, "routing non-positive flow");
        {
            let inc_u = &self.incident_hyperedges[inc_u_it];
            let inc_v = &self.incident_hyperedges[inc_v_it];
            debug_assert!(
                flow <= self.residual_capacity_between(inc_u, inc_v),
                "routing more flow than residual capacity"
            );
            debug_assert!(inc_u.flow.abs() <= self.capacity(e));
            debug_assert!(inc_v.flow.abs() <= self.capacity(e));
        }

        let prev_flow_u = self.incident_hyperedges[inc_u_it].flow;
        let prev_flow_v = self.incident_hyperedges[inc_v_it].flow;
        let abs_received_u = (prev_flow_u * self.receives_multiplier).max(0);
        let abs_sent_v = (prev_flow_v * self.sends_multiplier).max(0);

        self.hyperedges[e].flow += flow - abs_received_u - abs_sent_v;
        debug_assert!(self.hyperedges[e].flow <= self.hyperedges[e].capacity);

        self.incident_hyperedges[inc_u_it].flow += flow * self.sends_multiplier;
        self.incident_hyperedges[inc_v_it].flow += flow * self.receives_multiplier;
        let new_flow_u = self.incident_hyperedges[inc_u_it].flow;
        let new_flow_v = self.incident_hyperedges[inc_v_it].flow;

        // u previously received flow and now has none or sends
        if prev_flow_u * self.receives_multiplier > 0 && new_flow_u * self.sends_multiplier >= 0 {
            self.remove_pin_from_flow_pins(inc_u_it, true);
        }
        // u now sends flow and did not previously
        if new_flow_u * self.sends_multiplier > 0 && prev_flow_u * self.sends_multiplier <= 0 {
            self.insert_pin_into_flow_pins(inc_u_it, false);
        }
        // v previously sent flow and now has none or receives
        if prev_flow_v * self.sends_multiplier > 0 && new_flow_v * self.receives_multiplier >= 0 {
            self.remove_pin_from_flow_pins(inc_v_it, false);
        }
        // v now receives flow and did not previously
        if new_flow_v * self.receives_multiplier > 0 && prev_flow_v * self.receives_multiplier <= 0
        {
            self.insert_pin_into_flow_pins(inc_v_it, true);
        }

        heavy_assert!(self.pin_is_categorized_correctly(inc_u_it));
        heavy_assert!(self.pin_is_categorized_correctly(inc_v_it));
    }

    fn pins_without_flow(&self, e: Hyperedge) -> PinIndexRange {
        if self.forward_view() {
            PinIndexRange {
                begin: self.pins_sending_flow[e].end,
                end: self.pins_receiving_flow[e].begin,
            }
        } else {
            PinIndexRange {
                begin: self.pins_receiving_flow[e].end,
                end: self.pins_sending_flow[e].begin,
            }
        }
    }

    fn swap_pins(&mut self, a: PinIndex, b: PinIndex) {
        if a == b {
            return;
        }
        let inc_a = self.pins[a].he_inc_iter;
        let inc_b = self.pins[b].he_inc_iter;
        self.pins.swap(a, b);
        self.incident_hyperedges[inc_a].pin_iter = b;
        self.incident_hyperedges[inc_b].pin_iter = a;
    }

    fn remove_pin_from_flow_pins(&mut self, inc_u_it: InHeIndex, flow_receiving_pins: bool) {
        let e = self.incident_hyperedges[inc_u_it].e;
        let it_u = self.incident_hyperedges[inc_u_it].pin_iter;
        let forward = self.forward_view();
        let range = if flow_receiving_pins {
            &mut self.pins_receiving_flow[e]
        } else {
            &mut self.pins_sending_flow[e]
        };
        debug_assert!(!range.is_empty());
        debug_assert!(range.contains(it_u));

        // the boundary pin on the side where the range shrinks
        let it_o = if forward == flow_receiving_pins {
            let o = range.begin;
            range.begin += 1;
            o
        } else {
            range.end -= 1;
            range.end
        };
        self.swap_pins(it_u, it_o);
        debug_assert!(self.pins_without_flow(e).contains(it_o));
    }

    fn insert_pin_into_flow_pins(&mut self, inc_u_it: InHeIndex, flow_receiving_pins: bool) {
        let e = self.incident_hyperedges[inc_u_it].e;
        let it_u = self.incident_hyperedges[inc_u_it].pin_iter;
        debug_assert!(self.pins_without_flow(e).contains(it_u));
        let forward = self.forward_view();
        let range = if flow_receiving_pins {
            &mut self.pins_receiving_flow[e]
        } else {
            &mut self.pins_sending_flow[e]
        };
        let it_o = if forward == flow_receiving_pins {
            range.begin -= 1;
            range.begin
        } else {
            let o = range.end;
            range.end += 1;
            o
        };
        self.swap_pins(it_u, it_o);
    }

    #[cfg(any(test, feature = "debug-checks"))]
    fn pin_is_categorized_correctly(&self, inc_u_it: InHeIndex) -> bool {
        let inc_u = &self.incident_hyperedges[inc_u_it];
        let e = inc_u.e;
        let it_u = inc_u.pin_iter;
        let sends = self.flow_sent(inc_u) > 0 && self.pins_sending_flow[e].contains(it_u);
        let receives = self.flow_received(inc_u) > 0 && self.pins_receiving_flow[e].contains(it_u);
        let no_flow = inc_u.flow == 0 && self.pins_without_flow(e).contains(it_u);
        (sends && !receives && !no_flow)
            || (!sends && receives && !no_flow)
            || (!sends && !receives && no_flow)
    }

    /// Walks all incidences and checks back-pointers, pin categorization,
    /// capacity bounds and per-edge flow conservation.
    #[cfg(any(test, feature = "debug-checks"))]
    pub fn verify_consistency(&self) {
        for e in 0..self.num_hyperedges() {
            assert!(self.flow(e) >= 0 && self.flow(e) <= self.capacity(e));
            let mut net = 0;
            let mut entering = 0;
            for p in self.pins_of(e) {
                let inc = self.get_in_he(p.he_inc_iter);
                assert_eq!(inc.e, e);
                assert_eq!(self.pins[inc.pin_iter].pin, p.pin);
                assert!(inc.flow.abs() <= self.capacity(e));
                net += inc.flow;
                entering += self.absolute_flow_sent(inc);
            }
            assert_eq!(net, 0, "pin flows of hyperedge {} do not cancel", e);
            assert_eq!(entering, self.flow(e));
            for i in self.pin_indices(e) {
                assert!(self.pin_is_categorized_correctly(self.pins[i].he_inc_iter));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::FlowHypergraph;

    fn triangle() -> FlowHypergraph {
        // three nodes, two hyperedges: {0,1} with capacity 2, {1,2} with
        // capacity 1
        FlowHypergraph::new(
            vec![1, 1, 1],
            vec![2, 1],
            vec![2, 2],
            vec![0, 1, 1, 2],
        )
    }

    #[test]
    fn construction_wires_backpointers() {
        let hg = triangle();
        assert_eq!(hg.num_nodes(), 3);
        assert_eq!(hg.num_hyperedges(), 2);
        assert_eq!(hg.num_pins(), 4);
        assert_eq!(hg.degree(1), 2);
        assert_eq!(hg.pin_count(0), 2);
        hg.verify_consistency();
    }

    #[test]
    fn route_flow_moves_pins_between_regions() {
        let mut hg = triangle();
        let inc_u = hg.pins_of(0)[0].he_inc_iter; // node 0 in edge 0
        let inc_v = hg.pins_of(0)[1].he_inc_iter; // node 1 in edge 0
        assert_eq!(hg.residual_capacity_between(hg.get_in_he(inc_u), hg.get_in_he(inc_v)), 2);

        hg.route_flow(inc_u, inc_v, 1);
        assert_eq!(hg.flow(0), 1);
        assert_eq!(hg.pins_sending_flow_into(0).len(), 1);
        assert_eq!(hg.pins_sending_flow_into(0)[0].pin, 0);
        assert_eq!(hg.pins_receiving_flow_from(0)[0].pin, 1);
        hg.verify_consistency();

        // routing back cancels the flow and empties both regions
        hg.route_flow(inc_v, inc_u, 1);
        assert_eq!(hg.flow(0), 0);
        assert!(hg.pins_sending_flow_into(0).is_empty());
        assert!(hg.pins_receiving_flow_from(0).is_empty());
        hg.verify_consistency();
    }

    #[test]
    fn residual_of_a_step_includes_pending_pin_flow() {
        let mut hg = triangle();
        let inc_u = hg.pins_of(0)[0].he_inc_iter;
        let inc_v = hg.pins_of(0)[1].he_inc_iter;
        hg.route_flow(inc_u, inc_v, 2);
        assert!(hg.is_saturated(0));
        // pushing in the opposite direction undoes pending flow on both
        // endpoints on top of the (zero) slack
        assert_eq!(
            hg.residual_capacity_between(hg.get_in_he(inc_v), hg.get_in_he(inc_u)),
            4
        );
    }

    #[test]
    fn flip_view_direction_is_an_involution() {
        let mut hg = triangle();
        let inc_u = hg.pins_of(0)[0].he_inc_iter;
        let inc_v = hg.pins_of(0)[1].he_inc_iter;
        hg.route_flow(inc_u, inc_v, 1);

        let sent_before = hg.flow_sent(hg.get_in_he(inc_u));
        hg.flip_view_direction();
        assert_eq!(hg.flow_received(hg.get_in_he(inc_u)), sent_before);
        assert_eq!(hg.pins_receiving_flow_from(0)[0].pin, 0);
        hg.flip_view_direction();
        assert_eq!(hg.flow_sent(hg.get_in_he(inc_u)), sent_before);
        hg.verify_consistency();
    }
}
