//! Max-flow invariance across all engines on the fixture hypergraphs.

use std::path::PathBuf;

use whfc::algorithms::BidirectionalDinic;
use whfc::algorithms::CutterState;
use whfc::algorithms::Dinic;
use whfc::algorithms::FlowAlgorithm;
use whfc::algorithms::ParallelPushRelabel;
use whfc::algorithms::PushRelabelEngine;
use whfc::algorithms::ScalingDinic;
use whfc::algorithms::SequentialPushRelabel;
use whfc::basic_types::Flow;
use whfc::basic_types::Node;
use whfc::datastructure::FlowHypergraph;
use whfc::io::hmetis;

fn fixture(name: &str) -> FlowHypergraph {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name);
    hmetis::read_flow_hypergraph(&path).expect("fixture parses")
}

fn augmenting_path_flow<FA: FlowAlgorithm>(name: &str, s: Node, t: Node) -> Flow {
    let mut hg = fixture(name);
    let max_block_weight = hg.total_node_weight();
    let mut flow_algo = FA::new(&hg);
    let mut cs: CutterState<FA> = CutterState::new(&hg, max_block_weight);
    cs.initialize(&mut hg, s, t);
    let has_cut = flow_algo.exhaust_flow(&mut hg, &mut cs);
    assert!(has_cut, "{} found no cut on {}", FA::NAME, name);
    cs.flow_value
}

fn push_relabel_flow<E: PushRelabelEngine>(name: &str, s: Node, t: Node) -> Flow {
    let hg = fixture(name);
    let mut engine = E::new(&hg);
    engine.pierce(&hg, s, true);
    engine.pierce(&hg, t, false);
    assert!(engine.find_min_cuts(&hg), "{} exceeded the bound", E::NAME);
    engine.flow_value()
}

fn check_all_engines(name: &str, s: Node, t: Node, expected: Flow) {
    assert_eq!(augmenting_path_flow::<Dinic>(name, s, t), expected);
    assert_eq!(augmenting_path_flow::<BidirectionalDinic>(name, s, t), expected);
    assert_eq!(augmenting_path_flow::<ScalingDinic>(name, s, t), expected);
    assert_eq!(push_relabel_flow::<SequentialPushRelabel>(name, s, t), expected);
    assert_eq!(push_relabel_flow::<ParallelPushRelabel>(name, s, t), expected);
}

#[test]
fn testhg_flow_is_one() {
    check_all_engines("testhg.hgr", 14, 10, 1);
}

#[test]
fn twocenters_flow_is_two() {
    check_all_engines("twocenters.hgr", 0, 2, 2);
    check_all_engines("twocenters.hgr", 0, 3, 2);
}

#[test]
fn push_back_flow_is_six() {
    check_all_engines("push_back.hgr", 0, 7, 6);
}

#[test]
fn flow_bound_aborts_the_search() {
    let hg = fixture("push_back.hgr");
    let mut engine = SequentialPushRelabel::new(&hg);
    engine.set_upper_flow_bound(3);
    engine.pierce(&hg, 0, true);
    engine.pierce(&hg, 7, false);
    assert!(!engine.find_min_cuts(&hg));
}

#[test]
fn exhausted_flow_is_maximal() {
    // re-exhausting must not find another augmenting path
    let mut hg = fixture("push_back.hgr");
    let mut flow_algo = Dinic::new(&hg);
    let mut cs: CutterState<Dinic> = CutterState::new(&hg, hg.total_node_weight());
    cs.initialize(&mut hg, 0, 7);
    assert!(flow_algo.exhaust_flow(&mut hg, &mut cs));
    assert_eq!(cs.flow_value, 6);
    assert!(flow_algo.exhaust_flow(&mut hg, &mut cs));
    assert_eq!(cs.flow_value, 6);
}
