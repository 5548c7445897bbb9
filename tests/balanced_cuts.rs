//! End-to-end balanced-cut enumeration through both drivers.

use std::path::PathBuf;

use whfc::algorithms::BidirectionalDinic;
use whfc::algorithms::Dinic;
use whfc::algorithms::FlowAlgorithm;
use whfc::algorithms::HyperFlowCutter;
use whfc::algorithms::ParallelPushRelabel;
use whfc::algorithms::PushRelabelCutter;
use whfc::algorithms::PushRelabelEngine;
use whfc::algorithms::ScalingDinic;
use whfc::algorithms::SequentialPushRelabel;
use whfc::basic_types::Bipartition;
use whfc::basic_types::Flow;
use whfc::basic_types::Node;
use whfc::basic_types::NodeWeight;
use whfc::datastructure::FlowHypergraph;
use whfc::io::hmetis;

fn fixture(name: &str) -> FlowHypergraph {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name);
    hmetis::read_flow_hypergraph(&path).expect("fixture parses")
}

fn assert_valid_partition(hg: &FlowHypergraph, partition: &Bipartition, mbw: NodeWeight) {
    let weight = |b: &[Node]| b.iter().map(|&u| hg.node_weight(u)).sum::<NodeWeight>();
    assert!(weight(&partition.block0) <= mbw);
    assert!(weight(&partition.block1) <= mbw);
    assert_eq!(
        partition.block0.len() + partition.block1.len(),
        hg.num_nodes()
    );
    let mut seen = vec![false; hg.num_nodes()];
    for &u in partition.block0.iter().chain(partition.block1.iter()) {
        assert!(!seen[u], "node {} assigned twice", u);
        seen[u] = true;
    }
}

fn run_flipping_driver<FA: FlowAlgorithm>(
    name: &str,
    s: Node,
    t: Node,
    mbw: NodeWeight,
    find_most_balanced: bool,
) -> (Flow, Bipartition) {
    let hg = fixture(name);
    let mut hfc: HyperFlowCutter<FA> = HyperFlowCutter::new(hg, mbw, 42);
    hfc.find_most_balanced = find_most_balanced;
    assert!(
        hfc.enumerate_cuts_until_balanced_or_flow_bound_exceeded(s, t),
        "{} found no balanced cut on {}",
        FA::NAME,
        name
    );
    let partition = hfc.partition.clone().expect("partition written");
    assert_valid_partition(&hfc.hg, &partition, mbw);
    assert!(partition.block0.contains(&s));
    assert!(partition.block1.contains(&t));
    (hfc.cs.flow_value, partition)
}

fn run_push_relabel_driver<E: PushRelabelEngine>(
    name: &str,
    s: Node,
    t: Node,
    mbw: NodeWeight,
    find_most_balanced: bool,
) -> (Flow, Bipartition) {
    let hg = fixture(name);
    let mut cutter: PushRelabelCutter<E> = PushRelabelCutter::new(hg, mbw, 42);
    cutter.find_most_balanced = find_most_balanced;
    assert!(
        cutter.enumerate_cuts_until_balanced_or_flow_bound_exceeded(s, t, |_| true),
        "{} found no balanced cut on {}",
        E::NAME,
        name
    );
    assert!(cutter.num_cuts >= 1);
    let partition = cutter.partition.clone().expect("partition written");
    assert_valid_partition(&cutter.hg, &partition, mbw);
    assert!(partition.block0.contains(&s));
    assert!(partition.block1.contains(&t));
    (cutter.flow_value(), partition)
}

fn sorted(mut v: Vec<Node>) -> Vec<Node> {
    v.sort_unstable();
    v
}

#[test]
fn path_is_split_in_the_middle_with_a_unit_cut() {
    // piercing walks the chain node by node, reusing the flow of one
    for find_most_balanced in [false, true] {
        let (flow, partition) =
            run_flipping_driver::<Dinic>("path.hgr", 0, 7, 4, find_most_balanced);
        assert_eq!(flow, 1);
        assert_eq!(sorted(partition.block0), vec![0, 1, 2, 3]);
        assert_eq!(sorted(partition.block1), vec![4, 5, 6, 7]);
    }
}

#[test]
fn path_with_the_other_dinic_variants() {
    let (flow, partition) = run_flipping_driver::<BidirectionalDinic>("path.hgr", 0, 7, 4, true);
    assert_eq!(flow, 1);
    assert_eq!(sorted(partition.block0), vec![0, 1, 2, 3]);

    let (flow, _) = run_flipping_driver::<ScalingDinic>("path.hgr", 0, 7, 4, true);
    assert_eq!(flow, 1);
}

#[test]
fn path_with_the_push_relabel_cutters() {
    for find_most_balanced in [false, true] {
        let (flow, partition) = run_push_relabel_driver::<SequentialPushRelabel>(
            "path.hgr",
            0,
            7,
            4,
            find_most_balanced,
        );
        assert_eq!(flow, 1);
        assert_eq!(sorted(partition.block0), vec![0, 1, 2, 3]);
    }

    let (flow, _) = run_push_relabel_driver::<ParallelPushRelabel>("path.hgr", 0, 7, 4, true);
    assert_eq!(flow, 1);
}

#[test]
fn twocenters_balanced_once_one_side_may_take_the_satellites() {
    let (flow, _) = run_flipping_driver::<Dinic>("twocenters.hgr", 0, 2, 5, true);
    assert_eq!(flow, 2);
    let (flow, _) =
        run_push_relabel_driver::<SequentialPushRelabel>("twocenters.hgr", 0, 2, 5, true);
    assert_eq!(flow, 2);
}

#[test]
fn push_back_balanced_cuts() {
    // the residual of the max flow reaches every node but the sink, so
    // the source block may take up to seven of the eight unit weights
    let (flow, _) = run_flipping_driver::<Dinic>("push_back.hgr", 0, 7, 7, true);
    assert_eq!(flow, 6);
    let (flow, _) = run_push_relabel_driver::<ParallelPushRelabel>("push_back.hgr", 0, 7, 7, true);
    assert_eq!(flow, 6);
}

#[test]
fn testhg_balanced_cuts() {
    let (flow, _) = run_flipping_driver::<Dinic>("testhg.hgr", 14, 10, 11, true);
    assert_eq!(flow, 1);
    let (flow, _) =
        run_push_relabel_driver::<SequentialPushRelabel>("testhg.hgr", 14, 10, 11, true);
    assert_eq!(flow, 1);
}

#[test]
fn flow_bound_below_the_max_flow_reports_failure() {
    let hg = fixture("twocenters.hgr");
    let mut hfc: HyperFlowCutter<Dinic> = HyperFlowCutter::new(hg, 5, 42);
    hfc.set_flow_bound(1);
    assert!(!hfc.enumerate_cuts_until_balanced_or_flow_bound_exceeded(0, 2));
}
