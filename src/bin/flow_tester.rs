//! Computes the max flow of a sidecar-described cut problem with both the
//! bidirectional and the plain Dinic engine and verifies that they agree.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use whfc::algorithms::BidirectionalDinic;
use whfc::algorithms::CutterState;
use whfc::algorithms::Dinic;
use whfc::algorithms::FlowAlgorithm;
use whfc::basic_types::Flow;
use whfc::basic_types::NodeWeight;
use whfc::io::hmetis;
use whfc::io::sidecar;

#[derive(Debug, Parser)]
#[command(about = "Cross-checks the max-flow value of the Dinic variants")]
struct Args {
    /// Hypergraph in hMETIS format, with a .whfc sidecar next to it.
    hgfile: PathBuf,
}

fn run_flow<FA: FlowAlgorithm>(args: &Args, max_block_weight: NodeWeight) -> anyhow::Result<Flow> {
    let info = sidecar::read_cut_problem(&args.hgfile)?;
    let mut hg = hmetis::read_flow_hypergraph(&args.hgfile)?;
    anyhow::ensure!(
        info.s < hg.num_nodes() && info.t < hg.num_nodes(),
        "s or t not within the node id range"
    );

    let mut flow_algo = FA::new(&hg);
    let mut cs: CutterState<FA> = CutterState::new(&hg, max_block_weight);
    cs.initialize(&mut hg, info.s, info.t);
    let has_cut = flow_algo.exhaust_flow(&mut hg, &mut cs);
    anyhow::ensure!(has_cut, "flow engine terminated without a cut");
    println!("{}: flow = {}", FA::NAME, cs.flow_value);
    Ok(cs.flow_value)
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let info = sidecar::read_cut_problem(&args.hgfile)
        .with_context(|| format!("reading sidecar of {}", args.hgfile.display()))?;
    let max_block_weight = info.max_block_weight[0].max(info.max_block_weight[1]);

    let f1 = run_flow::<BidirectionalDinic>(&args, max_block_weight)?;
    let f2 = run_flow::<Dinic>(&args, max_block_weight)?;
    anyhow::ensure!(
        f1 == f2,
        "flow values disagree: bidirectional = {}, plain = {}",
        f1,
        f2
    );
    Ok(())
}
