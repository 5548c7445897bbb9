//! Runs the parallel push-relabel cut enumeration on a sidecar-described
//! problem and emits one CSV measurement row.
//!
//! Row format:
//! `graph,algorithm,seed,threads,improved,flow,flowbound,time,mbc_time,`
//! `time_limit_exceeded,num_cuts,discharge,global_relabel,update,`
//! `source_cut,saturate,assimilate,pierce`

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use clap::Parser;

use whfc::algorithms::ParallelPushRelabel;
use whfc::algorithms::PushRelabelCutter;
use whfc::algorithms::PushRelabelEngine;
use whfc::io::hmetis;
use whfc::io::sidecar;

const TIME_LIMIT_SECONDS: u64 = 3600;
const MEASURE_EVERY: usize = 50;

#[derive(Debug, Parser)]
#[command(about = "Measurement harness for the parallel push-relabel cutter")]
struct Args {
    /// Hypergraph in hMETIS format, with .whfc / .generator sidecars.
    hgfile: PathBuf,
    /// Worker threads for the discharge rounds.
    #[arg(default_value_t = 1)]
    threads: usize,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let info = sidecar::read_cut_problem(&args.hgfile)
        .with_context(|| format!("reading sidecar of {}", args.hgfile.display()))?;
    let seed = sidecar::read_generator_seed(&args.hgfile, 0)?;
    let hg = hmetis::read_flow_hypergraph(&args.hgfile)
        .with_context(|| format!("reading {}", args.hgfile.display()))?;
    anyhow::ensure!(
        info.s < hg.num_nodes() && info.t < hg.num_nodes(),
        "s or t not within the node id range"
    );

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(args.threads)
        .build()
        .context("building the worker pool")?;

    let max_block_weight = info.max_block_weight[0].max(info.max_block_weight[1]);
    let mut hfc: PushRelabelCutter<ParallelPushRelabel> =
        PushRelabelCutter::new(hg, max_block_weight, seed);
    hfc.set_flow_bound(info.upper_flow_bound);

    let mut time_limit_exceeded = false;
    let mut measure_step = 0usize;
    let start = Instant::now();

    let improved = pool.install(|| {
        hfc.enumerate_cuts_until_balanced_or_flow_bound_exceeded(info.s, info.t, |_| {
            measure_step += 1;
            if measure_step == MEASURE_EVERY {
                measure_step = 0;
                if start.elapsed().as_secs() > TIME_LIMIT_SECONDS {
                    time_limit_exceeded = true;
                    return false;
                }
            }
            true
        })
    });
    let total_time = start.elapsed().as_secs_f64();

    let graph = args
        .hgfile
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_else(|| args.hgfile.display().to_string());
    let timings = hfc.engine.timings();
    println!(
        "{},FlowCutter,{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{}",
        graph,
        seed,
        args.threads,
        if improved { "yes" } else { "no" },
        hfc.flow_value(),
        info.upper_flow_bound,
        total_time,
        hfc.mbc_time,
        if time_limit_exceeded { "yes" } else { "no" },
        hfc.num_cuts,
        timings.discharge,
        timings.global_relabel,
        timings.update,
        timings.source_cut,
        timings.saturate,
        hfc.assimilate_time,
        hfc.pierce_time,
    );
    Ok(())
}
