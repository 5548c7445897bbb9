//! Sidecar files next to a hypergraph file.
//!
//! `<file>.whfc` holds one line with the cut problem parameters:
//! `maxBlockWeight0 maxBlockWeight1 upperFlowBound s t` (0-based node
//! ids). `<file>.generator` holds the serialized PRNG state for
//! deterministic replays: the decimal seed the generator was created
//! from.

use std::fs;
use std::io::Write as _;
use std::path::Path;
use std::path::PathBuf;

use crate::basic_types::Flow;
use crate::basic_types::Node;
use crate::basic_types::NodeWeight;
use crate::io::WhfcError;

#[derive(Debug, Clone, Copy)]
pub struct CutProblem {
    pub max_block_weight: [NodeWeight; 2],
    pub upper_flow_bound: Flow,
    pub s: Node,
    pub t: Node,
}

fn whfc_path(hg_path: &Path) -> PathBuf {
    let mut p = hg_path.as_os_str().to_owned();
    p.push(".whfc");
    PathBuf::from(p)
}

fn generator_path(hg_path: &Path) -> PathBuf {
    let mut p = hg_path.as_os_str().to_owned();
    p.push(".generator");
    PathBuf::from(p)
}

pub fn read_cut_problem(hg_path: &Path) -> Result<CutProblem, WhfcError> {
    let path = whfc_path(hg_path);
    let content = fs::read_to_string(&path).map_err(|e| WhfcError::io(&path, e))?;
    let mut fields = content.split_whitespace();
    let mut next = |what: &str| -> Result<i64, WhfcError> {
        fields
            .next()
            .ok_or_else(|| WhfcError::malformed(&path, format!("missing {}", what)))?
            .parse()
            .map_err(|_| WhfcError::malformed(&path, format!("could not parse {}", what)))
    };
    let mbw0 = next("maxBlockWeight0")?;
    let mbw1 = next("maxBlockWeight1")?;
    let bound = next("upperFlowBound")?;
    let s = next("s")?;
    let t = next("t")?;
    if mbw0 < 0 || mbw1 < 0 || s < 0 || t < 0 {
        return Err(WhfcError::malformed(&path, "negative field"));
    }
    Ok(CutProblem {
        max_block_weight: [mbw0 as NodeWeight, mbw1 as NodeWeight],
        upper_flow_bound: bound,
        s: s as Node,
        t: t as Node,
    })
}

pub fn write_cut_problem(hg_path: &Path, info: &CutProblem) -> Result<(), WhfcError> {
    let path = whfc_path(hg_path);
    let mut f = fs::File::create(&path).map_err(|e| WhfcError::io(&path, e))?;
    writeln!(
        f,
        "{} {} {} {} {}",
        info.max_block_weight[0], info.max_block_weight[1], info.upper_flow_bound, info.s, info.t
    )
    .map_err(|e| WhfcError::io(&path, e))
}

/// The seed is optional: a missing sidecar falls back to the given
/// default.
pub fn read_generator_seed(hg_path: &Path, default_seed: u64) -> Result<u64, WhfcError> {
    let path = generator_path(hg_path);
    match fs::read_to_string(&path) {
        Ok(content) => content
            .trim()
            .parse()
            .map_err(|_| WhfcError::malformed(&path, "could not parse generator seed")),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(default_seed),
        Err(e) => Err(WhfcError::io(&path, e)),
    }
}

pub fn write_generator_seed(hg_path: &Path, seed: u64) -> Result<(), WhfcError> {
    let path = generator_path(hg_path);
    let mut f = fs::File::create(&path).map_err(|e| WhfcError::io(&path, e))?;
    writeln!(f, "{}", seed).map_err(|e| WhfcError::io(&path, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cut_problem_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let hg_path = dir.path().join("g.hgr");
        let info = CutProblem {
            max_block_weight: [10, 12],
            upper_flow_bound: 42,
            s: 3,
            t: 7,
        };
        write_cut_problem(&hg_path, &info).unwrap();
        let back = read_cut_problem(&hg_path).unwrap();
        assert_eq!(back.max_block_weight, [10, 12]);
        assert_eq!(back.upper_flow_bound, 42);
        assert_eq!(back.s, 3);
        assert_eq!(back.t, 7);
    }

    #[test]
    fn missing_generator_sidecar_falls_back_to_the_default() {
        let dir = tempfile::tempdir().unwrap();
        let hg_path = dir.path().join("g.hgr");
        assert_eq!(read_generator_seed(&hg_path, 99).unwrap(), 99);
        write_generator_seed(&hg_path, 7).unwrap();
        assert_eq!(read_generator_seed(&hg_path, 99).unwrap(), 7);
    }
}
