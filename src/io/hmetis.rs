//! hMETIS hypergraph files.
//!
//! ASCII format: the first non-comment line is `m n [type]` with `m`
//! hyperedges, `n` nodes and a type code describing which weights follow.
//! Then one line per hyperedge (optional integer weight first, then
//! 1-based pin ids), then, if node-weighted, `n` lines of node weights.
//! Lines starting with `%` are comments. Hyperedges with at most one pin
//! are rejected.

use std::fs;
use std::io::Write as _;
use std::path::Path;

use enumset::EnumSet;
use enumset::EnumSetType;

use crate::basic_types::Flow;
use crate::basic_types::NodeWeight;
use crate::datastructure::FlowHypergraph;
use crate::datastructure::FlowHypergraphBuilder;
use crate::io::WhfcError;

/// Which weights the type code of the header announces.
#[derive(Debug, EnumSetType)]
pub enum WeightKind {
    HyperedgeWeights,
    NodeWeights,
}

fn parse_type_code(path: &Path, code: u32) -> Result<EnumSet<WeightKind>, WhfcError> {
    match code {
        0 => Ok(EnumSet::empty()),
        1 => Ok(WeightKind::HyperedgeWeights.into()),
        10 => Ok(WeightKind::NodeWeights.into()),
        11 => Ok(WeightKind::HyperedgeWeights | WeightKind::NodeWeights),
        _ => Err(WhfcError::malformed(
            path,
            format!("unknown hypergraph type code {}", code),
        )),
    }
}

fn type_code(kinds: EnumSet<WeightKind>) -> u32 {
    let mut code = 0;
    if kinds.contains(WeightKind::HyperedgeWeights) {
        code += 1;
    }
    if kinds.contains(WeightKind::NodeWeights) {
        code += 10;
    }
    code
}

pub fn read_flow_hypergraph(path: &Path) -> Result<FlowHypergraph, WhfcError> {
    let content = fs::read_to_string(path).map_err(|e| WhfcError::io(path, e))?;
    parse_flow_hypergraph(path, &content)
}

fn parse_flow_hypergraph(path: &Path, content: &str) -> Result<FlowHypergraph, WhfcError> {
    let mut lines = content
        .lines()
        .filter(|line| !line.trim_start().starts_with('%'));

    let header = lines
        .next()
        .ok_or_else(|| WhfcError::malformed(path, "missing header line"))?;
    let mut header_fields = header.split_whitespace();
    let num_hyperedges: usize = parse_field(path, header_fields.next(), "hyperedge count")?;
    let num_nodes: usize = parse_field(path, header_fields.next(), "node count")?;
    let kinds = match header_fields.next() {
        Some(code) => parse_type_code(path, parse_str(path, code, "type code")?)?,
        None => EnumSet::empty(),
    };

    let mut builder = FlowHypergraphBuilder::with_nodes(num_nodes);

    for _ in 0..num_hyperedges {
        let line = lines
            .next()
            .ok_or_else(|| WhfcError::malformed(path, "fewer hyperedge lines than announced"))?;
        let mut fields = line.split_whitespace();

        let capacity: Flow = if kinds.contains(WeightKind::HyperedgeWeights) {
            parse_field(path, fields.next(), "hyperedge weight")?
        } else {
            1
        };
        builder.start_hyperedge(capacity);

        let mut pin_count = 0usize;
        for field in fields {
            let pin: usize = parse_str(path, field, "pin id")?;
            if pin < 1 {
                return Err(WhfcError::malformed(path, "pin id < 1 (ids are one-based)"));
            }
            if pin > num_nodes {
                return Err(WhfcError::malformed(path, "pin id exceeds the node count"));
            }
            builder.add_pin(pin - 1);
            pin_count += 1;
        }
        if pin_count <= 1 {
            return Err(WhfcError::malformed(
                path,
                "hyperedge with zero or one pins",
            ));
        }
    }

    if kinds.contains(WeightKind::NodeWeights) {
        for u in 0..num_nodes {
            let line = lines
                .next()
                .ok_or_else(|| WhfcError::malformed(path, "fewer node weights than nodes"))?;
            let weight: NodeWeight = parse_str(path, line.trim(), "node weight")?;
            builder.set_node_weight(u, weight);
        }
    }

    Ok(builder.finalize())
}

fn parse_field<T: std::str::FromStr>(
    path: &Path,
    field: Option<&str>,
    what: &str,
) -> Result<T, WhfcError> {
    let field = field.ok_or_else(|| WhfcError::malformed(path, format!("missing {}", what)))?;
    parse_str(path, field, what)
}

fn parse_str<T: std::str::FromStr>(path: &Path, field: &str, what: &str) -> Result<T, WhfcError> {
    field
        .parse()
        .map_err(|_| WhfcError::malformed(path, format!("could not parse {} '{}'", what, field)))
}

/// Writes the hypergraph with the smallest type code that preserves the
/// weights; round-trips with [`read_flow_hypergraph`].
pub fn write_flow_hypergraph(hg: &FlowHypergraph, path: &Path) -> Result<(), WhfcError> {
    let has_node_weights = (0..hg.num_nodes()).any(|u| hg.node_weight(u) != 1);
    let has_hyperedge_weights = (0..hg.num_hyperedges()).any(|e| hg.capacity(e) != 1);
    let mut kinds = EnumSet::empty();
    if has_node_weights {
        kinds |= WeightKind::NodeWeights;
    }
    if has_hyperedge_weights {
        kinds |= WeightKind::HyperedgeWeights;
    }

    let mut out = String::new();
    out.push_str(&format!("{} {}", hg.num_hyperedges(), hg.num_nodes()));
    if !kinds.is_empty() {
        out.push_str(&format!(" {}", type_code(kinds)));
    }
    out.push('\n');

    for e in 0..hg.num_hyperedges() {
        assert!(hg.pin_count(e) > 1, "hyperedge {} has too few pins", e);
        let mut first = true;
        if has_hyperedge_weights {
            out.push_str(&format!("{}", hg.capacity(e)));
            first = false;
        }
        for p in hg.pins_of(e) {
            if !first {
                out.push(' ');
            }
            out.push_str(&format!("{}", p.pin + 1));
            first = false;
        }
        out.push('\n');
    }
    if has_node_weights {
        for u in 0..hg.num_nodes() {
            out.push_str(&format!("{}\n", hg.node_weight(u)));
        }
    }

    let mut f = fs::File::create(path).map_err(|e| WhfcError::io(path, e))?;
    f.write_all(out.as_bytes()).map_err(|e| WhfcError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_unweighted_graphs_and_skips_comments() {
        let text = "% a comment\n2 3\n1 2\n% another\n2 3\n";
        let hg = parse_flow_hypergraph(Path::new("test.hgr"), text).unwrap();
        assert_eq!(hg.num_nodes(), 3);
        assert_eq!(hg.num_hyperedges(), 2);
        assert_eq!(hg.capacity(0), 1);
        assert_eq!(hg.node_weight(0), 1);
        assert_eq!(hg.pins_of(1)[0].pin, 1);
    }

    #[test]
    fn parses_edge_and_node_weights() {
        let text = "1 2 11\n7 1 2\n3\n4\n";
        let hg = parse_flow_hypergraph(Path::new("test.hgr"), text).unwrap();
        assert_eq!(hg.capacity(0), 7);
        assert_eq!(hg.node_weight(0), 3);
        assert_eq!(hg.node_weight(1), 4);
        assert_eq!(hg.total_node_weight(), 7);
    }

    #[test]
    fn rejects_single_pin_hyperedges_and_bad_ids() {
        let single_pin = "1 2\n1\n";
        assert!(parse_flow_hypergraph(Path::new("t"), single_pin).is_err());
        let zero_id = "1 2\n0 1\n";
        assert!(parse_flow_hypergraph(Path::new("t"), zero_id).is_err());
        let out_of_range = "1 2\n1 3\n";
        assert!(parse_flow_hypergraph(Path::new("t"), out_of_range).is_err());
    }

    #[test]
    fn writer_round_trips_through_the_reader() {
        let text = "2 3 11\n5 1 2\n2 2 3\n1\n2\n3\n";
        let hg = parse_flow_hypergraph(Path::new("t"), text).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roundtrip.hgr");
        write_flow_hypergraph(&hg, &path).unwrap();
        let back = read_flow_hypergraph(&path).unwrap();

        assert_eq!(back.num_nodes(), hg.num_nodes());
        assert_eq!(back.num_hyperedges(), hg.num_hyperedges());
        for e in 0..hg.num_hyperedges() {
            assert_eq!(back.capacity(e), hg.capacity(e));
            let pins: Vec<_> = back.pins_of(e).iter().map(|p| p.pin).collect();
            let expected: Vec<_> = hg.pins_of(e).iter().map(|p| p.pin).collect();
            assert_eq!(pins, expected);
        }
        for u in 0..hg.num_nodes() {
            assert_eq!(back.node_weight(u), hg.node_weight(u));
        }
    }
}
