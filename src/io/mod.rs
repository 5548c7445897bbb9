//! File formats: hMETIS hypergraphs and the sidecar files carrying the
//! cut problem parameters and the RNG seed.

pub mod hmetis;
pub mod sidecar;

use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by the readers. Malformed input is fatal at load time;
/// internal invariant violations are bugs and panic instead.
#[derive(Debug, Error)]
pub enum WhfcError {
    #[error("could not access '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed input in '{path}': {reason}")]
    InputMalformed { path: PathBuf, reason: String },
}

impl WhfcError {
    pub(crate) fn malformed(path: &std::path::Path, reason: impl Into<String>) -> Self {
        WhfcError::InputMalformed {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }

    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        WhfcError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}
