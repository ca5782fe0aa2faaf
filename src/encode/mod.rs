//! Encoders that turn file trees, tables and stats reports into graph records
//!
//! - [`entity`]: one file → one attributed entity
//! - [`collection`]: membership bookkeeping for a collection
//! - [`walker`]: bounded traversal of a subject directory
//! - [`table`]: delimited tables → column and row entities
//! - [`stats`]: FreeSurfer `.stats` reports → per-structure measure entities

pub mod collection;
pub mod entity;
pub mod stats;
pub mod table;
pub mod walker;

pub use collection::CollectionBuilder;
pub use entity::{EntityFactory, FileEntity};
pub use stats::{MeasureDefinition, StatsEncoder, StatsEncoding, StatsError, StatsReport};
pub use table::{encode_value, TableEncoder, TableEncoding};
pub use walker::{DirectoryWalker, SubjectEncoding, WalkSummary};

use crate::graph::GraphError;
use crate::retrieval::RetrievalError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while encoding
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("Root directory not found: {0}")]
    RootNotFound(PathBuf),

    #[error("Input file not found: {0}")]
    InputNotFound(PathBuf),

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} is not under subject root {root}")]
    OutsideRoot { path: PathBuf, root: PathBuf },

    #[error("Table error: {0}")]
    Table(#[from] csv::Error),

    #[error("Stats report error: {0}")]
    Stats(#[from] StatsError),

    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("Digest mismatch for {uri}: recorded {recorded}, received {received}")]
    DigestMismatch {
        uri: String,
        recorded: String,
        received: String,
    },

    #[error("Retrieval failed: {0}")]
    Retrieval(#[from] RetrievalError),
}

impl EncodeError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        EncodeError::Io {
            path: path.into(),
            source,
        }
    }

    /// True for errors confined to a single file, which a walk logs and skips
    pub fn is_file_level(&self) -> bool {
        matches!(self, EncodeError::Io { .. } | EncodeError::OutsideRoot { .. })
    }
}

/// Result type for encoding operations
pub type EncodeResult<T> = Result<T, EncodeError>;

/// Make `raw` safe to use as the local part of a qualified name
///
/// Keeps ASCII alphanumerics, `_`, `-` and `.`; everything else becomes `_`.
pub(crate) fn local_name(raw: &str) -> String {
    raw.trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}
