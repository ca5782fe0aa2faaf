//! Serializers for a finished graph
//!
//! Both walk records, then relations, in insertion order.
//!
//! - [`provn`]: PROV-N document text
//! - [`triples`]: N-Triples statements and batched `INSERT IN GRAPH` bodies

pub mod provn;
pub mod triples;

use crate::graph::QualifiedName;
use thiserror::Error;

/// Errors raised while serializing a graph
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Cannot expand {0}: prefix is not registered")]
    UnboundPrefix(QualifiedName),

    #[error("Batch size must be positive")]
    EmptyBatch,
}

/// Result type for export operations
pub type ExportResult<T> = Result<T, ExportError>;

/// Quote `s` as a double-quoted literal body
pub(crate) fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out
}
