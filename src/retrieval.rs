//! Remote file retrieval
//!
//! A retrieval service answers a location URL with a small JSON ticket
//! naming the file's MD5 and a URI it can be downloaded from. Transport is
//! left to the implementor of [`FileRetrieval`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors reported by a retrieval service or its transport
#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("Invalid retrieval ticket: {0}")]
    InvalidTicket(#[from] serde_json::Error),

    #[error("No ticket for {location}: {reason}")]
    Unavailable { location: String, reason: String },

    #[error("Download of {uri} failed: {reason}")]
    Download { uri: String, reason: String },
}

pub type RetrievalResult<T> = Result<T, RetrievalError>;

/// Ticket returned by a retrieval service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievalTicket {
    pub md5sum: String,
    pub uri: String,
}

impl RetrievalTicket {
    pub fn from_json(text: &str) -> RetrievalResult<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

/// Fetches tickets and file bytes
pub trait FileRetrieval {
    /// Ask the service about the file at `location`
    fn ticket(&self, location: &str) -> RetrievalResult<RetrievalTicket>;

    /// Download the bytes a ticket points at
    fn fetch(&self, ticket: &RetrievalTicket) -> RetrievalResult<Vec<u8>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticket_from_service_json() {
        let ticket = RetrievalTicket::from_json(
            r#"{"md5sum": "d41d8cd98f00b204e9800998ecf8427e", "uri": "http://files.example/x"}"#,
        )
        .unwrap();
        assert_eq!(ticket.md5sum, "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(ticket.uri, "http://files.example/x");
    }

    #[test]
    fn ticket_requires_both_fields() {
        let err = RetrievalTicket::from_json(r#"{"uri": "x"}"#).unwrap_err();
        assert!(matches!(err, RetrievalError::InvalidTicket(_)));
    }
}
