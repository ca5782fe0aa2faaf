//! Identifier generation policies
//!
//! Every record a job creates gets a `niiri:` local name from an
//! [`IdentifierPolicy`]. Call sites always pass a seed naming the logical
//! object (for a file: subject, relative path, digest), and the policy
//! decides whether to use it.
//!
//! - [`ContentIdentifiers`]: UUID v5 over the seed. Re-encoding an unchanged
//!   tree reproduces every identifier, so uploads of the same data collide
//!   in the store instead of duplicating.
//! - [`RandomIdentifiers`]: UUID v4. Every run yields fresh identifiers;
//!   two uploads of the same data stay distinct.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// UUID v5 namespace for content-derived identifiers
const CONTENT_NS: Uuid = Uuid::from_bytes([
    0x3b, 0x1e, 0x6d, 0x52, 0x8c, 0x47, 0x4f, 0x0a,
    0x9e, 0x25, 0x71, 0xd4, 0x0c, 0x8e, 0xa1, 0x63,
]);

/// Produces local names for new records
pub trait IdentifierPolicy: Send + Sync {
    /// Mint an identifier for the object described by `seed`
    fn mint(&self, seed: &[&str]) -> String;

    /// True if equal seeds always produce equal identifiers
    fn is_deterministic(&self) -> bool;
}

/// Fresh random identifiers for every record
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomIdentifiers;

impl IdentifierPolicy for RandomIdentifiers {
    fn mint(&self, _seed: &[&str]) -> String {
        Uuid::new_v4().simple().to_string()
    }

    fn is_deterministic(&self) -> bool {
        false
    }
}

/// Identifiers derived from the seed
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentIdentifiers;

impl IdentifierPolicy for ContentIdentifiers {
    fn mint(&self, seed: &[&str]) -> String {
        let input = seed.join(":");
        Uuid::new_v5(&CONTENT_NS, input.as_bytes()).simple().to_string()
    }

    fn is_deterministic(&self) -> bool {
        true
    }
}

/// Configured identifier mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentifierMode {
    #[default]
    Random,
    Content,
}

impl IdentifierMode {
    pub fn policy(&self) -> Box<dyn IdentifierPolicy> {
        match self {
            IdentifierMode::Random => Box::new(RandomIdentifiers),
            IdentifierMode::Content => Box::new(ContentIdentifiers),
        }
    }
}
