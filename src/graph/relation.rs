//! Typed relations between records

use super::namespace::{prov, QualifiedName};
use super::record::Attributes;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The relation kinds an encoding job produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RelationKind {
    /// collection → member
    HadMember,
    /// derived entity → source entity
    WasDerivedFrom,
    /// entity → activity
    WasGeneratedBy,
    /// activity → agent
    WasAssociatedWith,
}

impl RelationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationKind::HadMember => "hadMember",
            RelationKind::WasDerivedFrom => "wasDerivedFrom",
            RelationKind::WasGeneratedBy => "wasGeneratedBy",
            RelationKind::WasAssociatedWith => "wasAssociatedWith",
        }
    }

    /// The `prov:` predicate used when the relation is flattened to a triple
    pub fn predicate(&self) -> QualifiedName {
        prov(self.as_str())
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A directed, typed edge between two records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    pub kind: RelationKind,
    pub subject: QualifiedName,
    pub object: QualifiedName,
    #[serde(default, skip_serializing_if = "Attributes::is_empty")]
    pub attributes: Attributes,
}

impl Relation {
    pub fn new(kind: RelationKind, subject: QualifiedName, object: QualifiedName) -> Self {
        Self {
            kind,
            subject,
            object,
            attributes: Attributes::new(),
        }
    }

    pub fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = attributes;
        self
    }
}
