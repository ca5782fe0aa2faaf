//! Core provenance graph data structures

pub mod namespace;
mod provenance;
mod record;
mod relation;


pub use namespace::{Namespace, NamespaceTable, QualifiedName};
pub use provenance::{GraphError, GraphResult, ProvenanceGraph};
pub use record::{Attributes, Literal, Record, RecordKind};
pub use relation::{Relation, RelationKind};
