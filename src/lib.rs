//! provgraph: provenance graphs for neuroimaging file collections
//!
//! Encodes a FreeSurfer subject directory, a delimited table, or a
//! FreeSurfer `.stats` report as a graph of PROV records (entities,
//! collections, activities, agents) joined by `hadMember`,
//! `wasDerivedFrom`, `wasGeneratedBy` and `wasAssociatedWith`.
//!
//! # Core Concepts
//!
//! - **Entities**: one per file, table row, column or anatomical structure,
//!   carrying digests, locations and heuristic tags
//! - **Collections**: subject directories, tables and stats reports
//! - **Jobs**: each encoding run is an activity associated with the user
//!   who ran it
//!
//! # Example
//!
//! ```no_run
//! use provgraph::{EncoderConfig, GraphOrchestrator};
//! use std::path::Path;
//!
//! let orchestrator = GraphOrchestrator::new(EncoderConfig::default());
//! let outcome = orchestrator
//!     .encode_directory(Path::new("/data/subjects/bert"), "demo")
//!     .unwrap();
//! println!("{}", provgraph::export::provn::render(&outcome.graph));
//! ```

pub mod config;
pub mod encode;
pub mod export;
pub mod graph;
pub mod hash;
pub mod identifier;
pub mod orchestrator;
pub mod retrieval;
pub mod tagger;

pub use config::{ConfigError, EncoderConfig};
pub use encode::{EncodeError, EncodeResult};
pub use export::{ExportError, ExportResult};
pub use graph::{
    Attributes, GraphError, GraphResult, Literal, NamespaceTable, ProvenanceGraph, QualifiedName,
    Record, RecordKind, Relation, RelationKind,
};
pub use hash::{Digest, DigestAlgorithm};
pub use identifier::{ContentIdentifiers, IdentifierMode, IdentifierPolicy, RandomIdentifiers};
pub use orchestrator::{FixedEnvironment, GraphOrchestrator, JobEnvironment, JobOutcome, SystemEnvironment};
pub use retrieval::{FileRetrieval, RetrievalError, RetrievalResult, RetrievalTicket};
pub use tagger::HeuristicTagger;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
