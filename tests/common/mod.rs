//! Common test utilities for provgraph integration tests
//!
//! Scratch subject trees, report fixtures, and an orchestrator with a
//! fixed clock, user and host.

pub mod fixtures;

pub use fixtures::{
    eligible_files, orchestrator, test_config, SubjectTree, ASEG_STATS, SCORES_CSV,
};
