//! Scratch fixtures

use chrono::{TimeZone, Utc};
use provgraph::{EncoderConfig, FixedEnvironment, GraphOrchestrator};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use walkdir::WalkDir;

/// A segmentation report with one structure reported in both the header
/// measures and the table
pub const ASEG_STATS: &str = "\
# Title Segmentation Statistics
# generating_program mri_segstats
# subjectname bert
# Measure BrainSeg, BrainSegVol, Brain Segmentation Volume, 1243340.000000, mm^3
# Measure Left-Hippocampus, HippoVol, Hippocampus Volume, 4200.5, mm^3
# TableCol  1 ColHeader Index
# TableCol  1 FieldName Index
# TableCol  1 Units     NA
# TableCol  2 ColHeader NVoxels
# TableCol  2 FieldName Number of Voxels
# TableCol  2 Units     unitless
# TableCol  3 ColHeader Volume_mm3
# TableCol  3 FieldName Volume
# TableCol  3 Units     mm^3
# TableCol  4 ColHeader StructName
# TableCol  4 FieldName Structure Name
# TableCol  4 Units     NA
# ColHeaders  Index NVoxels Volume_mm3 StructName
  1   4051   4105.2  Left-Hippocampus
  2   1520   1530.0  Left-Amygdala
";

/// Two columns; row 2 is missing B
pub const SCORES_CSV: &str = "A,B\n1,2.5\n2,N/A\n";

/// Ignore tokens that cannot collide with scratch directory names
pub fn test_config() -> EncoderConfig {
    EncoderConfig {
        ignore: vec!["trash".into(), "bak".into()],
        ..EncoderConfig::default()
    }
}

/// Orchestrator with a fixed clock, user and host
pub fn orchestrator(config: EncoderConfig) -> GraphOrchestrator {
    GraphOrchestrator::new(config).with_environment(FixedEnvironment {
        now: Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap(),
        user: "tester".into(),
        hostname: "lab.example".into(),
    })
}

/// A FreeSurfer-like subject directory in a temp dir
pub struct SubjectTree {
    _dir: TempDir,
    pub root: PathBuf,
}

impl SubjectTree {
    pub fn new(subject: &str) -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let root = dir.path().join(subject);
        fs::create_dir_all(&root).expect("create subject root");
        Self { _dir: dir, root }
    }

    /// The `bert` layout: scans, surfaces, labels, a report, plus files
    /// that must never be encoded
    pub fn bert() -> Self {
        Self::new("bert")
            .with_file("mri/T1.mgz", b"t1 volume")
            .with_file("mri/aseg.mgz", b"segmentation")
            .with_file("surf/lh.white", b"left white surface")
            .with_file("surf/rh.pial", b"right pial surface")
            .with_file("label/lh.BA1.label", b"ba1")
            .with_file("label/rh.cortex.label", b"cortex")
            .with_file("stats/aseg.stats", ASEG_STATS.as_bytes())
            .with_file("scripts/recon-all.log", b"log")
            .with_file("trash/old.mgz", b"old")
            .with_file("surf/lh.white.bak", b"backup")
            .with_file(".xdebug_mris_calc", b"hidden")
    }

    pub fn with_file(self, relative: &str, contents: &[u8]) -> Self {
        let path = self.root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent");
        }
        fs::write(&path, contents).expect("write fixture file");
        self
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }
}

/// Relative paths of the files a walk should encode: regular, not hidden,
/// no ignore token in the path
pub fn eligible_files(root: &Path, ignore: &[String]) -> Vec<String> {
    WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| !e.file_name().to_string_lossy().starts_with('.'))
        .filter(|e| {
            let path = e.path().to_string_lossy();
            !ignore.iter().any(|t| path.contains(t.as_str()))
        })
        .map(|e| {
            e.path()
                .strip_prefix(root)
                .unwrap_or(e.path())
                .to_string_lossy()
                .into_owned()
        })
        .collect()
}
