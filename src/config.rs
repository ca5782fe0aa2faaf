//! Encoder configuration
//!
//! One [`EncoderConfig`] is built per process (from defaults, a YAML file,
//! and CLI overrides) and handed to the orchestrator. Nothing here is
//! mutated once a job starts.

use crate::graph::{Namespace, NamespaceTable};
use crate::hash::DigestAlgorithm;
use crate::identifier::IdentifierMode;
use crate::tagger::{freesurfer_rules, TagRule};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Settings for delimited-table encoding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    /// Field delimiter
    pub delimiter: char,
    /// Cell values treated as missing
    pub na_values: Vec<String>,
    /// Stop after this many data rows
    pub max_rows: Option<usize>,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            delimiter: ',',
            na_values: vec!["N/A".into(), "pending".into(), "-999".into()],
            max_rows: None,
        }
    }
}

/// Settings for stats-report encoding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsConfig {
    /// Units whose values are counts rather than measurements
    pub unitless_units: Vec<String>,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            unitless_units: vec!["unitless".into(), "NA".into()],
        }
    }
}

/// Everything an encoding job needs to know up front
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    /// Namespaces registered in addition to the standard table
    pub extra_namespaces: Vec<Namespace>,
    /// Filename heuristics, in table order
    pub tag_rules: Vec<TagRule>,
    /// Any file whose path contains one of these is skipped
    pub ignore: Vec<String>,
    /// Stop the walk after this many file entities
    pub max_items: usize,
    /// Digests recorded for each file; the first seeds content identifiers
    pub digests: Vec<DigestAlgorithm>,
    /// Retrieval service URL; file locations become `<base>?file_uri=<file url>`
    pub location_base: Option<String>,
    /// Hostname used in file URLs; the system hostname when absent
    pub hostname: Option<String>,
    pub identifiers: IdentifierMode,
    /// Role recorded on the activity → agent association
    pub agent_role: String,
    pub table: TableConfig,
    pub stats: StatsConfig,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            extra_namespaces: Vec::new(),
            tag_rules: freesurfer_rules(),
            ignore: ["bak", "src", "tmp", "trash", "touch"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            max_items: 100_000,
            digests: vec![DigestAlgorithm::Md5, DigestAlgorithm::Sha512],
            location_base: None,
            hostname: None,
            identifiers: IdentifierMode::default(),
            agent_role: "LoggedInUser".into(),
            table: TableConfig::default(),
            stats: StatsConfig::default(),
        }
    }
}

impl EncoderConfig {
    /// Parse a YAML document; missing keys take their defaults
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: EncoderConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a YAML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&text)
    }

    /// Load `path` if given, else the default file if it exists, else defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            return Self::load(path);
        }
        match default_config_path() {
            Some(path) if path.is_file() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Standard namespaces plus any configured extras
    pub fn namespace_table(&self) -> NamespaceTable {
        let mut table = NamespaceTable::standard();
        for ns in &self.extra_namespaces {
            table.register(ns.clone());
        }
        table
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.ignore.iter().any(|s| s.is_empty()) {
            return Err(ConfigError::Invalid(
                "empty ignore token would exclude every file".into(),
            ));
        }
        if self.tag_rules.iter().any(|r| r.token.is_empty()) {
            return Err(ConfigError::Invalid("tag rule with empty token".into()));
        }
        if self.agent_role.is_empty() {
            return Err(ConfigError::Invalid("agent_role must not be empty".into()));
        }
        Ok(())
    }
}

/// Default config location (`~/.config/provgraph/config.yaml` on Linux)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("provgraph").join("config.yaml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_freesurfer_conventions() {
        let config = EncoderConfig::default();
        assert_eq!(config.max_items, 100_000);
        assert_eq!(config.ignore, vec!["bak", "src", "tmp", "trash", "touch"]);
        assert_eq!(config.digests, vec![DigestAlgorithm::Md5, DigestAlgorithm::Sha512]);
        assert_eq!(config.identifiers, IdentifierMode::Random);
        assert!(!config.tag_rules.is_empty());
    }

    #[test]
    fn partial_yaml_keeps_other_defaults() {
        let config = EncoderConfig::from_yaml_str(
            "max_items: 5\nidentifiers: content\nignore: [scratch]\n",
        )
        .unwrap();
        assert_eq!(config.max_items, 5);
        assert_eq!(config.identifiers, IdentifierMode::Content);
        assert_eq!(config.ignore, vec!["scratch"]);
        assert_eq!(config.agent_role, "LoggedInUser");
        assert_eq!(config.table.na_values, vec!["N/A", "pending", "-999"]);
    }

    #[test]
    fn yaml_tag_rules_and_namespaces() {
        let yaml = r#"
extra_namespaces:
  - prefix: ex
    uri: "http://example.org/"
tag_rules:
  - token: bold
    terms:
      - value: "ex:FunctionalScan"
      - predicate: "nidm:AnatomicalAnnotation"
        value: "obo:UBERON_0000955"
"#;
        let config = EncoderConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.tag_rules.len(), 1);
        assert!(config.tag_rules[0].terms[0].predicate.is_none());
        assert!(config.namespace_table().contains("ex"));
        assert!(config.namespace_table().contains("prov"));
    }

    #[test]
    fn empty_ignore_token_is_rejected() {
        let err = EncoderConfig::from_yaml_str("ignore: ['']").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "max_items: 12").unwrap();

        let config = EncoderConfig::load_or_default(Some(&path)).unwrap();
        assert_eq!(config.max_items, 12);

        let missing = dir.path().join("nope.yaml");
        assert!(matches!(
            EncoderConfig::load(&missing),
            Err(ConfigError::Io { .. })
        ));
    }
}
