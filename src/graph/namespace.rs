//! Namespaces and qualified names

use serde::{Deserialize, Serialize};
use std::fmt;

/// Well-known namespace prefixes
pub mod prefix {
    pub const PROV: &str = "prov";
    pub const XSD: &str = "xsd";
    pub const RDF: &str = "rdf";
    pub const RDFS: &str = "rdfs";
    pub const FOAF: &str = "foaf";
    pub const DCTERMS: &str = "dcterms";
    pub const FS: &str = "fs";
    pub const NIDM: &str = "nidm";
    pub const NIIRI: &str = "niiri";
    pub const OBO: &str = "obo";
    pub const NIF: &str = "nif";
    pub const CRYPTO: &str = "crypto";
}

/// A namespace-qualified name such as `nidm:tag` or `niiri:3f2a...`
///
/// Serializes as the plain `prefix:local` string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct QualifiedName {
    prefix: String,
    local: String,
}

impl QualifiedName {
    pub fn new(prefix: impl Into<String>, local: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            local: local.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn local(&self) -> &str {
        &self.local
    }

    /// Parse `prefix:local`. The local part may itself contain `:`.
    pub fn parse(s: &str) -> Option<Self> {
        let (prefix, local) = s.split_once(':')?;
        if prefix.is_empty() || local.is_empty() {
            return None;
        }
        Some(Self::new(prefix, local))
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.prefix, self.local)
    }
}

impl From<QualifiedName> for String {
    fn from(name: QualifiedName) -> Self {
        name.to_string()
    }
}

impl TryFrom<String> for QualifiedName {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s).ok_or_else(|| format!("not a qualified name: {}", s))
    }
}

pub fn prov(local: &str) -> QualifiedName {
    QualifiedName::new(prefix::PROV, local)
}

pub fn xsd(local: &str) -> QualifiedName {
    QualifiedName::new(prefix::XSD, local)
}

pub fn rdfs(local: &str) -> QualifiedName {
    QualifiedName::new(prefix::RDFS, local)
}

pub fn foaf(local: &str) -> QualifiedName {
    QualifiedName::new(prefix::FOAF, local)
}

pub fn fs(local: &str) -> QualifiedName {
    QualifiedName::new(prefix::FS, local)
}

pub fn nidm(local: &str) -> QualifiedName {
    QualifiedName::new(prefix::NIDM, local)
}

pub fn niiri(local: &str) -> QualifiedName {
    QualifiedName::new(prefix::NIIRI, local)
}

pub fn obo(local: &str) -> QualifiedName {
    QualifiedName::new(prefix::OBO, local)
}

pub fn nif(local: &str) -> QualifiedName {
    QualifiedName::new(prefix::NIF, local)
}

pub fn crypto(local: &str) -> QualifiedName {
    QualifiedName::new(prefix::CRYPTO, local)
}

/// A registered prefix → URI binding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Namespace {
    pub prefix: String,
    pub uri: String,
}

impl Namespace {
    pub fn new(prefix: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            uri: uri.into(),
        }
    }
}

/// The set of namespaces a graph may reference
///
/// Registered once per graph; lookups are by prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NamespaceTable(Vec<Namespace>);

impl NamespaceTable {
    /// An empty table
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    /// The namespaces every encoding job uses
    pub fn standard() -> Self {
        Self(vec![
            Namespace::new(prefix::PROV, "http://www.w3.org/ns/prov#"),
            Namespace::new(prefix::XSD, "http://www.w3.org/2001/XMLSchema#"),
            Namespace::new(prefix::RDF, "http://www.w3.org/1999/02/22-rdf-syntax-ns#"),
            Namespace::new(prefix::RDFS, "http://www.w3.org/2000/01/rdf-schema#"),
            Namespace::new(prefix::FOAF, "http://xmlns.com/foaf/0.1/"),
            Namespace::new(prefix::DCTERMS, "http://purl.org/dc/terms/"),
            Namespace::new(prefix::FS, "http://freesurfer.net/fswiki/terms/"),
            Namespace::new(prefix::NIDM, "http://nidm.nidash.org/terms/"),
            Namespace::new(prefix::NIIRI, "http://nidm.nidash.org/iri/"),
            Namespace::new(prefix::OBO, "http://purl.obolibrary.org/obo/"),
            Namespace::new(prefix::NIF, "http://neurolex.org/wiki/"),
            Namespace::new(prefix::CRYPTO, "http://www.w3.org/2000/10/swap/crypto#"),
        ])
    }

    /// Register a namespace, replacing any existing binding for the prefix
    pub fn register(&mut self, namespace: Namespace) {
        match self.0.iter_mut().find(|ns| ns.prefix == namespace.prefix) {
            Some(existing) => existing.uri = namespace.uri,
            None => self.0.push(namespace),
        }
    }

    /// Merge another table into this one
    pub fn extend(&mut self, other: &NamespaceTable) {
        for ns in other.iter() {
            self.register(ns.clone());
        }
    }

    pub fn get(&self, prefix: &str) -> Option<&Namespace> {
        self.0.iter().find(|ns| ns.prefix == prefix)
    }

    pub fn contains(&self, prefix: &str) -> bool {
        self.get(prefix).is_some()
    }

    /// Expand a qualified name to its full URI
    pub fn expand(&self, name: &QualifiedName) -> Option<String> {
        self.get(name.prefix())
            .map(|ns| format!("{}{}", ns.uri, name.local()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Namespace> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for NamespaceTable {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_keeps_colons_in_local_part() {
        let name = QualifiedName::parse("fs:Left:Cortex").unwrap();
        assert_eq!(name.prefix(), "fs");
        assert_eq!(name.local(), "Left:Cortex");
        assert!(QualifiedName::parse("nocolon").is_none());
        assert!(QualifiedName::parse(":local").is_none());
    }

    #[test]
    fn expand_resolves_registered_prefix() {
        let table = NamespaceTable::standard();
        assert_eq!(
            table.expand(&nidm("tag")).as_deref(),
            Some("http://nidm.nidash.org/terms/tag")
        );
        assert_eq!(table.expand(&QualifiedName::new("nope", "x")), None);
    }

    #[test]
    fn register_replaces_existing_binding() {
        let mut table = NamespaceTable::standard();
        let before = table.len();
        table.register(Namespace::new("fs", "http://example.org/fs/"));
        assert_eq!(table.len(), before);
        assert_eq!(table.get("fs").unwrap().uri, "http://example.org/fs/");

        table.register(Namespace::new("ex", "http://example.org/"));
        assert_eq!(table.len(), before + 1);
    }
}
