//! Record representation in the provenance graph

use super::namespace::{nidm, QualifiedName};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Typed attribute values
///
/// Every variant except `Name` is a literal with an XSD datatype;
/// `Name` refers to another resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Literal {
    String(String),
    Integer(i64),
    Float(f64),
    Uri(String),
    DateTime(DateTime<Utc>),
    Name(QualifiedName),
}

impl Literal {
    /// XSD datatype local name, or `None` for resource references
    pub fn datatype(&self) -> Option<&'static str> {
        match self {
            Literal::String(_) => Some("string"),
            Literal::Integer(_) => Some("integer"),
            Literal::Float(_) => Some("float"),
            Literal::Uri(_) => Some("anyURI"),
            Literal::DateTime(_) => Some("dateTime"),
            Literal::Name(_) => None,
        }
    }

    /// Lexical form of the value
    pub fn lexical(&self) -> String {
        match self {
            Literal::String(s) | Literal::Uri(s) => s.clone(),
            Literal::Integer(i) => i.to_string(),
            Literal::Float(f) => f.to_string(),
            Literal::DateTime(t) => t.to_rfc3339(),
            Literal::Name(n) => n.to_string(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Literal::String(s) | Literal::Uri(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for Literal {
    fn from(s: &str) -> Self {
        Literal::String(s.to_string())
    }
}

impl From<String> for Literal {
    fn from(s: String) -> Self {
        Literal::String(s)
    }
}

impl From<i64> for Literal {
    fn from(i: i64) -> Self {
        Literal::Integer(i)
    }
}

impl From<f64> for Literal {
    fn from(f: f64) -> Self {
        Literal::Float(f)
    }
}

impl From<QualifiedName> for Literal {
    fn from(name: QualifiedName) -> Self {
        Literal::Name(name)
    }
}

/// Ordered multimap from predicate to value
///
/// Predicates may repeat (an entity carries many `nidm:tag` values), so
/// this is a list of pairs rather than a map. Insertion order is kept.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attributes(Vec<(QualifiedName, Literal)>);

impl Attributes {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Append a pair
    pub fn push(&mut self, key: QualifiedName, value: impl Into<Literal>) {
        self.0.push((key, value.into()));
    }

    /// Append a pair, builder style
    pub fn with(mut self, key: QualifiedName, value: impl Into<Literal>) -> Self {
        self.push(key, value);
        self
    }

    /// Append every pair of `other`, keeping its order
    pub fn extend(&mut self, other: Attributes) {
        self.0.extend(other.0);
    }

    /// All values recorded under `key`, in insertion order
    pub fn get_all<'a>(&'a self, key: &QualifiedName) -> impl Iterator<Item = &'a Literal> + 'a {
        let key = key.clone();
        self.0.iter().filter(move |(k, _)| *k == key).map(|(_, v)| v)
    }

    /// First value recorded under `key`
    pub fn first(&self, key: &QualifiedName) -> Option<&Literal> {
        self.get_all(key).next()
    }

    pub fn contains_key(&self, key: &QualifiedName) -> bool {
        self.0.iter().any(|(k, _)| k == key)
    }

    /// True if the exact pair is present
    pub fn contains(&self, key: &QualifiedName, value: &Literal) -> bool {
        self.0.iter().any(|(k, v)| k == key && v == value)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(QualifiedName, Literal)> {
        self.0.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &QualifiedName> {
        self.0.iter().map(|(k, _)| k)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(QualifiedName, Literal)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (QualifiedName, Literal)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Record kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RecordKind {
    Entity,
    /// An entity that groups members via `hadMember`
    Collection,
    Activity {
        start_time: Option<DateTime<Utc>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        end_time: Option<DateTime<Utc>>,
    },
    Agent,
}

impl RecordKind {
    pub fn name(&self) -> &'static str {
        match self {
            RecordKind::Entity => "entity",
            RecordKind::Collection => "collection",
            RecordKind::Activity { .. } => "activity",
            RecordKind::Agent => "agent",
        }
    }

    /// Entities and collections are both PROV entities
    pub fn is_entity_like(&self) -> bool {
        matches!(self, RecordKind::Entity | RecordKind::Collection)
    }
}

/// A record in the provenance graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Unique identifier within the graph
    pub id: QualifiedName,
    #[serde(flatten)]
    pub kind: RecordKind,
    pub attributes: Attributes,
}

impl Record {
    pub fn entity(id: QualifiedName) -> Self {
        Self {
            id,
            kind: RecordKind::Entity,
            attributes: Attributes::new(),
        }
    }

    pub fn collection(id: QualifiedName) -> Self {
        Self {
            id,
            kind: RecordKind::Collection,
            attributes: Attributes::new(),
        }
    }

    pub fn activity(id: QualifiedName, start_time: DateTime<Utc>) -> Self {
        Self {
            id,
            kind: RecordKind::Activity {
                start_time: Some(start_time),
                end_time: None,
            },
            attributes: Attributes::new(),
        }
    }

    pub fn agent(id: QualifiedName) -> Self {
        Self {
            id,
            kind: RecordKind::Agent,
            attributes: Attributes::new(),
        }
    }

    /// Add an attribute
    pub fn with_attribute(mut self, key: QualifiedName, value: impl Into<Literal>) -> Self {
        self.attributes.push(key, value);
        self
    }

    /// Add several attributes
    pub fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.attributes.extend(attributes);
        self
    }

    /// The `nidm:tag` values, in order
    pub fn tags(&self) -> Vec<&str> {
        let key = nidm("tag");
        self.attributes
            .get_all(&key)
            .filter_map(Literal::as_str)
            .collect()
    }
}
