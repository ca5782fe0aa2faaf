//! ProvenanceGraph: the append-only record and relation store for one job

use super::namespace::{prov, NamespaceTable, QualifiedName};
use super::record::{Attributes, Literal, Record, RecordKind};
use super::relation::{Relation, RelationKind};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;

/// Errors raised by graph mutations
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("Duplicate identifier: {0}")]
    DuplicateIdentifier(QualifiedName),

    #[error("Record not found: {0}")]
    RecordNotFound(QualifiedName),

    #[error("Unregistered namespace prefix '{prefix}' in {name}")]
    UnknownNamespace { prefix: String, name: QualifiedName },

    #[error("Record {id} is a {actual}, expected {expected}")]
    KindMismatch {
        id: QualifiedName,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("Record {0} does not accept additional attributes")]
    ImmutableRecord(QualifiedName),
}

/// Result type for graph operations
pub type GraphResult<T> = Result<T, GraphError>;

/// An in-memory provenance graph
///
/// Records and relations are kept in insertion order, which is the order
/// serializers traverse them. Records are never removed; the only permitted
/// mutation of an existing record is appending attributes to an entity or
/// collection (see [`ProvenanceGraph::append_attributes`]).
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProvenanceGraph {
    namespaces: NamespaceTable,
    records: Vec<Record>,
    relations: Vec<Relation>,
    #[serde(skip)]
    index: HashMap<QualifiedName, usize>,
}

impl ProvenanceGraph {
    /// Create an empty graph over the given namespaces
    pub fn new(namespaces: NamespaceTable) -> Self {
        Self {
            namespaces,
            records: Vec::new(),
            relations: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn namespaces(&self) -> &NamespaceTable {
        &self.namespaces
    }

    /// Insert a record
    ///
    /// Fails if the identifier is already taken or any name uses an
    /// unregistered prefix.
    pub fn add_record(&mut self, record: Record) -> GraphResult<QualifiedName> {
        if self.index.contains_key(&record.id) {
            return Err(GraphError::DuplicateIdentifier(record.id));
        }
        self.check_namespace(&record.id)?;
        self.check_attributes(&record.attributes)?;

        let id = record.id.clone();
        self.index.insert(id.clone(), self.records.len());
        self.records.push(record);
        Ok(id)
    }

    /// Insert an entity
    pub fn entity(&mut self, id: QualifiedName, attributes: Attributes) -> GraphResult<QualifiedName> {
        self.add_record(Record::entity(id).with_attributes(attributes))
    }

    /// Insert a collection
    pub fn collection(&mut self, id: QualifiedName, attributes: Attributes) -> GraphResult<QualifiedName> {
        self.add_record(Record::collection(id).with_attributes(attributes))
    }

    /// Insert an activity started at `start_time`
    pub fn activity(
        &mut self,
        id: QualifiedName,
        start_time: DateTime<Utc>,
        attributes: Attributes,
    ) -> GraphResult<QualifiedName> {
        self.add_record(Record::activity(id, start_time).with_attributes(attributes))
    }

    /// Insert an agent
    pub fn agent(&mut self, id: QualifiedName, attributes: Attributes) -> GraphResult<QualifiedName> {
        self.add_record(Record::agent(id).with_attributes(attributes))
    }

    /// Append attributes to an existing entity or collection
    ///
    /// Used when a second source describes a structure already in the graph.
    pub fn append_attributes(&mut self, id: &QualifiedName, attributes: Attributes) -> GraphResult<()> {
        self.check_attributes(&attributes)?;
        let idx = *self
            .index
            .get(id)
            .ok_or_else(|| GraphError::RecordNotFound(id.clone()))?;
        let record = &mut self.records[idx];
        if !record.kind.is_entity_like() {
            return Err(GraphError::ImmutableRecord(id.clone()));
        }
        record.attributes.extend(attributes);
        Ok(())
    }

    /// Record that `member` belongs to `collection`
    ///
    /// The graph does not reject a repeated membership; callers keep
    /// their own bookkeeping (see `CollectionBuilder`).
    pub fn had_member(&mut self, collection: &QualifiedName, member: &QualifiedName) -> GraphResult<()> {
        self.expect_kind(collection, "collection", |k| matches!(k, RecordKind::Collection))?;
        self.expect_kind(member, "entity", RecordKind::is_entity_like)?;
        self.push_relation(Relation::new(
            RelationKind::HadMember,
            collection.clone(),
            member.clone(),
        ));
        Ok(())
    }

    /// Record that `derived` was derived from `source`
    pub fn was_derived_from(&mut self, derived: &QualifiedName, source: &QualifiedName) -> GraphResult<()> {
        self.expect_kind(derived, "entity", RecordKind::is_entity_like)?;
        self.expect_kind(source, "entity", RecordKind::is_entity_like)?;
        self.push_relation(Relation::new(
            RelationKind::WasDerivedFrom,
            derived.clone(),
            source.clone(),
        ));
        Ok(())
    }

    /// Record that `entity` was generated by `activity`
    pub fn was_generated_by(&mut self, entity: &QualifiedName, activity: &QualifiedName) -> GraphResult<()> {
        self.expect_kind(entity, "entity", RecordKind::is_entity_like)?;
        self.expect_kind(activity, "activity", |k| matches!(k, RecordKind::Activity { .. }))?;
        self.push_relation(Relation::new(
            RelationKind::WasGeneratedBy,
            entity.clone(),
            activity.clone(),
        ));
        Ok(())
    }

    /// Record that `activity` was carried out by `agent` in `role`
    pub fn was_associated_with(
        &mut self,
        activity: &QualifiedName,
        agent: &QualifiedName,
        role: &str,
    ) -> GraphResult<()> {
        self.expect_kind(activity, "activity", |k| matches!(k, RecordKind::Activity { .. }))?;
        self.expect_kind(agent, "agent", |k| matches!(k, RecordKind::Agent))?;
        let attributes = Attributes::new().with(prov("role"), Literal::from(role));
        self.push_relation(
            Relation::new(RelationKind::WasAssociatedWith, activity.clone(), agent.clone())
                .with_attributes(attributes),
        );
        Ok(())
    }

    /// Get a record by ID
    pub fn get(&self, id: &QualifiedName) -> Option<&Record> {
        self.index.get(id).map(|&idx| &self.records[idx])
    }

    pub fn contains(&self, id: &QualifiedName) -> bool {
        self.index.contains_key(id)
    }

    /// All records in insertion order
    pub fn records(&self) -> impl Iterator<Item = &Record> {
        self.records.iter()
    }

    /// All relations in insertion order
    pub fn relations(&self) -> impl Iterator<Item = &Relation> {
        self.relations.iter()
    }

    /// Relations of one kind, in insertion order
    pub fn relations_of(&self, kind: RelationKind) -> impl Iterator<Item = &Relation> {
        self.relations.iter().filter(move |r| r.kind == kind)
    }

    /// Member IDs of a collection, in the order they were added
    pub fn members_of(&self, collection: &QualifiedName) -> Vec<&QualifiedName> {
        self.relations_of(RelationKind::HadMember)
            .filter(|r| &r.subject == collection)
            .map(|r| &r.object)
            .collect()
    }

    /// Plain entities (collections excluded)
    pub fn entities(&self) -> impl Iterator<Item = &Record> {
        self.records
            .iter()
            .filter(|r| matches!(r.kind, RecordKind::Entity))
    }

    pub fn collections(&self) -> impl Iterator<Item = &Record> {
        self.records
            .iter()
            .filter(|r| matches!(r.kind, RecordKind::Collection))
    }

    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    pub fn relation_count(&self) -> usize {
        self.relations.len()
    }

    fn push_relation(&mut self, relation: Relation) {
        self.relations.push(relation);
    }

    fn expect_kind(
        &self,
        id: &QualifiedName,
        expected: &'static str,
        accepts: impl Fn(&RecordKind) -> bool,
    ) -> GraphResult<()> {
        let record = self
            .get(id)
            .ok_or_else(|| GraphError::RecordNotFound(id.clone()))?;
        if accepts(&record.kind) {
            Ok(())
        } else {
            Err(GraphError::KindMismatch {
                id: id.clone(),
                expected,
                actual: record.kind.name(),
            })
        }
    }

    fn check_namespace(&self, name: &QualifiedName) -> GraphResult<()> {
        if self.namespaces.contains(name.prefix()) {
            Ok(())
        } else {
            Err(GraphError::UnknownNamespace {
                prefix: name.prefix().to_string(),
                name: name.clone(),
            })
        }
    }

    fn check_attributes(&self, attributes: &Attributes) -> GraphResult<()> {
        for (key, value) in attributes.iter() {
            self.check_namespace(key)?;
            if let Literal::Name(name) = value {
                self.check_namespace(name)?;
            }
        }
        Ok(())
    }
}
