//! Collection creation and membership bookkeeping

use crate::graph::{Attributes, GraphResult, ProvenanceGraph, QualifiedName, Record};
use std::collections::HashSet;

/// A collection under construction
///
/// Tracks which records are already members so a record is linked at most
/// once. The graph itself does not enforce this.
#[derive(Debug)]
pub struct CollectionBuilder {
    id: QualifiedName,
    members: HashSet<QualifiedName>,
}

impl CollectionBuilder {
    /// Insert the collection record into `graph`
    pub fn create(
        graph: &mut ProvenanceGraph,
        id: QualifiedName,
        attributes: Attributes,
    ) -> GraphResult<Self> {
        let id = graph.collection(id, attributes)?;
        Ok(Self {
            id,
            members: HashSet::new(),
        })
    }

    pub fn id(&self) -> &QualifiedName {
        &self.id
    }

    /// Link an existing record as a member
    ///
    /// Returns `false` without touching the graph if it is already a member.
    pub fn add_member(&mut self, graph: &mut ProvenanceGraph, member: &QualifiedName) -> GraphResult<bool> {
        if self.members.contains(member) {
            return Ok(false);
        }
        graph.had_member(&self.id, member)?;
        self.members.insert(member.clone());
        Ok(true)
    }

    /// Insert `record` and link it as a member
    pub fn add_record(&mut self, graph: &mut ProvenanceGraph, record: Record) -> GraphResult<QualifiedName> {
        let id = graph.add_record(record)?;
        self.add_member(graph, &id)?;
        Ok(id)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::namespace::niiri;
    use crate::graph::{NamespaceTable, RelationKind};

    #[test]
    fn repeated_membership_is_recorded_once() {
        let mut graph = ProvenanceGraph::new(NamespaceTable::standard());
        let mut builder = CollectionBuilder::create(&mut graph, niiri("c"), Attributes::new()).unwrap();
        let e = builder
            .add_record(&mut graph, Record::entity(niiri("e")))
            .unwrap();

        assert!(!builder.add_member(&mut graph, &e).unwrap());
        assert_eq!(builder.len(), 1);
        assert_eq!(graph.relations_of(RelationKind::HadMember).count(), 1);
    }

    #[test]
    fn nested_collections() {
        let mut graph = ProvenanceGraph::new(NamespaceTable::standard());
        let mut outer = CollectionBuilder::create(&mut graph, niiri("table"), Attributes::new()).unwrap();
        let inner = CollectionBuilder::create(&mut graph, niiri("columns"), Attributes::new()).unwrap();
        assert!(outer.add_member(&mut graph, inner.id()).unwrap());
        assert_eq!(graph.members_of(outer.id()), vec![&niiri("columns")]);
    }
}
