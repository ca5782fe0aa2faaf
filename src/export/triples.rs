//! N-Triples statements and triple-store update bodies
//!
//! Records become `rdf:type` statements plus one statement per attribute.
//! A few PROV-N attribute keys map onto their PROV-O predicates
//! (`prov:type` → `rdf:type`, `prov:label` → `rdfs:label`,
//! `prov:location` → `prov:atLocation`). Associations keep their role
//! through a qualified association blank node.

use super::{escape, ExportError, ExportResult};
use crate::encode::MeasureDefinition;
use crate::graph::namespace::{fs, nidm, prefix, prov, rdfs, QualifiedName};
use crate::graph::{Attributes, Literal, NamespaceTable, ProvenanceGraph, RecordKind, RelationKind};

/// Largest batch a single update request should carry
pub const MAX_STATEMENTS_PER_REQUEST: usize = 1000;

fn rdf_type() -> QualifiedName {
    QualifiedName::new(prefix::RDF, "type")
}

/// Every statement describing `graph`, one per line, without newlines
pub fn statements(graph: &ProvenanceGraph) -> ExportResult<Vec<String>> {
    let mut writer = StatementWriter::new(graph.namespaces());

    for record in graph.records() {
        let class = match record.kind {
            RecordKind::Entity => "Entity",
            RecordKind::Collection => "Collection",
            RecordKind::Activity { .. } => "Activity",
            RecordKind::Agent => "Agent",
        };
        writer.resource(&record.id, &rdf_type(), &prov(class))?;
        if let RecordKind::Activity {
            start_time,
            end_time,
        } = &record.kind
        {
            if let Some(t) = start_time {
                writer.literal(&record.id, &prov("startedAtTime"), &Literal::DateTime(*t))?;
            }
            if let Some(t) = end_time {
                writer.literal(&record.id, &prov("endedAtTime"), &Literal::DateTime(*t))?;
            }
        }
        writer.attributes(&record.id, &record.attributes)?;
    }

    for (n, relation) in graph.relations().enumerate() {
        writer.resource(&relation.subject, &relation.kind.predicate(), &relation.object)?;
        if relation.kind == RelationKind::WasAssociatedWith {
            let node = format!("_:assoc{}", n);
            let subject = writer.iri(&relation.subject)?;
            let qualified = writer.iri(&prov("qualifiedAssociation"))?;
            let class = writer.iri(&prov("Association"))?;
            let agent = writer.iri(&relation.object)?;
            let type_predicate = writer.iri(&rdf_type())?;
            let agent_predicate = writer.iri(&prov("agent"))?;
            writer.raw(&subject, &qualified, &node);
            writer.raw(&node, &type_predicate, &class);
            writer.raw(&node, &agent_predicate, &agent);
            for (key, value) in relation.attributes.iter() {
                let predicate = if *key == prov("role") {
                    prov("hadRole")
                } else {
                    key.clone()
                };
                let (predicate, object) = (writer.iri(&predicate)?, writer.object(value)?);
                writer.raw(&node, &predicate, &object);
            }
        }
    }

    Ok(writer.finish())
}

/// Statements describing measure terms (`fs:<name> a fs:Measure`)
pub fn vocabulary_statements(
    namespaces: &NamespaceTable,
    vocabulary: &[MeasureDefinition],
) -> ExportResult<Vec<String>> {
    let mut writer = StatementWriter::new(namespaces);
    for definition in vocabulary {
        let term = definition.term();
        writer.resource(&term, &rdf_type(), &fs("Measure"))?;
        writer.literal(&term, &rdfs("label"), &Literal::from(definition.description.as_str()))?;
        writer.literal(&term, &nidm("units"), &Literal::from(definition.units.as_str()))?;
    }
    Ok(writer.finish())
}

/// Split statements into consecutive batches of at most `max`
pub fn batches(statements: &[String], max: usize) -> ExportResult<Vec<&[String]>> {
    if max == 0 {
        return Err(ExportError::EmptyBatch);
    }
    Ok(statements.chunks(max).collect())
}

/// Update body inserting `batch` into the named graph
pub fn insert_body(graph_iri: &str, batch: &[String]) -> String {
    format!("INSERT IN GRAPH <{}>\n{{\n{}\n}}\n", graph_iri, batch.join("\n"))
}

struct StatementWriter<'a> {
    namespaces: &'a NamespaceTable,
    lines: Vec<String>,
}

impl<'a> StatementWriter<'a> {
    fn new(namespaces: &'a NamespaceTable) -> Self {
        Self {
            namespaces,
            lines: Vec::new(),
        }
    }

    fn iri(&self, name: &QualifiedName) -> ExportResult<String> {
        self.namespaces
            .expand(name)
            .map(|uri| format!("<{}>", uri))
            .ok_or_else(|| ExportError::UnboundPrefix(name.clone()))
    }

    fn object(&self, value: &Literal) -> ExportResult<String> {
        match value {
            Literal::Name(name) => self.iri(name),
            other => {
                let datatype = other.datatype().unwrap_or("string");
                let xsd = self.iri(&QualifiedName::new(prefix::XSD, datatype))?;
                Ok(format!("\"{}\"^^{}", escape(&other.lexical()), xsd))
            }
        }
    }

    fn raw(&mut self, subject: &str, predicate: &str, object: &str) {
        self.lines.push(format!("{} {} {} .", subject, predicate, object));
    }

    fn resource(&mut self, s: &QualifiedName, p: &QualifiedName, o: &QualifiedName) -> ExportResult<()> {
        let (s, p, o) = (self.iri(s)?, self.iri(p)?, self.iri(o)?);
        self.raw(&s, &p, &o);
        Ok(())
    }

    fn literal(&mut self, s: &QualifiedName, p: &QualifiedName, value: &Literal) -> ExportResult<()> {
        let (s, p, o) = (self.iri(s)?, self.iri(p)?, self.object(value)?);
        self.raw(&s, &p, &o);
        Ok(())
    }

    fn attributes(&mut self, subject: &QualifiedName, attributes: &Attributes) -> ExportResult<()> {
        for (key, value) in attributes.iter() {
            let predicate = match (key.prefix(), key.local()) {
                (prefix::PROV, "type") => rdf_type(),
                (prefix::PROV, "label") => rdfs("label"),
                (prefix::PROV, "location") => prov("atLocation"),
                _ => key.clone(),
            };
            self.literal(subject, &predicate, value)?;
        }
        Ok(())
    }

    fn finish(self) -> Vec<String> {
        self.lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::namespace::niiri;
    use chrono::{TimeZone, Utc};

    const NIIRI: &str = "http://nidm.nidash.org/iri/";
    const RDF_TYPE: &str = "<http://www.w3.org/1999/02/22-rdf-syntax-ns#type>";

    fn small_graph() -> ProvenanceGraph {
        let mut graph = ProvenanceGraph::new(NamespaceTable::standard());
        let c = graph
            .collection(niiri("c"), Attributes::new().with(prov("type"), Literal::Name(fs("subject_directory"))))
            .unwrap();
        let e = graph
            .entity(
                niiri("e"),
                Attributes::new()
                    .with(prov("label"), "T1.mgz")
                    .with(prov("location"), Literal::Uri("file://h/T1.mgz".into())),
            )
            .unwrap();
        let a = graph
            .activity(niiri("a"), Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap(), Attributes::new())
            .unwrap();
        let u = graph.agent(niiri("u"), Attributes::new()).unwrap();
        graph.had_member(&c, &e).unwrap();
        graph.was_associated_with(&a, &u, "LoggedInUser").unwrap();
        graph
    }

    #[test]
    fn records_and_attributes() {
        let lines = statements(&small_graph()).unwrap();
        assert_eq!(
            lines[0],
            format!("<{NIIRI}c> {RDF_TYPE} <http://www.w3.org/ns/prov#Collection> .")
        );
        assert!(lines.contains(&format!(
            "<{NIIRI}c> {RDF_TYPE} <http://freesurfer.net/fswiki/terms/subject_directory> ."
        )));
        assert!(lines.contains(&format!(
            "<{NIIRI}e> <http://www.w3.org/2000/01/rdf-schema#label> \"T1.mgz\"^^<http://www.w3.org/2001/XMLSchema#string> ."
        )));
        assert!(lines.contains(&format!(
            "<{NIIRI}e> <http://www.w3.org/ns/prov#atLocation> \"file://h/T1.mgz\"^^<http://www.w3.org/2001/XMLSchema#anyURI> ."
        )));
        assert!(lines.iter().any(|l| l.contains("startedAtTime") && l.contains("2024-01-02T03:04:05+00:00")));
        assert!(lines.contains(&format!(
            "<{NIIRI}c> <http://www.w3.org/ns/prov#hadMember> <{NIIRI}e> ."
        )));
    }

    #[test]
    fn association_role_is_qualified() {
        let lines = statements(&small_graph()).unwrap();
        assert!(lines.iter().any(|l| l.contains("qualifiedAssociation") && l.ends_with("_:assoc1 .")));
        assert!(lines.iter().any(|l| l.starts_with("_:assoc1 <http://www.w3.org/ns/prov#hadRole> \"LoggedInUser\"")));
    }

    #[test]
    fn unbound_prefix_is_an_error() {
        let table = NamespaceTable::empty();
        let err = vocabulary_statements(
            &table,
            &[MeasureDefinition {
                name: "Volume_mm3".into(),
                description: "Volume".into(),
                units: "mm^3".into(),
            }],
        )
        .unwrap_err();
        assert!(matches!(err, ExportError::UnboundPrefix(_)));
    }

    #[test]
    fn vocabulary_terms() {
        let lines = vocabulary_statements(
            &NamespaceTable::standard(),
            &[MeasureDefinition {
                name: "Volume_mm3".into(),
                description: "Volume".into(),
                units: "mm^3".into(),
            }],
        )
        .unwrap();
        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[0],
            format!("<http://freesurfer.net/fswiki/terms/Volume_mm3> {RDF_TYPE} <http://freesurfer.net/fswiki/terms/Measure> .")
        );
    }

    #[test]
    fn batching() {
        let lines: Vec<String> = (0..2500).map(|i| format!("s{} .", i)).collect();
        let chunks = batches(&lines, MAX_STATEMENTS_PER_REQUEST).unwrap();
        assert_eq!(chunks.iter().map(|c| c.len()).collect::<Vec<_>>(), vec![1000, 1000, 500]);
        assert!(batches(&lines, 0).is_err());

        let body = insert_body("http://test.nidm.org", chunks[2]);
        assert!(body.starts_with("INSERT IN GRAPH <http://test.nidm.org>\n{\n"));
        assert!(body.ends_with("s2499 .\n}\n"));
    }
}
