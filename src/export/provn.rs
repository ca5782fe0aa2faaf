//! PROV-N rendering

use super::escape;
use crate::graph::namespace::{prefix, prov};
use crate::graph::{Attributes, Literal, ProvenanceGraph, Record, RecordKind, Relation, RelationKind};
use std::fmt::Write;

/// Render `graph` as a PROV-N document
pub fn render(graph: &ProvenanceGraph) -> String {
    let mut out = String::from("document\n");
    for ns in graph.namespaces().iter() {
        // prov and xsd are predefined in PROV-N
        if ns.prefix == prefix::PROV || ns.prefix == prefix::XSD {
            continue;
        }
        let _ = writeln!(out, "  prefix {} <{}>", ns.prefix, ns.uri);
    }
    if !graph.namespaces().is_empty() {
        out.push('\n');
    }
    for record in graph.records() {
        out.push_str("  ");
        out.push_str(&record_line(record));
        out.push('\n');
    }
    for relation in graph.relations() {
        out.push_str("  ");
        out.push_str(&relation_line(relation));
        out.push('\n');
    }
    out.push_str("endDocument\n");
    out
}

fn record_line(record: &Record) -> String {
    match &record.kind {
        RecordKind::Entity => format!("entity({}{})", record.id, attribute_list(&record.attributes)),
        RecordKind::Collection => {
            let mut attributes =
                Attributes::new().with(prov("type"), Literal::Name(prov("Collection")));
            attributes.extend(record.attributes.clone());
            format!("entity({}{})", record.id, attribute_list(&attributes))
        }
        RecordKind::Activity {
            start_time,
            end_time,
        } => format!(
            "activity({}, {}, {}{})",
            record.id,
            start_time.map_or("-".to_string(), |t| t.to_rfc3339()),
            end_time.map_or("-".to_string(), |t| t.to_rfc3339()),
            attribute_list(&record.attributes)
        ),
        RecordKind::Agent => format!("agent({}{})", record.id, attribute_list(&record.attributes)),
    }
}

fn relation_line(relation: &Relation) -> String {
    let attrs = attribute_list(&relation.attributes);
    match relation.kind {
        RelationKind::HadMember | RelationKind::WasDerivedFrom => format!(
            "{}({}, {}{})",
            relation.kind, relation.subject, relation.object, attrs
        ),
        RelationKind::WasGeneratedBy => format!(
            "wasGeneratedBy({}, {}, -{})",
            relation.subject, relation.object, attrs
        ),
        RelationKind::WasAssociatedWith => format!(
            "wasAssociatedWith({}, {}, -{})",
            relation.subject, relation.object, attrs
        ),
    }
}

/// `, [k=v, ...]`, or nothing for an empty list
fn attribute_list(attributes: &Attributes) -> String {
    if attributes.is_empty() {
        return String::new();
    }
    let pairs: Vec<String> = attributes
        .iter()
        .map(|(key, value)| format!("{}={}", key, literal(value)))
        .collect();
    format!(", [{}]", pairs.join(", "))
}

fn literal(value: &Literal) -> String {
    match value {
        Literal::Name(name) => format!("'{}'", name),
        other => format!(
            "\"{}\" %% xsd:{}",
            escape(&other.lexical()),
            other.datatype().unwrap_or("string")
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::namespace::{fs, niiri};
    use crate::graph::NamespaceTable;
    use chrono::{TimeZone, Utc};

    #[test]
    fn renders_records_and_relations() {
        let mut graph = ProvenanceGraph::new(NamespaceTable::standard());
        let c = graph
            .collection(
                niiri("c"),
                Attributes::new().with(prov("type"), Literal::Name(fs("subject_directory"))),
            )
            .unwrap();
        let e = graph
            .entity(niiri("e"), Attributes::new().with(prov("label"), "T1 \"raw\".mgz"))
            .unwrap();
        let a = graph
            .activity(niiri("a"), Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap(), Attributes::new())
            .unwrap();
        let ag = graph.agent(niiri("u"), Attributes::new()).unwrap();
        graph.had_member(&c, &e).unwrap();
        graph.was_generated_by(&c, &a).unwrap();
        graph.was_associated_with(&a, &ag, "LoggedInUser").unwrap();

        let text = render(&graph);
        assert!(text.starts_with("document\n"));
        assert!(text.ends_with("endDocument\n"));
        assert!(text.contains("  prefix niiri <http://nidm.nidash.org/iri/>\n"));
        assert!(!text.contains("prefix prov "));
        assert!(text.contains(
            "entity(niiri:c, [prov:type='prov:Collection', prov:type='fs:subject_directory'])"
        ));
        assert!(text.contains(r#"entity(niiri:e, [prov:label="T1 \"raw\".mgz" %% xsd:string])"#));
        assert!(text.contains("activity(niiri:a, 2024-01-02T03:04:05+00:00, -)"));
        assert!(text.contains("agent(niiri:u)"));
        assert!(text.contains("hadMember(niiri:c, niiri:e)"));
        assert!(text.contains("wasGeneratedBy(niiri:c, niiri:a, -)"));
        assert!(text.contains(
            r#"wasAssociatedWith(niiri:a, niiri:u, -, [prov:role="LoggedInUser" %% xsd:string])"#
        ));

        let records_end = text.find("agent(").unwrap();
        assert!(text.find("hadMember(").unwrap() > records_end);
    }

    #[test]
    fn typed_literals() {
        assert_eq!(literal(&Literal::Integer(3)), "\"3\" %% xsd:integer");
        assert_eq!(literal(&Literal::Uri("file://h/x".into())), "\"file://h/x\" %% xsd:anyURI");
    }
}
