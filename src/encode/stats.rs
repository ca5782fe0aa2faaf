//! FreeSurfer `.stats` reports
//!
//! A report has a commented header (`# key value`, `# Measure ...` and
//! `# TableCol ...` lines) followed by whitespace-separated rows, one per
//! anatomical structure. [`StatsReport::parse`] turns the text into a list
//! of [`StructureMeasures`]; [`StatsEncoder`] turns that into one entity per
//! structure inside a stats collection.
//!
//! Parsing is all-or-nothing: any malformed line rejects the report.

use super::collection::CollectionBuilder;
use super::{local_name, EncodeResult};
use crate::graph::namespace::{fs, nidm, niiri, prov};
use crate::graph::{Attributes, Literal, ProvenanceGraph, QualifiedName, Record};
use crate::identifier::IdentifierPolicy;
use std::collections::{BTreeMap, HashMap, HashSet};
use thiserror::Error;
use tracing::{debug, info};

/// Errors raised while parsing a stats report
#[derive(Debug, Error)]
pub enum StatsError {
    #[error("line {line}: data row before the structure column is declared")]
    RowBeforeColumns { line: usize },

    #[error("line {line}: expected {expected} columns, found {found}")]
    ColumnCount {
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("line {line}: malformed TableCol entry")]
    MalformedTableCol { line: usize },

    #[error("line {line}: malformed Measure entry")]
    MalformedMeasure { line: usize },

    #[error("column {column} has no {field}")]
    MissingColumnField { column: usize, field: &'static str },

    #[error("line {line}: '{value}' is not numeric")]
    NotNumeric { line: usize, value: String },
}

/// Where a group of measures came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeasureSource {
    /// A `# Measure` header line
    Header,
    /// A data row
    Table,
}

/// One typed measurement
#[derive(Debug, Clone, PartialEq)]
pub struct MeasureItem {
    pub name: String,
    pub description: String,
    pub value: Literal,
    pub units: String,
}

/// Measures reported for one structure by one line
#[derive(Debug, Clone, PartialEq)]
pub struct StructureMeasures {
    pub structure: String,
    pub source: MeasureSource,
    pub items: Vec<MeasureItem>,
}

/// Vocabulary entry for a measure name, taken from its first occurrence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeasureDefinition {
    pub name: String,
    pub description: String,
    pub units: String,
}

impl MeasureDefinition {
    /// `fs:<name>`
    pub fn term(&self) -> QualifiedName {
        fs(&local_name(&self.name))
    }
}

/// A parsed stats report
#[derive(Debug, Clone, Default)]
pub struct StatsReport {
    /// Header key/value pairs, in file order
    pub header: Vec<(String, String)>,
    /// Table-info index: column number (1-based) → field → value
    pub columns: BTreeMap<usize, HashMap<String, String>>,
    pub measures: Vec<StructureMeasures>,
}

impl StatsReport {
    /// Parse report text; `unitless` lists units whose integer-shaped
    /// values are kept as integers
    pub fn parse(text: &str, unitless: &[String]) -> Result<Self, StatsError> {
        let mut report = StatsReport::default();
        let mut struct_column: Option<usize> = None;

        for (idx, raw) in text.lines().enumerate() {
            let line = idx + 1;
            if raw.trim().is_empty() {
                continue;
            }

            if let Some(comment) = raw.strip_prefix('#') {
                let fields: Vec<&str> = comment.split_whitespace().collect();
                if fields.len() < 2 {
                    continue;
                }
                match fields[0] {
                    "TableCol" => {
                        if fields.len() < 3 {
                            return Err(StatsError::MalformedTableCol { line });
                        }
                        let column = fields[1]
                            .parse::<usize>()
                            .ok()
                            .filter(|&c| c > 0)
                            .ok_or(StatsError::MalformedTableCol { line })?;
                        let value = fields[3..].join(" ");
                        if value == "StructName" {
                            struct_column = Some(column);
                        }
                        report
                            .columns
                            .entry(column)
                            .or_default()
                            .insert(fields[2].to_string(), value);
                    }
                    "Measure" => {
                        let parts: Vec<String> = fields[1..]
                            .join(" ")
                            .split(", ")
                            .map(str::to_string)
                            .collect();
                        let [structure, name, description, value, units] = parts.as_slice() else {
                            return Err(StatsError::MalformedMeasure { line });
                        };
                        let value = coerce(value, units, unitless, line)?;
                        report.measures.push(StructureMeasures {
                            structure: structure.clone(),
                            source: MeasureSource::Header,
                            items: vec![MeasureItem {
                                name: name.clone(),
                                description: description.clone(),
                                value,
                                units: units.clone(),
                            }],
                        });
                    }
                    "ColHeaders" => continue,
                    key => report.header.push((key.to_string(), fields[1..].join(" "))),
                }
                continue;
            }

            let column = struct_column.ok_or(StatsError::RowBeforeColumns { line })?;
            let row: Vec<&str> = raw.split_whitespace().collect();
            if row.len() != report.columns.len() {
                return Err(StatsError::ColumnCount {
                    line,
                    expected: report.columns.len(),
                    found: row.len(),
                });
            }
            let structure = row
                .get(column - 1)
                .ok_or(StatsError::ColumnCount {
                    line,
                    expected: column,
                    found: row.len(),
                })?
                .to_string();

            let mut items = Vec::with_capacity(row.len().saturating_sub(1));
            for (pos, value) in row.iter().enumerate() {
                let number = pos + 1;
                if number == column {
                    continue;
                }
                let info = report
                    .columns
                    .get(&number)
                    .ok_or(StatsError::MissingColumnField {
                        column: number,
                        field: "ColHeader",
                    })?;
                let field = |name: &'static str| {
                    info.get(name).cloned().ok_or(StatsError::MissingColumnField {
                        column: number,
                        field: name,
                    })
                };
                let units = field("Units")?;
                items.push(MeasureItem {
                    name: field("ColHeader")?,
                    description: field("FieldName")?,
                    value: coerce(value, &units, unitless, line)?,
                    units,
                });
            }
            report.measures.push(StructureMeasures {
                structure,
                source: MeasureSource::Table,
                items,
            });
        }

        Ok(report)
    }

    /// Distinct measure names with their first description and units
    pub fn vocabulary(&self) -> Vec<MeasureDefinition> {
        let mut seen = HashSet::new();
        self.measures
            .iter()
            .flat_map(|m| m.items.iter())
            .filter(|item| seen.insert(item.name.as_str()))
            .map(|item| MeasureDefinition {
                name: item.name.clone(),
                description: item.description.clone(),
                units: item.units.clone(),
            })
            .collect()
    }
}

/// Counts (unitless, integer-shaped) stay integers; everything else is a float
fn coerce(value: &str, units: &str, unitless: &[String], line: usize) -> Result<Literal, StatsError> {
    let value = value.trim();
    let not_numeric = || StatsError::NotNumeric {
        line,
        value: value.to_string(),
    };
    if unitless.iter().any(|u| u == units) && !value.contains('.') {
        if let Ok(i) = value.parse::<i64>() {
            return Ok(Literal::Integer(i));
        }
    }
    value.parse::<f64>().map(Literal::Float).map_err(|_| not_numeric())
}

/// Result of encoding a stats report
#[derive(Debug, Clone)]
pub struct StatsEncoding {
    pub collection: QualifiedName,
    pub header: QualifiedName,
    /// Structure name → entity, one per distinct structure
    pub structures: Vec<(String, QualifiedName)>,
    pub vocabulary: Vec<MeasureDefinition>,
}

/// Encodes a parsed report into a stats collection
pub struct StatsEncoder<'a> {
    policy: &'a dyn IdentifierPolicy,
}

impl<'a> StatsEncoder<'a> {
    pub fn new(policy: &'a dyn IdentifierPolicy) -> Self {
        Self { policy }
    }

    /// Add the report to `graph`, deriving the collection from `source`
    ///
    /// `source` must already be in the graph.
    pub fn encode(
        &self,
        graph: &mut ProvenanceGraph,
        report: &StatsReport,
        source: &QualifiedName,
    ) -> EncodeResult<StatsEncoding> {
        let seed = source.to_string();
        let collection_id = niiri(&self.policy.mint(&["stats_collection", seed.as_str()]));
        let mut collection = CollectionBuilder::create(
            graph,
            collection_id,
            Attributes::new().with(prov("type"), Literal::Name(nidm("FreeSurferStatsCollection"))),
        )?;

        let mut header_attrs =
            Attributes::new().with(prov("type"), Literal::Name(fs("stat_header")));
        for (key, value) in &report.header {
            header_attrs.push(fs(&local_name(key)), value.as_str());
        }
        let header = graph.entity(niiri(&self.policy.mint(&["stats_header", seed.as_str()])), header_attrs)?;

        let mut index: HashMap<&str, QualifiedName> = HashMap::new();
        let mut structures = Vec::new();
        for group in &report.measures {
            let mut values = Attributes::new();
            for item in &group.items {
                values.push(fs(&local_name(&item.name)), item.value.clone());
            }

            match index.get(group.structure.as_str()) {
                Some(existing) => {
                    debug!(structure = %group.structure, "merging measures into existing entity");
                    graph.append_attributes(existing, values)?;
                }
                None => {
                    let mut attributes = Attributes::new().with(
                        nidm("AnatomicalAnnotation"),
                        Literal::Name(fs(&local_name(&group.structure))),
                    );
                    attributes.extend(values);
                    let id = niiri(&self.policy.mint(&["structure", seed.as_str(), group.structure.as_str()]));
                    let id = collection.add_record(
                        graph,
                        Record::entity(id).with_attributes(attributes),
                    )?;
                    index.insert(group.structure.as_str(), id.clone());
                    structures.push((group.structure.clone(), id));
                }
            }
        }

        collection.add_member(graph, &header)?;
        graph.was_derived_from(collection.id(), source)?;

        info!(
            structures = structures.len(),
            header_fields = report.header.len(),
            "stats report encoded"
        );

        Ok(StatsEncoding {
            collection: collection.id().clone(),
            header,
            structures,
            vocabulary: report.vocabulary(),
        })
    }
}
