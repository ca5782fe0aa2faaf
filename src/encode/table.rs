//! Delimited tables → column and row entities

use super::collection::CollectionBuilder;
use super::{local_name, EncodeError, EncodeResult};
use crate::config::TableConfig;
use crate::graph::namespace::{nidm, niiri, prov};
use crate::graph::{Attributes, Literal, ProvenanceGraph, QualifiedName, Record};
use crate::hash::{hash_bytes, DigestAlgorithm};
use crate::identifier::IdentifierPolicy;
use serde_json::Value;
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info};

/// Literal for a cell value
///
/// Null becomes the string `"Unknown"`; arrays and objects are kept as
/// their JSON text.
pub fn encode_value(value: &Value) -> Literal {
    match value {
        Value::Null => Literal::from("Unknown"),
        Value::String(s) => Literal::String(s.clone()),
        Value::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => Literal::Integer(i),
            (None, Some(f)) => Literal::Float(f),
            _ => Literal::String(n.to_string()),
        },
        other => Literal::String(other.to_string()),
    }
}

/// Result of encoding one table
#[derive(Debug, Clone)]
pub struct TableEncoding {
    /// The `nidm:csv_file` entity
    pub source: QualifiedName,
    /// The `nidm:csv_collection` holding the column collection and rows
    pub collection: QualifiedName,
    pub column_collection: QualifiedName,
    pub columns: Vec<QualifiedName>,
    pub rows: Vec<QualifiedName>,
    /// Cells left out as empty, missing or NaN
    pub omitted_cells: usize,
}

pub struct TableEncoder<'a> {
    config: &'a TableConfig,
    policy: &'a dyn IdentifierPolicy,
}

impl<'a> TableEncoder<'a> {
    pub fn new(config: &'a TableConfig, policy: &'a dyn IdentifierPolicy) -> Self {
        Self { config, policy }
    }

    /// Read and encode the table at `path`
    pub fn encode_file(&self, graph: &mut ProvenanceGraph, path: &Path) -> EncodeResult<TableEncoding> {
        if !path.is_file() {
            return Err(EncodeError::InputNotFound(path.to_path_buf()));
        }
        let bytes = std::fs::read(path).map_err(|e| EncodeError::io(path, e))?;
        let location = path
            .canonicalize()
            .map_err(|e| EncodeError::io(path, e))?
            .display()
            .to_string();
        self.encode_bytes(graph, &bytes, &location, &path.display().to_string())
    }

    /// Encode table bytes that were read from `location`
    pub fn encode_bytes(
        &self,
        graph: &mut ProvenanceGraph,
        bytes: &[u8],
        location: &str,
        label: &str,
    ) -> EncodeResult<TableEncoding> {
        let sha512 = hash_bytes(bytes, DigestAlgorithm::Sha512).hex;

        let source = graph.entity(
            niiri(&self.policy.mint(&["csv_file", location, sha512.as_str()])),
            Attributes::new()
                .with(prov("type"), Literal::Name(nidm("csv_file")))
                .with(nidm("sha512"), sha512.as_str())
                .with(prov("location"), Literal::Uri(location.to_string())),
        )?;

        let table_local = self.policy.mint(&["csv_collection", location, sha512.as_str()]);
        let mut table = CollectionBuilder::create(
            graph,
            niiri(&table_local),
            Attributes::new()
                .with(prov("type"), Literal::Name(nidm("csv_collection")))
                .with(prov("label"), label),
        )?;
        graph.was_derived_from(table.id(), &source)?;

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter()?)
            .flexible(true)
            .from_reader(bytes);
        let headers = reader.headers()?.clone();

        let mut column_collection = CollectionBuilder::create(
            graph,
            niiri(&self.policy.mint(&["column_headers", table_local.as_str()])),
            Attributes::new().with(prov("type"), Literal::Name(nidm("column_headers"))),
        )?;
        table.add_member(graph, column_collection.id())?;

        let mut taken = HashSet::new();
        let mut columns = Vec::with_capacity(headers.len());
        for (idx, heading) in headers.iter().enumerate() {
            let base = format!("{}/{}", table_local, local_name(heading));
            let mut local = base.clone();
            let mut suffix = idx;
            while !taken.insert(local.clone()) {
                local = format!("{}_{}", base, suffix);
                suffix += 1;
            }
            let record = Record::entity(niiri(&local))
                .with_attribute(prov("type"), Literal::Name(nidm("csv_heading")))
                .with_attribute(prov("label"), encode_value(&Value::from(heading)))
                .with_attribute(prov("location"), idx as i64);
            columns.push(column_collection.add_record(graph, record)?);
        }

        let mut rows = Vec::new();
        let mut omitted_cells = 0;
        for result in reader.records() {
            if self.config.max_rows.is_some_and(|max| rows.len() >= max) {
                debug!(max_rows = rows.len(), "row limit reached");
                break;
            }
            let record = result?;
            let number = rows.len() + 1;

            let mut attributes = Attributes::new()
                .with(prov("type"), Literal::Name(nidm("csv_row")))
                .with(prov("location"), number as i64);
            for (column, cell) in columns.iter().zip(record.iter().map(Some).chain(std::iter::repeat(None))) {
                match cell.and_then(|c| self.cell_value(c)) {
                    Some(value) => attributes.push(column.clone(), encode_value(&value)),
                    None => omitted_cells += 1,
                }
            }

            let id = niiri(&self.policy.mint(&["csv_row", table_local.as_str(), number.to_string().as_str()]));
            rows.push(table.add_record(graph, Record::entity(id).with_attributes(attributes))?);
        }

        info!(
            columns = columns.len(),
            rows = rows.len(),
            omitted = omitted_cells,
            "table encoded"
        );

        Ok(TableEncoding {
            source,
            collection: table.id().clone(),
            column_collection: column_collection.id().clone(),
            columns,
            rows,
            omitted_cells,
        })
    }

    fn delimiter(&self) -> EncodeResult<u8> {
        u8::try_from(self.config.delimiter)
            .ok()
            .filter(u8::is_ascii)
            .ok_or_else(|| {
                EncodeError::Table(csv::Error::from(std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    format!("delimiter {:?} is not a single ASCII byte", self.config.delimiter),
                )))
            })
    }

    /// Typed cell value, or `None` when the cell counts as missing
    fn cell_value(&self, raw: &str) -> Option<Value> {
        let cell = raw.trim();
        if cell.is_empty() || self.is_na(cell) {
            return None;
        }
        if let Ok(i) = cell.parse::<i64>() {
            return Some(Value::from(i));
        }
        if let Ok(f) = cell.parse::<f64>() {
            // NaN has no JSON number
            return serde_json::Number::from_f64(f).map(Value::Number);
        }
        Some(Value::String(cell.to_string()))
    }

    fn is_na(&self, cell: &str) -> bool {
        let numeric = cell.parse::<f64>().ok();
        self.config.na_values.iter().any(|na| {
            na == cell
                || matches!((numeric, na.parse::<f64>()), (Some(a), Ok(b)) if a == b)
        })
    }
}
