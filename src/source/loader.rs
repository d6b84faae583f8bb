//! Turns raw source content into a [`Relation`].

use tracing::{debug, warn};

use super::sniff::{Dialect, SourceFormat, sniff_format};
use crate::{
    LoadError,
    core::types::{DataType, Value},
    db::table::{ColumnDef, Relation, Row, Schema, Table},
};

/// Parses content as JSON or delimited text, whichever it sniffs as.
pub fn load_relation(name: &str, content: &str) -> Result<Relation, LoadError> {
    let relation = match sniff_format(content) {
        SourceFormat::Json => load_json(name, content)?,
        SourceFormat::Delimited => load_delimited(name, content)?,
    };

    if let Some(column) = relation.schema().duplicate_column() {
        return Err(LoadError::schema(format!("duplicate column name {column:?}")));
    }

    Ok(relation)
}

/// Loads a top-level array of flat objects.
///
/// Columns come from the first object's keys in order. Later objects are
/// projected onto those columns: missing keys become NULL and extra keys are
/// dropped.
fn load_json(name: &str, content: &str) -> Result<Relation, LoadError> {
    let data: serde_json::Value = serde_json::from_str(content)?;

    let records = data
        .as_array()
        .and_then(|items| {
            items
                .iter()
                .map(serde_json::Value::as_object)
                .collect::<Option<Vec<_>>>()
        })
        .ok_or_else(|| LoadError::schema("expected a top-level array of objects"))?;

    let Some(first) = records.first() else {
        return Err(LoadError::schema(
            "expected a top-level array of objects, found an empty array",
        ));
    };
    if first.is_empty() {
        return Err(LoadError::schema("first object has no keys to use as columns"));
    }

    let columns: Vec<&String> = first.keys().collect();
    let schema = Schema::new(
        columns
            .iter()
            .map(|key| ColumnDef::new(key, DataType::Any))
            .collect(),
    );
    let mut relation = Relation::new(name, schema);

    for (idx, record) in records.iter().enumerate() {
        let dropped = record.keys().filter(|key| !first.contains_key(*key)).count();
        if dropped > 0 {
            debug!(table = name, record = idx, dropped, "ignoring keys absent from the first object");
        }

        let values = columns
            .iter()
            .map(|key| record.get(*key).map_or(Value::Null, Value::from_json))
            .collect();
        relation.insert_row(Row::new(values))?;
    }

    Ok(relation)
}

/// Loads comma or tab separated text with a mandatory header row.
///
/// Every value is kept as text. Short rows are rejected; fields past the
/// header's width are dropped.
fn load_delimited(name: &str, content: &str) -> Result<Relation, LoadError> {
    let dialect = Dialect::sniff(content)?;
    let mut reader = dialect.reader_builder().from_reader(content.as_bytes());

    let headers = reader.headers()?.clone();
    let width = headers.len();
    let schema = Schema::new(
        headers
            .iter()
            .map(|header| ColumnDef::new(header, DataType::Text))
            .collect(),
    );
    let mut relation = Relation::new(name, schema);

    for record in reader.records() {
        let record = record?;
        let line = record.position().map_or(0, |pos| pos.line());

        if record.len() < width {
            return Err(LoadError::schema(format!(
                "line {line} has {} fields but the header has {width}",
                record.len()
            )));
        }
        if record.len() > width {
            warn!(
                table = name,
                line,
                extra = record.len() - width,
                "dropping fields past the header"
            );
        }

        let values = record
            .iter()
            .take(width)
            .map(|field| Value::Text(field.to_owned()))
            .collect();
        relation.insert_row(Row::new(values))?;
    }

    Ok(relation)
}
