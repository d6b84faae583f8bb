use super::{Table, row::Row, schema::Schema};
use crate::LoadError;

/// A named relation with its schema and rows.
///
/// Built once by the loader and never modified after it is registered with
/// the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct Relation {
    /// The table name, exactly as written in the query.
    pub(crate) name: String,

    /// The relation's schema defining its columns.
    pub(crate) schema: Schema,

    pub(crate) rows: Vec<Row>,
}

impl Relation {
    /// Creates an empty relation with the given name and schema.
    pub fn new(name: &str, schema: Schema) -> Self {
        Self {
            name: name.to_owned(),
            schema,
            rows: Vec::new(),
        }
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl Table for Relation {
    fn name(&self) -> &str {
        &self.name
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn insert_row(&mut self, row: Row) -> Result<(), LoadError> {
        if row.values.len() != self.schema.len() {
            return Err(LoadError::schema(format!(
                "row has {} values but {} has {} columns",
                row.values.len(),
                self.name,
                self.schema.len()
            )));
        }

        self.rows.push(row);
        Ok(())
    }
}
