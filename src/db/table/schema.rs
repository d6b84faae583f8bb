use std::collections::HashSet;

use super::column_def::ColumnDef;

/// A relation schema defining the structure of rows.
///
/// An ordered list of column definitions. All rows of a relation must have
/// exactly one value per column.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    /// The ordered list of column definitions.
    pub columns: Vec<ColumnDef>,
}

impl Schema {
    /// Creates a new schema from a vector of column definitions.
    pub fn new(columns: Vec<ColumnDef>) -> Self {
        Self { columns }
    }

    /// Column names in declaration order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|col| col.name.as_str())
    }

    /// Returns the first column name that appears more than once.
    pub fn duplicate_column(&self) -> Option<&str> {
        let mut seen = HashSet::new();
        self.column_names().find(|name| !seen.insert(*name))
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}
