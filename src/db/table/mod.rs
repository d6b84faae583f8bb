use crate::LoadError;

pub mod column_def;
pub mod relation;
pub mod row;
pub mod schema;

pub use column_def::ColumnDef;
pub use relation::Relation;
pub use row::Row;
pub use schema::Schema;

/// Trait for table-like structures.
///
/// Defines the common interface for relations built by the loader before
/// they are handed to the engine.
pub trait Table {
    /// Returns the table name.
    fn name(&self) -> &str;

    /// Returns the table's schema.
    fn schema(&self) -> &Schema;

    /// Appends a row to the table (validates against schema).
    fn insert_row(&mut self, row: Row) -> Result<(), LoadError>;
}
