use rusqlite::{Connection, params, params_from_iter};
use tracing::debug;

use crate::{
    LoadError,
    core::types::Value,
    db::table::{Relation, Row, Table},
};

/// Response from executing a SQL statement.
///
/// Contains the result column names and the rows, in the order the engine
/// produced them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResponse {
    /// Result column names, in cursor order.
    pub columns: Vec<String>,

    /// The rows returned by the query.
    pub rows: Vec<Row>,
}

impl QueryResponse {
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        Self { columns, rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// The engine handle for one session.
///
/// Wraps a private in-memory SQLite connection. Loaded relations live in the
/// connection's temporary schema and disappear when the handle is dropped.
#[derive(Debug)]
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Opens a fresh in-memory catalog.
    pub fn new_in_memory() -> rusqlite::Result<Self> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
        })
    }

    /// Checks whether the catalog already knows a table or view by this name.
    ///
    /// The schema tables are not listed in the catalog itself and are
    /// matched by name.
    pub fn has_relation(&self, name: &str) -> rusqlite::Result<bool> {
        if SCHEMA_TABLES
            .iter()
            .any(|table| table.eq_ignore_ascii_case(name))
        {
            return Ok(true);
        }

        let mut stmt = self.conn.prepare_cached(
            "SELECT 1 FROM sqlite_temp_master WHERE type IN ('table', 'view') AND name = ?1 COLLATE NOCASE \
             UNION ALL \
             SELECT 1 FROM sqlite_master WHERE type IN ('table', 'view') AND name = ?1 COLLATE NOCASE",
        )?;
        stmt.exists(params![name])
    }

    /// Registers a relation as a temporary table.
    ///
    /// Creation and every insert share one transaction, so a failure leaves
    /// nothing behind.
    pub fn create_relation(&mut self, relation: &Relation) -> Result<(), LoadError> {
        let table = quote_identifier(relation.name());
        let columns: Vec<String> = relation
            .schema()
            .columns
            .iter()
            .map(|col| {
                let name = quote_identifier(&col.name);
                match col.data_type.sql_type() {
                    "" => name,
                    sql_type => format!("{name} {sql_type}"),
                }
            })
            .collect();
        let names: Vec<String> = relation.schema().column_names().map(quote_identifier).collect();
        let placeholders: Vec<String> = (1..=names.len()).map(|i| format!("?{i}")).collect();

        let create = format!("CREATE TEMP TABLE {table} ({})", columns.join(", "));
        let insert = format!(
            "INSERT INTO {table} ({}) VALUES ({})",
            names.join(", "),
            placeholders.join(", ")
        );

        let tx = self.conn.transaction()?;
        tx.execute(&create, [])?;
        {
            let mut stmt = tx.prepare(&insert)?;
            for row in relation.rows() {
                stmt.execute(params_from_iter(row.values.iter()))?;
            }
        }
        tx.commit()?;

        debug!(table = relation.name(), rows = relation.len(), "registered relation");
        Ok(())
    }

    /// Makes `alias` another name for an existing relation.
    pub fn create_alias(&mut self, alias: &str, target: &str) -> Result<(), LoadError> {
        self.conn.execute(
            &format!(
                "CREATE TEMP VIEW {} AS SELECT * FROM {}",
                quote_identifier(alias),
                quote_identifier(target)
            ),
            [],
        )?;

        debug!(alias, target, "registered alias");
        Ok(())
    }

    /// Executes a single statement and collects its result rows.
    pub fn execute_query(&self, sql: &str) -> rusqlite::Result<QueryResponse> {
        let mut stmt = self.conn.prepare(sql)?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let column_count = columns.len();

        let mut cursor = stmt.query([])?;
        let mut rows = Vec::new();
        while let Some(row) = cursor.next()? {
            let values = (0..column_count)
                .map(|idx| row.get_ref(idx).map(Value::from))
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows.push(Row::new(values));
        }

        Ok(QueryResponse::new(columns, rows))
    }
}

/// Catalog tables that exist without appearing in `sqlite_master`.
const SCHEMA_TABLES: [&str; 4] = [
    "sqlite_master",
    "sqlite_schema",
    "sqlite_temp_master",
    "sqlite_temp_schema",
];

/// Quotes an identifier so any file path can be used as a table name.
pub(crate) fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
