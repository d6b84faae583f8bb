//! The per-session orchestrator: resolve file tables, run, format.

use std::{collections::HashSet, io::Write, thread};

use sqlparser::ast::Statement;
use tracing::debug;

use crate::{
    LoadError, Result, ShelectError,
    db::{database::Database, table::Relation},
    output::{OutputFormat, ResultWriter},
    source::{SourceReader, is_stdin, loader::load_relation},
    sql::{extract_tables, parse_statements},
};

/// State shared by every statement of one session.
///
/// Owns the engine connection, the set of table names already loaded into
/// it, the source reader used to load new ones and the result writer. Each
/// table name is read from its source at most once per session. Standard
/// input is read once under whichever of its names comes first; the other
/// name becomes a view over that relation.
pub struct Session<R: SourceReader, W: Write> {
    database: Database,
    reader: R,
    writer: ResultWriter<W>,
    loaded: HashSet<String>,
    stdin_table: Option<String>,
}

impl<R: SourceReader, W: Write> Session<R, W> {
    /// Starts a session on a fresh in-memory catalog.
    pub fn new(reader: R, format: OutputFormat, sink: W) -> Result<Self> {
        Ok(Self {
            database: Database::new_in_memory()?,
            reader,
            writer: ResultWriter::new(format, sink),
            loaded: HashSet::new(),
            stdin_table: None,
        })
    }

    pub fn reader(&self) -> &R {
        &self.reader
    }

    pub fn sink(&self) -> &W {
        self.writer.sink()
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    pub fn format(&self) -> OutputFormat {
        self.writer.format()
    }

    /// Whether a table name has been loaded in this session.
    pub fn is_loaded(&self, table: &str) -> bool {
        self.loaded.contains(table)
    }

    /// Parses text and runs each statement in order, stopping at the first
    /// failure.
    pub fn run_sql(&mut self, sql: &str) -> Result<()> {
        for statement in parse_statements(sql)? {
            self.run_statement(&statement)?;
        }
        Ok(())
    }

    /// Loads every file the statement references, executes it unmodified and
    /// writes the result.
    pub fn run_statement(&mut self, statement: &Statement) -> Result<()> {
        self.load_tables(statement)?;

        let sql = statement.to_string();
        debug!(%sql, "executing statement");
        let response = self.database.execute_query(&sql)?;

        self.writer.write(&response)
    }

    /// Reads and parses pending tables concurrently, then registers them one
    /// at a time. A name joins the loaded set only once its relation is
    /// visible to the engine; tables that did load stay loaded even when a
    /// sibling fails, and the first failure is returned.
    fn load_tables(&mut self, statement: &Statement) -> Result<()> {
        let mut pending: Vec<String> = Vec::new();
        let mut stdin_aliases = Vec::new();
        for table in extract_tables(statement) {
            if self.loaded.contains(&table) || self.database.has_relation(&table)? {
                continue;
            }
            if is_stdin(&table)
                && (self.stdin_table.is_some() || pending.iter().any(|name| is_stdin(name)))
            {
                stdin_aliases.push(table);
                continue;
            }
            pending.push(table);
        }

        let reader = &self.reader;
        let parsed: Vec<(String, Result<Relation, LoadError>)> = thread::scope(|scope| {
            let handles: Vec<_> = pending
                .into_iter()
                .map(|table| {
                    scope.spawn(move || {
                        let relation = read_relation(reader, &table);
                        (table, relation)
                    })
                })
                .collect();

            handles
                .into_iter()
                .map(|handle| {
                    handle
                        .join()
                        .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
                })
                .collect()
        });

        let mut first_error = None;
        for (table, relation) in parsed {
            let registered = relation.and_then(|relation| {
                self.database.create_relation(&relation)?;
                Ok(relation.len())
            });

            match registered {
                Ok(rows) => {
                    debug!(table = %table, rows, "loaded table");
                    if is_stdin(&table) {
                        self.stdin_table = Some(table.clone());
                    }
                    self.loaded.insert(table);
                }
                Err(source) if first_error.is_none() => {
                    first_error = Some(ShelectError::Load { table, source });
                }
                Err(source) => {
                    debug!(table = %table, error = %source, "additional table failed to load");
                }
            }
        }

        // Without a loaded stdin relation the failure is already recorded.
        if let Some(target) = self.stdin_table.clone() {
            for alias in stdin_aliases {
                match self.database.create_alias(&alias, &target) {
                    Ok(()) => {
                        self.loaded.insert(alias);
                    }
                    Err(source) if first_error.is_none() => {
                        first_error = Some(ShelectError::Load {
                            table: alias,
                            source,
                        });
                    }
                    Err(_) => {}
                }
            }
        }

        first_error.map_or(Ok(()), Err)
    }
}

fn read_relation<R: SourceReader>(reader: &R, table: &str) -> Result<Relation, LoadError> {
    let content = reader.read(table)?;
    load_relation(table, &content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemorySource;

    const HAPPYPATH_CSV: &str = "name,value\nfoo,1\nbar,2\nbaz,\n,4\n";
    const HAPPYPATH_JSON: &str = r#"[
        {"name": "foo", "value": 1},
        {"name": "bar", "value": 2},
        {"name": "baz", "value": null},
        {"name": null, "value": 4}
    ]"#;

    fn session(format: OutputFormat, source: MemorySource) -> Session<MemorySource, Vec<u8>> {
        Session::new(source, format, Vec::new()).expect("session starts")
    }

    fn output(session: &Session<MemorySource, Vec<u8>>) -> String {
        String::from_utf8(session.sink().clone()).expect("utf8 output")
    }

    fn run(format: OutputFormat, source: MemorySource, sql: &str) -> String {
        let mut session = session(format, source);
        session.run_sql(sql).expect("statement runs");
        output(&session)
    }

    #[test]
    fn test_read_csv_write_table() {
        let source = MemorySource::new().with_file("./data.csv", HAPPYPATH_CSV);

        assert_eq!(
            run(OutputFormat::Table, source, r#"SELECT * FROM "./data.csv""#),
            "name | value\n\
             -----+------\n\
             foo  | 1    \n\
             bar  | 2    \n\
             baz  |      \n     \
             | 4    \n"
        );
    }

    #[test]
    fn test_read_csv_write_csv() {
        let source = MemorySource::new().with_file("./data.csv", HAPPYPATH_CSV);

        assert_eq!(
            run(OutputFormat::Csv, source, r#"SELECT * FROM "./data.csv""#),
            "name,value\r\nfoo,1\r\nbar,2\r\nbaz,\r\n,4\r\n"
        );
    }

    #[test]
    fn test_read_csv_write_json() {
        let source = MemorySource::new().with_file("./data.csv", HAPPYPATH_CSV);
        let output = run(OutputFormat::Json, source, r#"SELECT * FROM "./data.csv""#);

        assert_eq!(
            serde_json::from_str::<serde_json::Value>(&output).unwrap(),
            serde_json::json!([
                {"name": "foo", "value": "1"},
                {"name": "bar", "value": "2"},
                {"name": "baz", "value": ""},
                {"name": "", "value": "4"}
            ])
        );
    }

    #[test]
    fn test_read_json_write_table() {
        let source = MemorySource::new().with_file("./data.json", HAPPYPATH_JSON);

        assert_eq!(
            run(OutputFormat::Table, source, r#"SELECT * FROM "./data.json""#),
            "name | value\n\
             -----+------\n\
             foo  | 1    \n\
             bar  | 2    \n\
             baz  | NULL \n\
             NULL | 4    \n"
        );
    }

    #[test]
    fn test_read_json_write_csv() {
        let source = MemorySource::new().with_file("./data.json", HAPPYPATH_JSON);

        assert_eq!(
            run(OutputFormat::Csv, source, r#"SELECT * FROM "./data.json""#),
            "name,value\r\nfoo,1\r\nbar,2\r\nbaz,\r\n,4\r\n"
        );
    }

    #[test]
    fn test_read_json_write_json_keeps_nulls() {
        let source = MemorySource::new().with_file("./data.json", HAPPYPATH_JSON);
        let output = run(OutputFormat::Json, source, r#"SELECT * FROM "./data.json""#);

        assert_eq!(
            serde_json::from_str::<serde_json::Value>(&output).unwrap(),
            serde_json::json!([
                {"name": "foo", "value": 1},
                {"name": "bar", "value": 2},
                {"name": "baz", "value": null},
                {"name": null, "value": 4}
            ])
        );
    }

    #[test]
    fn test_join_group_order() {
        let source = MemorySource::new()
            .with_file("./examples/people.csv", "id,name\n1,Alice\n2,Bob\n3,Carlos\n4,Dani")
            .with_file(
                "./examples/values.json",
                r#"[{"id":"1","value":"10"},{"id":"2","value":"20"},{"id":"3","value":"30"},{"id":"3","value":"40"}]"#,
            );

        let output = run(
            OutputFormat::Table,
            source,
            r#"
SELECT p.name, SUM(v.value)
FROM "./examples/people.csv" AS p
LEFT JOIN "./examples/values.json" AS V USING (id)
GROUP BY 1 ORDER BY 2 DESC
"#,
        );

        assert_eq!(
            output,
            "name   | SUM(v.value)\n\
             -------+-------------\n\
             Carlos | 70          \n\
             Bob    | 20          \n\
             Alice  | 10          \n\
             Dani   | NULL        \n"
        );
    }

    #[test]
    fn test_empty_execution() {
        for format in [OutputFormat::Csv, OutputFormat::Json, OutputFormat::Table] {
            assert_eq!(run(format, MemorySource::new(), "-- comment\n;"), "");
        }
    }

    #[test]
    fn test_self_join_loads_once() {
        let source = MemorySource::new().with_file("t.csv", "id,name\n1,a\n2,b\n");
        let mut session = session(OutputFormat::Csv, source);

        session
            .run_sql(r#"SELECT a.name FROM "t.csv" AS a JOIN "t.csv" AS b ON a.id = b.id"#)
            .unwrap();
        session.run_sql(r#"SELECT count(*) FROM "t.csv""#).unwrap();

        assert_eq!(session.reader().read_count("t.csv"), 1);
        assert!(session.is_loaded("t.csv"));
    }

    #[test]
    fn test_stdin_read_once() {
        let source = MemorySource::new().with_stdin("name\tvalue\nfoo\t1\n");
        let mut session = session(OutputFormat::Csv, source);

        session.run_sql(r#"SELECT name FROM "-""#).unwrap();
        session.run_sql(r#"SELECT value FROM "-""#).unwrap();

        assert_eq!(session.reader().read_count("-"), 1);
        assert_eq!(output(&session), "name\r\nfoo\r\nvalue\r\n1\r\n");
    }

    #[test]
    fn test_cte_names_are_not_loaded() {
        let source = MemorySource::new()
            .with_file("base.csv", "id,name\n1,a\n")
            .with_file("temp", "x,y\n9,9\n");
        let mut session = session(OutputFormat::Csv, source);

        session
            .run_sql(r#"WITH temp AS (SELECT * FROM "base.csv") SELECT name FROM temp"#)
            .unwrap();

        assert_eq!(session.reader().read_count("temp"), 0);
        assert!(!session.is_loaded("temp"));
        assert_eq!(output(&session), "name\r\na\r\n");
    }

    #[test]
    fn test_missing_file_leaves_no_phantom() {
        let mut session = session(OutputFormat::Csv, MemorySource::new());

        let err = session.run_sql(r#"SELECT * FROM "missing.csv""#).unwrap_err();
        match &err {
            ShelectError::Load { table, source } => {
                assert_eq!(table, "missing.csv");
                assert!(matches!(source, LoadError::NotFound { path } if path == "missing.csv"));
            }
            other => panic!("Expected load error, got {other:?}"),
        }
        assert_eq!(err.to_string(), "error loading table data from missing.csv");
        assert!(!session.is_loaded("missing.csv"));
        assert!(!session.database().has_relation("missing.csv").unwrap());

        session
            .run_sql("SELECT name FROM sqlite_temp_master")
            .unwrap();
        assert_eq!(output(&session), "");

        // The file shows up later: a retry loads it.
        session.reader().insert_file("missing.csv", "a,b\n1,2\n");
        session.run_sql(r#"SELECT b FROM "missing.csv""#).unwrap();
        assert_eq!(output(&session), "b\r\n2\r\n");
        assert_eq!(session.reader().read_count("missing.csv"), 2);
    }

    #[test]
    fn test_bad_file_does_not_stop_good_one() {
        let source = MemorySource::new()
            .with_file("good.csv", "id\tv\n1\tx\n")
            .with_file("bad.json", r#"{"not": "an array"}"#);
        let mut session = session(OutputFormat::Csv, source);

        let err = session
            .run_sql(r#"SELECT * FROM "good.csv" JOIN "bad.json" USING (id)"#)
            .unwrap_err();

        assert!(matches!(
            err,
            ShelectError::Load { ref table, source: LoadError::Schema(_) } if table == "bad.json"
        ));
        assert!(session.is_loaded("good.csv"));
        assert!(!session.is_loaded("bad.json"));
    }

    #[test]
    fn test_execution_error() {
        let source = MemorySource::new().with_file("t.csv", "a,b\n1,2\n");
        let mut session = session(OutputFormat::Csv, source);

        let err = session.run_sql(r#"SELECT nope FROM "t.csv""#).unwrap_err();

        assert!(matches!(err, ShelectError::Execution(_)));
        assert!(session.is_loaded("t.csv"));
    }

    #[test]
    fn test_syntax_error_loads_nothing() {
        let source = MemorySource::new().with_file("t.csv", "a,b\n1,2\n");
        let mut session = session(OutputFormat::Csv, source);

        let err = session.run_sql(r#"SELECT FROM "t.csv" WHERE"#).unwrap_err();

        assert!(matches!(err, ShelectError::Syntax { .. }));
        assert_eq!(session.reader().read_count("t.csv"), 0);
    }

    #[test]
    fn test_both_stdin_names_in_one_statement() {
        let source = MemorySource::new().with_stdin("a,b\n1,2\n");
        let mut session = session(OutputFormat::Csv, source);

        session
            .run_sql(r#"SELECT x.a, y.b FROM "-" AS x JOIN stdin AS y USING (a)"#)
            .unwrap();

        assert_eq!(output(&session), "a,b\r\n1,2\r\n");
        assert_eq!(session.reader().read_count("-"), 1);
        assert_eq!(session.reader().read_count("stdin"), 0);
        assert!(session.is_loaded("-"));
        assert!(session.is_loaded("stdin"));
    }

    #[test]
    fn test_stdin_names_share_one_read_across_statements() {
        let source = MemorySource::new().with_stdin("a,b\n1,2\n");
        let mut session = session(OutputFormat::Csv, source);

        session.run_sql(r#"SELECT a FROM "-""#).unwrap();
        session.run_sql("SELECT b FROM stdin").unwrap();

        assert_eq!(output(&session), "a\r\n1\r\nb\r\n2\r\n");
        assert_eq!(session.reader().read_count("-"), 1);
        assert_eq!(session.reader().read_count("stdin"), 0);
    }

    #[test]
    fn test_failed_stdin_load_creates_no_alias() {
        let source = MemorySource::new().with_stdin("no delimiter here\n");
        let mut session = session(OutputFormat::Csv, source);

        let err = session
            .run_sql(r#"SELECT * FROM "-", stdin"#)
            .unwrap_err();

        assert!(matches!(err, ShelectError::Load { ref table, .. } if table == "-"));
        assert!(!session.is_loaded("-"));
        assert!(!session.is_loaded("stdin"));
        assert_eq!(session.reader().read_count("stdin"), 0);
    }

    #[test]
    fn test_engine_like_file_name_is_read() {
        let source = MemorySource::new().with_file("sqlite_dump.csv", "a,b\n1,2\n");
        let mut session = session(OutputFormat::Csv, source);

        let result = session.run_sql(r#"SELECT b FROM "sqlite_dump.csv""#);

        assert_eq!(session.reader().read_count("sqlite_dump.csv"), 1);
        // The engine may refuse the reserved prefix, but only while loading.
        match result {
            Ok(()) => assert_eq!(output(&session), "b\r\n2\r\n"),
            Err(ShelectError::Load { table, .. }) => assert_eq!(table, "sqlite_dump.csv"),
            Err(other) => panic!("Expected a load error, got {other:?}"),
        }
    }

    #[test]
    fn test_temp_qualified_reference() {
        let source = MemorySource::new().with_file("t.csv", "a,b\n1,2\n");

        assert_eq!(
            run(OutputFormat::Csv, source, r#"SELECT b FROM temp."t.csv""#),
            "b\r\n2\r\n"
        );
    }
}
