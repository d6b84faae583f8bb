//! Finding the table references a statement needs materialized.

use std::{collections::BTreeSet, ops::ControlFlow};

use sqlparser::ast::{ObjectName, ObjectNamePart, Query, Statement, Visit, Visitor};

/// Collects relation names and CTE bindings across the whole statement tree.
#[derive(Debug, Default)]
struct TableCollector {
    tables: BTreeSet<String>,
    cte_bindings: BTreeSet<String>,
}

impl Visitor for TableCollector {
    type Break = ();

    fn pre_visit_query(&mut self, query: &Query) -> ControlFlow<Self::Break> {
        if let Some(with) = &query.with {
            for cte in &with.cte_tables {
                self.cte_bindings.insert(cte.alias.name.value.clone());
            }
        }
        ControlFlow::Continue(())
    }

    fn pre_visit_relation(&mut self, relation: &ObjectName) -> ControlFlow<Self::Break> {
        if let Some(name) = table_name(relation) {
            self.tables.insert(name);
        }
        ControlFlow::Continue(())
    }
}

/// Returns every table referenced anywhere in the statement, minus names
/// bound by a `WITH` clause at any level.
///
/// Subqueries, joins and CTE bodies are all searched. No attempt is made to
/// decide whether a name is a file; that is left to loading it.
pub fn extract_tables(statement: &Statement) -> BTreeSet<String> {
    let mut collector = TableCollector::default();
    let _ = statement.visit(&mut collector);

    collector
        .tables
        .difference(&collector.cte_bindings)
        .cloned()
        .collect()
}

/// The table part of a possibly qualified name (`schema.table`).
///
/// The qualifier is dropped when loading but stays in the statement. Loaded
/// relations live in the `temp` schema, so `temp."data.csv"` resolves while
/// `main."data.csv"` loads the file and then fails to find it.
fn table_name(name: &ObjectName) -> Option<String> {
    match name.0.last()? {
        ObjectNamePart::Identifier(ident) => Some(ident.value.clone()),
        ObjectNamePart::Function(_) => None,
    }
}
