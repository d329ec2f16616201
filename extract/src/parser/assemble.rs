//! Schema assembly from `CREATE TABLE` blocks.

use std::collections::HashMap;
use std::sync::LazyLock;

use ddl_schema_core::{ForeignKey, Table};
use regex::Regex;
use tracing::{debug, warn};

use super::classify::{Clause, classify_clause};
use super::diagnostics::{ParseDiagnostics, ParseIssue};
use super::lexer::{collapse_whitespace, find_closing_paren, split_clauses};

static CREATE_TABLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)\bCREATE\s+(?:(?:GLOBAL|LOCAL)\s+)?(?:(?:TEMP|TEMPORARY|UNLOGGED)\s+)?TABLE\s+(?:IF\s+NOT\s+EXISTS\s+)?(?:"?[\w$]+"?\s*\.\s*)?"?([\w$]+)"?\s*\("#,
    )
    .expect("static regex must compile")
});

/// Ordered tables with a case-insensitive name index.
///
/// A repeated table name keeps both records in output order; lookups
/// resolve to the first one.
#[derive(Debug, Clone, Default)]
pub struct TableMap {
    tables: Vec<Table>,
    index: HashMap<String, usize>,
}

impl TableMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, table: Table) {
        self.index
            .entry(table.table_name.to_ascii_lowercase())
            .or_insert(self.tables.len());
        self.tables.push(table);
    }

    pub fn get(&self, name: &str) -> Option<&Table> {
        self.index
            .get(&name.to_ascii_lowercase())
            .map(|&i| &self.tables[i])
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Table> {
        self.index
            .get(&name.to_ascii_lowercase())
            .map(|&i| &mut self.tables[i])
    }

    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    pub fn tables_mut(&mut self) -> &mut [Table] {
        &mut self.tables
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn into_tables(self) -> Vec<Table> {
        self.tables
    }
}

impl From<Vec<Table>> for TableMap {
    fn from(tables: Vec<Table>) -> Self {
        let mut map = TableMap::new();
        for table in tables {
            map.push(table);
        }
        map
    }
}

/// Builds one table per `CREATE TABLE` block, in input order.
pub(super) fn assemble_tables(ddl: &str, diagnostics: &mut ParseDiagnostics) -> TableMap {
    let mut map = TableMap::new();
    let mut cursor = 0;

    while let Some(caps) = CREATE_TABLE.captures_at(ddl, cursor) {
        let Some(header) = caps.get(0) else { break };
        let name = caps[1].to_string();
        let open = header.end() - 1;

        let Some(close) = find_closing_paren(ddl, open) else {
            warn!(table = %name, "CREATE TABLE body never closes, skipping");
            diagnostics
                .issues
                .push(ParseIssue::UnterminatedTable { table: name });
            cursor = header.end();
            continue;
        };

        let body = collapse_whitespace(&ddl[open + 1..close]);
        let table = assemble_table(&name, &body, diagnostics);
        debug!(
            table = %table.table_name,
            columns = table.columns.len(),
            foreign_keys = table.foreign_keys.len(),
            "Assembled table"
        );
        map.push(table);
        cursor = close + 1;
    }

    map
}

/// Applies every clause of one table body to a fresh table record.
pub(super) fn assemble_table(name: &str, body: &str, diagnostics: &mut ParseDiagnostics) -> Table {
    let mut table = Table::new(name);

    for raw in split_clauses(body) {
        let clause = raw.trim();
        diagnostics.clauses_seen += 1;

        match classify_clause(clause) {
            Clause::Column(parsed) => {
                let column = parsed.column;
                if let Some(target) = parsed.reference {
                    table.add_foreign_key(ForeignKey::new(
                        &column.name,
                        column.logical_type,
                        &target.table,
                        Some(&target.column),
                    ));
                }
                table.columns.push(column);
            }
            Clause::PrimaryKey(pk) => {
                for column_name in &pk.columns {
                    match table.find_column_mut(column_name) {
                        Some(column) => column.is_primary_key = true,
                        None => diagnostics.issues.push(ParseIssue::DanglingConstraintReference {
                            statement: format!("PRIMARY KEY on {name}"),
                            target: format!("column {column_name}"),
                        }),
                    }
                }
            }
            Clause::ForeignKey(fk) => {
                let Some(column) = table.find_column_mut(&fk.column) else {
                    diagnostics.issues.push(ParseIssue::DanglingConstraintReference {
                        statement: format!("FOREIGN KEY on {name}"),
                        target: format!("column {}", fk.column),
                    });
                    continue;
                };
                column.is_foreign_key = true;
                let mut record = ForeignKey::new(
                    &column.name,
                    column.logical_type,
                    &fk.references_table,
                    Some(&fk.references_column),
                );
                if let Some(constraint) = &fk.constraint_name {
                    record = record.with_constraint_name(constraint);
                }
                table.add_foreign_key(record);
            }
            Clause::Ignored => {
                debug!(table = %name, clause, "Ignoring constraint clause");
            }
            Clause::Malformed => {
                debug!(table = %name, clause, "Skipping malformed clause");
                diagnostics.issues.push(ParseIssue::MalformedClause {
                    table: name.to_string(),
                    clause: clause.to_string(),
                });
            }
        }
    }

    table
}
