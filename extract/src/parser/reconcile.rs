//! Reconciliation of `ALTER TABLE ... ADD` constraints onto assembled tables.
//!
//! Dumps declare most keys after the tables they belong to. Foreign keys
//! (`ADD [CONSTRAINT name] FOREIGN KEY`) and primary keys
//! (`ADD [CONSTRAINT name] PRIMARY KEY`) are applied here; other `ALTER`
//! statements are ignored.

use std::sync::LazyLock;

use ddl_schema_core::{DEFAULT_REFERENCED_COLUMN, ForeignKey};
use regex::Regex;
use tracing::debug;

use super::assemble::TableMap;
use super::diagnostics::{ParseDiagnostics, ParseIssue};
use super::lexer::unquote_identifier;

static ALTER_FOREIGN_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?is)\bALTER\s+TABLE\s+(?:IF\s+EXISTS\s+)?(?:ONLY\s+)?(?:"?[\w$]+"?\s*\.\s*)?"?([\w$]+)"?\s+ADD\s+(?:CONSTRAINT\s+"?([\w$]+)"?\s+)?FOREIGN\s+KEY\s*\(\s*"?([\w$]+)"?\s*\)\s*REFERENCES\s+(?:"?[\w$]+"?\s*\.\s*)?"?([\w$]+)"?(?:\s*\(\s*"?([\w$]+)"?\s*\))?[^;]*;?"#,
    )
    .expect("static regex must compile")
});

static ALTER_PRIMARY_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?is)\bALTER\s+TABLE\s+(?:IF\s+EXISTS\s+)?(?:ONLY\s+)?(?:"?[\w$]+"?\s*\.\s*)?"?([\w$]+)"?\s+ADD\s+(?:CONSTRAINT\s+"?([\w$]+)"?\s+)?PRIMARY\s+KEY\s*\(([^)]*)\)"#,
    )
    .expect("static regex must compile")
});

/// One `ALTER TABLE ... ADD [CONSTRAINT name] FOREIGN KEY` statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlterForeignKey {
    pub table: String,
    pub constraint_name: Option<String>,
    pub column: String,
    pub references_table: String,
    pub references_column: String,
}

impl AlterForeignKey {
    /// Finds every foreign-key `ALTER TABLE` statement in `ddl`, in order.
    ///
    /// # Examples
    ///
    /// ```
    /// use ddl_schema_extract::parser::AlterForeignKey;
    ///
    /// let found = AlterForeignKey::find_all(
    ///     "ALTER TABLE ONLY public.orders\n    ADD CONSTRAINT fk_user FOREIGN KEY (user_id) REFERENCES public.users(id) ON DELETE CASCADE;",
    /// );
    /// assert_eq!(found.len(), 1);
    /// assert_eq!(found[0].table, "orders");
    /// assert_eq!(found[0].references_table, "users");
    /// ```
    pub fn find_all(ddl: &str) -> Vec<Self> {
        ALTER_FOREIGN_KEY
            .captures_iter(ddl)
            .map(|caps| Self {
                table: caps[1].to_string(),
                constraint_name: caps.get(2).map(|m| m.as_str().to_string()),
                column: caps[3].to_string(),
                references_table: caps[4].to_string(),
                references_column: caps
                    .get(5)
                    .map_or(DEFAULT_REFERENCED_COLUMN, |m| m.as_str())
                    .to_string(),
            })
            .collect()
    }

    fn describe(&self) -> String {
        format!("ALTER TABLE {} FOREIGN KEY ({})", self.table, self.column)
    }
}

/// Applies one statement to the table map.
///
/// Returns `Ok(true)` when a foreign-key record was appended and `Ok(false)`
/// when the column already had one (the flag is still set). Unknown tables
/// and columns leave the map untouched and are reported as
/// [`ParseIssue::DanglingConstraintReference`]. Tables are never created.
pub fn apply_alter_foreign_key(
    tables: &mut TableMap,
    statement: &AlterForeignKey,
) -> Result<bool, ParseIssue> {
    let Some(table) = tables.get_mut(&statement.table) else {
        return Err(ParseIssue::DanglingConstraintReference {
            statement: statement.describe(),
            target: format!("table {}", statement.table),
        });
    };

    let Some(column) = table.find_column_mut(&statement.column) else {
        return Err(ParseIssue::DanglingConstraintReference {
            statement: statement.describe(),
            target: format!("column {}.{}", statement.table, statement.column),
        });
    };

    column.is_foreign_key = true;
    let mut record = ForeignKey::new(
        &column.name,
        column.logical_type,
        &statement.references_table,
        Some(&statement.references_column),
    );
    if let Some(name) = &statement.constraint_name {
        record = record.with_constraint_name(name);
    }
    Ok(table.add_foreign_key(record))
}

/// One `ALTER TABLE ... ADD [CONSTRAINT name] PRIMARY KEY (...)` statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlterPrimaryKey {
    pub table: String,
    pub constraint_name: Option<String>,
    pub columns: Vec<String>,
}

impl AlterPrimaryKey {
    pub fn find_all(ddl: &str) -> Vec<Self> {
        ALTER_PRIMARY_KEY
            .captures_iter(ddl)
            .map(|caps| Self {
                table: caps[1].to_string(),
                constraint_name: caps.get(2).map(|m| m.as_str().to_string()),
                columns: caps[3]
                    .split(',')
                    .map(unquote_identifier)
                    .filter(|c| !c.is_empty())
                    .map(String::from)
                    .collect(),
            })
            .collect()
    }
}

/// Flags the statement's columns as primary key.
///
/// Returns the number of columns flagged. Unknown columns are skipped and
/// reported; an unknown table leaves the map untouched.
pub fn apply_alter_primary_key(
    tables: &mut TableMap,
    statement: &AlterPrimaryKey,
) -> Result<usize, ParseIssue> {
    let describe = || format!("ALTER TABLE {} PRIMARY KEY", statement.table);
    let Some(table) = tables.get_mut(&statement.table) else {
        return Err(ParseIssue::DanglingConstraintReference {
            statement: describe(),
            target: format!("table {}", statement.table),
        });
    };

    let mut flagged = 0;
    let mut missing = Vec::new();
    for name in &statement.columns {
        match table.find_column_mut(name) {
            Some(column) => {
                column.is_primary_key = true;
                flagged += 1;
            }
            None => missing.push(name.as_str()),
        }
    }

    if missing.is_empty() {
        Ok(flagged)
    } else {
        Err(ParseIssue::DanglingConstraintReference {
            statement: describe(),
            target: format!("column(s) {}", missing.join(", ")),
        })
    }
}

/// Runs every primary-key and foreign-key `ALTER TABLE` statement in `ddl`
/// against `tables`, primary keys first.
///
/// Returns the number of foreign-key records appended.
pub(super) fn reconcile_alter_statements(
    ddl: &str,
    tables: &mut TableMap,
    diagnostics: &mut ParseDiagnostics,
) -> usize {
    for statement in AlterPrimaryKey::find_all(ddl) {
        diagnostics.alter_statements += 1;
        match apply_alter_primary_key(tables, &statement) {
            Ok(flagged) => {
                debug!(table = %statement.table, flagged, "Applied primary key");
            }
            Err(issue) => {
                debug!(%issue, "Skipping ALTER TABLE statement");
                diagnostics.issues.push(issue);
            }
        }
    }

    let mut added = 0;
    for statement in AlterForeignKey::find_all(ddl) {
        diagnostics.alter_statements += 1;
        match apply_alter_foreign_key(tables, &statement) {
            Ok(true) => added += 1,
            Ok(false) => {
                debug!(table = %statement.table, column = %statement.column, "Foreign key already recorded");
            }
            Err(issue) => {
                debug!(%issue, "Skipping ALTER TABLE statement");
                diagnostics.issues.push(issue);
            }
        }
    }
    added
}
