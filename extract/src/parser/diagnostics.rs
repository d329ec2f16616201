//! Non-fatal parse issues and per-run statistics.

use serde::Serialize;
use thiserror::Error;

/// A problem noticed while parsing that does not abort the parse.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParseIssue {
    /// A clause with fewer than two tokens was skipped.
    #[error("skipped malformed clause in table {table}: {clause:?}")]
    MalformedClause { table: String, clause: String },
    /// A constraint named a table or column that does not exist.
    #[error("{statement} references missing {target}")]
    DanglingConstraintReference { statement: String, target: String },
    /// A `CREATE TABLE` body whose parenthesis never closes.
    #[error("CREATE TABLE {table} has an unterminated column list")]
    UnterminatedTable { table: String },
    /// The input contained no `CREATE TABLE` statement.
    #[error("no CREATE TABLE statements found")]
    NoTablesFound,
}

/// Diagnostics for a single parse run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ParseDiagnostics {
    pub tables_found: usize,
    pub clauses_seen: usize,
    pub columns: usize,
    pub foreign_keys: usize,
    pub alter_statements: usize,
    pub issues: Vec<ParseIssue>,
}

impl ParseDiagnostics {
    /// Summarises the collected issues as human-readable warnings.
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        let malformed = self
            .issues
            .iter()
            .filter(|issue| matches!(issue, ParseIssue::MalformedClause { .. }))
            .count();
        if malformed > 0 {
            warnings.push(format!("Skipped {malformed} malformed clause(s)"));
        }

        let dangling = self
            .issues
            .iter()
            .filter(|issue| matches!(issue, ParseIssue::DanglingConstraintReference { .. }))
            .count();
        if dangling > 0 {
            warnings.push(format!(
                "Ignored {dangling} constraint(s) referencing missing tables or columns"
            ));
        }

        for issue in &self.issues {
            if matches!(
                issue,
                ParseIssue::UnterminatedTable { .. } | ParseIssue::NoTablesFound
            ) {
                warnings.push(issue.to_string());
            }
        }

        warnings
    }

    pub fn has_issue(&self, predicate: impl Fn(&ParseIssue) -> bool) -> bool {
        self.issues.iter().any(predicate)
    }
}
