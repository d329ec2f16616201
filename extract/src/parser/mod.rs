//! DDL parser for PostgreSQL-style `CREATE TABLE` / `ALTER TABLE` scripts.
//!
//! This module turns raw DDL text into an ordered sequence of
//! [`Table`] records without a SQL grammar. It handles the shapes
//! that tool-generated dumps and hand-written migrations actually contain:
//!
//! - nested parentheses in types and expressions (`numeric(10, 2)`, `CHECK (...)`)
//! - quoted identifiers and literals with embedded commas
//! - inline constraints (`PRIMARY KEY`, `NOT NULL`, `REFERENCES t(c)`)
//! - table-level `[CONSTRAINT name] PRIMARY KEY (...)` / `FOREIGN KEY (...)` clauses
//! - forward references resolved later by `ALTER TABLE ... ADD ... FOREIGN KEY`
//!
//! # Architecture
//!
//! Parsing runs in two strictly sequential passes over one input. The
//! assembler locates every `CREATE TABLE` block, splits its body with the
//! depth/quote-aware lexer and classifies each clause into column or
//! constraint records. The reconciler then applies `ALTER TABLE` primary
//! and foreign keys to the assembled table map. Problems never abort the parse; they
//! are collected as [`ParseIssue`]s in [`ParseDiagnostics`].
//!
//! The primary entry point is [`DdlParser::new`] followed by
//! [`DdlParser::parse`], but most consumers should use the higher-level
//! [`parse_ddl`](crate::parse_ddl) function instead.
//!
//! [`Table`]: ddl_schema_core::Table

mod assemble;
mod classify;
mod diagnostics;
mod lexer;
mod reconcile;
mod sql_types;

use std::time::Instant;

use ddl_schema_core::Table;
use tracing::{debug, info};

pub use assemble::TableMap;
pub use classify::{
    Clause, ColumnClause, ForeignKeyClause, InlineReference, PrimaryKeyClause, classify_clause,
};
pub use diagnostics::{ParseDiagnostics, ParseIssue};
pub use lexer::{find_closing_paren, split_clauses, strip_sql_comments};
pub use reconcile::{
    AlterForeignKey, AlterPrimaryKey, apply_alter_foreign_key, apply_alter_primary_key,
};
pub use sql_types::map_sql_type;

/// Options for [`DdlParser`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseOptions {
    /// Mark every primary-key column non-nullable after parsing.
    ///
    /// Off by default: columns stay nullable unless `NOT NULL` is written.
    pub force_primary_key_not_null: bool,
}

/// Parser for one DDL script.
///
/// # Examples
///
/// ```
/// use ddl_schema_extract::parser::DdlParser;
///
/// let ddl = "CREATE TABLE orders (id serial PRIMARY KEY, user_id integer);\n\
///            ALTER TABLE orders ADD CONSTRAINT fk_user FOREIGN KEY (user_id) REFERENCES users(id);";
/// let mut parser = DdlParser::new(ddl);
/// let tables = parser.parse();
///
/// assert_eq!(tables.len(), 1);
/// assert_eq!(tables[0].foreign_keys[0].references_table, "users");
/// assert!(parser.warnings().is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct DdlParser {
    ddl: String,
    options: ParseOptions,
    warnings: Vec<String>,
    diagnostics: ParseDiagnostics,
}

impl DdlParser {
    pub fn new(ddl: &str) -> Self {
        Self {
            ddl: ddl.to_string(),
            options: ParseOptions::default(),
            warnings: Vec::new(),
            diagnostics: ParseDiagnostics::default(),
        }
    }

    pub fn with_options(mut self, options: ParseOptions) -> Self {
        self.options = options;
        self
    }

    /// Parses the script. An input without `CREATE TABLE` statements yields
    /// an empty vector and a [`ParseIssue::NoTablesFound`] diagnostic.
    pub fn parse(&mut self) -> Vec<Table> {
        let started = Instant::now();
        let mut diagnostics = ParseDiagnostics::default();
        let text = strip_sql_comments(&self.ddl);

        let mut tables = assemble::assemble_tables(&text, &mut diagnostics);
        if tables.is_empty() {
            debug!("No CREATE TABLE statements found");
            diagnostics.issues.push(ParseIssue::NoTablesFound);
        } else {
            reconcile::reconcile_alter_statements(&text, &mut tables, &mut diagnostics);
        }

        if self.options.force_primary_key_not_null {
            let changed: usize = tables
                .tables_mut()
                .iter_mut()
                .map(Table::normalize_primary_keys)
                .sum();
            debug!(changed, "Forced primary keys non-nullable");
        }

        let tables = tables.into_tables();
        diagnostics.tables_found = tables.len();
        diagnostics.columns = tables.iter().map(|t| t.columns.len()).sum();
        diagnostics.foreign_keys = tables.iter().map(|t| t.foreign_keys.len()).sum();

        info!(
            tables = diagnostics.tables_found,
            columns = diagnostics.columns,
            foreign_keys = diagnostics.foreign_keys,
            issues = diagnostics.issues.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Parsed DDL"
        );

        self.warnings = diagnostics.warnings();
        self.diagnostics = diagnostics;
        tables
    }

    /// Returns any warnings encountered during the most recent parse.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Returns diagnostics for the most recent parse call.
    pub fn diagnostics(&self) -> &ParseDiagnostics {
        &self.diagnostics
    }
}
