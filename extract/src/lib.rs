//! Table schema extraction from PostgreSQL DDL.
//!
//! This crate turns `CREATE TABLE` / `ALTER TABLE ... FOREIGN KEY` scripts
//! into the [`Table`] model of `ddl-schema-core`. The default strategy is a
//! lexical parser that needs no SQL grammar; a chat-completion strategy can
//! be selected through configuration, alone or with the parser as fallback.
//!
//! # Main entry points
//!
//! - [`parse_ddl`]: parse DDL text with the lexical parser.
//! - [`parse_ddl_with_report`]: same, with diagnostics, validation and an
//!   [`ExtractionReport`].
//! - [`strategy::build_extractor`]: build the strategy selected by a
//!   [`GeneratorConfig`](config::GeneratorConfig).
//! - [`cache::extract_cached`]: run any strategy through a content-hash cache.
//!
//! # Example
//!
//! ```
//! use ddl_schema_core::LogicalType;
//! use ddl_schema_extract::parse_ddl;
//!
//! let ddl = "\
//! CREATE TABLE users (
//!     id serial PRIMARY KEY,
//!     email character varying(255) NOT NULL
//! );
//! CREATE TABLE orders (
//!     id serial PRIMARY KEY,
//!     user_id integer,
//!     total numeric(10, 2)
//! );
//! ALTER TABLE orders ADD CONSTRAINT fk_user FOREIGN KEY (user_id) REFERENCES users(id);
//! ";
//!
//! let tables = parse_ddl(ddl);
//! assert_eq!(tables.len(), 2);
//! assert_eq!(tables[1].columns[2].logical_type, LogicalType::Decimal);
//! assert!(tables[1].find_column("user_id").unwrap().is_foreign_key);
//! ```
//!
//! [`Table`]: ddl_schema_core::Table

pub mod cache;
pub mod config;
pub mod error;
pub mod llm;
pub mod output;
pub mod parser;
pub mod report;
pub mod strategy;

use std::time::Instant;

use cache::{ExtractionCache, extract_cached};
use ddl_schema_core::{Table, ValidationOptions, validate_tables};
use parser::{DdlParser, ParseDiagnostics, ParseOptions};
use report::ExtractionReport;
use strategy::SchemaExtractor;

pub use error::ExtractError;

/// Result of a reported extraction run.
#[derive(Debug, Clone)]
pub struct ParseRun {
    pub tables: Vec<Table>,
    pub report: ExtractionReport,
    /// Present for the lexical parser only.
    pub diagnostics: Option<ParseDiagnostics>,
}

impl ParseRun {
    pub fn success(&self) -> bool {
        self.report.success
    }
}

/// Parses DDL text with default options.
///
/// Never fails: an input without `CREATE TABLE` statements yields an empty
/// vector.
pub fn parse_ddl(ddl: &str) -> Vec<Table> {
    DdlParser::new(ddl).parse()
}

/// Parses DDL text with explicit options.
pub fn parse_ddl_with_options(ddl: &str, options: ParseOptions) -> Vec<Table> {
    DdlParser::new(ddl).with_options(options).parse()
}

/// Parses DDL text and produces a report with diagnostics and validation.
///
/// The run is unsuccessful when no tables were found.
///
/// # Examples
///
/// ```
/// use ddl_schema_extract::parse_ddl_with_report;
/// use ddl_schema_extract::parser::ParseOptions;
///
/// let run = parse_ddl_with_report("CREATE TABLE t (id int PRIMARY KEY, orphan);", ParseOptions::default());
/// assert!(run.success());
/// assert_eq!(run.report.tables, 1);
/// assert_eq!(run.report.warnings, vec!["Skipped 1 malformed clause(s)"]);
///
/// let empty = parse_ddl_with_report("-- nothing here", ParseOptions::default());
/// assert!(!empty.success());
/// ```
pub fn parse_ddl_with_report(ddl: &str, options: ParseOptions) -> ParseRun {
    let started = Instant::now();
    let mut parser = DdlParser::new(ddl).with_options(options);
    let tables = parser.parse();
    let validation = validate_tables(
        &tables,
        ValidationOptions {
            strict_primary_keys: options.force_primary_key_not_null,
        },
    );

    let report = ExtractionReport::from_tables("regex", &tables, elapsed_ms(started))
        .with_diagnostics(parser.diagnostics())
        .with_validation(&validation);

    ParseRun {
        tables,
        report,
        diagnostics: Some(parser.diagnostics().clone()),
    }
}

/// Runs any strategy, optionally through a cache, and reports on its result.
///
/// Strategy failures are captured in the report rather than returned, so a
/// batch can keep going.
pub fn extract_with_report<E: SchemaExtractor + ?Sized>(
    extractor: &E,
    ddl: &str,
    cache: Option<&mut ExtractionCache>,
) -> ParseRun {
    let started = Instant::now();
    let result = match cache {
        Some(cache) => extract_cached(extractor, ddl, cache),
        None => extractor.extract(ddl),
    };
    let (tables, report) = match result {
        Ok(tables) => {
            let validation = validate_tables(&tables, ValidationOptions::default());
            let report = ExtractionReport::from_tables(extractor.name(), &tables, elapsed_ms(started))
                .with_validation(&validation);
            (tables, report)
        }
        Err(err) => (
            Vec::new(),
            ExtractionReport::failed(extractor.name(), &err.to_string(), elapsed_ms(started)),
        ),
    };
    ParseRun {
        tables,
        report,
        diagnostics: None,
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use strategy::RegexExtractor;

    #[test]
    fn test_report_includes_validation_errors() {
        let run = parse_ddl_with_report(
            "CREATE TABLE t (a int); CREATE TABLE t (b int);",
            ParseOptions::default(),
        );
        assert!(run.success());
        assert_eq!(run.report.validation_errors, vec!["duplicate table: t"]);
    }

    #[test]
    fn test_strict_pk_validation_follows_force_option() {
        let ddl = "CREATE TABLE t (id int PRIMARY KEY);";
        let run = parse_ddl_with_report(
            ddl,
            ParseOptions {
                force_primary_key_not_null: true,
            },
        );
        assert!(run.report.validation_errors.is_empty());
        assert!(!run.tables[0].columns[0].is_nullable);
    }

    #[test]
    fn test_extract_with_report_uses_strategy_name() {
        let run = extract_with_report(&RegexExtractor::default(), "CREATE TABLE t (id int);", None);
        assert_eq!(run.report.strategy, "regex");
        assert!(run.diagnostics.is_none());
        assert_eq!(run.tables.len(), 1);
    }

    #[test]
    fn test_extract_with_report_through_cache() {
        let mut cache = ExtractionCache::in_memory();
        let ddl = "CREATE TABLE t (id int);";
        extract_with_report(&RegexExtractor::default(), ddl, Some(&mut cache));
        let run = extract_with_report(&RegexExtractor::default(), ddl, Some(&mut cache));
        assert!(run.success());
        assert_eq!(cache.stats(), (1, 1));
    }

    #[test]
    fn test_extract_with_report_empty_result_is_unsuccessful() {
        let chain = strategy::FallbackExtractor::new(Vec::new());
        let run = extract_with_report(&chain, "CREATE TABLE t (id int);", None);
        assert!(!run.success());
        assert!(run.report.error.is_none());
    }
}
