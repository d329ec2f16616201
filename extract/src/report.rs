//! Structured extraction reporting.

use std::path::PathBuf;

use ddl_schema_core::{Table, ValidationError};
use serde::{Deserialize, Serialize};

use crate::parser::ParseDiagnostics;

/// Per-input extraction report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionReport {
    /// Strategy that produced the result (`regex`, `llm`, `hybrid`).
    pub strategy: String,
    /// `false` when no tables were extracted or the strategy failed.
    pub success: bool,
    pub tables: usize,
    pub columns: usize,
    pub foreign_keys: usize,
    /// Tables that have no primary-key column.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tables_without_primary_key: Vec<String>,
    #[serde(default)]
    pub issues: Vec<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default)]
    pub validation_errors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub elapsed_ms: u64,
}

impl ExtractionReport {
    /// Builds a report from extracted tables.
    pub fn from_tables(strategy: &str, tables: &[Table], elapsed_ms: u64) -> Self {
        Self {
            strategy: strategy.to_string(),
            success: !tables.is_empty(),
            tables: tables.len(),
            columns: tables.iter().map(|t| t.columns.len()).sum(),
            foreign_keys: tables.iter().map(|t| t.foreign_keys.len()).sum(),
            tables_without_primary_key: tables
                .iter()
                .filter(|t| t.primary_key().is_none())
                .map(|t| t.table_name.clone())
                .collect(),
            issues: Vec::new(),
            warnings: Vec::new(),
            validation_errors: Vec::new(),
            error: None,
            elapsed_ms,
        }
    }

    /// Builds a report for a strategy that failed outright.
    pub fn failed(strategy: &str, error: &str, elapsed_ms: u64) -> Self {
        let mut report = Self::from_tables(strategy, &[], elapsed_ms);
        report.error = Some(error.to_string());
        report
    }

    pub fn with_diagnostics(mut self, diagnostics: &ParseDiagnostics) -> Self {
        self.issues = diagnostics.issues.iter().map(ToString::to_string).collect();
        self.warnings = diagnostics.warnings();
        self
    }

    pub fn with_validation(mut self, errors: &[ValidationError]) -> Self {
        self.validation_errors = errors.iter().map(ToString::to_string).collect();
        self
    }
}

/// Outcome of one input in a batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchEntry {
    pub input: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
    pub report: ExtractionReport,
}

/// Summary written next to batch outputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub generated_at: String,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub entries: Vec<BatchEntry>,
}

impl BatchReport {
    pub fn new(entries: Vec<BatchEntry>) -> Self {
        let succeeded = entries.iter().filter(|e| e.report.success).count();
        Self {
            generated_at: chrono::Utc::now().to_rfc3339(),
            total: entries.len(),
            succeeded,
            failed: entries.len() - succeeded,
            entries,
        }
    }
}
