//! Output formatting for tables and reports.

use ddl_schema_core::Table;
use ddl_schema_core::context::tables_context;

use crate::report::ExtractionReport;

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum OutputFormat {
    #[default]
    Json,
    Yaml,
    Markdown,
    Table,
    /// Render context consumed by templates (JSON).
    Context,
}

impl OutputFormat {
    /// File extension used for batch outputs.
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Json | OutputFormat::Context => "json",
            OutputFormat::Yaml => "yaml",
            OutputFormat::Markdown => "md",
            OutputFormat::Table => "txt",
        }
    }
}

/// Formats extracted tables in the requested output format.
pub fn format_tables(tables: &[Table], format: OutputFormat) -> Result<String, String> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(tables)
            .map_err(|e| format!("JSON serialization failed: {e}")),
        OutputFormat::Yaml => {
            serde_yaml::to_string(tables).map_err(|e| format!("YAML serialization failed: {e}"))
        }
        OutputFormat::Markdown => Ok(tables_to_markdown(tables)),
        OutputFormat::Table => Ok(tables_to_table(tables)),
        OutputFormat::Context => serde_json::to_string_pretty(&tables_context(tables))
            .map_err(|e| format!("JSON serialization failed: {e}")),
    }
}

/// Formats an extraction report in the requested output format.
///
/// [`OutputFormat::Context`] has no report-specific meaning and renders JSON.
pub fn format_report(report: &ExtractionReport, format: OutputFormat) -> Result<String, String> {
    match format {
        OutputFormat::Json | OutputFormat::Context => serde_json::to_string_pretty(report)
            .map_err(|e| format!("JSON serialization failed: {e}")),
        OutputFormat::Yaml => {
            serde_yaml::to_string(report).map_err(|e| format!("YAML serialization failed: {e}"))
        }
        OutputFormat::Markdown => Ok(report_to_markdown(report)),
        OutputFormat::Table => Ok(report_to_table(report)),
    }
}

fn column_flags(is_primary_key: bool, is_foreign_key: bool, is_nullable: bool) -> String {
    let mut flags = Vec::new();
    if is_primary_key {
        flags.push("PK");
    }
    if is_foreign_key {
        flags.push("FK");
    }
    if !is_nullable {
        flags.push("NOT NULL");
    }
    flags.join(", ")
}

fn tables_to_markdown(tables: &[Table]) -> String {
    let mut out = String::new();

    for table in tables {
        out.push_str(&format!("# {} ({})\n\n", table.table_name, table.entity_name));

        if !table.columns.is_empty() {
            out.push_str("| Column | Type | SQL Type | Flags |\n");
            out.push_str("|--------|------|----------|-------|\n");
            for column in &table.columns {
                let flags =
                    column_flags(column.is_primary_key, column.is_foreign_key, column.is_nullable);
                out.push_str(&format!(
                    "| `{}` | {} | `{}` | {flags} |\n",
                    column.name, column.logical_type, column.sql_type
                ));
            }
            out.push('\n');
        }

        let primary_keys = table.primary_keys();
        if !primary_keys.is_empty() {
            let names: Vec<String> =
                primary_keys.iter().map(|c| format!("`{}`", c.name)).collect();
            out.push_str(&format!("Primary key: {}\n\n", names.join(", ")));
        }

        if !table.foreign_keys.is_empty() {
            out.push_str("## Foreign Keys\n\n");
            for fk in &table.foreign_keys {
                out.push_str(&format!(
                    "- `{}` → `{}.{}`",
                    fk.column_name, fk.references_table, fk.references_column
                ));
                if let Some(ref name) = fk.constraint_name {
                    out.push_str(&format!(" ({name})"));
                }
                out.push('\n');
            }
            out.push('\n');
        }
    }

    out
}

fn tables_to_table(tables: &[Table]) -> String {
    let mut out = String::new();

    for table in tables {
        out.push_str(&format!(
            "Table: {}  Entity: {}  Columns: {}\n",
            table.table_name,
            table.entity_name,
            table.columns.len()
        ));

        let name_width = table
            .columns
            .iter()
            .map(|c| c.name.len())
            .max()
            .unwrap_or(4);
        let type_width = table
            .columns
            .iter()
            .map(|c| c.logical_type.as_str().len())
            .max()
            .unwrap_or(4);

        for column in &table.columns {
            let flags =
                column_flags(column.is_primary_key, column.is_foreign_key, column.is_nullable);
            out.push_str(&format!(
                "  {:<name_width$}  {:<type_width$}  {flags}\n",
                column.name,
                column.logical_type.as_str(),
            ));
        }

        for fk in &table.foreign_keys {
            out.push_str(&format!(
                "  FK {} -> {}.{}\n",
                fk.column_name, fk.references_table, fk.references_column
            ));
        }
        out.push('\n');
    }

    out
}

fn report_to_markdown(report: &ExtractionReport) -> String {
    let mut out = String::new();

    out.push_str(&format!("# Extraction Report: {}\n\n", report.strategy));
    out.push_str(&format!(
        "- **Success:** {}\n",
        if report.success { "yes" } else { "no" }
    ));
    out.push_str(&format!("- **Tables:** {}\n", report.tables));
    out.push_str(&format!("- **Columns:** {}\n", report.columns));
    out.push_str(&format!("- **Foreign Keys:** {}\n", report.foreign_keys));
    out.push_str(&format!("- **Elapsed:** {} ms\n", report.elapsed_ms));
    if let Some(ref error) = report.error {
        out.push_str(&format!("- **Error:** {error}\n"));
    }

    for (title, items) in [
        ("Warnings", &report.warnings),
        ("Issues", &report.issues),
        ("Validation Errors", &report.validation_errors),
    ] {
        if !items.is_empty() {
            out.push_str(&format!("\n## {title}\n\n"));
            for item in items {
                out.push_str(&format!("- {item}\n"));
            }
        }
    }

    out
}

fn report_to_table(report: &ExtractionReport) -> String {
    let status = if report.success { "OK" } else { "FAIL" };
    let mut out = format!(
        "{:<8} {:<6} tables={} columns={} fks={} issues={} {}ms",
        report.strategy,
        status,
        report.tables,
        report.columns,
        report.foreign_keys,
        report.issues.len(),
        report.elapsed_ms,
    );
    if let Some(ref error) = report.error {
        out.push_str(&format!("  [{error}]"));
    }
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use ddl_schema_core::{Column, ForeignKey, LogicalType};

    fn sample_tables() -> Vec<Table> {
        let mut orders = Table::new("orders")
            .with_column(Column::new("id", "serial", LogicalType::Int).primary_key().not_null())
            .with_column(Column::new("user_id", "integer", LogicalType::Int).foreign_key());
        orders.add_foreign_key(
            ForeignKey::new("user_id", LogicalType::Int, "users", None).with_constraint_name("fk_user"),
        );
        vec![orders]
    }

    #[test]
    fn test_format_tables_json_and_yaml() {
        let json = format_tables(&sample_tables(), OutputFormat::Json).unwrap();
        assert!(json.contains("\"table_name\": \"orders\""));
        assert!(json.contains("\"logical_type\": \"int\""));

        let yaml = format_tables(&sample_tables(), OutputFormat::Yaml).unwrap();
        assert!(yaml.contains("table_name: orders"));
    }

    #[test]
    fn test_format_tables_markdown() {
        let md = format_tables(&sample_tables(), OutputFormat::Markdown).unwrap();
        assert!(md.contains("# orders (Orders)"));
        assert!(md.contains("| `id` | int | `serial` | PK, NOT NULL |"));
        assert!(md.contains("`user_id` → `users.id` (fk_user)"));
        assert!(md.contains("Primary key: `id`\n"));
    }

    #[test]
    fn test_markdown_lists_composite_primary_key() {
        let lines = Table::new("order_lines")
            .with_column(Column::new("order_id", "bigint", LogicalType::Long).primary_key())
            .with_column(Column::new("line_no", "integer", LogicalType::Int).primary_key())
            .with_column(Column::new("quantity", "integer", LogicalType::Int));
        let md = format_tables(&[lines], OutputFormat::Markdown).unwrap();
        assert!(md.contains("Primary key: `order_id`, `line_no`"));
    }

    #[test]
    fn test_format_tables_table() {
        let table = format_tables(&sample_tables(), OutputFormat::Table).unwrap();
        assert!(table.contains("Table: orders  Entity: Orders  Columns: 2"));
        assert!(table.contains("FK user_id -> users.id"));
    }

    #[test]
    fn test_format_tables_context() {
        let ctx = format_tables(&sample_tables(), OutputFormat::Context).unwrap();
        let value: serde_json::Value = serde_json::from_str(&ctx).unwrap();
        assert_eq!(value[0]["EntityName"], "Orders");
        assert_eq!(value[0]["primary_key"]["name"], "id");
    }

    #[test]
    fn test_format_report_variants() {
        let mut report = ExtractionReport::from_tables("regex", &sample_tables(), 2);
        report.warnings = vec!["Skipped 1 malformed clause(s)".into()];

        let md = format_report(&report, OutputFormat::Markdown).unwrap();
        assert!(md.contains("# Extraction Report: regex"));
        assert!(md.contains("**Success:** yes"));
        assert!(md.contains("## Warnings"));

        let line = format_report(&report, OutputFormat::Table).unwrap();
        assert!(line.contains("OK"));
        assert!(line.contains("tables=1"));

        let failed = ExtractionReport::failed("llm", "boom", 0);
        assert!(format_report(&failed, OutputFormat::Table).unwrap().contains("FAIL"));
    }
}
