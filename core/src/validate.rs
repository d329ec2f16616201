//! Table model validation.
//!
//! Validates structural invariants of extracted tables, catching problems
//! such as duplicate tables or columns, foreign keys that name missing
//! columns, and duplicate foreign keys before they reach a renderer.
//!
//! # Examples
//!
//! ```
//! use ddl_schema_core::*;
//!
//! let users = Table::new("users")
//!     .with_column(Column::new("id", "serial", LogicalType::Int).primary_key().not_null());
//! assert!(validate_tables(&[users.clone()], ValidationOptions::default()).is_empty());
//!
//! // Duplicate table names (case-insensitive) are rejected
//! let errors = validate_tables(&[users.clone(), Table::new("USERS")], ValidationOptions::default());
//! assert!(errors.iter().any(|e| matches!(e, ValidationError::DuplicateTable(_))));
//! ```

use std::collections::HashSet;

use thiserror::Error;

use crate::Table;

/// Table validation errors.
///
/// Each variant describes a specific structural problem found during
/// validation. The `Display` impl provides a human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Table name is empty or whitespace-only.
    #[error("table name cannot be empty")]
    EmptyTableName,
    /// Two tables share a name (case-insensitive).
    #[error("duplicate table: {0}")]
    DuplicateTable(String),
    /// A column name is empty.
    #[error("empty column name in table {0}")]
    EmptyColumnName(String),
    /// Two columns in one table share a name (case-insensitive).
    #[error("duplicate column {column} in table {table}")]
    DuplicateColumn { table: String, column: String },
    /// More than one foreign key targets the same column.
    #[error("duplicate foreign key for column {column} in table {table}")]
    DuplicateForeignKey { table: String, column: String },
    /// A foreign key names a column the table does not have.
    #[error("foreign key in table {table} names missing column {column}")]
    ForeignKeyColumnMissing { table: String, column: String },
    /// A foreign-key record exists but the column is not flagged.
    #[error("column {column} in table {table} has a foreign key but is not flagged")]
    ForeignKeyFlagMissing { table: String, column: String },
    /// A primary-key column is nullable.
    #[error("primary key column {column} in table {table} is nullable")]
    NullablePrimaryKey { table: String, column: String },
}

/// Knobs for [`validate_tables`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidationOptions {
    /// Report nullable primary-key columns.
    ///
    /// Off by default: the base extraction path does not force primary keys
    /// to be non-nullable.
    pub strict_primary_keys: bool,
}

/// Validates a sequence of tables.
///
/// Checks table-name uniqueness, then validates each table individually.
/// All problems are reported; validation does not stop at the first one.
pub fn validate_tables(tables: &[Table], options: ValidationOptions) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for table in tables {
        if !table.table_name.trim().is_empty()
            && !seen.insert(table.table_name.to_ascii_lowercase())
        {
            errors.push(ValidationError::DuplicateTable(table.table_name.clone()));
        }
        errors.extend(validate_table(table, options));
    }

    errors
}

/// Validates a single table.
///
/// # Examples
///
/// ```
/// use ddl_schema_core::*;
///
/// let mut orders = Table::new("orders")
///     .with_column(Column::new("user_id", "integer", LogicalType::Int));
/// orders.foreign_keys.push(ForeignKey::new("customer_id", LogicalType::Int, "customers", None));
///
/// let errors = validate_table(&orders, ValidationOptions::default());
/// assert!(errors.iter().any(|e| matches!(e, ValidationError::ForeignKeyColumnMissing { .. })));
/// ```
pub fn validate_table(table: &Table, options: ValidationOptions) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if table.table_name.trim().is_empty() {
        errors.push(ValidationError::EmptyTableName);
        return errors;
    }
    let name = table.table_name.as_str();

    let mut columns: HashSet<String> = HashSet::new();
    for column in &table.columns {
        if column.name.trim().is_empty() {
            errors.push(ValidationError::EmptyColumnName(name.to_string()));
            continue;
        }
        if !columns.insert(column.name.to_ascii_lowercase()) {
            errors.push(ValidationError::DuplicateColumn {
                table: name.to_string(),
                column: column.name.clone(),
            });
        }
        if options.strict_primary_keys && column.is_primary_key && column.is_nullable {
            errors.push(ValidationError::NullablePrimaryKey {
                table: name.to_string(),
                column: column.name.clone(),
            });
        }
    }

    let mut fk_columns: HashSet<String> = HashSet::new();
    for fk in &table.foreign_keys {
        if !fk_columns.insert(fk.column_name.to_ascii_lowercase()) {
            errors.push(ValidationError::DuplicateForeignKey {
                table: name.to_string(),
                column: fk.column_name.clone(),
            });
            continue;
        }
        match table.find_column(&fk.column_name) {
            None => errors.push(ValidationError::ForeignKeyColumnMissing {
                table: name.to_string(),
                column: fk.column_name.clone(),
            }),
            Some(column) if !column.is_foreign_key => {
                errors.push(ValidationError::ForeignKeyFlagMissing {
                    table: name.to_string(),
                    column: column.name.clone(),
                })
            }
            Some(_) => {}
        }
    }

    errors
}
