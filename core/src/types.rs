//! Schema type definitions for DDL-derived table modeling.
//!
//! This module defines the in-memory model produced by extraction: a
//! [`Table`] owns its [`Column`]s in declaration order and its
//! [`ForeignKey`]s in discovery order. The types serialize with [`serde`]
//! in a single snake_case shape; renderer-facing duplication of field
//! names lives in [`crate::context`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::naming::to_pascal_case;

/// Referenced column assumed when a reference omits an explicit column.
pub const DEFAULT_REFERENCED_COLUMN: &str = "id";

/// Logical scalar type of a column.
///
/// This is the engine's own type tag, independent of any output language.
/// SQL types that have no mapping degrade to [`LogicalType::Unknown`]
/// rather than failing extraction.
///
/// # Examples
///
/// ```
/// use ddl_schema_core::LogicalType;
///
/// assert_eq!(LogicalType::default(), LogicalType::Unknown);
/// assert_eq!(LogicalType::DateTime.as_str(), "datetime");
/// assert_eq!(LogicalType::from_label("Int64"), LogicalType::Long);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogicalType {
    /// 32-bit integer (`integer`, `serial`).
    Int,
    /// 64-bit integer (`bigint`, `bigserial`).
    Long,
    /// Text (`text`, `varchar`, `character varying`).
    String,
    /// Boolean.
    Bool,
    /// Date or timestamp.
    DateTime,
    /// Single-precision float (`real`).
    Float,
    /// Double-precision float (`double precision`).
    Double,
    /// Arbitrary-precision number (`numeric`, `decimal`).
    Decimal,
    /// No mapping known (the default).
    #[default]
    Unknown,
}

impl LogicalType {
    /// All logical types, in declaration order.
    pub const ALL: [LogicalType; 9] = [
        LogicalType::Int,
        LogicalType::Long,
        LogicalType::String,
        LogicalType::Bool,
        LogicalType::DateTime,
        LogicalType::Float,
        LogicalType::Double,
        LogicalType::Decimal,
        LogicalType::Unknown,
    ];

    /// Returns the canonical lowercase tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogicalType::Int => "int",
            LogicalType::Long => "long",
            LogicalType::String => "string",
            LogicalType::Bool => "bool",
            LogicalType::DateTime => "datetime",
            LogicalType::Float => "float",
            LogicalType::Double => "double",
            LogicalType::Decimal => "decimal",
            LogicalType::Unknown => "unknown",
        }
    }

    /// Leniently maps a free-form type label onto a logical type.
    ///
    /// Accepts the canonical tags plus the spellings produced by external
    /// extractors and language-flavoured names (`Int32`, `DateTime`,
    /// `nvarchar`, `money`, ...). Matching is case-insensitive. Anything
    /// unrecognized becomes [`LogicalType::Unknown`].
    ///
    /// # Examples
    ///
    /// ```
    /// use ddl_schema_core::LogicalType;
    ///
    /// assert_eq!(LogicalType::from_label("DateTime"), LogicalType::DateTime);
    /// assert_eq!(LogicalType::from_label("nvarchar"), LogicalType::String);
    /// assert_eq!(LogicalType::from_label("object"), LogicalType::Unknown);
    /// ```
    pub fn from_label(label: &str) -> Self {
        let lower = label.trim().to_ascii_lowercase();
        match lower.as_str() {
            "int" | "int32" | "integer" | "serial" | "smallint" | "short" => LogicalType::Int,
            "long" | "int64" | "bigint" | "bigserial" => LogicalType::Long,
            "string" | "text" | "varchar" | "nvarchar" | "character varying" | "char" => {
                LogicalType::String
            }
            "bool" | "boolean" => LogicalType::Bool,
            "datetime" | "date" | "timestamp" | "datetimeoffset" | "timestamp without time zone" => {
                LogicalType::DateTime
            }
            "float" | "single" | "real" => LogicalType::Float,
            "double" | "double precision" => LogicalType::Double,
            "decimal" | "numeric" | "money" => LogicalType::Decimal,
            _ => LogicalType::Unknown,
        }
    }
}

impl fmt::Display for LogicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A column of a table.
///
/// Columns are nullable unless `NOT NULL` was declared. The raw SQL type is
/// kept next to the logical type so renderers can emit either.
///
/// # Examples
///
/// ```
/// use ddl_schema_core::{Column, LogicalType};
///
/// let id = Column::new("id", "serial", LogicalType::Int).primary_key();
/// assert!(id.is_primary_key);
/// assert!(id.is_nullable);
///
/// let email = Column::new("email", "varchar(255)", LogicalType::String).not_null();
/// assert!(!email.is_nullable);
/// assert!(email.matches("EMAIL"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    /// Column name as declared (quotes stripped).
    pub name: String,
    /// Logical scalar type.
    pub logical_type: LogicalType,
    /// Raw SQL type text (e.g. `numeric(10, 2)`).
    #[serde(default)]
    pub sql_type: String,
    pub is_primary_key: bool,
    pub is_foreign_key: bool,
    pub is_nullable: bool,
}

impl Column {
    /// Creates a nullable, non-key column.
    pub fn new(name: &str, sql_type: &str, logical_type: LogicalType) -> Self {
        Self {
            name: name.to_string(),
            logical_type,
            sql_type: sql_type.to_string(),
            is_primary_key: false,
            is_foreign_key: false,
            is_nullable: true,
        }
    }

    /// Marks as primary key.
    pub fn primary_key(mut self) -> Self {
        self.is_primary_key = true;
        self
    }

    /// Marks as foreign key.
    pub fn foreign_key(mut self) -> Self {
        self.is_foreign_key = true;
        self
    }

    /// Marks as `NOT NULL`.
    pub fn not_null(mut self) -> Self {
        self.is_nullable = false;
        self
    }

    /// Case-insensitive name comparison.
    pub fn matches(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

/// A foreign-key relationship from one column to a referenced table.
///
/// `constraint_name` is `None` for inline `REFERENCES` clauses and set for
/// named `CONSTRAINT ... FOREIGN KEY` declarations.
///
/// # Examples
///
/// ```
/// use ddl_schema_core::{ForeignKey, LogicalType};
///
/// let fk = ForeignKey::new("user_id", LogicalType::Int, "users", None)
///     .with_constraint_name("fk_user");
/// assert_eq!(fk.references_column, "id");
/// assert_eq!(fk.constraint_name.as_deref(), Some("fk_user"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKey {
    /// Referencing column in the owning table.
    pub column_name: String,
    /// Logical type copied from the owning column at detection time.
    pub logical_type: LogicalType,
    pub references_table: String,
    pub references_column: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraint_name: Option<String>,
}

impl ForeignKey {
    /// Creates an unnamed foreign key. A missing referenced column defaults
    /// to [`DEFAULT_REFERENCED_COLUMN`].
    pub fn new(
        column_name: &str,
        logical_type: LogicalType,
        references_table: &str,
        references_column: Option<&str>,
    ) -> Self {
        Self {
            column_name: column_name.to_string(),
            logical_type,
            references_table: references_table.to_string(),
            references_column: references_column
                .unwrap_or(DEFAULT_REFERENCED_COLUMN)
                .to_string(),
            constraint_name: None,
        }
    }

    /// Sets the constraint name.
    pub fn with_constraint_name(mut self, name: &str) -> Self {
        self.constraint_name = Some(name.to_string());
        self
    }

    /// Case-insensitive comparison against the referencing column.
    pub fn is_for_column(&self, column: &str) -> bool {
        self.column_name.eq_ignore_ascii_case(column)
    }
}

/// A table extracted from one `CREATE TABLE` statement.
///
/// This is the primary type in the crate. Tables are keyed by name
/// case-insensitively; `entity_name` is the PascalCase display name
/// derived from `table_name`.
///
/// # Examples
///
/// ```
/// use ddl_schema_core::{Column, ForeignKey, LogicalType, Table};
///
/// let mut orders = Table::new("order_items")
///     .with_column(Column::new("id", "serial", LogicalType::Int).primary_key())
///     .with_column(Column::new("order_id", "integer", LogicalType::Int));
/// assert_eq!(orders.entity_name, "OrderItems");
///
/// let fk = ForeignKey::new("order_id", LogicalType::Int, "orders", None);
/// assert!(orders.add_foreign_key(fk.clone()));
/// assert!(!orders.add_foreign_key(fk)); // one foreign key per column
///
/// assert_eq!(orders.primary_key().map(|c| c.name.as_str()), Some("id"));
/// assert!(orders.find_column("ORDER_ID").is_some());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    /// Raw table identifier.
    pub table_name: String,
    /// Display name (PascalCase of `table_name`).
    pub entity_name: String,
    /// Columns in declaration order.
    #[serde(default)]
    pub columns: Vec<Column>,
    /// Foreign keys in discovery order.
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKey>,
}

impl Table {
    /// Creates an empty table, deriving the entity name.
    pub fn new(table_name: &str) -> Self {
        Self {
            table_name: table_name.to_string(),
            entity_name: to_pascal_case(table_name),
            ..Default::default()
        }
    }

    /// Adds a column.
    pub fn with_column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    /// Case-insensitive table name comparison.
    pub fn matches(&self, name: &str) -> bool {
        self.table_name.eq_ignore_ascii_case(name)
    }

    /// Finds a column by case-insensitive name.
    pub fn find_column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.matches(name))
    }

    /// Finds a column by case-insensitive name for mutation.
    pub fn find_column_mut(&mut self, name: &str) -> Option<&mut Column> {
        self.columns.iter_mut().find(|c| c.matches(name))
    }

    /// Returns the first primary-key column, if any.
    pub fn primary_key(&self) -> Option<&Column> {
        self.columns.iter().find(|c| c.is_primary_key)
    }

    /// Returns every primary-key column in declaration order.
    pub fn primary_keys(&self) -> Vec<&Column> {
        self.columns.iter().filter(|c| c.is_primary_key).collect()
    }

    /// Finds the foreign key declared for a column (case-insensitive).
    pub fn find_foreign_key(&self, column: &str) -> Option<&ForeignKey> {
        self.foreign_keys.iter().find(|fk| fk.is_for_column(column))
    }

    /// Appends a foreign key unless the column already has one.
    ///
    /// Returns `true` when the record was added. Later discoveries for the
    /// same column are ignored, not merged.
    pub fn add_foreign_key(&mut self, foreign_key: ForeignKey) -> bool {
        if self.find_foreign_key(&foreign_key.column_name).is_some() {
            return false;
        }
        self.foreign_keys.push(foreign_key);
        true
    }

    /// Forces every primary-key column to be non-nullable.
    ///
    /// Returns the number of columns changed.
    pub fn normalize_primary_keys(&mut self) -> usize {
        let mut changed = 0;
        for column in self.columns.iter_mut().filter(|c| c.is_primary_key) {
            if column.is_nullable {
                column.is_nullable = false;
                changed += 1;
            }
        }
        changed
    }
}
