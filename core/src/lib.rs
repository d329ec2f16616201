//! Core schema model for tables extracted from SQL DDL.
//!
//! This crate defines the types shared by every extraction strategy and by
//! the renderers that consume them:
//!
//! - [`Table`]: one `CREATE TABLE` statement: name, derived entity name,
//!   columns and foreign keys.
//! - [`Column`]: a column with its logical type and key/nullability flags.
//! - [`ForeignKey`]: a reference from a column to another table.
//! - [`LogicalType`]: the engine's scalar type tag.
//!
//! Validation ([`validate_tables`]) catches structural errors such as
//! duplicate tables or columns and foreign keys naming missing columns.
//! The [`context`] module turns tables into the key/value objects that
//! template renderers consume.
//!
//! # Example
//!
//! ```
//! use ddl_schema_core::*;
//!
//! let mut orders = Table::new("orders")
//!     .with_column(Column::new("id", "serial", LogicalType::Int).primary_key())
//!     .with_column(Column::new("user_id", "integer", LogicalType::Int).foreign_key());
//! orders.add_foreign_key(ForeignKey::new("user_id", LogicalType::Int, "users", Some("id")));
//!
//! assert_eq!(orders.entity_name, "Orders");
//! assert!(validate_tables(&[orders], ValidationOptions::default()).is_empty());
//! ```

pub mod context;
pub mod naming;
mod types;
mod validate;

pub use types::*;
pub use validate::{ValidationError, ValidationOptions, validate_table, validate_tables};
