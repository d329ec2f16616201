//! Render context for template collaborators.
//!
//! Templates consume a table as a generic key/value object. Two naming
//! conventions are in circulation (PascalCase keys and snake_case keys), so
//! every column and primary-key entry carries both spellings of each field.

use serde_json::{Map, Value, json};

use crate::{Column, ForeignKey, Table};

/// Column names treated as bookkeeping rather than user-editable data.
pub const SYSTEM_COLUMNS: &[&str] = &["id", "created_at", "updated_at", "created_by", "updated_by"];

/// Placeholder replaced by the entity name in template file and directory names.
pub const TABLE_PLACEHOLDER: &str = "$table$";

/// Returns `true` for bookkeeping columns (case-insensitive).
pub fn is_system_column(name: &str) -> bool {
    SYSTEM_COLUMNS
        .iter()
        .any(|system| system.eq_ignore_ascii_case(name))
}

/// Replaces every `$table$` placeholder with the table's entity name.
///
/// # Examples
///
/// ```
/// use ddl_schema_core::{Table, context::expand_placeholder};
///
/// let table = Table::new("user_profiles");
/// assert_eq!(expand_placeholder("$table$/$table$Service.cs", &table), "UserProfiles/UserProfilesService.cs");
/// ```
pub fn expand_placeholder(segment: &str, table: &Table) -> String {
    segment.replace(TABLE_PLACEHOLDER, &table.entity_name)
}

fn column_value(column: &Column, is_system: bool) -> Value {
    json!({
        "Name": column.name,
        "LogicalType": column.logical_type.as_str(),
        "SqlType": column.sql_type,
        "IsPrimaryKey": column.is_primary_key,
        "IsForeignKey": column.is_foreign_key,
        "IsNullable": column.is_nullable,
        "IsSystem": is_system,
        "name": column.name,
        "logical_type": column.logical_type.as_str(),
        "sql_type": column.sql_type,
        "is_primary_key": column.is_primary_key,
        "is_foreign_key": column.is_foreign_key,
        "is_nullable": column.is_nullable,
        "is_system": is_system,
    })
}

fn foreign_key_value(fk: &ForeignKey) -> Value {
    json!({
        "ColumnName": fk.column_name,
        "LogicalType": fk.logical_type.as_str(),
        "ReferencesTable": fk.references_table,
        "ReferencesColumn": fk.references_column,
        "ConstraintName": fk.constraint_name,
        "column_name": fk.column_name,
        "logical_type": fk.logical_type.as_str(),
        "references_table": fk.references_table,
        "references_column": fk.references_column,
        "constraint_name": fk.constraint_name,
    })
}

/// Builds the render context for one table.
///
/// The `primary_key` entry is the first primary-key column or an explicit
/// `null` when the table has none.
///
/// # Examples
///
/// ```
/// use ddl_schema_core::{Column, LogicalType, Table, context::table_context};
///
/// let table = Table::new("users")
///     .with_column(Column::new("id", "serial", LogicalType::Int).primary_key())
///     .with_column(Column::new("email", "text", LogicalType::String));
///
/// let ctx = table_context(&table);
/// assert_eq!(ctx["entity_name"], "Users");
/// assert_eq!(ctx["columns"][0]["Name"], ctx["columns"][0]["name"]);
/// assert_eq!(ctx["primary_key"]["logical_type"], "int");
/// assert_eq!(ctx["editable_columns"].as_array().unwrap().len(), 1);
/// ```
pub fn table_context(table: &Table) -> Value {
    let columns: Vec<Value> = table
        .columns
        .iter()
        .map(|c| column_value(c, is_system_column(&c.name)))
        .collect();
    let editable: Vec<Value> = table
        .columns
        .iter()
        .filter(|c| !is_system_column(&c.name))
        .map(|c| column_value(c, false))
        .collect();
    let foreign_keys: Vec<Value> = table.foreign_keys.iter().map(foreign_key_value).collect();

    let primary_key = table.primary_key().map_or(Value::Null, |pk| {
        json!({
            "Name": pk.name,
            "LogicalType": pk.logical_type.as_str(),
            "name": pk.name,
            "logical_type": pk.logical_type.as_str(),
        })
    });

    let mut ctx = Map::new();
    ctx.insert("TableName".into(), Value::from(table.table_name.as_str()));
    ctx.insert("EntityName".into(), Value::from(table.entity_name.as_str()));
    ctx.insert("table_name".into(), Value::from(table.table_name.as_str()));
    ctx.insert("entity_name".into(), Value::from(table.entity_name.as_str()));
    ctx.insert("columns".into(), Value::Array(columns));
    ctx.insert("editable_columns".into(), Value::Array(editable));
    ctx.insert("foreign_keys".into(), Value::Array(foreign_keys));
    ctx.insert("primary_key".into(), primary_key);
    Value::Object(ctx)
}

/// Builds render contexts for every table, preserving order.
pub fn tables_context(tables: &[Table]) -> Value {
    Value::Array(tables.iter().map(table_context).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LogicalType;

    #[test]
    fn test_primary_key_is_null_when_absent() {
        let table = Table::new("audit_log")
            .with_column(Column::new("message", "text", LogicalType::String));
        let ctx = table_context(&table);
        assert!(ctx["primary_key"].is_null());
    }

    #[test]
    fn test_system_columns_flagged_and_filtered() {
        let table = Table::new("posts")
            .with_column(Column::new("id", "serial", LogicalType::Int).primary_key())
            .with_column(Column::new("title", "text", LogicalType::String))
            .with_column(Column::new("Created_At", "timestamp", LogicalType::DateTime));
        let ctx = table_context(&table);

        let columns = ctx["columns"].as_array().unwrap();
        assert_eq!(columns[0]["IsSystem"], true);
        assert_eq!(columns[1]["is_system"], false);
        assert_eq!(columns[2]["is_system"], true);

        let editable = ctx["editable_columns"].as_array().unwrap();
        assert_eq!(editable.len(), 1);
        assert_eq!(editable[0]["name"], "title");
    }

    #[test]
    fn test_foreign_keys_carry_both_spellings() {
        let mut table = Table::new("orders")
            .with_column(Column::new("user_id", "integer", LogicalType::Int).foreign_key());
        table.add_foreign_key(
            ForeignKey::new("user_id", LogicalType::Int, "users", None).with_constraint_name("fk_user"),
        );
        let ctx = table_context(&table);
        let fk = &ctx["foreign_keys"][0];
        assert_eq!(fk["references_table"], "users");
        assert_eq!(fk["ReferencesColumn"], "id");
        assert_eq!(fk["constraint_name"], "fk_user");
        assert_eq!(fk["logical_type"], "int");
    }

    #[test]
    fn test_tables_context_preserves_order() {
        let ctx = tables_context(&[Table::new("b"), Table::new("a")]);
        assert_eq!(ctx[0]["table_name"], "b");
        assert_eq!(ctx[1]["table_name"], "a");
    }
}
