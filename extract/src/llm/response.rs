//! Interpretation of chat-completion answers.
//!
//! Models do not reliably follow the requested shape: answers arrive wrapped
//! in Markdown fences, as a single object instead of an array, wrapped in a
//! `{"tables": [...]}` envelope, or with PascalCase / camelCase keys. This
//! module accepts all of those and normalises the result to the table model.

use ddl_schema_core::naming::to_pascal_case;
use ddl_schema_core::{Column, ForeignKey, LogicalType, Table};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::ExtractError;

/// Strips surrounding whitespace and Markdown code fences.
///
/// # Examples
///
/// ```
/// use ddl_schema_extract::llm::clean_response;
///
/// assert_eq!(clean_response("```json\n[]\n```"), "[]");
/// assert_eq!(clean_response("  {\"a\": 1} "), "{\"a\": 1}");
/// ```
pub fn clean_response(raw: &str) -> &str {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix("```") {
        // Drop the info string (`json`, `JSON`, ...) on the opening fence.
        text = rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric());
    }
    if let Some(rest) = text.trim_end().strip_suffix("```") {
        text = rest;
    }
    text.trim()
}

/// Parses a model answer into tables.
///
/// Fails with [`ExtractError::InvalidResponse`] when the answer is not JSON,
/// is neither an array nor an object, or contains no usable table.
pub fn parse_tables(raw: &str) -> Result<Vec<Table>, ExtractError> {
    let text = clean_response(raw);
    let value: Value = serde_json::from_str(text).map_err(|err| {
        let preview: String = text.chars().take(200).collect();
        ExtractError::InvalidResponse(format!("not valid JSON ({err}); starts with: {preview}"))
    })?;

    let items = match value {
        Value::Array(items) => items,
        Value::Object(object) => {
            if let Some(Value::Array(items)) = field(&object, &["tables"]) {
                debug!("Unwrapping tables envelope");
                items.clone()
            } else {
                vec![Value::Object(object)]
            }
        }
        other => {
            return Err(ExtractError::InvalidResponse(format!(
                "expected a JSON array or object, got {}",
                json_kind(&other)
            )));
        }
    };

    let tables: Vec<Table> = items
        .iter()
        .filter_map(|item| {
            let table = item.as_object().and_then(table_from_object);
            if table.is_none() {
                warn!("Ignoring table entry without a table name");
            }
            table
        })
        .collect();

    if tables.is_empty() {
        return Err(ExtractError::InvalidResponse(
            "no tables found in response".into(),
        ));
    }
    Ok(tables)
}

/// Field lookup that ignores case and underscores, so `table_name`,
/// `tableName` and `TableName` all match.
fn field<'a>(object: &'a Map<String, Value>, names: &[&str]) -> Option<&'a Value> {
    object.iter().find_map(|(key, value)| {
        let key = normalize_key(key);
        names
            .iter()
            .any(|name| normalize_key(name) == key)
            .then_some(value)
    })
}

fn normalize_key(key: &str) -> String {
    key.chars()
        .filter(|c| *c != '_')
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

fn string_field(object: &Map<String, Value>, names: &[&str]) -> Option<String> {
    field(object, names)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

fn bool_field(object: &Map<String, Value>, names: &[&str], default: bool) -> bool {
    field(object, names).and_then(Value::as_bool).unwrap_or(default)
}

fn type_field(object: &Map<String, Value>) -> LogicalType {
    string_field(object, &["logical_type", "csharp_type", "type", "data_type"])
        .map(|label| LogicalType::from_label(&label))
        .unwrap_or_default()
}

fn array_field<'a>(object: &'a Map<String, Value>, names: &[&str]) -> &'a [Value] {
    field(object, names)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

fn table_from_object(object: &Map<String, Value>) -> Option<Table> {
    let table_name = string_field(object, &["table_name", "name"])?;
    let mut table = Table::new(&table_name);
    if let Some(entity_name) = string_field(object, &["entity_name"]) {
        table.entity_name = entity_name;
    }

    for column in array_field(object, &["columns"]).iter().filter_map(Value::as_object) {
        let Some(name) = string_field(column, &["name", "column_name"]) else {
            continue;
        };
        let sql_type = string_field(column, &["sql_type"]).unwrap_or_default();
        let mut parsed = Column::new(&name, &sql_type, type_field(column));
        parsed.is_primary_key = bool_field(column, &["is_primary_key", "primary_key"], false);
        parsed.is_foreign_key = bool_field(column, &["is_foreign_key", "foreign_key"], false);
        parsed.is_nullable = bool_field(column, &["is_nullable", "nullable"], true);
        table.columns.push(parsed);
    }

    for fk in array_field(object, &["foreign_keys"]).iter().filter_map(Value::as_object) {
        let (Some(column_name), Some(references_table)) = (
            string_field(fk, &["column_name", "column"]),
            string_field(fk, &["references_table"]),
        ) else {
            continue;
        };
        let references_column = string_field(fk, &["references_column"]);
        let mut record = ForeignKey::new(
            &column_name,
            type_field(fk),
            &references_table,
            references_column.as_deref(),
        );
        if let Some(name) = string_field(fk, &["constraint_name"]) {
            record = record.with_constraint_name(&name);
        }
        table.add_foreign_key(record);
    }

    normalize_table(&mut table);
    Some(table)
}

/// Repairs the invariants a model answer may violate.
fn normalize_table(table: &mut Table) {
    if table.entity_name.trim().is_empty() {
        table.entity_name = to_pascal_case(&table.table_name);
    }
    table.normalize_primary_keys();

    let Table {
        columns,
        foreign_keys,
        ..
    } = table;
    for fk in foreign_keys.iter_mut() {
        if let Some(column) = columns.iter_mut().find(|c| c.matches(&fk.column_name)) {
            column.is_foreign_key = true;
            if fk.logical_type == LogicalType::Unknown {
                fk.logical_type = column.logical_type;
            }
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_response_variants() {
        assert_eq!(clean_response("```\n[1]\n```\n"), "[1]");
        assert_eq!(clean_response("```JSON [1]```"), "[1]");
        assert_eq!(clean_response("[1]"), "[1]");
        assert_eq!(clean_response("   "), "");
    }

    #[test]
    fn test_parse_pascal_case_single_object() {
        let raw = r#"```json
{
  "TableName": "user_profiles",
  "Columns": [
    {"Name": "id", "CSharpType": "Int32", "IsPrimaryKey": true, "IsNullable": true},
    {"Name": "created", "CSharpType": "DateTime", "IsNullable": false},
    {"Name": "owner_id", "CSharpType": "int64"}
  ],
  "ForeignKeys": [
    {"ColumnName": "owner_id", "ReferencesTable": "users"}
  ]
}
```"#;
        let tables = parse_tables(raw).unwrap();
        assert_eq!(tables.len(), 1);
        let table = &tables[0];
        assert_eq!(table.entity_name, "UserProfiles");
        assert_eq!(table.columns[0].logical_type, LogicalType::Int);
        assert!(!table.columns[0].is_nullable, "primary keys are forced non-nullable");
        assert_eq!(table.columns[1].logical_type, LogicalType::DateTime);
        assert!(table.columns[2].is_foreign_key);
        assert_eq!(table.foreign_keys[0].references_column, "id");
        assert_eq!(table.foreign_keys[0].logical_type, LogicalType::Long);
    }

    #[test]
    fn test_parse_snake_case_array_and_envelope() {
        let array = r#"[{"table_name":"a","columns":[{"name":"x","logical_type":"decimal"}]},{"table_name":"b"}]"#;
        let tables = parse_tables(array).unwrap();
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0].columns[0].logical_type, LogicalType::Decimal);
        assert!(tables[1].columns.is_empty());

        let envelope = r#"{"tables":[{"tableName":"c","entityName":"Cee"}]}"#;
        let tables = parse_tables(envelope).unwrap();
        assert_eq!(tables[0].table_name, "c");
        assert_eq!(tables[0].entity_name, "Cee");
    }

    #[test]
    fn test_invalid_responses() {
        for raw in ["not json", "42", "[]", r#"[{"columns":[]}]"#, ""] {
            let err = parse_tables(raw).unwrap_err();
            assert!(matches!(err, ExtractError::InvalidResponse(_)), "{raw}: {err}");
        }
    }

    #[test]
    fn test_unknown_type_labels_degrade() {
        let tables =
            parse_tables(r#"[{"table_name":"t","columns":[{"name":"doc","type":"object"}]}]"#).unwrap();
        assert_eq!(tables[0].columns[0].logical_type, LogicalType::Unknown);
    }
}
