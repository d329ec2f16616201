//! SQL type keyword to logical type mapping.

use ddl_schema_core::LogicalType;

/// Reduces a raw SQL type to its lookup phrase: lowercase, parenthesised
/// arguments and array suffixes removed, whitespace collapsed.
fn type_phrase(raw: &str) -> String {
    let mut phrase = String::with_capacity(raw.len());
    let mut depth = 0usize;
    for ch in raw.chars() {
        match ch {
            '(' | '[' => depth += 1,
            ')' | ']' => depth = depth.saturating_sub(1),
            _ if depth == 0 => phrase.push(ch.to_ascii_lowercase()),
            _ => {}
        }
    }
    phrase.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn lookup(phrase: &str) -> Option<LogicalType> {
    let ty = match phrase {
        "integer" | "serial" => LogicalType::Int,
        "bigint" | "bigserial" => LogicalType::Long,
        "text" | "varchar" | "character varying" => LogicalType::String,
        "boolean" => LogicalType::Bool,
        "timestamp" | "timestamp without time zone" | "date" => LogicalType::DateTime,
        "real" => LogicalType::Float,
        "double precision" => LogicalType::Double,
        "numeric" | "decimal" => LogicalType::Decimal,
        _ => return None,
    };
    Some(ty)
}

/// Maps a SQL type to a logical type.
///
/// Matching is case-insensitive on the full type phrase first
/// (`double precision`, `character varying(255)`), then on its first word
/// (`varchar(255)` → `varchar`, `timestamp(3) with time zone` →
/// `timestamp`). Unmapped types degrade to [`LogicalType::Unknown`].
///
/// # Examples
///
/// ```
/// use ddl_schema_core::LogicalType;
/// use ddl_schema_extract::parser::map_sql_type;
///
/// assert_eq!(map_sql_type("SERIAL"), LogicalType::Int);
/// assert_eq!(map_sql_type("varchar(255)"), LogicalType::String);
/// assert_eq!(map_sql_type("double precision"), LogicalType::Double);
/// assert_eq!(map_sql_type("jsonb"), LogicalType::Unknown);
/// ```
pub fn map_sql_type(raw: &str) -> LogicalType {
    let phrase = type_phrase(raw);
    if let Some(ty) = lookup(&phrase) {
        return ty;
    }
    phrase
        .split(' ')
        .next()
        .and_then(lookup)
        .unwrap_or(LogicalType::Unknown)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_table() {
        let cases = [
            ("integer", LogicalType::Int),
            ("serial", LogicalType::Int),
            ("bigint", LogicalType::Long),
            ("bigserial", LogicalType::Long),
            ("text", LogicalType::String),
            ("varchar", LogicalType::String),
            ("character varying", LogicalType::String),
            ("boolean", LogicalType::Bool),
            ("timestamp", LogicalType::DateTime),
            ("timestamp without time zone", LogicalType::DateTime),
            ("date", LogicalType::DateTime),
            ("real", LogicalType::Float),
            ("double precision", LogicalType::Double),
            ("numeric", LogicalType::Decimal),
            ("decimal", LogicalType::Decimal),
        ];
        for (raw, expected) in cases {
            assert_eq!(map_sql_type(raw), expected, "{raw}");
        }
    }

    #[test]
    fn test_arguments_and_case_are_ignored() {
        assert_eq!(map_sql_type("NUMERIC(10, 2)"), LogicalType::Decimal);
        assert_eq!(map_sql_type("Character  Varying(64)"), LogicalType::String);
        assert_eq!(map_sql_type("integer[]"), LogicalType::Int);
        assert_eq!(map_sql_type("timestamp(3) with time zone"), LogicalType::DateTime);
    }

    #[test]
    fn test_unmapped_types_are_unknown() {
        for raw in ["jsonb", "uuid", "smallint", "character(2)", "", "double"] {
            assert_eq!(map_sql_type(raw), LogicalType::Unknown, "{raw}");
        }
    }
}
