//! Clause classification.
//!
//! Decides whether one top-level clause of a table body declares a column or
//! a table-level constraint, and extracts what the model captures from it.
//! This is a lexical classifier, not a grammar: input is assumed to be
//! well-formed, tool-generated DDL.

use std::sync::LazyLock;

use ddl_schema_core::{Column, DEFAULT_REFERENCED_COLUMN};
use regex::Regex;

use super::lexer::{split_words, unquote_identifier};
use super::sql_types::map_sql_type;

/// Words that end the type portion of a column definition.
const TYPE_TERMINATORS: &[&str] = &[
    "NOT",
    "NULL",
    "PRIMARY",
    "REFERENCES",
    "DEFAULT",
    "UNIQUE",
    "CHECK",
    "CONSTRAINT",
    "COLLATE",
    "GENERATED",
];

static PATTERNS: LazyLock<ClausePatterns> = LazyLock::new(ClausePatterns::new);

struct ClausePatterns {
    constraint_prefix: Regex,
    primary_key: Regex,
    foreign_key: Regex,
    other_constraint: Regex,
    inline_primary_key: Regex,
    not_null: Regex,
    references: Regex,
}

impl ClausePatterns {
    fn new() -> Self {
        // All regexes here are compile-time constants. An expect() failure indicates
        // a programmer error in the pattern, not a runtime condition.
        Self {
            // CONSTRAINT pk_users PRIMARY KEY (id)
            constraint_prefix: Regex::new(r#"(?is)^CONSTRAINT\s+"?([\w$]+)"?\s*(.*)$"#)
                .expect("static regex must compile"),
            // PRIMARY KEY (id) / PRIMARY KEY (tenant_id, id)
            primary_key: Regex::new(r"(?is)^PRIMARY\s+KEY\s*\(([^)]*)\)")
                .expect("static regex must compile"),
            // FOREIGN KEY (user_id) REFERENCES users(id)
            foreign_key: Regex::new(
                r#"(?is)^FOREIGN\s+KEY\s*\(\s*"?(\w+)"?\s*\)\s*REFERENCES\s+(?:"?\w+"?\.)?"?(\w+)"?(?:\s*\(\s*"?(\w+)"?\s*\))?"#,
            )
            .expect("static regex must compile"),
            // UNIQUE (email), CHECK (...), EXCLUDE USING ..., LIKE other
            other_constraint: Regex::new(r"(?i)^(UNIQUE|CHECK|EXCLUDE|LIKE)\b")
                .expect("static regex must compile"),
            inline_primary_key: Regex::new(r"(?i)\bPRIMARY\s+KEY\b")
                .expect("static regex must compile"),
            not_null: Regex::new(r"(?i)\bNOT\s+NULL\b").expect("static regex must compile"),
            // REFERENCES users(id) / REFERENCES public.users
            references: Regex::new(
                r#"(?i)\bREFERENCES\s+(?:"?\w+"?\.)?"?(\w+)"?(?:\s*\(\s*"?(\w+)"?\s*\))?"#,
            )
            .expect("static regex must compile"),
        }
    }
}

/// Target of an inline `REFERENCES` clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineReference {
    pub table: String,
    pub column: String,
}

/// A column definition clause.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnClause {
    pub column: Column,
    pub reference: Option<InlineReference>,
}

/// A table-level `PRIMARY KEY (...)` clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimaryKeyClause {
    pub constraint_name: Option<String>,
    pub columns: Vec<String>,
}

/// A table-level `FOREIGN KEY (...) REFERENCES ...` clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeyClause {
    pub constraint_name: Option<String>,
    pub column: String,
    pub references_table: String,
    pub references_column: String,
}

/// Classification of one clause.
#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    Column(ColumnClause),
    PrimaryKey(PrimaryKeyClause),
    ForeignKey(ForeignKeyClause),
    /// A constraint that carries nothing the model captures (unique, check, ...).
    Ignored,
    /// Too few tokens to be a column definition.
    Malformed,
}

/// Classifies one trimmed clause.
///
/// # Examples
///
/// ```
/// use ddl_schema_core::LogicalType;
/// use ddl_schema_extract::parser::{Clause, classify_clause};
///
/// match classify_clause("id serial PRIMARY KEY") {
///     Clause::Column(c) => {
///         assert!(c.column.is_primary_key);
///         assert_eq!(c.column.logical_type, LogicalType::Int);
///     }
///     other => panic!("unexpected {other:?}"),
/// }
/// assert!(matches!(classify_clause("CONSTRAINT pk PRIMARY KEY (id)"), Clause::PrimaryKey(_)));
/// assert!(matches!(classify_clause("orphan"), Clause::Malformed));
/// ```
pub fn classify_clause(clause: &str) -> Clause {
    let clause = clause.trim();
    let patterns = &*PATTERNS;

    if let Some(caps) = patterns.constraint_prefix.captures(clause) {
        let name = caps.get(1).map(|m| m.as_str().to_string());
        let rest = caps.get(2).map_or("", |m| m.as_str());
        return classify_constraint(rest, name).unwrap_or(Clause::Ignored);
    }

    if let Some(constraint) = classify_constraint(clause, None) {
        return constraint;
    }
    if patterns.other_constraint.is_match(clause) {
        return Clause::Ignored;
    }

    classify_column(clause)
}

fn classify_constraint(body: &str, constraint_name: Option<String>) -> Option<Clause> {
    let patterns = &*PATTERNS;

    if let Some(caps) = patterns.primary_key.captures(body) {
        let columns: Vec<String> = caps[1]
            .split(',')
            .map(unquote_identifier)
            .filter(|c| !c.is_empty())
            .map(String::from)
            .collect();
        return Some(Clause::PrimaryKey(PrimaryKeyClause {
            constraint_name,
            columns,
        }));
    }

    if let Some(caps) = patterns.foreign_key.captures(body) {
        return Some(Clause::ForeignKey(ForeignKeyClause {
            constraint_name,
            column: caps[1].to_string(),
            references_table: caps[2].to_string(),
            references_column: caps
                .get(3)
                .map_or(DEFAULT_REFERENCED_COLUMN, |m| m.as_str())
                .to_string(),
        }));
    }

    None
}

fn classify_column(clause: &str) -> Clause {
    let words = split_words(clause);
    if words.len() < 2 {
        return Clause::Malformed;
    }

    let name = unquote_identifier(&words[0]);
    if name.is_empty() {
        return Clause::Malformed;
    }

    let mut type_words = vec![words[1].as_str()];
    type_words.extend(
        words[2..]
            .iter()
            .map(String::as_str)
            .take_while(|word| !is_type_terminator(word)),
    );
    let sql_type = type_words.join(" ");

    let patterns = &*PATTERNS;
    let mut column = Column::new(name, &sql_type, map_sql_type(&sql_type));
    column.is_nullable = !patterns.not_null.is_match(clause);
    column.is_primary_key = patterns.inline_primary_key.is_match(clause);

    let reference = patterns.references.captures(clause).map(|caps| InlineReference {
        table: caps[1].to_string(),
        column: caps
            .get(2)
            .map_or(DEFAULT_REFERENCED_COLUMN, |m| m.as_str())
            .to_string(),
    });
    column.is_foreign_key = reference.is_some();

    Clause::Column(ColumnClause { column, reference })
}

fn is_type_terminator(word: &str) -> bool {
    let head = word.split('(').next().unwrap_or(word);
    TYPE_TERMINATORS
        .iter()
        .any(|keyword| keyword.eq_ignore_ascii_case(head))
}
