//! Chat-completion request construction.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::LlmSettings;

static CREATE_TABLE_COUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)CREATE\s+TABLE").expect("static regex must compile"));

/// System prompt used when the configuration does not supply one.
pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a database schema analyst. You read PostgreSQL DDL and describe every table it defines as JSON.";

const SCHEMA_DESCRIPTION: &str = r#"

Return ONLY valid JSON, without Markdown code fences or commentary.
Return a JSON ARRAY of tables, even when the script defines a single table.

Each table object has this shape:
{
  "table_name": "table_name_from_sql",
  "entity_name": "PascalCaseTableName",
  "columns": [
    {
      "name": "column_name",
      "logical_type": "int|long|string|bool|datetime|float|double|decimal|unknown",
      "sql_type": "type as written in the script",
      "is_primary_key": false,
      "is_foreign_key": false,
      "is_nullable": true
    }
  ],
  "foreign_keys": [
    {
      "column_name": "referencing_column",
      "logical_type": "int",
      "references_table": "referenced_table",
      "references_column": "id",
      "constraint_name": "constraint_name_or_null"
    }
  ]
}

Type mapping:
- integer, serial -> int
- bigint, bigserial -> long
- text, varchar, character varying -> string
- boolean -> bool
- timestamp, date -> datetime
- real -> float
- double precision -> double
- numeric, decimal -> decimal
- anything else -> unknown

Primary keys come from inline PRIMARY KEY and from CONSTRAINT ... PRIMARY KEY (column).
Foreign keys come from inline REFERENCES and from ALTER TABLE ... ADD CONSTRAINT ... FOREIGN KEY.
A column is nullable unless it is declared NOT NULL."#;

/// OpenAI-compatible chat-completion request body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    #[serde(default)]
    pub content: Option<String>,
}

impl ChatMessage {
    fn new(role: &str, content: String) -> Self {
        Self {
            role: role.to_string(),
            content: Some(content),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResponseFormat {
    #[serde(rename = "type")]
    pub kind: String,
}

/// The subset of a chat-completion response the extractor reads.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Choice {
    pub message: Option<ChatMessage>,
}

impl ChatCompletionResponse {
    /// Content of the first choice, if any.
    pub fn into_content(self) -> Option<String> {
        self.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
    }
}

/// Counts `CREATE TABLE` occurrences, used as a size hint in the prompt.
pub fn count_create_tables(ddl: &str) -> usize {
    CREATE_TABLE_COUNT.find_iter(ddl).count()
}

pub fn user_prompt(ddl: &str) -> String {
    let count = count_create_tables(ddl);
    let shape = if count == 1 {
        "[single_table_object]"
    } else {
        "[table1, table2, ...]"
    };
    format!(
        "Parse the following PostgreSQL script and return a JSON array with its table schemas.\n\n\
         The script contains approximately {count} table(s).\n\n\
         {ddl}\n\n\
         Remember:\n\
         - Return ONLY a JSON array: {shape}\n\
         - Wrap the response in square brackets even for a single table\n\
         - Include every table, column, primary key and foreign key from the script"
    )
}

/// Builds the request for one DDL script.
pub fn build_request(settings: &LlmSettings, ddl: &str) -> ChatCompletionRequest {
    let system = if settings.system_prompt.trim().is_empty() {
        DEFAULT_SYSTEM_PROMPT
    } else {
        settings.system_prompt.as_str()
    };
    let response_format = (!settings.response_format.trim().is_empty()).then(|| ResponseFormat {
        kind: settings.response_format.clone(),
    });

    ChatCompletionRequest {
        model: settings.model.clone(),
        messages: vec![
            ChatMessage::new("system", format!("{system}{SCHEMA_DESCRIPTION}")),
            ChatMessage::new("user", user_prompt(ddl)),
        ],
        temperature: settings.temperature,
        max_tokens: settings.max_tokens,
        response_format,
    }
}
