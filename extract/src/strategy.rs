//! Interchangeable schema extraction strategies.
//!
//! Every strategy turns DDL text into the same [`Table`] model. The regex
//! parser is always available; the chat-completion strategy is selected by
//! configuration, alone or chained with the regex parser as a fallback.

use ddl_schema_core::Table;
use tracing::{debug, info, warn};

use crate::config::{GeneratorConfig, ParserMode};
use crate::error::ExtractError;
use crate::parser::{DdlParser, ParseOptions};

/// A way of extracting tables from DDL text.
pub trait SchemaExtractor: Send + Sync {
    /// Short identifier used in logs, reports and cache keys.
    fn name(&self) -> &'static str;

    fn extract(&self, ddl: &str) -> Result<Vec<Table>, ExtractError>;
}

impl<E: SchemaExtractor + ?Sized> SchemaExtractor for Box<E> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn extract(&self, ddl: &str) -> Result<Vec<Table>, ExtractError> {
        (**self).extract(ddl)
    }
}

/// The lexical parser as a strategy. Never fails; an input without tables
/// yields an empty vector.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegexExtractor {
    options: ParseOptions,
}

impl RegexExtractor {
    pub fn new(options: ParseOptions) -> Self {
        Self { options }
    }
}

impl SchemaExtractor for RegexExtractor {
    fn name(&self) -> &'static str {
        "regex"
    }

    fn extract(&self, ddl: &str) -> Result<Vec<Table>, ExtractError> {
        Ok(DdlParser::new(ddl).with_options(self.options).parse())
    }
}

/// Tries strategies in order and returns the first non-empty success.
///
/// When no strategy produces tables, the last strategy decides: an empty
/// answer yields `Ok(vec![])`, a failure yields
/// [`ExtractError::AllStrategiesFailed`] listing every failure seen.
///
/// # Examples
///
/// ```
/// use ddl_schema_extract::strategy::{FallbackExtractor, RegexExtractor, SchemaExtractor};
///
/// let chain = FallbackExtractor::new(vec![Box::new(RegexExtractor::default())]);
/// let tables = chain.extract("CREATE TABLE t (id int);").unwrap();
/// assert_eq!(tables.len(), 1);
/// assert!(chain.extract("SELECT 1;").unwrap().is_empty());
/// ```
pub struct FallbackExtractor {
    strategies: Vec<Box<dyn SchemaExtractor>>,
}

impl FallbackExtractor {
    pub fn new(strategies: Vec<Box<dyn SchemaExtractor>>) -> Self {
        Self { strategies }
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }
}

impl SchemaExtractor for FallbackExtractor {
    fn name(&self) -> &'static str {
        "hybrid"
    }

    fn extract(&self, ddl: &str) -> Result<Vec<Table>, ExtractError> {
        let mut failures = Vec::new();
        let mut last_answered = true;

        for strategy in &self.strategies {
            match strategy.extract(ddl) {
                Ok(tables) if !tables.is_empty() => {
                    info!(strategy = strategy.name(), tables = tables.len(), "Strategy succeeded");
                    return Ok(tables);
                }
                Ok(_) => {
                    debug!(strategy = strategy.name(), "Strategy returned no tables");
                    last_answered = true;
                }
                Err(err) => {
                    warn!(strategy = strategy.name(), %err, "Strategy failed, trying next");
                    failures.push(format!("{}: {err}", strategy.name()));
                    last_answered = false;
                }
            }
        }

        if last_answered {
            Ok(Vec::new())
        } else {
            Err(ExtractError::AllStrategiesFailed(failures))
        }
    }
}

/// Builds the strategy selected by `config.parser.mode`.
///
/// `llm` mode fails with [`ExtractError::Disabled`] when `llm.enabled` is
/// false or the crate was built without HTTP support. `hybrid` mode chains
/// both strategies in `prefer_llm` order and degrades to the regex parser
/// alone when the chat-completion strategy is unavailable.
pub fn build_extractor(config: &GeneratorConfig) -> Result<Box<dyn SchemaExtractor>, ExtractError> {
    let regex = RegexExtractor::new(ParseOptions {
        force_primary_key_not_null: config.parser.force_primary_key_not_null,
    });
    info!(mode = %config.parser.mode, "Building extractor");

    match config.parser.mode {
        ParserMode::Standard => Ok(Box::new(regex)),
        ParserMode::Llm => llm_extractor(config),
        ParserMode::Hybrid => {
            let llm = match llm_extractor(config) {
                Ok(llm) => llm,
                Err(err) => {
                    warn!(%err, "Chat-completion strategy unavailable, using regex parser only");
                    return Ok(Box::new(FallbackExtractor::new(vec![Box::new(regex)])));
                }
            };
            let strategies: Vec<Box<dyn SchemaExtractor>> = if config.parser.prefer_llm {
                vec![llm, Box::new(regex)]
            } else {
                vec![Box::new(regex), llm]
            };
            Ok(Box::new(FallbackExtractor::new(strategies)))
        }
    }
}

#[cfg(feature = "http")]
fn llm_extractor(config: &GeneratorConfig) -> Result<Box<dyn SchemaExtractor>, ExtractError> {
    use crate::llm::{HttpTransport, LlmExtractor};

    if !config.llm.enabled {
        return Err(ExtractError::Disabled("llm"));
    }
    let transport = HttpTransport::new(&config.llm)?;
    Ok(Box::new(LlmExtractor::new(transport, config.llm.clone())))
}

#[cfg(not(feature = "http"))]
fn llm_extractor(_config: &GeneratorConfig) -> Result<Box<dyn SchemaExtractor>, ExtractError> {
    Err(ExtractError::Disabled("llm"))
}
