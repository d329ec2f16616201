//! Schema extraction through an OpenAI-compatible chat-completion service.
//!
//! [`LlmExtractor`] produces the same [`Table`] model as the regex parser by
//! asking a text-generation model to describe the DDL as JSON. The network
//! exchange sits behind [`ChatTransport`], so the extractor can be driven by
//! [`HttpTransport`] in production and by an in-memory transport in tests.
//!
//! [`HttpTransport`]: transport::HttpTransport

mod prompt;
mod response;
mod transport;

use std::thread;
use std::time::{Duration, Instant};

use ddl_schema_core::Table;
use tracing::{debug, info, warn};

use crate::config::LlmSettings;
use crate::error::ExtractError;
use crate::strategy::SchemaExtractor;

pub use prompt::{
    ChatCompletionRequest, ChatMessage, DEFAULT_SYSTEM_PROMPT, ResponseFormat, build_request,
    count_create_tables, user_prompt,
};
pub use response::{clean_response, parse_tables};
#[cfg(feature = "http")]
pub use transport::HttpTransport;
pub use transport::ChatTransport;

/// Longest single wait between attempts.
pub const MAX_RETRY_DELAY: Duration = Duration::from_secs(300);

/// Attempt budget with exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub attempts: u32,
    pub initial_delay: Duration,
    pub backoff: f64,
}

impl RetryPolicy {
    pub fn from_settings(settings: &LlmSettings) -> Self {
        Self {
            attempts: settings.retry_count.max(1),
            initial_delay: Duration::from_millis(settings.retry_delay_ms),
            backoff: settings.retry_backoff.max(1.0),
        }
    }

    /// Delay to wait after the given failed attempt (1-based), capped at
    /// [`MAX_RETRY_DELAY`].
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    /// use ddl_schema_extract::llm::RetryPolicy;
    ///
    /// let policy = RetryPolicy { attempts: 4, initial_delay: Duration::from_millis(100), backoff: 2.0 };
    /// assert_eq!(policy.delay_after(1), Duration::from_millis(100));
    /// assert_eq!(policy.delay_after(3), Duration::from_millis(400));
    /// ```
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let seconds = self.initial_delay.as_secs_f64() * self.backoff.powi(exponent);
        Duration::try_from_secs_f64(seconds)
            .map_or(MAX_RETRY_DELAY, |delay| delay.min(MAX_RETRY_DELAY))
    }
}

/// Chat-completion extraction strategy.
pub struct LlmExtractor<T: ChatTransport> {
    transport: T,
    settings: LlmSettings,
    retry: RetryPolicy,
}

impl<T: ChatTransport> LlmExtractor<T> {
    pub fn new(transport: T, settings: LlmSettings) -> Self {
        let retry = RetryPolicy::from_settings(&settings);
        Self {
            transport,
            settings,
            retry,
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Sends the request until a non-empty answer arrives, retrying
    /// transient failures and empty answers.
    fn request_with_retry(&self, request: &ChatCompletionRequest) -> Result<String, ExtractError> {
        let mut last_error = None;

        for attempt in 1..=self.retry.attempts {
            match self.transport.complete(request) {
                Ok(content) if !content.trim().is_empty() => {
                    debug!(attempt, chars = content.len(), "Received chat response");
                    return Ok(content);
                }
                Ok(_) => {
                    warn!(attempt, "Chat response was empty");
                    last_error = Some(ExtractError::InvalidResponse("empty response".into()));
                }
                Err(err) if err.is_transient() => {
                    warn!(attempt, attempts = self.retry.attempts, %err, "Chat request failed");
                    last_error = Some(err);
                }
                Err(err) => return Err(err),
            }

            if attempt < self.retry.attempts {
                let delay = self.retry.delay_after(attempt);
                debug!(delay_ms = delay.as_millis() as u64, "Waiting before retry");
                thread::sleep(delay);
            }
        }

        Err(last_error.unwrap_or_else(|| ExtractError::InvalidResponse("no response".into())))
    }
}

impl<T: ChatTransport> SchemaExtractor for LlmExtractor<T> {
    fn name(&self) -> &'static str {
        "llm"
    }

    fn extract(&self, ddl: &str) -> Result<Vec<Table>, ExtractError> {
        if ddl.trim().is_empty() {
            return Err(ExtractError::EmptyInput);
        }
        if !self.settings.enabled {
            return Err(ExtractError::Disabled("llm"));
        }

        let started = Instant::now();
        let request = build_request(&self.settings, ddl);
        let content = self.request_with_retry(&request)?;
        let tables = parse_tables(&content)?;

        info!(
            model = %self.settings.model,
            tables = tables.len(),
            columns = tables.iter().map(|t| t.columns.len()).sum::<usize>(),
            foreign_keys = tables.iter().map(|t| t.foreign_keys.len()).sum::<usize>(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Parsed chat response"
        );
        Ok(tables)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use super::*;

    struct Scripted(Mutex<VecDeque<Result<String, ExtractError>>>);

    impl Scripted {
        fn new(replies: Vec<Result<String, ExtractError>>) -> Self {
            Self(Mutex::new(replies.into()))
        }

        fn remaining(&self) -> usize {
            self.0.lock().unwrap().len()
        }
    }

    impl ChatTransport for Scripted {
        fn complete(&self, _request: &ChatCompletionRequest) -> Result<String, ExtractError> {
            self.0
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(ExtractError::fatal("script exhausted")))
        }
    }

    fn settings() -> LlmSettings {
        LlmSettings {
            retry_count: 3,
            retry_delay_ms: 0,
            ..Default::default()
        }
    }

    const ANSWER: &str = r#"[{"table_name":"users","columns":[{"name":"id","logical_type":"int","is_primary_key":true}]}]"#;

    #[test]
    fn test_transient_errors_are_retried() {
        let extractor = LlmExtractor::new(
            Scripted::new(vec![
                Err(ExtractError::transient("connection refused")),
                Ok("   ".into()),
                Ok(ANSWER.into()),
            ]),
            settings(),
        );
        let tables = extractor.extract("CREATE TABLE users (id int);").unwrap();
        assert_eq!(tables[0].table_name, "users");
        assert_eq!(extractor.transport.remaining(), 0);
    }

    #[test]
    fn test_fatal_error_stops_immediately() {
        let extractor = LlmExtractor::new(
            Scripted::new(vec![Err(ExtractError::fatal("HTTP 401")), Ok(ANSWER.into())]),
            settings(),
        );
        let err = extractor.extract("CREATE TABLE users (id int);").unwrap_err();
        assert_eq!(err, ExtractError::fatal("HTTP 401"));
        assert_eq!(extractor.transport.remaining(), 1);
    }

    #[test]
    fn test_attempts_are_bounded() {
        let extractor = LlmExtractor::new(
            Scripted::new(vec![
                Err(ExtractError::Timeout { seconds: 1 }),
                Err(ExtractError::Timeout { seconds: 1 }),
                Err(ExtractError::Timeout { seconds: 1 }),
                Ok(ANSWER.into()),
            ]),
            settings(),
        );
        assert_eq!(
            extractor.extract("CREATE TABLE users (id int);"),
            Err(ExtractError::Timeout { seconds: 1 })
        );
        assert_eq!(extractor.transport.remaining(), 1);
    }

    #[test]
    fn test_empty_input_and_disabled() {
        let extractor = LlmExtractor::new(Scripted::new(vec![]), settings());
        assert_eq!(extractor.extract(" \n "), Err(ExtractError::EmptyInput));

        let disabled = LlmExtractor::new(
            Scripted::new(vec![Ok(ANSWER.into())]),
            LlmSettings {
                enabled: false,
                ..settings()
            },
        );
        assert_eq!(disabled.extract("CREATE TABLE t (a int);"), Err(ExtractError::Disabled("llm")));
    }

    #[test]
    fn test_primary_keys_are_forced_not_null() {
        let extractor = LlmExtractor::new(Scripted::new(vec![Ok(ANSWER.into())]), settings());
        let tables = extractor.extract("CREATE TABLE users (id int);").unwrap();
        assert!(!tables[0].columns[0].is_nullable);
    }

    #[test]
    fn test_retry_policy_from_settings() {
        let policy = RetryPolicy::from_settings(&LlmSettings {
            retry_count: 0,
            retry_delay_ms: 250,
            retry_backoff: 0.5,
            ..Default::default()
        });
        assert_eq!(policy.attempts, 1);
        assert_eq!(policy.backoff, 1.0);
        assert_eq!(policy.delay_after(2), Duration::from_millis(250));
    }

    #[test]
    fn test_delay_saturates_for_huge_backoff() {
        let policy = RetryPolicy {
            attempts: 3,
            initial_delay: Duration::from_millis(1),
            backoff: f64::INFINITY,
        };
        assert_eq!(policy.delay_after(1), Duration::from_millis(1));
        assert_eq!(policy.delay_after(2), MAX_RETRY_DELAY);

        let policy = RetryPolicy { backoff: 1e300, ..policy };
        assert_eq!(policy.delay_after(3), MAX_RETRY_DELAY);
        assert_eq!(policy.delay_after(u32::MAX), MAX_RETRY_DELAY);
    }
}
