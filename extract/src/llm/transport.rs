//! Chat-completion transports.

use crate::error::ExtractError;

use super::prompt::ChatCompletionRequest;

/// Sends one chat-completion request and returns the assistant message.
///
/// Implementations classify failures through
/// [`ExtractError::is_transient`] so the extractor knows which ones to retry.
pub trait ChatTransport: Send + Sync {
    fn complete(&self, request: &ChatCompletionRequest) -> Result<String, ExtractError>;
}

impl<T: ChatTransport + ?Sized> ChatTransport for Box<T> {
    fn complete(&self, request: &ChatCompletionRequest) -> Result<String, ExtractError> {
        (**self).complete(request)
    }
}

#[cfg(feature = "http")]
pub use http::HttpTransport;

#[cfg(feature = "http")]
mod http {
    use std::time::Duration;

    use reqwest::blocking::Client;
    use tracing::{debug, info, warn};

    use super::ChatTransport;
    use crate::config::LlmSettings;
    use crate::error::ExtractError;
    use crate::llm::prompt::{ChatCompletionRequest, ChatCompletionResponse};

    /// Blocking HTTP transport for OpenAI-compatible endpoints (Ollama,
    /// llama.cpp server, hosted APIs).
    #[derive(Debug, Clone)]
    pub struct HttpTransport {
        client: Client,
        endpoint: String,
        model: String,
        timeout_seconds: u64,
        log_requests: bool,
    }

    impl HttpTransport {
        pub fn new(settings: &LlmSettings) -> Result<Self, ExtractError> {
            let client = Client::builder()
                .timeout(Duration::from_secs(settings.timeout_seconds))
                .build()
                .map_err(|err| ExtractError::fatal(format!("cannot build HTTP client: {err}")))?;
            Ok(Self {
                client,
                endpoint: settings.api_endpoint.clone(),
                model: settings.model.clone(),
                timeout_seconds: settings.timeout_seconds,
                log_requests: settings.log_requests,
            })
        }

        fn request_error(&self, err: reqwest::Error) -> ExtractError {
            if err.is_timeout() {
                return ExtractError::Timeout {
                    seconds: self.timeout_seconds,
                };
            }
            if err.is_connect() {
                return ExtractError::transient(format!(
                    "cannot connect to {} ({err}); is the model server running?",
                    self.endpoint
                ));
            }
            ExtractError::transient(format!("request to {} failed: {err}", self.endpoint))
        }
    }

    impl ChatTransport for HttpTransport {
        fn complete(&self, request: &ChatCompletionRequest) -> Result<String, ExtractError> {
            if self.log_requests {
                match serde_json::to_string(request) {
                    Ok(body) => debug!(endpoint = %self.endpoint, %body, "Chat request"),
                    Err(err) => warn!(%err, "Cannot serialize chat request for logging"),
                }
            }
            info!(endpoint = %self.endpoint, timeout_s = self.timeout_seconds, "Sending chat request");

            let response = self
                .client
                .post(&self.endpoint)
                .json(request)
                .send()
                .map_err(|err| self.request_error(err))?;
            let status = response.status();
            let body = response.text().map_err(|err| self.request_error(err))?;

            if !status.is_success() {
                if body.contains("model") && body.contains("not found") {
                    return Err(ExtractError::fatal(format!(
                        "model '{}' not found; pull it first (ollama pull {})",
                        self.model, self.model
                    )));
                }
                let message = format!("HTTP {status}: {}", body.trim());
                return Err(if status.is_server_error() {
                    ExtractError::transient(message)
                } else {
                    ExtractError::fatal(message)
                });
            }

            if self.log_requests {
                debug!(%body, "Chat response");
            }

            let parsed: ChatCompletionResponse = serde_json::from_str(&body).map_err(|err| {
                ExtractError::InvalidResponse(format!("malformed chat completion: {err}"))
            })?;
            parsed
                .into_content()
                .ok_or_else(|| ExtractError::InvalidResponse("no content in response".into()))
        }
    }
}
