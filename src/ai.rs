//! Generative fallback service
//!
//! Invoked only when the deterministic tiers (diagnostics, flow, intent)
//! all miss. The interface is a single opaque text completion; retry, if
//! any, belongs to the caller.

mod canned;
mod error;
mod openai;

pub use canned::{CannedService, DEGRADED_REPLY};
pub use error::AiError;
pub use openai::OpenAiService;

use crate::config::Config;
use async_trait::async_trait;
use std::sync::Arc;

/// Common interface for completion providers
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Generate a reply to the message, given recent (role, content)
    /// history lines, oldest first.
    async fn complete(&self, message: &str, history: &[(String, String)])
        -> Result<String, AiError>;

    /// Identifier used in logs
    fn model_id(&self) -> &str;
}

/// Logging wrapper for completion services
pub struct LoggingService {
    inner: Arc<dyn CompletionService>,
    model_id: String,
}

impl LoggingService {
    pub fn new(inner: Arc<dyn CompletionService>) -> Self {
        let model_id = inner.model_id().to_string();
        Self { inner, model_id }
    }
}

#[async_trait]
impl CompletionService for LoggingService {
    async fn complete(
        &self,
        message: &str,
        history: &[(String, String)],
    ) -> Result<String, AiError> {
        let start = std::time::Instant::now();
        let result = self.inner.complete(message, history).await;
        let duration = start.elapsed();

        match &result {
            Ok(text) => {
                tracing::info!(
                    model = %self.model_id,
                    duration_ms = %duration.as_millis(),
                    chars = text.len(),
                    "completion request finished"
                );
            }
            Err(e) => {
                tracing::error!(
                    model = %self.model_id,
                    duration_ms = %duration.as_millis(),
                    error = %e.message,
                    retryable = e.kind.is_retryable(),
                    retry_after = ?e.retry_after,
                    "completion request failed"
                );
            }
        }

        result
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

/// Build the configured completion service: a live `OpenAI`-compatible
/// client when a key is set, canned deterministic replies otherwise.
pub fn service_from_config(config: &Config) -> Arc<dyn CompletionService> {
    let inner: Arc<dyn CompletionService> = match &config.openai_api_key {
        Some(key) if !key.is_empty() => Arc::new(OpenAiService::new(
            key.clone(),
            config.openai_model.clone(),
            config.openai_max_tokens,
        )),
        _ => {
            tracing::warn!("OPENAI_API_KEY not set, AI fallback uses canned responses");
            Arc::new(CannedService::new())
        }
    };
    Arc::new(LoggingService::new(inner))
}
