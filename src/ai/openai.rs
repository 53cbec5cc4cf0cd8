//! `OpenAI`-compatible chat-completions client

use super::{AiError, CompletionService};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const SYSTEM_PROMPT: &str = "\
You are an expert EV charging station technical support assistant. \
Help users diagnose and troubleshoot charging station issues. \
Be concise and technical, ask for the displayed error code when one is \
not provided, give actionable steps, and recommend contacting support \
when you are unsure.";

/// `OpenAI`-compatible service implementation
pub struct OpenAiService {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    max_tokens: u32,
}

impl OpenAiService {
    pub fn new(api_key: String, model: String, max_tokens: u32) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            api_key,
            model,
            base_url: "https://api.openai.com/v1/chat/completions".to_string(),
            max_tokens,
        }
    }

    /// Point the client at a compatible gateway (also used by tests).
    #[allow(dead_code)]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn build_request(&self, message: &str, history: &[(String, String)]) -> ChatCompletionRequest {
        let mut messages = vec![ChatMessage {
            role: "system".to_string(),
            content: SYSTEM_PROMPT.to_string(),
        }];
        for (role, content) in history {
            messages.push(ChatMessage {
                role: role.clone(),
                content: content.clone(),
            });
        }
        messages.push(ChatMessage {
            role: "user".to_string(),
            content: message.to_string(),
        });

        ChatCompletionRequest {
            model: self.model.clone(),
            messages,
            max_tokens: self.max_tokens,
            temperature: 0.7,
        }
    }
}

#[async_trait]
impl CompletionService for OpenAiService {
    async fn complete(
        &self,
        message: &str,
        history: &[(String, String)],
    ) -> Result<String, AiError> {
        let request = self.build_request(message, history);

        let response = self
            .client
            .post(&self.base_url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AiError::network(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = retry_after_hint(response.headers());
            let body = response.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                401 | 403 => AiError::auth(format!("authentication failed: {body}")),
                429 => AiError::rate_limit(format!("rate limited: {body}"))
                    .with_retry_after(retry_after),
                400 => AiError::invalid_request(format!("bad request: {body}")),
                500..=599 => AiError::server_error(format!("server error {status}: {body}")),
                _ => AiError::unknown(format!("unexpected status {status}: {body}")),
            });
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| AiError::unknown(format!("malformed completion response: {e}")))?;

        completion
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| AiError::unknown("completion response had no content"))
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}

/// Backoff hint from a `Retry-After` header. Only the delta-seconds form
/// is honored; the HTTP-date form is ignored.
fn retry_after_hint(headers: &reqwest::header::HeaderMap) -> Option<Duration> {
    headers
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_carries_system_prompt_and_history() {
        let svc = OpenAiService::new("key".to_string(), "gpt-4o-mini".to_string(), 500);
        let history = vec![
            ("user".to_string(), "hello".to_string()),
            ("assistant".to_string(), "hi, how can I help?".to_string()),
        ];
        let req = svc.build_request("my charger is dead", &history);

        assert_eq!(req.messages.len(), 4);
        assert_eq!(req.messages[0].role, "system");
        assert_eq!(req.messages[1].content, "hello");
        assert_eq!(req.messages[3].content, "my charger is dead");
        assert_eq!(req.max_tokens, 500);
    }

    #[test]
    fn retry_after_hint_reads_delta_seconds_only() {
        use reqwest::header::{HeaderMap, HeaderValue, RETRY_AFTER};

        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_static("30"));
        assert_eq!(retry_after_hint(&headers), Some(Duration::from_secs(30)));

        headers.insert(
            RETRY_AFTER,
            HeaderValue::from_static("Wed, 21 Oct 2026 07:28:00 GMT"),
        );
        assert_eq!(retry_after_hint(&headers), None);

        assert_eq!(retry_after_hint(&HeaderMap::new()), None);
    }
}
