//! Deterministic canned replies
//!
//! Used when no completion API key is configured, and as the degraded
//! text when the live service fails mid-turn. Keyword-keyed so demo
//! deployments still feel responsive.

use super::{AiError, CompletionService};
use async_trait::async_trait;

/// Reply returned when the live AI service fails mid-turn.
pub const DEGRADED_REPLY: &str = "I'm not sure I understood that. Could you rephrase, \
or share the error code shown on your charging station?";

const DEFAULT_REPLY: &str = "I understand you need assistance with EV charging. \
Could you share more details, or the error code displayed on your charging \
station? That helps me give you accurate diagnostics.";

pub struct CannedService;

impl CannedService {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CannedService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CompletionService for CannedService {
    async fn complete(
        &self,
        message: &str,
        _history: &[(String, String)],
    ) -> Result<String, AiError> {
        let lower = message.to_lowercase();

        let reply = if ["help", "assist", "support"].iter().any(|w| lower.contains(w)) {
            "I'm here to help with EV charging station diagnostics. You can report \
             error codes (like ER001), troubleshoot issues, or ask technical questions."
        } else if ["how", "what", "why", "when"].iter().any(|w| lower.contains(w)) {
            "I can answer questions about EV charging stations. For specific issues, \
             the error code displayed on the station gets you the fastest diagnosis."
        } else if lower.contains("thank") {
            "You're welcome! Is there anything else I can help you with?"
        } else {
            DEFAULT_REPLY
        };

        Ok(reply.to_string())
    }

    fn model_id(&self) -> &str {
        "canned"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replies_are_deterministic() {
        let svc = CannedService::new();
        let a = svc.complete("thank you so much", &[]).await.unwrap();
        let b = svc.complete("thank you so much", &[]).await.unwrap();
        assert_eq!(a, b);
        assert!(a.contains("welcome"));
    }

    #[tokio::test]
    async fn unknown_text_gets_the_generic_prompt() {
        let svc = CannedService::new();
        let reply = svc.complete("zzz", &[]).await.unwrap();
        assert_eq!(reply, DEFAULT_REPLY);
    }
}
