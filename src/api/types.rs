//! API request and response types

use serde::{Deserialize, Serialize};

/// Universal chat request from web, Android, and iOS clients.
///
/// `message` carries free text; `action` carries an explicit menu or
/// button choice. Either may be absent; an empty turn simply cascades
/// to the fallback tier.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub user_id: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default = "default_platform")]
    pub platform: String,
}

fn default_platform() -> String {
    "web".to_string()
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub timestamp: String,
    pub diagnostics_loaded: bool,
    pub error_codes_count: usize,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
