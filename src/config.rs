//! Environment-driven configuration

/// Application settings, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub db_path: String,
    pub error_codes_path: String,
    pub flows_path: String,
    /// Heuristic knob for bare numeric codes like `301`: when set, the
    /// message must also look like an error report before a naked number
    /// is accepted. See `catalog`.
    pub bare_code_needs_context: bool,
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub openai_max_tokens: u32,
}

impl Config {
    pub fn from_env() -> Self {
        let db_path = std::env::var("VOLTDESK_DB_PATH").unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            format!("{home}/.voltdesk/voltdesk.db")
        });

        Self {
            port: env_parsed("VOLTDESK_PORT", 8000),
            db_path,
            error_codes_path: std::env::var("VOLTDESK_ERROR_CODES")
                .unwrap_or_else(|_| "data/error_codes.json".to_string()),
            flows_path: std::env::var("VOLTDESK_FLOWS")
                .unwrap_or_else(|_| "data/flows.json".to_string()),
            bare_code_needs_context: std::env::var("VOLTDESK_BARE_CODE_CONTEXT")
                .map_or(true, |v| v != "0" && !v.eq_ignore_ascii_case("false")),
            openai_api_key: std::env::var("OPENAI_API_KEY").ok(),
            openai_model: std::env::var("OPENAI_MODEL")
                .unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            openai_max_tokens: env_parsed("OPENAI_MAX_TOKENS", 500),
        }
    }
}

fn env_parsed<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
