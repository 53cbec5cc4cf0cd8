//! HTTP API for the support chatbot

mod handlers;
mod types;

pub use handlers::create_router;
#[allow(unused_imports)] // Public API re-exports
pub use types::*;

use crate::catalog::ErrorCatalog;
use crate::engine::ConversationManager;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<ConversationManager>,
    pub catalog: Arc<ErrorCatalog>,
}

impl AppState {
    pub fn new(manager: Arc<ConversationManager>, catalog: Arc<ErrorCatalog>) -> Self {
        Self { manager, catalog }
    }
}
