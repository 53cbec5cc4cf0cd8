//! Test doubles and fixtures for engine tests
//!
//! The in-memory store and stub AI service let arbitration tests run
//! without real I/O.

use super::ConversationManager;
use crate::ai::{AiError, CompletionService};
use crate::catalog::{ErrorCatalog, ErrorEntry};
use crate::flow::FlowGraph;
use crate::session::{SessionRecord, SessionStore, StoreError};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Knowledge base shared by engine and cascade tests.
pub fn test_catalog() -> ErrorCatalog {
    let entry = |code: &str, title: &str, description: &str| ErrorEntry {
        code: code.to_string(),
        title: title.to_string(),
        description: description.to_string(),
        solutions: vec!["Power-cycle the unit.".to_string(), "Retry the session.".to_string()],
    };
    ErrorCatalog::from_entries(
        vec![
            entry(
                "ER001",
                "Gun Temperature Limit",
                "The gun temperature exceeded the safe threshold during charging.",
            ),
            entry(
                "ER015",
                "RFID Communication Fail",
                "The RFID reader is not responding to the controller.",
            ),
            entry(
                "ER301",
                "Charging Session Timeout",
                "The charging session ended because the vehicle stopped responding.",
            ),
        ],
        true,
    )
    .expect("test catalog is valid")
}

/// Flow graph shared by engine and cascade tests.
pub fn test_flows() -> FlowGraph {
    FlowGraph::from_json(
        r#"{
            "flows": {
                "start": {
                    "text": "Welcome to EV charging support. How can I help?",
                    "options": ["Report Error Code", "Wallet Related Issues", "Troubleshoot Issue"]
                },
                "error_reporting": {
                    "text": "Which error code is the station showing?"
                },
                "wallet_issues": {
                    "text": "What wallet problem are you seeing?",
                    "options": ["Balance Not Updating", "Payment Failed"]
                },
                "balance_not_updating": {
                    "text": "Balances refresh within five minutes of a top-up.",
                    "steps": ["Pull down to refresh", "Log out and back in"]
                },
                "payment_failed": {
                    "text": "Failed payments are reversed automatically within 24 hours."
                },
                "troubleshooting": {
                    "text": "Is the charging cable firmly connected?",
                    "options": ["Yes", "No"]
                },
                "cable_check": {
                    "text": "Reinsert the connector and retry.",
                    "steps": ["Unplug the connector", "Wait ten seconds", "Plug it back in"]
                },
                "support": {
                    "text": "Connecting you to a technician now.",
                    "action": "contact_support"
                },
                "solution_resolved": {
                    "text": "Great to hear it's sorted. Anything else?",
                    "options": ["Report Another Error", "No, I'm all set"]
                },
                "solution_not_resolved": {
                    "text": "Let's dig deeper.",
                    "options": ["Troubleshoot Issue", "Contact Support"]
                }
            },
            "option_routes": {
                "Report Error Code": "error_reporting",
                "Wallet Related Issues": "wallet_issues",
                "Troubleshoot Issue": "troubleshooting",
                "Contact Support": "support",
                "Yes": "cable_check",
                "No": "support",
                "Yes, issue resolved": "solution_resolved",
                "No, still having issues": "solution_not_resolved",
                "Back to Menu": "start",
                "Report Another Error": "error_reporting"
            }
        }"#,
    )
    .expect("test flows are valid")
}

/// Build a manager over the shared fixtures and fresh doubles.
pub fn manager_with(ai: StubAi) -> (ConversationManager, Arc<MemoryStore>, Arc<StubAi>) {
    let store = Arc::new(MemoryStore::new());
    let ai = Arc::new(ai);
    let manager = ConversationManager::new(
        Arc::new(test_catalog()),
        Arc::new(test_flows()),
        store.clone(),
        ai.clone(),
    );
    (manager, store, ai)
}

// ============================================================
// In-memory session store
// ============================================================

pub struct MemoryStore {
    sessions: Mutex<HashMap<String, SessionRecord>>,
    messages: Mutex<Vec<(String, String, String)>>,
    fail_next_load: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            messages: Mutex::new(Vec::new()),
            fail_next_load: AtomicBool::new(false),
        }
    }

    /// Pre-populate a session with an active flow node.
    pub fn seed_session(&self, user_id: &str, current_node: Option<&str>) {
        let mut record = SessionRecord::new(user_id, "web");
        record.current_node = current_node.map(String::from);
        record.turn_count = 1;
        self.sessions
            .lock()
            .unwrap()
            .insert(user_id.to_string(), record);
    }

    pub fn session(&self, user_id: &str) -> Option<SessionRecord> {
        self.sessions.lock().unwrap().get(user_id).cloned()
    }

    pub fn history(&self, session_id: &str) -> Vec<(String, String)> {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .filter(|(sid, _, _)| sid == session_id)
            .map(|(_, role, content)| (role.clone(), content.clone()))
            .collect()
    }

    /// Make the next `load` fail, simulating an unavailable store.
    pub fn fail_next_load(&self) {
        self.fail_next_load.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn load(&self, user_id: &str) -> Result<Option<SessionRecord>, StoreError> {
        if self.fail_next_load.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected load failure".to_string()));
        }
        Ok(self.session(user_id))
    }

    async fn save(&self, record: &SessionRecord) -> Result<(), StoreError> {
        self.sessions
            .lock()
            .unwrap()
            .insert(record.user_id.clone(), record.clone());
        Ok(())
    }

    async fn append_message(
        &self,
        session_id: &str,
        role: &str,
        content: &str,
    ) -> Result<(), StoreError> {
        self.messages.lock().unwrap().push((
            session_id.to_string(),
            role.to_string(),
            content.to_string(),
        ));
        Ok(())
    }

    async fn recent_messages(
        &self,
        session_id: &str,
        limit: usize,
    ) -> Result<Vec<(String, String)>, StoreError> {
        let mut history = self.history(session_id);
        if history.len() > limit {
            history.drain(..history.len() - limit);
        }
        Ok(history)
    }
}

// ============================================================
// Stub AI service
// ============================================================

/// Stub completion service that returns queued replies and records the
/// prompts it was given.
pub struct StubAi {
    responses: Mutex<VecDeque<Result<String, AiError>>>,
    prompts: Mutex<Vec<String>>,
}

impl StubAi {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn queue_ok(&self, text: &str) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Ok(text.to_string()));
    }

    pub fn queue_err(&self, error: AiError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionService for StubAi {
    async fn complete(
        &self,
        message: &str,
        _history: &[(String, String)],
    ) -> Result<String, AiError> {
        self.prompts.lock().unwrap().push(message.to_string());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok("stub reply".to_string()))
    }

    fn model_id(&self) -> &str {
        "stub"
    }
}
