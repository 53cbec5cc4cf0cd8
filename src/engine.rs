//! Conversation orchestration
//!
//! `ConversationManager` wraps the pure arbitration cascade with the
//! session-store and AI side effects: load prior state, decide, render,
//! persist next state and history. External-collaborator failures are
//! absorbed into degraded responses and never surface to the caller.

pub mod cascade;

#[cfg(test)]
pub mod testing;

use crate::ai::{CompletionService, DEGRADED_REPLY};
use crate::catalog::{ErrorCatalog, ErrorEntry};
use crate::flow::{FlowGraph, FlowNode, START_NODE};
use crate::session::{SessionRecord, SessionStore};
use cascade::{Decision, RoutingState, TurnInput};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;

/// History lines handed to the AI fallback for context.
const AI_HISTORY_LIMIT: usize = 10;

/// Follow-up options offered under every diagnostic reply. Each label
/// routes back into the flow graph on the next turn.
const DIAGNOSTIC_FOLLOW_UPS: &[&str] = &[
    "Yes, issue resolved",
    "No, still having issues",
    "Back to Menu",
];

/// Which strategy produced a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplyKind {
    Diagnostic,
    Flow,
    Ai,
}

/// One chat turn as received from the transport layer.
#[derive(Debug, Clone)]
pub struct ChatTurn {
    pub user_id: String,
    pub message: Option<String>,
    pub action: Option<String>,
    pub platform: String,
}

/// Tagged response for one turn. Exactly one kind is set; the optional
/// fields carry that kind's payload.
#[derive(Debug, Clone, Serialize)]
pub struct ChatReply {
    #[serde(rename = "type")]
    pub kind: ReplyKind,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub solutions: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub steps: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    pub session_id: String,
}

impl ChatReply {
    fn blank(kind: ReplyKind, text: String, session_id: &str) -> Self {
        Self {
            kind,
            text,
            error_code: None,
            description: None,
            solutions: None,
            options: None,
            steps: None,
            action: None,
            session_id: session_id.to_string(),
        }
    }
}

/// Central per-turn orchestrator. Holds only shared read-only indices
/// and handles to the external collaborators, so one instance serves
/// all concurrent requests.
pub struct ConversationManager {
    catalog: Arc<ErrorCatalog>,
    flows: Arc<FlowGraph>,
    store: Arc<dyn SessionStore>,
    ai: Arc<dyn CompletionService>,
}

impl ConversationManager {
    pub fn new(
        catalog: Arc<ErrorCatalog>,
        flows: Arc<FlowGraph>,
        store: Arc<dyn SessionStore>,
        ai: Arc<dyn CompletionService>,
    ) -> Self {
        Self {
            catalog,
            flows,
            store,
            ai,
        }
    }

    pub fn catalog(&self) -> &ErrorCatalog {
        &self.catalog
    }

    /// Process one chat turn to completion.
    pub async fn process(&self, turn: &ChatTurn) -> ChatReply {
        let mut session = self.load_session(turn).await;

        if let Some(message) = &turn.message {
            if let Err(e) = self
                .store
                .append_message(&session.session_id, "user", message)
                .await
            {
                tracing::warn!(error = %e, "failed to record user message");
            }
        }

        let prior = RoutingState {
            current_node: session.current_node.clone(),
            turn: session.turn_count,
        };
        let input = TurnInput {
            message: turn.message.as_deref(),
            action: turn.action.as_deref(),
        };

        let result = cascade::route(&self.catalog, &self.flows, &input, &prior);
        tracing::info!(
            user_id = %turn.user_id,
            platform = %turn.platform,
            decision = decision_tag(&result.decision),
            turn = result.next.turn,
            "turn routed"
        );

        let reply = match result.decision {
            Decision::Diagnostic { entry } => self.render_diagnostic(entry, &session),
            Decision::Flow { node, unrecognized } => {
                self.render_flow(&node, unrecognized, &session)
            }
            Decision::AiFallback => self.ai_reply(turn, &session).await,
        };

        session.current_node = result.next.current_node;
        session.turn_count = result.next.turn;
        session.updated_at = Utc::now();
        if let Err(e) = self.store.save(&session).await {
            // Last write wins when the store is healthy; when it is not,
            // the turn still completes with a usable reply.
            tracing::warn!(error = %e, user_id = %turn.user_id, "failed to persist session");
        }

        if let Err(e) = self
            .store
            .append_message(&session.session_id, "assistant", &reply.text)
            .await
        {
            tracing::warn!(error = %e, "failed to record assistant reply");
        }

        reply
    }

    /// A store read failure is treated as "no prior state", not a fatal
    /// error: the turn starts from root.
    async fn load_session(&self, turn: &ChatTurn) -> SessionRecord {
        match self.store.load(&turn.user_id).await {
            Ok(Some(record)) => record,
            Ok(None) => SessionRecord::new(&turn.user_id, &turn.platform),
            Err(e) => {
                tracing::warn!(error = %e, user_id = %turn.user_id, "session load failed, starting fresh");
                SessionRecord::new(&turn.user_id, &turn.platform)
            }
        }
    }

    fn render_diagnostic(&self, entry: &ErrorEntry, session: &SessionRecord) -> ChatReply {
        let text = format!(
            "I found information about {} - {}. Please review the solutions below.",
            entry.code, entry.title
        );
        ChatReply {
            error_code: Some(entry.code.clone()),
            description: Some(entry.description.clone()),
            solutions: Some(entry.solutions.clone()),
            options: Some(DIAGNOSTIC_FOLLOW_UPS.iter().map(|s| (*s).to_string()).collect()),
            ..ChatReply::blank(ReplyKind::Diagnostic, text, &session.session_id)
        }
    }

    fn render_flow(&self, name: &str, unrecognized: bool, session: &SessionRecord) -> ChatReply {
        let node = self.flows.get(name).or_else(|| self.flows.get(START_NODE));
        let Some(node) = node else {
            // Empty flow graph; behave like an AI miss with the generic prompt.
            return ChatReply::blank(
                ReplyKind::Flow,
                "How can I help you with EV charging today?".to_string(),
                &session.session_id,
            );
        };

        let text = if unrecognized {
            format!("Sorry, I didn't quite get that. {}", reoffer_text(node))
        } else {
            node.text.clone()
        };

        ChatReply {
            options: node.options.clone(),
            steps: node.steps.clone(),
            action: node.action.clone(),
            ..ChatReply::blank(ReplyKind::Flow, text, &session.session_id)
        }
    }

    async fn ai_reply(&self, turn: &ChatTurn, session: &SessionRecord) -> ChatReply {
        let history = self
            .store
            .recent_messages(&session.session_id, AI_HISTORY_LIMIT)
            .await
            .unwrap_or_default();

        let message = turn.message.as_deref().unwrap_or("Hello");
        let text = match self.ai.complete(message, &history).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(error = %e, "AI fallback failed, using degraded reply");
                DEGRADED_REPLY.to_string()
            }
        };

        ChatReply::blank(ReplyKind::Ai, text, &session.session_id)
    }
}

fn reoffer_text(node: &FlowNode) -> String {
    match &node.options {
        Some(options) if !options.is_empty() => {
            format!("Here are your options: {}.", options.join(", "))
        }
        _ => node.text.clone(),
    }
}

fn decision_tag(decision: &Decision<'_>) -> &'static str {
    match decision {
        Decision::Diagnostic { .. } => "diagnostic",
        Decision::Flow { .. } => "flow",
        Decision::AiFallback => "ai",
    }
}
