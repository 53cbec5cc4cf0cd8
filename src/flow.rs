//! Scripted conversation flows
//!
//! Flow nodes are loaded once from JSON and never mutated. Edges are not
//! stored explicitly: a transition happens when user input matches one of
//! the current node's option labels, resolved through the label-route
//! table or by slugifying the label into a node name.

use regex::Regex;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use std::sync::OnceLock;
use thiserror::Error;

/// Node every conversation falls back to.
pub const START_NODE: &str = "start";

#[derive(Debug, Error)]
pub enum FlowError {
    #[error("failed to read flow file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid JSON in flow file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("flow definition has no '{START_NODE}' node")]
    MissingStart,
}

/// One step of a scripted conversation. Immutable after load.
///
/// A node with options expects a reply; a node with an action and no
/// options is terminal and ends the scripted interaction.
#[derive(Debug, Clone, Deserialize)]
pub struct FlowNode {
    pub text: String,
    #[serde(default)]
    pub options: Option<Vec<String>>,
    #[serde(default)]
    pub steps: Option<Vec<String>>,
    #[serde(default)]
    pub action: Option<String>,
}

impl FlowNode {
    /// Terminal nodes clear the active-flow state after rendering.
    pub fn is_terminal(&self) -> bool {
        self.action.is_some() && self.options.as_ref().map_or(true, Vec::is_empty)
    }
}

#[derive(Debug, Deserialize)]
struct FlowFile {
    flows: BTreeMap<String, FlowNode>,
    /// Explicit option-label routes, checked before slug resolution.
    #[serde(default)]
    option_routes: HashMap<String, String>,
}

/// What the walker decided for one turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    /// Transition to a node; `next_active` is the state to persist
    /// (`None` once a terminal node has rendered).
    To {
        node: String,
        next_active: Option<String>,
    },
    /// Input matched nothing known; keep state and re-offer the current
    /// node's options.
    Unrecognized { node: String },
    /// Nothing for the walker here; intent matching gets the message.
    FallThrough,
}

/// Read-only conversation graph, shared across request handlers.
#[derive(Debug)]
pub struct FlowGraph {
    nodes: BTreeMap<String, FlowNode>,
    option_routes: HashMap<String, String>,
}

impl FlowGraph {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, FlowError> {
        let raw = fs::read_to_string(&path).map_err(|source| FlowError::Io {
            path: path.as_ref().display().to_string(),
            source,
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, FlowError> {
        let file: FlowFile = serde_json::from_str(raw)?;
        if !file.flows.contains_key(START_NODE) {
            return Err(FlowError::MissingStart);
        }

        let graph = Self {
            nodes: file.flows,
            option_routes: file
                .option_routes
                .into_iter()
                .map(|(label, node)| (normalize_label(&label), node))
                .collect(),
        };
        graph.warn_dangling_labels();
        Ok(graph)
    }

    /// Dangling option labels are a configuration defect, surfaced at load
    /// time as warnings rather than a refusal to start.
    fn warn_dangling_labels(&self) {
        for (name, node) in &self.nodes {
            let Some(options) = &node.options else { continue };
            for label in options {
                if looks_like_code_report(label) {
                    // Entries like "ER001 - Gun Temperature" are meant to
                    // fall through to diagnostics, never to a node.
                    continue;
                }
                if self.resolve_label(label).is_none() {
                    tracing::warn!(node = %name, label = %label, "flow option resolves to no node");
                }
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&FlowNode> {
        self.nodes.get(name)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Resolve an explicit client action against node names, then the
    /// label-route table. Highest-confidence path; no text matching.
    pub fn resolve_action(&self, action: &str) -> Option<&str> {
        if let Some((name, _)) = self.nodes.get_key_value(action) {
            return Some(name.as_str());
        }
        self.route_for(action)
    }

    /// Resolve an option label to its destination node, if any.
    pub fn resolve_label(&self, label: &str) -> Option<&str> {
        if let Some(node) = self.route_for(label) {
            return Some(node);
        }
        let slug = normalize_label(label).replace(' ', "_");
        self.nodes.get_key_value(slug.as_str()).map(|(name, _)| name.as_str())
    }

    fn route_for(&self, label: &str) -> Option<&str> {
        self.option_routes
            .get(&normalize_label(label))
            .filter(|node| self.nodes.contains_key(node.as_str()))
            .map(String::as_str)
    }

    /// Match free text against a node's option labels: exact label first,
    /// then prefix, then substring, all case-insensitive. Declaration order
    /// breaks ties within each pass.
    pub fn match_option<'a>(&'a self, node: &'a FlowNode, text: &str) -> Option<&'a str> {
        let options = node.options.as_deref()?;
        let input = normalize_label(text);
        if input.is_empty() {
            return None;
        }

        let exact = options.iter().find(|label| normalize_label(label) == input);
        let by_prefix = || {
            options.iter().find(|label| {
                let l = normalize_label(label);
                l.starts_with(&input) || input.starts_with(&l)
            })
        };
        let by_substring = || {
            options.iter().find(|label| {
                let l = normalize_label(label);
                l.contains(&input) || input.contains(&l)
            })
        };

        exact
            .or_else(by_prefix)
            .or_else(by_substring)
            .filter(|label| !looks_like_code_report(label))
            .and_then(|label| self.resolve_label(label))
    }

    /// One walker step, per the arbitration contract:
    /// explicit action first, then option matching on the active node,
    /// otherwise fall through to intent matching.
    pub fn advance(&self, current: Option<&str>, action: Option<&str>, text: Option<&str>) -> Advance {
        if let Some(action) = action {
            return match self.resolve_action(action) {
                Some(node) => self.transition(node),
                // Unknown action: state unchanged, re-offer options.
                None => Advance::Unrecognized {
                    node: current
                        .filter(|c| self.nodes.contains_key(*c))
                        .unwrap_or(START_NODE)
                        .to_string(),
                },
            };
        }

        if let (Some(current), Some(text)) = (current, text) {
            if let Some(node) = self.get(current) {
                if let Some(dest) = self.match_option(node, text) {
                    return self.transition(dest);
                }
            }
        }

        Advance::FallThrough
    }

    /// Build the transition result for a destination node, clearing the
    /// active state when the destination is terminal.
    pub fn transition(&self, dest: &str) -> Advance {
        let next_active = match self.get(dest) {
            Some(node) if node.is_terminal() => None,
            Some(_) => Some(dest.to_string()),
            None => None,
        };
        Advance::To {
            node: dest.to_string(),
            next_active,
        }
    }
}

fn normalize_label(label: &str) -> String {
    label
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || *c == ',' || *c == '\'')
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Option labels of the form `ERnnn - Title` are error-code shortcuts.
fn looks_like_code_report(label: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^er\d{1,4}\s*-").expect("valid regex"))
        .is_match(label.trim())
}
