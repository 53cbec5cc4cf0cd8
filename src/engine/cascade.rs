//! Pure priority arbitration
//!
//! The fixed order tried for every incoming message:
//!
//! 1. diagnostic lookup on the raw message (clears any active flow)
//! 2. explicit action, resolved without any text matching
//! 3. active flow node, matched against the free text
//! 4. intent matching (fuzzy payment pre-check, then keyword rules)
//! 5. AI fallback, flow state untouched
//!
//! This function is pure: same inputs, same decision, no I/O. The
//! surrounding manager executes the session and AI side effects.

use crate::catalog::{ErrorCatalog, ErrorEntry};
use crate::flow::{Advance, FlowGraph};
use crate::intent;

/// One chat turn as seen by the arbitration core.
#[derive(Debug, Clone, Copy)]
pub struct TurnInput<'a> {
    pub message: Option<&'a str>,
    pub action: Option<&'a str>,
}

/// Session-local routing state, passed in whole and returned whole.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RoutingState {
    /// Active flow node, `None` meaning root.
    pub current_node: Option<String>,
    pub turn: u32,
}

/// Which strategy won the turn.
#[derive(Debug, PartialEq, Eq)]
pub enum Decision<'a> {
    Diagnostic { entry: &'a ErrorEntry },
    Flow { node: String, unrecognized: bool },
    AiFallback,
}

#[derive(Debug)]
pub struct RouteResult<'a> {
    pub decision: Decision<'a>,
    pub next: RoutingState,
}

pub fn route<'a>(
    catalog: &'a ErrorCatalog,
    flows: &FlowGraph,
    input: &TurnInput<'_>,
    prior: &RoutingState,
) -> RouteResult<'a> {
    let turn = prior.turn + 1;

    // Tier 1: diagnostics. An error code in the message always wins,
    // even over an in-progress flow, which it clears.
    if let Some(message) = input.message {
        if let Some(entry) = catalog.lookup(message) {
            return RouteResult {
                decision: Decision::Diagnostic { entry },
                next: RoutingState {
                    current_node: None,
                    turn,
                },
            };
        }
    }

    // Tier 2: explicit action. A button press is never reinterpreted
    // as free text.
    if input.action.is_some() {
        let advance = flows.advance(prior.current_node.as_deref(), input.action, None);
        return flow_result(advance, prior, turn);
    }

    // Tier 3: active flow. Free text is matched against the current
    // node's options; a miss falls through to intent, and an intent
    // miss re-offers the current options.
    if let (Some(current), Some(message)) = (prior.current_node.as_deref(), input.message) {
        match flows.advance(Some(current), None, Some(message)) {
            Advance::FallThrough => {
                if let Some(advance) = intent_advance(flows, message) {
                    return flow_result(advance, prior, turn);
                }
                return flow_result(
                    Advance::Unrecognized {
                        node: current.to_string(),
                    },
                    prior,
                    turn,
                );
            }
            advance => return flow_result(advance, prior, turn),
        }
    }

    // Tier 4: intent matching with no active flow.
    if let Some(message) = input.message {
        if let Some(advance) = intent_advance(flows, message) {
            return flow_result(advance, prior, turn);
        }
    }

    // Tier 5: nothing deterministic matched.
    RouteResult {
        decision: Decision::AiFallback,
        next: RoutingState {
            current_node: prior.current_node.clone(),
            turn,
        },
    }
}

/// Intent tier: fuzzy payment pre-check first, then the ordered keyword
/// rules. A rule naming an unknown node is skipped with a warning.
fn intent_advance(flows: &FlowGraph, message: &str) -> Option<Advance> {
    if intent::is_payment_like(message) && flows.get("wallet_issues").is_some() {
        return Some(flows.transition("wallet_issues"));
    }

    let rule = intent::match_intent(message)?;
    if flows.get(rule.node).is_none() {
        tracing::warn!(intent = rule.intent, node = rule.node, "intent maps to unknown flow node");
        return None;
    }
    Some(flows.transition(rule.node))
}

fn flow_result<'a>(advance: Advance, prior: &RoutingState, turn: u32) -> RouteResult<'a> {
    match advance {
        Advance::To { node, next_active } => RouteResult {
            decision: Decision::Flow {
                node,
                unrecognized: false,
            },
            next: RoutingState {
                current_node: next_active,
                turn,
            },
        },
        Advance::Unrecognized { node } => RouteResult {
            decision: Decision::Flow {
                node,
                unrecognized: true,
            },
            next: RoutingState {
                current_node: prior.current_node.clone(),
                turn,
            },
        },
        // The walker only falls through when it had no action and no
        // matching options; with an explicit action it never does.
        Advance::FallThrough => RouteResult {
            decision: Decision::AiFallback,
            next: RoutingState {
                current_node: prior.current_node.clone(),
                turn,
            },
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::{test_catalog, test_flows};

    fn fresh() -> RoutingState {
        RoutingState::default()
    }

    fn active(node: &str) -> RoutingState {
        RoutingState {
            current_node: Some(node.to_string()),
            turn: 2,
        }
    }

    fn msg(text: &str) -> TurnInput<'_> {
        TurnInput {
            message: Some(text),
            action: None,
        }
    }

    #[test]
    fn error_code_message_routes_to_diagnostics() {
        let (catalog, flows) = (test_catalog(), test_flows());
        let result = route(&catalog, &flows, &msg("I'm getting ER001"), &fresh());
        assert!(matches!(
            result.decision,
            Decision::Diagnostic { entry } if entry.code == "ER001"
        ));
        assert_eq!(result.next.turn, 1);
    }

    #[test]
    fn fuzzy_description_match_routes_to_diagnostics() {
        let (catalog, flows) = (test_catalog(), test_flows());
        let result = route(&catalog, &flows, &msg("gun temperature is too high"), &fresh());
        assert!(matches!(
            result.decision,
            Decision::Diagnostic { entry } if entry.code == "ER001"
        ));
    }

    #[test]
    fn diagnostics_beat_an_active_flow_and_clear_it() {
        let (catalog, flows) = (test_catalog(), test_flows());
        // "no" would match the troubleshooting options, but the code wins.
        let result = route(
            &catalog,
            &flows,
            &msg("no, it's showing ER001 now"),
            &active("troubleshooting"),
        );
        assert!(matches!(result.decision, Decision::Diagnostic { .. }));
        assert_eq!(result.next.current_node, None);
    }

    #[test]
    fn explicit_action_bypasses_text_matching() {
        let (catalog, flows) = (test_catalog(), test_flows());
        let input = TurnInput {
            message: Some("unrelated words"),
            action: Some("troubleshooting"),
        };
        let result = route(&catalog, &flows, &input, &fresh());
        assert_eq!(
            result.decision,
            Decision::Flow {
                node: "troubleshooting".to_string(),
                unrecognized: false,
            }
        );
        assert_eq!(result.next.current_node.as_deref(), Some("troubleshooting"));
    }

    #[test]
    fn active_flow_matches_option_by_substring() {
        let (catalog, flows) = (test_catalog(), test_flows());
        let result = route(&catalog, &flows, &msg("no thanks"), &active("troubleshooting"));
        assert_eq!(
            result.decision,
            Decision::Flow {
                node: "support".to_string(),
                unrecognized: false,
            }
        );
        // Destination is terminal: active state is cleared.
        assert_eq!(result.next.current_node, None);
    }

    #[test]
    fn intent_keyword_enters_a_flow_and_sets_state() {
        let (catalog, flows) = (test_catalog(), test_flows());
        let result = route(&catalog, &flows, &msg("can you fix it please"), &fresh());
        assert_eq!(
            result.decision,
            Decision::Flow {
                node: "troubleshooting".to_string(),
                unrecognized: false,
            }
        );
        assert_eq!(result.next.current_node.as_deref(), Some("troubleshooting"));
    }

    #[test]
    fn bare_greeting_enters_the_start_flow() {
        let (catalog, flows) = (test_catalog(), test_flows());
        let result = route(&catalog, &flows, &msg("hi"), &fresh());
        assert_eq!(
            result.decision,
            Decision::Flow {
                node: "start".to_string(),
                unrecognized: false,
            }
        );
        assert_eq!(result.next.current_node.as_deref(), Some("start"));
    }

    #[test]
    fn payment_typo_routes_to_wallet_flow() {
        let (catalog, flows) = (test_catalog(), test_flows());
        let result = route(&catalog, &flows, &msg("my payement did not go through"), &fresh());
        assert_eq!(
            result.decision,
            Decision::Flow {
                node: "wallet_issues".to_string(),
                unrecognized: false,
            }
        );
    }

    #[test]
    fn unmatched_text_in_a_flow_reoffers_options() {
        let (catalog, flows) = (test_catalog(), test_flows());
        let result = route(&catalog, &flows, &msg("purple elephants"), &active("troubleshooting"));
        assert_eq!(
            result.decision,
            Decision::Flow {
                node: "troubleshooting".to_string(),
                unrecognized: true,
            }
        );
        assert_eq!(result.next.current_node.as_deref(), Some("troubleshooting"));
    }

    #[test]
    fn nothing_matches_falls_to_ai_without_touching_state() {
        let (catalog, flows) = (test_catalog(), test_flows());
        let result = route(&catalog, &flows, &msg("the weather is lovely"), &fresh());
        assert_eq!(result.decision, Decision::AiFallback);
        assert_eq!(result.next.current_node, None);
        assert_eq!(result.next.turn, 1);
    }

    #[test]
    fn empty_turn_cascades_to_ai() {
        let (catalog, flows) = (test_catalog(), test_flows());
        let input = TurnInput {
            message: None,
            action: None,
        };
        let result = route(&catalog, &flows, &input, &fresh());
        assert_eq!(result.decision, Decision::AiFallback);
    }

    #[test]
    fn route_is_deterministic() {
        let (catalog, flows) = (test_catalog(), test_flows());
        let a = route(&catalog, &flows, &msg("no thanks"), &active("troubleshooting"));
        let b = route(&catalog, &flows, &msg("no thanks"), &active("troubleshooting"));
        assert_eq!(a.decision, b.decision);
        assert_eq!(a.next, b.next);
    }
}
