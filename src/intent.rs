//! Keyword-based intent detection
//!
//! A thin rule layer consulted only when a message carries no error code,
//! no explicit action, and no active-flow option match. Keywords are
//! matched case-insensitively at word boundaries (phrases as plain
//! substrings) and rules are evaluated in declaration order; the order is
//! load-bearing (earlier rules outrank later ones) and must not be
//! re-sorted.

use strsim::jaro_winkler;

/// One intent rule: any keyword hit routes to the mapped flow node.
#[derive(Debug)]
pub struct IntentRule {
    pub intent: &'static str,
    pub keywords: &'static [&'static str],
    pub node: &'static str,
}

/// Rules in priority order. First matching rule wins.
pub const INTENT_RULES: &[IntentRule] = &[
    IntentRule {
        intent: "greeting",
        keywords: &["hello", "hi", "hey", "good morning", "good afternoon", "greetings"],
        node: "start",
    },
    IntentRule {
        intent: "error_report",
        keywords: &["error", "fault", "problem", "issue", "showing", "displaying"],
        node: "error_reporting",
    },
    IntentRule {
        intent: "troubleshoot",
        keywords: &["troubleshoot", "diagnose", "fix", "solve", "repair"],
        node: "troubleshooting",
    },
    IntentRule {
        intent: "wallet",
        keywords: &[
            "wallet", "balance", "refund", "transaction", "payment failed", "money", "recharge",
            "add money",
        ],
        node: "wallet_issues",
    },
    IntentRule {
        intent: "maintenance",
        keywords: &["maintenance", "service", "inspection", "check"],
        node: "maintenance",
    },
    IntentRule {
        intent: "support",
        keywords: &["help", "support", "assistance", "contact"],
        node: "support",
    },
    IntentRule {
        intent: "status",
        keywords: &["status", "working", "operational", "running"],
        node: "status_check",
    },
    IntentRule {
        intent: "installation",
        keywords: &["install", "setup", "configure", "connect"],
        node: "installation_guide",
    },
    IntentRule {
        intent: "network",
        keywords: &["network", "wifi", "connection", "internet", "ocpp", "communication"],
        node: "network_help",
    },
    IntentRule {
        intent: "payment",
        keywords: &["payment", "billing", "cost", "price", "pay"],
        node: "wallet_issues",
    },
    IntentRule {
        intent: "usage",
        keywords: &[
            "how to charge", "charge car", "charge vehicle", "start charging", "charging guide",
            "how to", "guide", "instructions", "manual",
        ],
        node: "user_guide",
    },
];

/// Keywords the fuzzy payment pre-check compares against, word by word.
const PAYMENT_KEYWORDS: &[&str] = &["payment", "wallet", "balance", "refund", "billing"];

/// Per-word Jaro-Winkler similarity needed to call a typo a payment keyword.
const PAYMENT_FUZZY_THRESHOLD: f64 = 0.84;

/// Find the first rule with a keyword hit in the message.
pub fn match_intent(text: &str) -> Option<&'static IntentRule> {
    let text = text.to_lowercase();
    if text.trim().is_empty() {
        return None;
    }
    INTENT_RULES
        .iter()
        .find(|rule| rule.keywords.iter().any(|kw| keyword_hit(&text, kw)))
}

/// One keyword against lowercased text. Phrases match as substrings.
/// Single words must start a word of the message, so "install" covers
/// "installation"; words shorter than three letters must match a whole
/// word, so "hi" never fires on "high".
fn keyword_hit(text: &str, keyword: &str) -> bool {
    if keyword.contains(' ') {
        return text.contains(keyword);
    }
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .any(|word| word == keyword || (keyword.len() >= 3 && word.starts_with(keyword)))
}

/// Fuzzy payment/wallet check that survives typos like "payement" or
/// "walit". Runs just before plain keyword matching in the cascade.
pub fn is_payment_like(text: &str) -> bool {
    text.to_lowercase().split_whitespace().any(|word| {
        PAYMENT_KEYWORDS
            .iter()
            .any(|kw| jaro_winkler(word, kw) >= PAYMENT_FUZZY_THRESHOLD)
    })
}
