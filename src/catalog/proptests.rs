//! Property-based tests for the diagnostic matcher
//!
//! The matching pipeline must be total (no panics on arbitrary input) and
//! deterministic (identical input, identical result).

use super::fuzzy::{normalize, title_score};
use super::pattern::extract_code_token;
use super::{ErrorCatalog, ErrorEntry};
use proptest::prelude::*;

fn test_catalog() -> ErrorCatalog {
    let records = vec![
        ErrorEntry {
            code: "ER001".to_string(),
            title: "Gun Temperature Limit".to_string(),
            description: "The gun temperature exceeded the safe threshold.".to_string(),
            solutions: vec!["Let the gun cool down.".to_string()],
        },
        ErrorEntry {
            code: "ER015".to_string(),
            title: "RFID Communication Fail".to_string(),
            description: "The RFID reader is not responding.".to_string(),
            solutions: vec!["Power-cycle the reader.".to_string()],
        },
    ];
    ErrorCatalog::from_entries(records, true).unwrap()
}

proptest! {
    #[test]
    fn extraction_never_panics(message in ".{0,200}") {
        let _ = extract_code_token(&message);
    }

    #[test]
    fn normalize_is_idempotent(text in ".{0,200}") {
        let once = normalize(&text);
        prop_assert_eq!(normalize(&once), once);
    }

    #[test]
    fn title_score_stays_in_unit_interval(query in "[a-z ]{0,80}", title in "[a-zA-Z ]{0,80}") {
        let score = title_score(&normalize(&query), &title);
        prop_assert!((0.0..=1.0).contains(&score));
    }

    #[test]
    fn lookup_is_deterministic(message in ".{0,200}") {
        let catalog = test_catalog();
        let first = catalog.lookup(&message).map(|e| e.code.clone());
        let second = catalog.lookup(&message).map(|e| e.code.clone());
        prop_assert_eq!(first, second);
    }
}
