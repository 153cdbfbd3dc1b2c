//! Cost heuristic for submitted statements.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

/// Number of signals that must be present together to flag a statement.
pub const COMPLEXITY_THRESHOLD: usize = 3;

const COMPLEX_REASON: &str =
    "Query contains multiple complex operations that may impact performance";

/// Lexical signals, checked against the lower-cased statement.
static SIGNALS: Lazy<[(ComplexitySignal, Regex); 5]> = Lazy::new(|| {
    [
        (
            ComplexitySignal::Subquery,
            Regex::new(r"(?s)select.*select").expect("Invalid regex: subquery pattern"),
        ),
        (
            ComplexitySignal::WindowFunction,
            Regex::new(r"over\(").expect("Invalid regex: window function pattern"),
        ),
        (
            ComplexitySignal::RecursiveCte,
            Regex::new(r"with recursive").expect("Invalid regex: recursive CTE pattern"),
        ),
        (
            ComplexitySignal::FullTextSearch,
            Regex::new(r"to_tsvector|to_tsquery").expect("Invalid regex: full-text pattern"),
        ),
        (
            ComplexitySignal::Aggregation,
            Regex::new(r"group by|having").expect("Invalid regex: aggregation pattern"),
        ),
    ]
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplexitySignal {
    Subquery,
    WindowFunction,
    RecursiveCte,
    FullTextSearch,
    Aggregation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComplexityAssessment {
    pub is_complex: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub signals: Vec<ComplexitySignal>,
}

/// Flag statements likely to be expensive.
///
/// Complex means at least [`COMPLEXITY_THRESHOLD`] of the five signals occur.
pub fn assess_complexity(statement: &str) -> ComplexityAssessment {
    let normalized = statement.to_lowercase();
    let signals: Vec<ComplexitySignal> = SIGNALS
        .iter()
        .filter(|(_, pattern)| pattern.is_match(&normalized))
        .map(|(signal, _)| *signal)
        .collect();

    let is_complex = signals.len() >= COMPLEXITY_THRESHOLD;
    ComplexityAssessment {
        is_complex,
        reason: is_complex.then(|| COMPLEX_REASON.to_string()),
        signals,
    }
}
