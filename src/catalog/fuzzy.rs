//! Keyword-to-column fuzzy matching.

use serde::Serialize;
use std::cmp::Ordering;

/// Matches at or below this similarity never become the best match.
pub const BEST_MATCH_THRESHOLD: f64 = 0.3;

/// A column and its optional comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescription {
    pub name: String,
    pub comment: Option<String>,
}

impl ColumnDescription {
    /// Text compared against the keyword: the name followed by the comment.
    fn haystack(&self) -> String {
        match &self.comment {
            Some(comment) => format!("{} {}", self.name, comment).to_lowercase(),
            None => self.name.to_lowercase(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnMatch {
    pub column: String,
    pub similarity: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FuzzyMatchResult {
    pub best_match: Option<String>,
    pub all_matches: Vec<ColumnMatch>,
}

/// Rank `columns` by Sørensen–Dice similarity to `keyword`, best first.
///
/// Comparison is case-insensitive. Ties keep catalog order.
pub fn rank_columns(keyword: &str, columns: Vec<ColumnDescription>) -> FuzzyMatchResult {
    let keyword = keyword.to_lowercase();
    let mut all_matches: Vec<ColumnMatch> = columns
        .into_iter()
        .map(|col| ColumnMatch {
            similarity: strsim::sorensen_dice(&keyword, &col.haystack()),
            column: col.name,
            comment: col.comment,
        })
        .collect();

    all_matches.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(Ordering::Equal)
    });

    let best_match = all_matches
        .first()
        .filter(|m| m.similarity > BEST_MATCH_THRESHOLD)
        .map(|m| m.column.clone());

    FuzzyMatchResult {
        best_match,
        all_matches,
    }
}
