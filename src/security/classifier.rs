//! Read-only statement classification.
//!
//! A lexical allow/deny gate, not a SQL parser. It over-rejects (a quoted
//! literal such as `'create'` inside a SELECT is denied) and under-rejects
//! anything outside the denylist, e.g. statement separators or data-modifying
//! functions called from a SELECT.

use serde::Serialize;
use tracing::debug;

/// Substrings that disqualify a statement wherever they occur.
const DENIED_SUBSTRINGS: [&str; 7] = [
    "insert", "update", "delete", "drop", "alter", "create", "truncate",
];

/// Result of classifying a statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", content = "reason", rename_all = "lowercase")]
pub enum Classification {
    Permitted,
    Denied(String),
}

impl Classification {
    pub fn is_permitted(&self) -> bool {
        matches!(self, Self::Permitted)
    }
}

/// Decide whether `statement` may run at all.
pub fn classify(statement: &str) -> Classification {
    let normalized = statement.trim().to_lowercase();

    if !normalized.starts_with("select") {
        debug!("Statement denied: does not start with select");
        return Classification::Denied("statement must begin with SELECT".into());
    }

    if let Some(word) = DENIED_SUBSTRINGS.iter().find(|w| normalized.contains(*w)) {
        debug!("Statement denied: contains '{}'", word);
        return Classification::Denied(format!("statement contains '{}'", word));
    }

    Classification::Permitted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_select_is_permitted() {
        assert!(classify("SELECT id, name FROM public.users").is_permitted());
        assert!(classify("   select 1  ").is_permitted());
        assert!(classify("\n\tSeLeCt now()").is_permitted());
    }

    #[test]
    fn test_non_select_is_denied() {
        for statement in [
            "DROP TABLE users",
            "WITH t AS (SELECT 1) SELECT * FROM t",
            "EXPLAIN SELECT 1",
            "",
            "  ",
            "show tables",
        ] {
            assert!(!classify(statement).is_permitted(), "{statement}");
        }
    }

    #[test]
    fn test_denylisted_substrings_anywhere() {
        for statement in [
            "select * from t; insert into t values (1)",
            "SELECT * FROM t; DELETE FROM t",
            "select * from t; drop table t",
            "select 1; ALTER TABLE t ADD c int",
            "select 1; truncate t",
            "select last_update from t",
        ] {
            assert!(!classify(statement).is_permitted(), "{statement}");
        }
    }

    #[test]
    fn test_quoted_literal_over_rejection() {
        assert_eq!(
            classify("select * from t where name='create'"),
            Classification::Denied("statement contains 'create'".into())
        );
    }

    #[test]
    fn test_statement_separator_passes_when_not_denylisted() {
        assert!(classify("select 1; select pg_sleep(10)").is_permitted());
    }
}
