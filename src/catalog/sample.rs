//! Distinct-value sampling.

/// Default number of distinct values returned.
pub const DEFAULT_SAMPLE_LIMIT: u32 = 5;

/// Quote an identifier, doubling embedded double quotes.
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Statement selecting distinct values of one column; `$1` is the limit,
/// bound as text like every other catalog parameter.
pub fn sample_statement(schema: &str, table: &str, column: &str) -> String {
    format!(
        "SELECT DISTINCT {} FROM {}.{} LIMIT $1::text::int",
        quote_ident(column),
        quote_ident(schema),
        quote_ident(table)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_ident() {
        assert_eq!(quote_ident("users"), "\"users\"");
        assert_eq!(quote_ident("Mixed Case"), "\"Mixed Case\"");
        assert_eq!(quote_ident("a\"b"), "\"a\"\"b\"");
    }

    #[test]
    fn test_sample_statement() {
        assert_eq!(
            sample_statement("public", "users", "email"),
            "SELECT DISTINCT \"email\" FROM \"public\".\"users\" LIMIT $1::text::int"
        );
    }

    #[test]
    fn test_injection_stays_inside_identifier() {
        let statement = sample_statement("public", "users\"; drop table x; --", "id");
        assert!(statement.contains("\"users\"\"; drop table x; --\""));
    }
}
