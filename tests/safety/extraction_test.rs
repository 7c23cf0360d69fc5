// tests/safety/extraction_test.rs
#[cfg(test)]
mod tests {
    use sqlsage::extract::{extract_explanation, extract_sql};

    const WANT: &str = "SELECT id FROM accounts";

    #[test]
    fn test_all_response_shapes_yield_the_same_query() {
        let shapes = [
            // Strict labelled format
            "SQL: SELECT id FROM accounts\nEXPLANATION: Lists every account id.",
            // Fenced code block
            "Sure! Here you go:\n```sql\nSELECT id FROM accounts\n```",
            // Bare SELECT with terminator
            "You can run SELECT id FROM accounts; to get them.",
            // Bare SELECT to end of response
            "The query would be SELECT id FROM accounts",
        ];
        for shape in shapes {
            assert_eq!(
                extract_sql(shape).as_deref(),
                Some(WANT),
                "response: {shape}"
            );
        }
    }

    #[test]
    fn test_labelled_takes_precedence_over_trailing_text() {
        let response =
            "SQL: SELECT id FROM accounts\nEXPLANATION: You could also SELECT name FROM users";
        assert_eq!(extract_sql(response).as_deref(), Some(WANT));
    }

    #[test]
    fn test_fence_markers_are_stripped_from_labelled_answers() {
        let response = "SQL:\n```sql\nSELECT id FROM accounts;\n```\nEXPLANATION: Plain listing.";
        assert_eq!(extract_sql(response).as_deref(), Some(WANT));
    }

    #[test]
    fn test_lowercase_select_is_accepted() {
        let response = "sql: select id from accounts";
        assert_eq!(
            extract_sql(response).as_deref(),
            Some("select id from accounts")
        );
    }

    #[test]
    fn test_chatter_without_sql_yields_nothing() {
        for response in [
            "I am unable to answer that from the given schema.",
            "Try rephrasing your question.",
            "",
        ] {
            assert_eq!(extract_sql(response), None, "response: {response}");
        }
    }

    #[test]
    fn test_non_select_statements_are_never_extracted() {
        for response in [
            "SQL: DELETE FROM accounts",
            "```sql\nDROP TABLE accounts\n```",
            "Run UPDATE accounts SET active = false",
        ] {
            assert_eq!(extract_sql(response), None, "response: {response}");
        }
    }

    #[test]
    fn test_explanation_extraction() {
        let response = "SQL: SELECT id FROM accounts\nEXPLANATION: Lists every account id.";
        assert_eq!(
            extract_explanation(response).as_deref(),
            Some("Lists every account id.")
        );
        assert_eq!(extract_explanation("SQL: SELECT id FROM accounts"), None);
    }

    #[test]
    fn test_multiline_query_keeps_its_body_only() {
        let response = concat!(
            "SQL: SELECT a.id, COUNT(*) AS orders\n",
            "FROM accounts a\n",
            "JOIN orders o ON o.account_id = a.id\n",
            "GROUP BY a.id\n",
            "EXPLANATION: Order counts per account."
        );
        let sql = extract_sql(response).unwrap();
        assert!(sql.starts_with("SELECT a.id"));
        assert!(sql.ends_with("GROUP BY a.id"));
        assert!(!sql.contains("EXPLANATION"));
    }
}
