//! SQL extraction from model responses.
//!
//! Models are told to answer in a strict `SQL:` / `EXPLANATION:` format but
//! routinely do not, so extraction runs ordered strategies from most to
//! least structured: the labelled format, a fenced code block, a terminated
//! bare SELECT, and finally an unterminated one. Whatever a strategy yields
//! still has to look like a SELECT to be accepted.

use once_cell::sync::Lazy;
use regex::Regex;

/// Candidates shorter than this are noise, not queries.
const MIN_SQL_LEN: usize = 10;

static LABELLED_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)\bSQL:\s*(.+?)\s*(?:\bEXPLANATION:|$)").expect("labelled sql pattern")
});

static FENCED_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)```(?:sql)?\s*(SELECT\b.*?)```").expect("fenced sql pattern")
});

static TERMINATED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)\b(SELECT\s.*?);").expect("terminated sql pattern"));

static TRAILING_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)\b(SELECT\s.*)").expect("trailing sql pattern"));

static EXPLANATION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)\bEXPLANATION:\s*(.+)$").expect("explanation pattern"));

/// Pull the SQL query out of a raw model response.
///
/// Returns `None` when no strategy produces a plausible SELECT.
pub fn extract_sql(response: &str) -> Option<String> {
    let strategies: [&Regex; 4] = [&LABELLED_RE, &FENCED_RE, &TERMINATED_RE, &TRAILING_RE];
    for strategy in strategies {
        if let Some(captures) = strategy.captures(response) {
            if let Some(candidate) = captures.get(1) {
                if let Some(sql) = clean_candidate(candidate.as_str()) {
                    return Some(sql);
                }
            }
        }
    }
    None
}

/// Pull the explanation sentence out of a raw model response, if present.
pub fn extract_explanation(response: &str) -> Option<String> {
    EXPLANATION_RE
        .captures(response)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|text| !text.is_empty())
}

/// Strip fencing and terminators, then accept only plausible SELECTs.
fn clean_candidate(candidate: &str) -> Option<String> {
    let mut text = candidate.trim();

    // The labelled strategy can capture a fenced block wholesale
    if let Some(stripped) = text.strip_prefix("```sql") {
        text = stripped;
    } else if let Some(stripped) = text.strip_prefix("```") {
        text = stripped;
    }
    if let Some(stripped) = text.strip_suffix("```") {
        text = stripped;
    }
    let text = text.trim().trim_end_matches(';').trim();

    let plausible = text.len() > MIN_SQL_LEN
        && text
            .get(..6)
            .is_some_and(|head| head.eq_ignore_ascii_case("select"));
    if plausible {
        Some(text.to_string())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WANT: &str = "SELECT id FROM accounts";

    #[test]
    fn test_labelled_format() {
        let response = "SQL: SELECT id FROM accounts\nEXPLANATION: Lists account ids.";
        assert_eq!(extract_sql(response).as_deref(), Some(WANT));
        assert_eq!(
            extract_explanation(response).as_deref(),
            Some("Lists account ids.")
        );
    }

    #[test]
    fn test_labelled_format_without_explanation() {
        let response = "SQL: SELECT id FROM accounts";
        assert_eq!(extract_sql(response).as_deref(), Some(WANT));
        assert_eq!(extract_explanation(response), None);
    }

    #[test]
    fn test_fenced_block() {
        let response = "Here is the query:\n```sql\nSELECT id FROM accounts\n```\nDone.";
        assert_eq!(extract_sql(response).as_deref(), Some(WANT));
    }

    #[test]
    fn test_fenced_block_without_language_tag() {
        let response = "```\nSELECT id FROM accounts;\n```";
        assert_eq!(extract_sql(response).as_deref(), Some(WANT));
    }

    #[test]
    fn test_terminated_bare_select() {
        let response = "The answer is SELECT id FROM accounts; which lists the ids.";
        assert_eq!(extract_sql(response).as_deref(), Some(WANT));
    }

    #[test]
    fn test_unterminated_bare_select() {
        let response = "You could run SELECT id FROM accounts";
        assert_eq!(extract_sql(response).as_deref(), Some(WANT));
    }

    #[test]
    fn test_labelled_fenced_combination() {
        let response = "SQL:\n```sql\nSELECT id FROM accounts;\n```\nEXPLANATION: Simple listing.";
        assert_eq!(extract_sql(response).as_deref(), Some(WANT));
    }

    #[test]
    fn test_rejects_non_select() {
        assert_eq!(extract_sql("SQL: DROP TABLE accounts"), None);
        assert_eq!(extract_sql("I cannot answer that question."), None);
        assert_eq!(extract_sql(""), None);
    }

    #[test]
    fn test_rejects_tiny_fragments() {
        assert_eq!(extract_sql("SQL: SELECT 1"), None);
    }

    #[test]
    fn test_multiline_sql_survives() {
        let response = "SQL: SELECT id,\n  name\nFROM accounts\nWHERE active = true\nEXPLANATION: filtered";
        let sql = extract_sql(response).unwrap();
        assert!(sql.starts_with("SELECT id,"));
        assert!(sql.contains("WHERE active = true"));
        assert!(!sql.to_uppercase().contains("EXPLANATION"));
    }
}
