//! Read-only SQL validation.
//!
//! The last gate before anything touches an engine. A statement passes only
//! if it starts with SELECT and contains no write, DDL or execution keyword
//! anywhere. Matching is word-bounded, so column names like `created_at` or
//! `update_count` never trip it. The check is total: any input produces a
//! verdict, never a panic.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::schema::SchemaGraph;

/// Keywords that make a statement non-read-only, wherever they appear.
static FORBIDDEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(INSERT|UPDATE|DELETE|DROP|CREATE|ALTER|TRUNCATE|EXEC|EXECUTE|CALL|GRANT|REVOKE|MERGE|REPLACE|LOAD|COPY|BULK)\b",
    )
    .expect("forbidden keyword pattern")
});

/// Keywords that redirect output into tables or files.
static REDIRECTION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(INTO|OUTFILE|DUMPFILE)\b").expect("redirection pattern"));

/// Table references after FROM/JOIN, for the advisory schema check.
static TABLE_REF_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:FROM|JOIN)\s+([A-Za-z_][A-Za-z0-9_\.]*)").expect("table ref pattern")
});

/// Outcome of validating one statement.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Verdict {
    pub valid: bool,
    /// Why the statement was rejected, when it was.
    pub reason: Option<String>,
    /// Referenced tables not present in the schema. Advisory only; an
    /// unknown table never rejects on its own.
    pub unknown_tables: Vec<String>,
}

impl Verdict {
    fn rejected(reason: String) -> Self {
        Self {
            valid: false,
            reason: Some(reason),
            unknown_tables: Vec::new(),
        }
    }
}

/// Validates generated SQL against the read-only policy and, optionally,
/// the known schema.
pub struct SqlValidator;

impl SqlValidator {
    /// Validate one statement. `schema` enables the advisory table check.
    pub fn validate(sql: &str, schema: Option<&SchemaGraph>) -> Verdict {
        let trimmed = sql.trim();
        if trimmed.is_empty() {
            return Verdict::rejected("empty statement".to_string());
        }

        let starts_with_select = trimmed
            .get(..6)
            .is_some_and(|head| head.eq_ignore_ascii_case("select"));
        if !starts_with_select {
            return Verdict::rejected("only SELECT statements are allowed".to_string());
        }

        if let Some(m) = FORBIDDEN_RE.find(trimmed) {
            return Verdict::rejected(format!(
                "forbidden keyword: {}",
                m.as_str().to_uppercase()
            ));
        }

        if let Some(m) = REDIRECTION_RE.find(trimmed) {
            return Verdict::rejected(format!(
                "output redirection keyword: {}",
                m.as_str().to_uppercase()
            ));
        }

        let unknown_tables = match schema {
            Some(graph) => referenced_tables(trimmed)
                .into_iter()
                .filter(|name| graph.table(unqualified(name)).is_none())
                .collect(),
            None => Vec::new(),
        };

        Verdict {
            valid: true,
            reason: None,
            unknown_tables,
        }
    }
}

/// Table names mentioned after FROM or JOIN, deduplicated in order.
fn referenced_tables(sql: &str) -> Vec<String> {
    let mut seen = Vec::new();
    for captures in TABLE_REF_RE.captures_iter(sql) {
        if let Some(name) = captures.get(1) {
            let name = name.as_str().to_string();
            if !seen.contains(&name) {
                seen.push(name);
            }
        }
    }
    seen
}

/// Strip a schema qualifier, keeping the table part.
fn unqualified(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ColumnDescriptor, TableDescriptor};

    fn graph() -> SchemaGraph {
        SchemaGraph {
            database_name: "shop".to_string(),
            tables: vec![TableDescriptor {
                name: "orders".to_string(),
                columns: vec![ColumnDescriptor {
                    name: "created_at".to_string(),
                    declared_type: "timestamp".to_string(),
                    nullable: true,
                    default: None,
                    max_length: None,
                }],
                primary_keys: vec![],
                foreign_keys: vec![],
            }],
        }
    }

    #[test]
    fn test_accepts_plain_select() {
        let verdict = SqlValidator::validate("SELECT * FROM orders", None);
        assert!(verdict.valid);
        assert!(verdict.reason.is_none());
    }

    #[test]
    fn test_keyword_like_column_names_pass() {
        // created_at contains "create", update_count contains "update"
        let verdict = SqlValidator::validate(
            "SELECT created_at, update_count FROM orders WHERE deleted_flag = false",
            None,
        );
        assert!(verdict.valid);
    }

    #[test]
    fn test_rejects_writes_with_named_keyword() {
        let verdict = SqlValidator::validate("SELECT * FROM orders; DROP TABLE orders", None);
        assert!(!verdict.valid);
        assert_eq!(verdict.reason.as_deref(), Some("forbidden keyword: DROP"));

        let verdict = SqlValidator::validate("select 1; delete from orders", None);
        assert!(!verdict.valid);
        assert_eq!(verdict.reason.as_deref(), Some("forbidden keyword: DELETE"));
    }

    #[test]
    fn test_rejects_non_select_statements() {
        for sql in ["INSERT INTO t VALUES (1)", "UPDATE t SET x = 1", "  ", "explain select 1"] {
            let verdict = SqlValidator::validate(sql, None);
            assert!(!verdict.valid, "should reject: {sql}");
        }
    }

    #[test]
    fn test_rejects_select_into() {
        let verdict = SqlValidator::validate("SELECT * INTO backup FROM orders", None);
        assert!(!verdict.valid);
        assert_eq!(
            verdict.reason.as_deref(),
            Some("output redirection keyword: INTO")
        );
    }

    #[test]
    fn test_rejects_outfile() {
        let verdict =
            SqlValidator::validate("SELECT * FROM orders OUTFILE '/tmp/x'", None);
        assert!(!verdict.valid);
    }

    #[test]
    fn test_unknown_tables_are_advisory() {
        let graph = graph();
        let verdict = SqlValidator::validate(
            "SELECT * FROM orders JOIN invoices ON invoices.order_id = orders.id",
            Some(&graph),
        );
        assert!(verdict.valid);
        assert_eq!(verdict.unknown_tables, vec!["invoices".to_string()]);
    }

    #[test]
    fn test_known_tables_report_clean() {
        let graph = graph();
        let verdict = SqlValidator::validate("SELECT * FROM orders", Some(&graph));
        assert!(verdict.valid);
        assert!(verdict.unknown_tables.is_empty());
    }
}
