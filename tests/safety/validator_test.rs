// tests/safety/validator_test.rs
#[cfg(test)]
mod tests {
    use sqlsage::schema::{ColumnDescriptor, SchemaGraph, TableDescriptor};
    use sqlsage::validate::SqlValidator;

    fn shop() -> SchemaGraph {
        let column = |name: &str| ColumnDescriptor {
            name: name.to_string(),
            declared_type: "text".to_string(),
            nullable: true,
            default: None,
            max_length: None,
        };
        SchemaGraph {
            database_name: "shop".to_string(),
            tables: vec![
                TableDescriptor {
                    name: "orders".to_string(),
                    columns: vec![column("id"), column("created_at"), column("update_count")],
                    primary_keys: vec!["id".to_string()],
                    foreign_keys: vec![],
                },
                TableDescriptor {
                    name: "customers".to_string(),
                    columns: vec![column("id")],
                    primary_keys: vec!["id".to_string()],
                    foreign_keys: vec![],
                },
            ],
        }
    }

    #[test]
    fn test_ordinary_selects_pass() {
        for sql in [
            "SELECT * FROM orders",
            "select id, created_at from orders where created_at > '2024-01-01'",
            "SELECT o.id FROM orders o JOIN customers c ON c.id = o.id LIMIT 10",
            "SELECT COUNT(*) FROM orders GROUP BY created_at",
        ] {
            let verdict = SqlValidator::validate(sql, None);
            assert!(verdict.valid, "should accept: {sql}");
            assert!(verdict.reason.is_none());
        }
    }

    #[test]
    fn test_keywords_inside_identifiers_do_not_reject() {
        // created_at embeds CREATE, update_count embeds UPDATE
        let verdict = SqlValidator::validate(
            "SELECT created_at, update_count FROM orders WHERE update_count > 0",
            None,
        );
        assert!(verdict.valid);
    }

    #[test]
    fn test_every_write_keyword_rejects() {
        let statements = [
            ("SELECT 1; INSERT orders VALUES (1)", "INSERT"),
            ("SELECT 1; UPDATE orders SET id = 2", "UPDATE"),
            ("SELECT 1; DELETE FROM orders", "DELETE"),
            ("SELECT 1; DROP TABLE orders", "DROP"),
            ("SELECT 1; CREATE TABLE x (id int)", "CREATE"),
            ("SELECT 1; ALTER TABLE orders ADD c int", "ALTER"),
            ("SELECT 1; TRUNCATE orders", "TRUNCATE"),
            ("SELECT 1; GRANT ALL ON orders TO bob", "GRANT"),
            ("SELECT 1; EXEC sp_who", "EXEC"),
        ];
        for (sql, keyword) in statements {
            let verdict = SqlValidator::validate(sql, None);
            assert!(!verdict.valid, "should reject: {sql}");
            assert_eq!(
                verdict.reason.as_deref(),
                Some(format!("forbidden keyword: {keyword}").as_str())
            );
        }
    }

    #[test]
    fn test_statements_not_starting_with_select_reject() {
        for sql in [
            "INSERT INTO orders VALUES (1)",
            "WITH x AS (SELECT 1) SELECT * FROM x",
            "EXPLAIN SELECT * FROM orders",
            "",
            "   ",
        ] {
            let verdict = SqlValidator::validate(sql, None);
            assert!(!verdict.valid, "should reject: {sql:?}");
        }
    }

    #[test]
    fn test_redirection_keywords_reject() {
        for sql in [
            "SELECT * INTO archive FROM orders",
            "SELECT * FROM orders INTO OUTFILE '/tmp/dump'",
        ] {
            let verdict = SqlValidator::validate(sql, None);
            assert!(!verdict.valid, "should reject: {sql}");
        }
    }

    #[test]
    fn test_unknown_table_is_reported_but_not_fatal() {
        let graph = shop();
        let verdict = SqlValidator::validate(
            "SELECT * FROM orders JOIN refunds ON refunds.order_id = orders.id",
            Some(&graph),
        );
        assert!(verdict.valid);
        assert_eq!(verdict.unknown_tables, vec!["refunds".to_string()]);
    }

    #[test]
    fn test_schema_qualified_names_resolve() {
        let graph = shop();
        let verdict = SqlValidator::validate("SELECT * FROM public.orders", Some(&graph));
        assert!(verdict.valid);
        assert!(verdict.unknown_tables.is_empty());
    }

    #[test]
    fn test_validator_is_total_on_junk() {
        for junk in ["SELECT", "select\u{0}garbage", "🙂", ";;;;", "select "] {
            // No panic, just a verdict
            let _ = SqlValidator::validate(junk, None);
        }
    }
}
