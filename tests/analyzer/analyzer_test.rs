// tests/analyzer/analyzer_test.rs
#[cfg(test)]
mod tests {
    use sqlsage::analyzer::{QueryAnalyzer, QueryType};
    use sqlsage::schema::{ColumnDescriptor, ForeignKeyEdge, SchemaGraph, TableDescriptor};

    fn column(name: &str, declared_type: &str) -> ColumnDescriptor {
        ColumnDescriptor {
            name: name.to_string(),
            declared_type: declared_type.to_string(),
            nullable: true,
            default: None,
            max_length: None,
        }
    }

    fn fk(local: &str, table: &str, referenced: &str) -> ForeignKeyEdge {
        ForeignKeyEdge {
            local_column: local.to_string(),
            referenced_table: table.to_string(),
            referenced_column: referenced.to_string(),
        }
    }

    /// A small web-shop schema: products, customers, orders, order_items.
    fn shop() -> SchemaGraph {
        SchemaGraph {
            database_name: "shop".to_string(),
            tables: vec![
                TableDescriptor {
                    name: "customers".to_string(),
                    columns: vec![
                        column("id", "integer"),
                        column("email", "character varying"),
                        column("country", "character varying"),
                        column("is_active", "boolean"),
                    ],
                    primary_keys: vec!["id".to_string()],
                    foreign_keys: vec![],
                },
                TableDescriptor {
                    name: "products".to_string(),
                    columns: vec![
                        column("id", "integer"),
                        column("title", "character varying"),
                        column("price", "numeric"),
                    ],
                    primary_keys: vec!["id".to_string()],
                    foreign_keys: vec![],
                },
                TableDescriptor {
                    name: "orders".to_string(),
                    columns: vec![
                        column("id", "integer"),
                        column("customer_id", "integer"),
                        column("status", "character varying"),
                        column("placed_at", "timestamp"),
                    ],
                    primary_keys: vec!["id".to_string()],
                    foreign_keys: vec![fk("customer_id", "customers", "id")],
                },
                TableDescriptor {
                    name: "order_items".to_string(),
                    columns: vec![
                        column("id", "integer"),
                        column("order_id", "integer"),
                        column("product_id", "integer"),
                        column("quantity", "integer"),
                    ],
                    primary_keys: vec!["id".to_string()],
                    foreign_keys: vec![
                        fk("order_id", "orders", "id"),
                        fk("product_id", "products", "id"),
                    ],
                },
            ],
        }
    }

    #[test]
    fn test_exact_table_names_win() {
        let graph = shop();
        let analyzer = QueryAnalyzer::new(&graph);

        let analysis = analyzer.analyze("list all orders");
        assert!(analysis.relevant_tables.contains("orders"));

        // "order items" with a space still hits order_items
        let analysis = analyzer.analyze("show the order items");
        assert!(analysis.relevant_tables.contains("order_items"));
    }

    #[test]
    fn test_column_keywords_pull_in_their_table() {
        let graph = shop();
        let analyzer = QueryAnalyzer::new(&graph);

        let analysis = analyzer.analyze("breakdown by country");
        assert!(analysis.relevant_tables.contains("customers"));

        let analysis = analyzer.analyze("sum of quantity");
        assert!(analysis.relevant_tables.contains("order_items"));
    }

    #[test]
    fn test_misspelled_table_is_recovered_by_fuzzy_match() {
        let graph = shop();
        let analyzer = QueryAnalyzer::new(&graph);

        let analysis = analyzer.analyze("describe prodcts");
        assert!(analysis.relevant_tables.contains("products"));
    }

    #[test]
    fn test_unrelated_question_falls_back_to_central_tables() {
        let graph = shop();
        let analyzer = QueryAnalyzer::new(&graph);

        let analysis = analyzer.analyze("xyzzy frobnicate");
        assert!(!analysis.relevant_tables.is_empty());
        assert!(analysis.relevant_tables.len() <= 3);
        // order_items has the highest foreign-key degree
        assert!(analysis.relevant_tables.contains("order_items"));
    }

    #[test]
    fn test_query_type_classification() {
        let graph = shop();
        let analyzer = QueryAnalyzer::new(&graph);

        let cases = [
            ("how many orders do we have", QueryType::Aggregation),
            ("top 10 products by price", QueryType::TopN),
            ("customers with their orders", QueryType::Join),
            ("orders where status is shipped", QueryType::Filter),
            ("show me the products", QueryType::SimpleSelect),
        ];
        for (question, expected) in cases {
            let analysis = analyzer.analyze(question);
            assert_eq!(analysis.query_type, expected, "question: {question}");
        }
    }

    #[test]
    fn test_complexity_stays_in_band() {
        let graph = shop();
        let analyzer = QueryAnalyzer::new(&graph);

        for question in [
            "show me the products",
            "how many orders per customer with their order items and quantity totals",
            "xyzzy",
        ] {
            let analysis = analyzer.analyze(question);
            assert!(
                (1..=5).contains(&analysis.complexity_level),
                "question: {question}"
            );
        }

        let simple = analyzer.analyze("show me the products");
        let complex =
            analyzer.analyze("how many order items per customer with their orders and products");
        assert!(complex.complexity_level > simple.complexity_level);
    }

    #[test]
    fn test_filter_hints_capture_literals() {
        let graph = shop();
        let analyzer = QueryAnalyzer::new(&graph);

        let analysis = analyzer.analyze("orders with status 'shipped' and quantity over 3");
        assert_eq!(
            analysis.filter_hints.exact_values,
            vec!["shipped".to_string()]
        );
        assert_eq!(analysis.filter_hints.numeric_values, vec![3.0]);

        let analysis = analyzer.analyze("only active customers");
        assert_eq!(
            analysis.filter_hints.boolean_keywords,
            vec![("active".to_string(), true)]
        );
    }

    #[test]
    fn test_same_question_same_analysis() {
        let graph = shop();
        let analyzer = QueryAnalyzer::new(&graph);

        let first = analyzer.analyze("top customers by order quantity");
        let second = analyzer.analyze("top customers by order quantity");
        assert_eq!(first, second);
    }
}
