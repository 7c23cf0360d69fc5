// tests/analyzer/focused_context_test.rs
#[cfg(test)]
mod tests {
    use sqlsage::analyzer::QueryAnalyzer;
    use sqlsage::schema::{ColumnDescriptor, ForeignKeyEdge, SchemaGraph, TableDescriptor};

    fn column(name: &str) -> ColumnDescriptor {
        ColumnDescriptor {
            name: name.to_string(),
            declared_type: "integer".to_string(),
            nullable: false,
            default: None,
            max_length: None,
        }
    }

    fn table(name: &str, columns: &[&str], fks: &[(&str, &str, &str)]) -> TableDescriptor {
        TableDescriptor {
            name: name.to_string(),
            columns: columns.iter().map(|c| column(c)).collect(),
            primary_keys: vec!["id".to_string()],
            foreign_keys: fks
                .iter()
                .map(|(local, table, referenced)| ForeignKeyEdge {
                    local_column: local.to_string(),
                    referenced_table: table.to_string(),
                    referenced_column: referenced.to_string(),
                })
                .collect(),
        }
    }

    /// Chain: payments -> orders -> customers, with shipments -> orders and
    /// an unrelated audit table.
    fn graph() -> SchemaGraph {
        SchemaGraph {
            database_name: "shop".to_string(),
            tables: vec![
                table("customers", &["id", "email"], &[]),
                table(
                    "orders",
                    &["id", "customer_id"],
                    &[("customer_id", "customers", "id")],
                ),
                table(
                    "payments",
                    &["id", "order_id"],
                    &[("order_id", "orders", "id")],
                ),
                table(
                    "shipments",
                    &["id", "order_id"],
                    &[("order_id", "orders", "id")],
                ),
                table("audit_entries", &["id", "event_name"], &[]),
            ],
        }
    }

    #[test]
    fn test_expansion_is_exactly_one_hop() {
        let graph = graph();
        let analyzer = QueryAnalyzer::new(&graph);
        let analysis = analyzer.analyze("list all orders");
        assert_eq!(
            analysis.relevant_tables.iter().collect::<Vec<_>>(),
            vec!["orders"]
        );

        let context = analyzer.focused_context(&analysis);
        let names: Vec<&str> = context.tables.iter().map(|t| t.name.as_str()).collect();

        // One hop out (customers) and one hop in (payments, shipments)
        assert!(names.contains(&"orders"));
        assert!(names.contains(&"customers"));
        assert!(names.contains(&"payments"));
        assert!(names.contains(&"shipments"));
        // Unrelated tables stay out
        assert!(!names.contains(&"audit_entries"));
    }

    #[test]
    fn test_relationships_stay_inside_the_focused_set() {
        let graph = graph();
        let analyzer = QueryAnalyzer::new(&graph);
        let analysis = analyzer.analyze("payments this month");
        let context = analyzer.focused_context(&analysis);

        let names: Vec<&str> = context.tables.iter().map(|t| t.name.as_str()).collect();
        for rel in &context.relationships {
            assert!(names.contains(&rel.from_table.as_str()), "{:?}", rel);
            assert!(names.contains(&rel.to_table.as_str()), "{:?}", rel);
        }
    }

    #[test]
    fn test_single_edge_pair_yields_one_relationship() {
        let graph = SchemaGraph {
            database_name: "shop".to_string(),
            tables: vec![
                table("customers", &["id"], &[]),
                table(
                    "orders",
                    &["id", "customer_id"],
                    &[("customer_id", "customers", "id")],
                ),
            ],
        };
        let analyzer = QueryAnalyzer::new(&graph);
        let analysis = analyzer.analyze("orders per customer");
        let context = analyzer.focused_context(&analysis);

        assert_eq!(context.relationships.len(), 1);
        let rel = &context.relationships[0];
        assert_eq!(rel.from_table, "orders");
        assert_eq!(rel.from_column, "customer_id");
        assert_eq!(rel.to_table, "customers");
        assert_eq!(rel.to_column, "id");
    }

    #[test]
    fn test_counts_reflect_focus_and_whole_database() {
        let graph = graph();
        let analyzer = QueryAnalyzer::new(&graph);
        let analysis = analyzer.analyze("list all orders");
        let context = analyzer.focused_context(&analysis);

        assert_eq!(context.total_tables_in_db, 5);
        assert_eq!(context.focused_table_count, context.tables.len());
        assert!(context.focused_table_count < context.total_tables_in_db);
    }

    #[test]
    fn test_focused_context_is_deterministic() {
        let graph = graph();
        let analyzer = QueryAnalyzer::new(&graph);
        let analysis = analyzer.analyze("shipments for orders");

        let first = analyzer.focused_context(&analysis);
        let second = analyzer.focused_context(&analysis);

        let first_names: Vec<&str> = first.tables.iter().map(|t| t.name.as_str()).collect();
        let second_names: Vec<&str> = second.tables.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(first_names, second_names);
        assert_eq!(first.relationships, second.relationships);
    }
}
