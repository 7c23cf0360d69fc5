//! Normalized schema graph types and extraction.
//!
//! The schema graph is the canonical representation of one database: its
//! tables in catalog order, each with columns (in ordinal position order),
//! primary-key column names and foreign-key edges. Graphs are immutable once
//! built and are rebuilt wholesale on cache refresh.

mod extractor;

pub use extractor::SchemaExtractor;

use serde::{Deserialize, Serialize};

/// A column as reported by the engine's catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    /// Column name.
    pub name: String,
    /// Engine-reported type string (e.g. "character varying", "tinyint").
    pub declared_type: String,
    /// Whether NULL values are allowed.
    pub nullable: bool,
    /// Default expression, if any.
    pub default: Option<String>,
    /// Declared maximum character length, if applicable.
    pub max_length: Option<i64>,
}

/// A foreign-key edge from one of this table's columns to a referenced
/// table/column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForeignKeyEdge {
    pub local_column: String,
    pub referenced_table: String,
    pub referenced_column: String,
}

/// One table: columns in declaration order, primary keys and FK edges.
///
/// Invariant: every `ForeignKeyEdge::local_column` names one of `columns`.
/// The extractor drops edges that violate this rather than producing an
/// inconsistent descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableDescriptor {
    pub name: String,
    pub columns: Vec<ColumnDescriptor>,
    pub primary_keys: Vec<String>,
    pub foreign_keys: Vec<ForeignKeyEdge>,
}

impl TableDescriptor {
    /// Look up a column by name.
    pub fn column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Whether a column with this name exists.
    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }
}

/// The full schema of one database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaGraph {
    /// Database name (the graph's identity).
    pub database_name: String,
    /// Tables in stable catalog order.
    pub tables: Vec<TableDescriptor>,
}

impl SchemaGraph {
    /// Look up a table by name (case-insensitive, catalog names vary by
    /// engine).
    pub fn table(&self, name: &str) -> Option<&TableDescriptor> {
        self.tables
            .iter()
            .find(|t| t.name.eq_ignore_ascii_case(name))
    }

    /// Number of tables in the graph.
    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    /// Tables that reference `name` via a foreign key.
    pub fn referencing_tables(&self, name: &str) -> Vec<&TableDescriptor> {
        self.tables
            .iter()
            .filter(|t| {
                t.foreign_keys
                    .iter()
                    .any(|fk| fk.referenced_table.eq_ignore_ascii_case(name))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_graph() -> SchemaGraph {
        SchemaGraph {
            database_name: "shop".to_string(),
            tables: vec![
                TableDescriptor {
                    name: "customers".to_string(),
                    columns: vec![ColumnDescriptor {
                        name: "id".to_string(),
                        declared_type: "integer".to_string(),
                        nullable: false,
                        default: None,
                        max_length: None,
                    }],
                    primary_keys: vec!["id".to_string()],
                    foreign_keys: vec![],
                },
                TableDescriptor {
                    name: "orders".to_string(),
                    columns: vec![
                        ColumnDescriptor {
                            name: "id".to_string(),
                            declared_type: "integer".to_string(),
                            nullable: false,
                            default: None,
                            max_length: None,
                        },
                        ColumnDescriptor {
                            name: "customer_id".to_string(),
                            declared_type: "integer".to_string(),
                            nullable: false,
                            default: None,
                            max_length: None,
                        },
                    ],
                    primary_keys: vec!["id".to_string()],
                    foreign_keys: vec![ForeignKeyEdge {
                        local_column: "customer_id".to_string(),
                        referenced_table: "customers".to_string(),
                        referenced_column: "id".to_string(),
                    }],
                },
            ],
        }
    }

    #[test]
    fn test_table_lookup_is_case_insensitive() {
        let graph = sample_graph();
        assert!(graph.table("ORDERS").is_some());
        assert!(graph.table("missing").is_none());
    }

    #[test]
    fn test_referencing_tables() {
        let graph = sample_graph();
        let refs = graph.referencing_tables("customers");
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].name, "orders");
    }

    #[test]
    fn test_column_lookup() {
        let graph = sample_graph();
        let orders = graph.table("orders").unwrap();
        assert!(orders.has_column("customer_id"));
        assert!(!orders.has_column("total"));
    }
}
