//! Schema extraction: catalog introspection into a [`SchemaGraph`].

use tracing::{debug, warn};

use super::{SchemaGraph, TableDescriptor};
use crate::config::ConnectionConfig;
use crate::engine::{self, DatabaseEngine, EngineResult};

/// Builds a [`SchemaGraph`] from a live connection.
///
/// Opens one connection per extraction and closes it afterwards; callers
/// that need the result repeatedly should go through the context cache.
pub struct SchemaExtractor;

impl SchemaExtractor {
    /// Introspect the database described by `config`.
    pub async fn analyze(config: &ConnectionConfig) -> EngineResult<SchemaGraph> {
        let engine = engine::connect(config).await?;
        let result = Self::analyze_with(engine.as_ref(), &config.database).await;
        engine.close().await;
        result
    }

    /// Introspect through an already-open engine.
    pub async fn analyze_with(
        engine: &dyn DatabaseEngine,
        database_name: &str,
    ) -> EngineResult<SchemaGraph> {
        let table_names = engine.list_tables().await?;
        debug!(
            database = database_name,
            tables = table_names.len(),
            "extracting schema"
        );

        let mut tables = Vec::with_capacity(table_names.len());
        for name in table_names {
            let columns = engine.describe_columns(&name).await?;
            let primary_keys = engine.primary_keys(&name).await?;
            let foreign_keys = engine
                .foreign_keys(&name)
                .await?
                .into_iter()
                .filter(|fk| {
                    let known = columns.iter().any(|c| c.name == fk.local_column);
                    if !known {
                        warn!(
                            table = name.as_str(),
                            column = fk.local_column.as_str(),
                            "dropping foreign key with unknown local column"
                        );
                    }
                    known
                })
                .collect();

            tables.push(TableDescriptor {
                name,
                columns,
                primary_keys,
                foreign_keys,
            });
        }

        Ok(SchemaGraph {
            database_name: database_name.to_string(),
            tables,
        })
    }

    /// Check that the engine is reachable with these connection parameters.
    pub async fn test_connection(config: &ConnectionConfig) -> bool {
        match engine::connect(config).await {
            Ok(engine) => {
                engine.close().await;
                true
            }
            Err(_) => false,
        }
    }
}
