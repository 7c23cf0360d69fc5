//! Database engine abstraction.
//!
//! Two catalog dialects (PostgreSQL and MySQL) share one capability set:
//! connect, enumerate tables, describe columns, primary keys, foreign keys,
//! run read-only queries and run the aggregate queries the profiler needs.
//! The concrete implementation is selected by the [`Driver`] tag at
//! construction time.
//!
//! Values returned by the drivers are normalized to text before leaving this
//! layer, so nothing downstream has to care about engine-native date, binary
//! or numeric representations.

mod mysql;
mod postgres;

pub use mysql::MySqlEngine;
pub use postgres::PostgresEngine;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

use crate::config::{ConnectionConfig, Driver};

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that can occur when talking to a database engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The engine could not be reached or refused the credentials.
    #[error("database connection failed: {0}")]
    Connection(#[source] sqlx::Error),

    /// A catalog introspection query failed or returned an unexpected shape.
    #[error("schema introspection failed: {0}")]
    Introspection(#[source] sqlx::Error),

    /// A data query (user query, sample or aggregate) failed.
    #[error("query failed: {0}")]
    Query(#[source] sqlx::Error),

    /// An identifier contained characters we refuse to interpolate.
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),
}

impl EngineError {
    /// Stable tag for the uniform result envelope.
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::Connection(_) => "connection",
            EngineError::Introspection(_) => "introspection",
            EngineError::Query(_) | EngineError::InvalidIdentifier(_) => "execution",
        }
    }
}

/// Rows plus column names, all values already normalized to text.
#[derive(Debug, Clone, Default)]
pub struct QueryOutput {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl QueryOutput {
    /// Number of rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Render rows as JSON objects keyed by column name.
    pub fn to_json_rows(&self) -> Vec<Value> {
        self.rows
            .iter()
            .map(|row| {
                let mut object = Map::new();
                for (i, column) in self.columns.iter().enumerate() {
                    let value = match row.get(i).and_then(|v| v.clone()) {
                        Some(text) => Value::String(text),
                        None => Value::Null,
                    };
                    object.insert(column.clone(), value);
                }
                Value::Object(object)
            })
            .collect()
    }
}

/// Capability set shared by the two engine dialects.
#[async_trait]
pub trait DatabaseEngine: Send + Sync {
    /// The driver tag this engine was constructed with.
    fn driver(&self) -> Driver;

    /// All base tables in the application schema, in name order.
    async fn list_tables(&self) -> EngineResult<Vec<String>>;

    /// Columns of one table in ordinal position order.
    async fn describe_columns(&self, table: &str) -> EngineResult<Vec<crate::schema::ColumnDescriptor>>;

    /// Primary-key column names of one table.
    async fn primary_keys(&self, table: &str) -> EngineResult<Vec<String>>;

    /// Foreign-key edges of one table.
    async fn foreign_keys(&self, table: &str) -> EngineResult<Vec<crate::schema::ForeignKeyEdge>>;

    /// Run an arbitrary read-only statement and return text-normalized rows.
    async fn run_query(&self, sql: &str) -> EngineResult<QueryOutput>;

    /// Total row count of a table.
    async fn count_rows(&self, table: &str) -> EngineResult<i64>;

    /// NULL count of one column.
    async fn count_nulls(&self, table: &str, column: &str) -> EngineResult<i64>;

    /// Distinct non-null value count of one column.
    async fn count_distinct(&self, table: &str, column: &str) -> EngineResult<i64>;

    /// Full value/frequency enumeration, descending by frequency.
    async fn value_frequencies(
        &self,
        table: &str,
        column: &str,
        limit: i64,
    ) -> EngineResult<Vec<(String, i64)>>;

    /// A bounded sample of distinct non-null values.
    async fn distinct_samples(
        &self,
        table: &str,
        column: &str,
        limit: i64,
    ) -> EngineResult<Vec<String>>;

    /// Close the underlying connection pool.
    async fn close(&self);
}

/// Open an engine for the configured driver.
pub async fn connect(config: &ConnectionConfig) -> EngineResult<Box<dyn DatabaseEngine>> {
    match config.driver {
        Driver::Postgres => Ok(Box::new(PostgresEngine::connect(config).await?)),
        Driver::MySql => Ok(Box::new(MySqlEngine::connect(config).await?)),
    }
}

static IDENTIFIER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_$]*$").expect("identifier regex"));

/// Validate an identifier before interpolating it into an aggregate query.
///
/// Table and column names come back out of the catalog, but the inbound
/// surface also accepts caller-supplied table names for sampling, so every
/// interpolation point goes through this check.
pub fn check_identifier(name: &str) -> EngineResult<()> {
    if IDENTIFIER_RE.is_match(name) {
        Ok(())
    } else {
        Err(EngineError::InvalidIdentifier(name.to_string()))
    }
}
