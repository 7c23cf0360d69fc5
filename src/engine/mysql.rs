//! MySQL engine implementation.
//!
//! Catalog queries target `information_schema` scoped to the connected
//! database name. MySQL returns some catalog text columns as binary strings
//! depending on collation, so string decoding falls back to a lossy UTF-8
//! conversion instead of failing.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::mysql::{MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::{Column, Row, TypeInfo};

use super::{check_identifier, DatabaseEngine, EngineError, EngineResult, QueryOutput};
use crate::config::{ConnectionConfig, Driver};
use crate::schema::{ColumnDescriptor, ForeignKeyEdge};

const CONNECT_TIMEOUT_SECS: u64 = 10;

/// MySQL-backed [`DatabaseEngine`].
pub struct MySqlEngine {
    pool: MySqlPool,
    database: String,
}

impl MySqlEngine {
    /// Open a single-connection pool for one extraction or request.
    pub async fn connect(config: &ConnectionConfig) -> EngineResult<Self> {
        let pool = MySqlPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .connect(&config.to_url())
            .await
            .map_err(EngineError::Connection)?;
        Ok(Self {
            pool,
            database: config.database.clone(),
        })
    }

    async fn scalar_i64(&self, sql: &str) -> EngineResult<i64> {
        let n: i64 = sqlx::query_scalar(sql)
            .fetch_one(&self.pool)
            .await
            .map_err(EngineError::Query)?;
        Ok(n)
    }
}

/// Decode a possibly-binary catalog string column.
fn text_col(row: &MySqlRow, name: &str) -> Result<Option<String>, sqlx::Error> {
    match row.try_get::<Option<String>, _>(name) {
        Ok(v) => Ok(v),
        Err(_) => {
            let bytes: Option<Vec<u8>> = row.try_get(name)?;
            Ok(bytes.map(|b| String::from_utf8_lossy(&b).into_owned()))
        }
    }
}

fn required_text_col(row: &MySqlRow, name: &str) -> Result<String, sqlx::Error> {
    text_col(row, name).map(|v| v.unwrap_or_default())
}

/// Normalize one result value to text.
fn value_to_text(row: &MySqlRow, idx: usize) -> Option<String> {
    if let Ok(v) = row.try_get::<Option<String>, _>(idx) {
        return v;
    }
    if let Ok(v) = row.try_get::<Option<i64>, _>(idx) {
        return v.map(|n| n.to_string());
    }
    if let Ok(v) = row.try_get::<Option<u64>, _>(idx) {
        return v.map(|n| n.to_string());
    }
    if let Ok(v) = row.try_get::<Option<i32>, _>(idx) {
        return v.map(|n| n.to_string());
    }
    if let Ok(v) = row.try_get::<Option<i16>, _>(idx) {
        return v.map(|n| n.to_string());
    }
    if let Ok(v) = row.try_get::<Option<i8>, _>(idx) {
        return v.map(|n| n.to_string());
    }
    if let Ok(v) = row.try_get::<Option<f64>, _>(idx) {
        return v.map(|n| n.to_string());
    }
    if let Ok(v) = row.try_get::<Option<f32>, _>(idx) {
        return v.map(|n| n.to_string());
    }
    if let Ok(v) = row.try_get::<Option<bool>, _>(idx) {
        return v.map(|b| b.to_string());
    }
    if let Ok(v) = row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(idx) {
        return v.map(|t| t.to_rfc3339());
    }
    if let Ok(v) = row.try_get::<Option<chrono::NaiveDateTime>, _>(idx) {
        return v.map(|t| t.to_string());
    }
    if let Ok(v) = row.try_get::<Option<chrono::NaiveDate>, _>(idx) {
        return v.map(|d| d.to_string());
    }
    if let Ok(v) = row.try_get::<Option<chrono::NaiveTime>, _>(idx) {
        return v.map(|t| t.to_string());
    }
    if let Ok(v) = row.try_get::<Option<Vec<u8>>, _>(idx) {
        return v.map(|b| String::from_utf8_lossy(&b).into_owned());
    }
    let type_name = row.columns()[idx].type_info().name().to_string();
    Some(format!("<{}>", type_name.to_lowercase()))
}

#[async_trait]
impl DatabaseEngine for MySqlEngine {
    fn driver(&self) -> Driver {
        Driver::MySql
    }

    async fn list_tables(&self) -> EngineResult<Vec<String>> {
        let rows = sqlx::query(
            r#"
            SELECT table_name
            FROM information_schema.tables
            WHERE table_schema = ?
              AND table_type = 'BASE TABLE'
            ORDER BY table_name
            "#,
        )
        .bind(&self.database)
        .fetch_all(&self.pool)
        .await
        .map_err(EngineError::Introspection)?;

        rows.iter()
            .map(|row| required_text_col(row, "table_name").map_err(EngineError::Introspection))
            .collect()
    }

    async fn describe_columns(&self, table: &str) -> EngineResult<Vec<ColumnDescriptor>> {
        let rows = sqlx::query(
            r#"
            SELECT
                column_name,
                data_type,
                is_nullable,
                column_default,
                character_maximum_length
            FROM information_schema.columns
            WHERE table_schema = ?
              AND table_name = ?
            ORDER BY ordinal_position
            "#,
        )
        .bind(&self.database)
        .bind(table)
        .fetch_all(&self.pool)
        .await
        .map_err(EngineError::Introspection)?;

        rows.iter()
            .map(|row| {
                let nullable = required_text_col(row, "is_nullable").map_err(EngineError::Introspection)?;
                // bigint unsigned in the MySQL catalog
                let max_length: Option<u64> = row
                    .try_get("character_maximum_length")
                    .map_err(EngineError::Introspection)?;
                Ok(ColumnDescriptor {
                    name: required_text_col(row, "column_name").map_err(EngineError::Introspection)?,
                    declared_type: required_text_col(row, "data_type")
                        .map_err(EngineError::Introspection)?,
                    nullable: nullable == "YES",
                    default: text_col(row, "column_default").map_err(EngineError::Introspection)?,
                    max_length: max_length.map(|n| n as i64),
                })
            })
            .collect()
    }

    async fn primary_keys(&self, table: &str) -> EngineResult<Vec<String>> {
        let rows = sqlx::query(
            r#"
            SELECT column_name
            FROM information_schema.key_column_usage
            WHERE table_schema = ?
              AND table_name = ?
              AND constraint_name = 'PRIMARY'
            ORDER BY ordinal_position
            "#,
        )
        .bind(&self.database)
        .bind(table)
        .fetch_all(&self.pool)
        .await
        .map_err(EngineError::Introspection)?;

        rows.iter()
            .map(|row| required_text_col(row, "column_name").map_err(EngineError::Introspection))
            .collect()
    }

    async fn foreign_keys(&self, table: &str) -> EngineResult<Vec<ForeignKeyEdge>> {
        let rows = sqlx::query(
            r#"
            SELECT
                column_name,
                referenced_table_name,
                referenced_column_name
            FROM information_schema.key_column_usage
            WHERE table_schema = ?
              AND table_name = ?
              AND referenced_table_name IS NOT NULL
            ORDER BY ordinal_position
            "#,
        )
        .bind(&self.database)
        .bind(table)
        .fetch_all(&self.pool)
        .await
        .map_err(EngineError::Introspection)?;

        rows.iter()
            .map(|row| {
                Ok(ForeignKeyEdge {
                    local_column: required_text_col(row, "column_name")
                        .map_err(EngineError::Introspection)?,
                    referenced_table: required_text_col(row, "referenced_table_name")
                        .map_err(EngineError::Introspection)?,
                    referenced_column: required_text_col(row, "referenced_column_name")
                        .map_err(EngineError::Introspection)?,
                })
            })
            .collect()
    }

    async fn run_query(&self, sql: &str) -> EngineResult<QueryOutput> {
        let rows = sqlx::query(sql)
            .fetch_all(&self.pool)
            .await
            .map_err(EngineError::Query)?;

        let columns = match rows.first() {
            Some(row) => row.columns().iter().map(|c| c.name().to_string()).collect(),
            None => Vec::new(),
        };

        let rows = rows
            .iter()
            .map(|row| (0..row.columns().len()).map(|i| value_to_text(row, i)).collect())
            .collect();

        Ok(QueryOutput { columns, rows })
    }

    async fn count_rows(&self, table: &str) -> EngineResult<i64> {
        check_identifier(table)?;
        self.scalar_i64(&format!("SELECT COUNT(*) FROM `{}`", table)).await
    }

    async fn count_nulls(&self, table: &str, column: &str) -> EngineResult<i64> {
        check_identifier(table)?;
        check_identifier(column)?;
        self.scalar_i64(&format!(
            "SELECT COUNT(*) FROM `{}` WHERE `{}` IS NULL",
            table, column
        ))
        .await
    }

    async fn count_distinct(&self, table: &str, column: &str) -> EngineResult<i64> {
        check_identifier(table)?;
        check_identifier(column)?;
        self.scalar_i64(&format!(
            "SELECT COUNT(DISTINCT `{}`) FROM `{}` WHERE `{}` IS NOT NULL",
            column, table, column
        ))
        .await
    }

    async fn value_frequencies(
        &self,
        table: &str,
        column: &str,
        limit: i64,
    ) -> EngineResult<Vec<(String, i64)>> {
        check_identifier(table)?;
        check_identifier(column)?;
        let sql = format!(
            "SELECT CAST(`{col}` AS CHAR) AS value, COUNT(*) AS freq \
             FROM `{table}` \
             WHERE `{col}` IS NOT NULL \
             GROUP BY `{col}` \
             ORDER BY freq DESC, value ASC \
             LIMIT {limit}",
            col = column,
            table = table,
            limit = limit
        );
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(EngineError::Query)?;

        rows.iter()
            .map(|row| {
                let value = required_text_col(row, "value").map_err(EngineError::Query)?;
                let freq: i64 = row.try_get("freq").map_err(EngineError::Query)?;
                Ok((value, freq))
            })
            .collect()
    }

    async fn distinct_samples(
        &self,
        table: &str,
        column: &str,
        limit: i64,
    ) -> EngineResult<Vec<String>> {
        check_identifier(table)?;
        check_identifier(column)?;
        let sql = format!(
            "SELECT DISTINCT CAST(`{col}` AS CHAR) AS value \
             FROM `{table}` \
             WHERE `{col}` IS NOT NULL \
             ORDER BY value \
             LIMIT {limit}",
            col = column,
            table = table,
            limit = limit
        );
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(EngineError::Query)?;

        rows.iter()
            .map(|row| required_text_col(row, "value").map_err(EngineError::Query))
            .collect()
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
