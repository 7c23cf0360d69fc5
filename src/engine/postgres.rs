//! PostgreSQL engine implementation.
//!
//! Catalog queries target `information_schema` scoped to the `public`
//! schema. Catalog columns are cast to `text`/`int` in SQL so the
//! `information_schema` domain types never reach the decoder.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{Column, Row, TypeInfo};

use super::{check_identifier, DatabaseEngine, EngineError, EngineResult, QueryOutput};
use crate::config::{ConnectionConfig, Driver};
use crate::schema::{ColumnDescriptor, ForeignKeyEdge};

const CONNECT_TIMEOUT_SECS: u64 = 10;

/// PostgreSQL-backed [`DatabaseEngine`].
pub struct PostgresEngine {
    pool: PgPool,
}

impl PostgresEngine {
    /// Open a single-connection pool for one extraction or request.
    pub async fn connect(config: &ConnectionConfig) -> EngineResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .connect(&config.to_url())
            .await
            .map_err(EngineError::Connection)?;
        Ok(Self { pool })
    }

    async fn scalar_i64(&self, sql: &str) -> EngineResult<i64> {
        let n: i64 = sqlx::query_scalar(sql)
            .fetch_one(&self.pool)
            .await
            .map_err(EngineError::Query)?;
        Ok(n)
    }
}

/// Normalize one result value to text.
///
/// Decodes the common wire types in a type ladder; anything outside it is
/// rendered as a `<typename>` placeholder rather than failing the row.
fn value_to_text(row: &PgRow, idx: usize) -> Option<String> {
    if let Ok(v) = row.try_get::<Option<String>, _>(idx) {
        return v;
    }
    if let Ok(v) = row.try_get::<Option<i64>, _>(idx) {
        return v.map(|n| n.to_string());
    }
    if let Ok(v) = row.try_get::<Option<i32>, _>(idx) {
        return v.map(|n| n.to_string());
    }
    if let Ok(v) = row.try_get::<Option<i16>, _>(idx) {
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
impl DatabaseEngine for PostgresEngine {
    fn driver(&self) -> Driver {
        Driver::Postgres
    }

    async fn list_tables(&self) -> EngineResult<Vec<String>> {
        let rows = sqlx::query(
            r#"
            SELECT table_name::text AS table_name
            FROM information_schema.tables
            WHERE table_schema = 'public'
              AND table_type = 'BASE TABLE'
            ORDER BY table_name
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(EngineError::Introspection)?;

        rows.iter()
            .map(|row| row.try_get("table_name").map_err(EngineError::Introspection))
            .collect()
    }

    async fn describe_columns(&self, table: &str) -> EngineResult<Vec<ColumnDescriptor>> {
        let rows = sqlx::query(
            r#"
            SELECT
                column_name::text AS column_name,
                data_type::text AS data_type,
                is_nullable::text AS is_nullable,
                column_default::text AS column_default,
                character_maximum_length::int AS character_maximum_length
            FROM information_schema.columns
            WHERE table_schema = 'public'
              AND table_name = $1
            ORDER BY ordinal_position
            "#,
        )
        .bind(table)
        .fetch_all(&self.pool)
        .await
        .map_err(EngineError::Introspection)?;

        rows.iter()
            .map(|row| {
                let nullable: String = row.try_get("is_nullable").map_err(EngineError::Introspection)?;
                let max_length: Option<i32> = row
                    .try_get("character_maximum_length")
                    .map_err(EngineError::Introspection)?;
                Ok(ColumnDescriptor {
                    name: row.try_get("column_name").map_err(EngineError::Introspection)?,
                    declared_type: row.try_get("data_type").map_err(EngineError::Introspection)?,
                    nullable: nullable == "YES",
                    default: row.try_get("column_default").map_err(EngineError::Introspection)?,
                    max_length: max_length.map(i64::from),
                })
            })
            .collect()
    }

    async fn primary_keys(&self, table: &str) -> EngineResult<Vec<String>> {
        let rows = sqlx::query(
            r#"
            SELECT kcu.column_name::text AS column_name
            FROM information_schema.table_constraints tc
            JOIN information_schema.key_column_usage kcu
              ON tc.constraint_name = kcu.constraint_name
             AND tc.table_schema = kcu.table_schema
            WHERE tc.constraint_type = 'PRIMARY KEY'
              AND tc.table_schema = 'public'
              AND tc.table_name = $1
            ORDER BY kcu.ordinal_position
            "#,
        )
        .bind(table)
        .fetch_all(&self.pool)
        .await
        .map_err(EngineError::Introspection)?;

        rows.iter()
            .map(|row| row.try_get("column_name").map_err(EngineError::Introspection))
            .collect()
    }

    async fn foreign_keys(&self, table: &str) -> EngineResult<Vec<ForeignKeyEdge>> {
        let rows = sqlx::query(
            r#"
            SELECT
                kcu.column_name::text AS local_column,
                ccu.table_name::text AS referenced_table,
                ccu.column_name::text AS referenced_column
            FROM information_schema.table_constraints tc
            JOIN information_schema.key_column_usage kcu
              ON tc.constraint_name = kcu.constraint_name
             AND tc.table_schema = kcu.table_schema
            JOIN information_schema.constraint_column_usage ccu
              ON tc.constraint_name = ccu.constraint_name
             AND tc.table_schema = ccu.table_schema
            WHERE tc.constraint_type = 'FOREIGN KEY'
              AND tc.table_schema = 'public'
              AND tc.table_name = $1
            ORDER BY kcu.ordinal_position
            "#,
        )
        .bind(table)
        .fetch_all(&self.pool)
        .await
        .map_err(EngineError::Introspection)?;

        rows.iter()
            .map(|row| {
                Ok(ForeignKeyEdge {
                    local_column: row.try_get("local_column").map_err(EngineError::Introspection)?,
                    referenced_table: row
                        .try_get("referenced_table")
                        .map_err(EngineError::Introspection)?,
                    referenced_column: row
                        .try_get("referenced_column")
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
        self.scalar_i64(&format!(r#"SELECT COUNT(*) FROM "{}""#, table)).await
    }

    async fn count_nulls(&self, table: &str, column: &str) -> EngineResult<i64> {
        check_identifier(table)?;
        check_identifier(column)?;
        self.scalar_i64(&format!(
            r#"SELECT COUNT(*) FROM "{}" WHERE "{}" IS NULL"#,
            table, column
        ))
        .await
    }

    async fn count_distinct(&self, table: &str, column: &str) -> EngineResult<i64> {
        check_identifier(table)?;
        check_identifier(column)?;
        self.scalar_i64(&format!(
            r#"SELECT COUNT(DISTINCT "{}") FROM "{}" WHERE "{}" IS NOT NULL"#,
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
            r#"
            SELECT "{col}"::text AS value, COUNT(*) AS freq
            FROM "{table}"
            WHERE "{col}" IS NOT NULL
            GROUP BY "{col}"
            ORDER BY freq DESC, value ASC
            LIMIT {limit}
            "#,
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
                let value: String = row.try_get("value").map_err(EngineError::Query)?;
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
            r#"
            SELECT DISTINCT "{col}"::text AS value
            FROM "{table}"
            WHERE "{col}" IS NOT NULL
            ORDER BY value
            LIMIT {limit}
            "#,
            col = column,
            table = table,
            limit = limit
        );
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(EngineError::Query)?;

        rows.iter()
            .map(|row| row.try_get("value").map_err(EngineError::Query))
            .collect()
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
