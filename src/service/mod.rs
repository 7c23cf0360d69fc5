//! The question-answering service.
//!
//! Orchestrates the full pipeline: cached context (schema + profiles),
//! question analysis, prompt composition, generation, extraction,
//! validation and finally execution. Every operation returns the uniform
//! [`QueryResult`] envelope so callers (CLI and web alike) handle exactly
//! one shape, and failures carry a stable `error_kind` tag naming the
//! pipeline stage that failed.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::analyzer::QueryAnalyzer;
use crate::cache::{CacheStats, ContextCache, ContextEntry};
use crate::config::{ConnectionConfig, Driver, Settings};
use crate::engine::{self, EngineResult};
use crate::extract;
use crate::generator::{GenerationOptions, GeneratorError, GeneratorResult, ModelInfo, OllamaClient};
use crate::profile::Profiler;
use crate::prompt::PromptComposer;
use crate::schema::SchemaExtractor;
use crate::validate::SqlValidator;

/// Hard ceiling on sample-row requests.
const MAX_SAMPLE_ROWS: i64 = 200;

/// Uniform response envelope for every service operation that can touch
/// data.
#[derive(Debug, Clone, serde::Serialize)]
pub struct QueryResult {
    pub success: bool,
    /// Result rows as JSON objects, when execution succeeded.
    pub data: Option<Vec<Value>>,
    pub columns: Vec<String>,
    pub row_count: usize,
    /// The generated or supplied SQL, when the pipeline got that far.
    pub sql_query: Option<String>,
    pub explanation: Option<String>,
    pub error: Option<String>,
    /// Stable stage tag: connection, introspection, generator, extraction,
    /// validation or execution.
    pub error_kind: Option<&'static str>,
}

impl QueryResult {
    fn success(output: crate::engine::QueryOutput) -> Self {
        Self {
            success: true,
            row_count: output.row_count(),
            columns: output.columns.clone(),
            data: Some(output.to_json_rows()),
            sql_query: None,
            explanation: None,
            error: None,
            error_kind: None,
        }
    }

    fn failure(kind: &'static str, message: String) -> Self {
        Self {
            success: false,
            data: None,
            columns: Vec::new(),
            row_count: 0,
            sql_query: None,
            explanation: None,
            error: Some(message),
            error_kind: Some(kind),
        }
    }

    fn with_sql(mut self, sql: Option<String>) -> Self {
        self.sql_query = sql;
        self
    }

    fn with_explanation(mut self, explanation: Option<String>) -> Self {
        self.explanation = explanation;
        self
    }
}

/// Long-lived service state shared by the CLI and the web server.
pub struct QueryService {
    settings: Settings,
    generator: OllamaClient,
    cache: Arc<ContextCache>,
}

impl QueryService {
    pub fn new(settings: Settings) -> GeneratorResult<Self> {
        let generator = OllamaClient::new(&settings.generator)?;
        let cache = Arc::new(ContextCache::new(Duration::from_secs(
            settings.cache.ttl_seconds,
        )));
        Ok(Self {
            settings,
            generator,
            cache,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Models installed on the generation backend.
    pub async fn list_models(&self) -> Result<Vec<ModelInfo>, GeneratorError> {
        self.generator.list_models().await
    }

    /// Whether the database answers at all.
    pub async fn test_connection(&self, config: &ConnectionConfig) -> bool {
        SchemaExtractor::test_connection(config).await
    }

    /// Extract and profile, bypassing the cache, then store the result.
    pub async fn refresh_context(&self, config: &ConnectionConfig) -> EngineResult<ContextEntry> {
        let engine = engine::connect(config).await?;
        let schema = match SchemaExtractor::analyze_with(engine.as_ref(), &config.database).await {
            Ok(schema) => schema,
            Err(err) => {
                engine.close().await;
                return Err(err);
            }
        };
        let profiler = Profiler::new(self.settings.profiler.clone());
        let profile = profiler.profile_database(engine.as_ref(), &schema).await;
        engine.close().await;

        let entry = ContextEntry::new(schema, profile);
        self.cache.put(config.fingerprint(), entry.clone());
        info!(
            database = config.database.as_str(),
            tables = entry.schema.table_count(),
            "context refreshed"
        );
        Ok(entry)
    }

    /// Cached context for a connection, building it on miss.
    pub async fn load_context(&self, config: &ConnectionConfig) -> EngineResult<ContextEntry> {
        let fingerprint = config.fingerprint();
        if let Some(entry) = self.cache.get(&fingerprint) {
            debug!(database = config.database.as_str(), "context cache hit");
            return Ok(entry);
        }
        self.refresh_context(config).await
    }

    /// The full natural-language-to-SQL pipeline.
    pub async fn answer_question(
        &self,
        config: &ConnectionConfig,
        question: &str,
        model_override: Option<&str>,
    ) -> QueryResult {
        let context = match self.load_context(config).await {
            Ok(context) => context,
            Err(err) => return QueryResult::failure(err.kind(), err.to_string()),
        };

        let analyzer = QueryAnalyzer::new(&context.schema);
        let analysis = analyzer.analyze(question);
        let focused = analyzer.focused_context(&analysis);
        debug!(
            tables = ?analysis.relevant_tables,
            query_type = analysis.query_type.as_str(),
            complexity = analysis.complexity_level,
            "question analyzed"
        );

        let composer = PromptComposer::new(config.driver);
        let prompt = composer.compose(question, &focused, &analysis, &context.profile);

        let model = model_override.unwrap_or(&self.settings.generator.model);
        let options = GenerationOptions::from(&self.settings.generator);
        let response = match self.generator.generate(model, &prompt, &options).await {
            Ok(response) => response,
            Err(err) => return QueryResult::failure(err.kind(), err.to_string()),
        };

        let Some(sql) = extract::extract_sql(&response) else {
            warn!("model response contained no extractable SQL");
            return QueryResult::failure(
                "extraction",
                "no SQL query could be extracted from the model response".to_string(),
            );
        };
        let explanation = extract::extract_explanation(&response);

        let verdict = SqlValidator::validate(&sql, Some(&context.schema));
        if !verdict.valid {
            let reason = verdict
                .reason
                .unwrap_or_else(|| "statement rejected".to_string());
            return QueryResult::failure("validation", reason)
                .with_sql(Some(sql))
                .with_explanation(explanation);
        }
        if !verdict.unknown_tables.is_empty() {
            warn!(tables = ?verdict.unknown_tables, "generated SQL references unknown tables");
        }

        match self.run(config, &sql).await {
            Ok(output) => QueryResult::success(output)
                .with_sql(Some(sql))
                .with_explanation(explanation),
            Err(err) => QueryResult::failure(err.kind(), err.to_string())
                .with_sql(Some(sql))
                .with_explanation(explanation),
        }
    }

    /// Validate and execute caller-supplied SQL.
    pub async fn execute_query(&self, config: &ConnectionConfig, sql: &str) -> QueryResult {
        let schema = self.cache.get(&config.fingerprint()).map(|e| e.schema);
        let verdict = SqlValidator::validate(sql, schema.as_ref());
        if !verdict.valid {
            let reason = verdict
                .reason
                .unwrap_or_else(|| "statement rejected".to_string());
            return QueryResult::failure("validation", reason).with_sql(Some(sql.to_string()));
        }

        match self.run(config, sql).await {
            Ok(output) => QueryResult::success(output).with_sql(Some(sql.to_string())),
            Err(err) => {
                QueryResult::failure(err.kind(), err.to_string()).with_sql(Some(sql.to_string()))
            }
        }
    }

    /// A bounded `SELECT *` over one table.
    pub async fn sample_rows(
        &self,
        config: &ConnectionConfig,
        table: &str,
        limit: i64,
    ) -> QueryResult {
        if let Err(err) = engine::check_identifier(table) {
            return QueryResult::failure(err.kind(), err.to_string());
        }
        let limit = limit.clamp(1, MAX_SAMPLE_ROWS);
        let sql = match config.driver {
            Driver::Postgres => format!(r#"SELECT * FROM "{table}" LIMIT {limit}"#),
            Driver::MySql => format!("SELECT * FROM `{table}` LIMIT {limit}"),
        };

        match self.run(config, &sql).await {
            Ok(output) => QueryResult::success(output).with_sql(Some(sql)),
            Err(err) => QueryResult::failure(err.kind(), err.to_string()).with_sql(Some(sql)),
        }
    }

    /// Cache occupancy snapshot.
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Drop the cached context for one connection. Returns whether one
    /// existed.
    pub fn invalidate_context(&self, config: &ConnectionConfig) -> bool {
        self.cache.invalidate(&config.fingerprint())
    }

    /// Drop every cached context.
    pub fn clear_contexts(&self) {
        self.cache.clear_all();
    }

    async fn run(&self, config: &ConnectionConfig, sql: &str) -> EngineResult<crate::engine::QueryOutput> {
        let engine = engine::connect(config).await?;
        let result = engine.run_query(sql).await;
        engine.close().await;
        result
    }
}
