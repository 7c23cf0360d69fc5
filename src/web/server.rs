//! Axum web server exposing the question-answering pipeline.
//!
//! Every data endpoint takes the connection parameters in the request body
//! and answers with the uniform [`QueryResult`] envelope, so a thin client
//! can treat all of them the same way.

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::config::{ConnectionConfig, Driver, Settings};
use crate::service::{QueryResult, QueryService};

/// Application state shared across handlers.
pub struct AppState {
    pub service: QueryService,
}

/// Connection parameters as sent by the client.
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectionRequest {
    pub driver: String,
    pub host: String,
    #[serde(default)]
    pub port: Option<u16>,
    pub database: String,
    pub username: String,
    #[serde(default)]
    pub password: String,
}

impl ConnectionRequest {
    fn resolve(&self) -> Result<ConnectionConfig, String> {
        let driver = Driver::from_str(&self.driver)
            .map_err(|_| format!("unsupported driver: {}", self.driver))?;
        Ok(ConnectionConfig {
            driver,
            host: self.host.clone(),
            port: self.port,
            database: self.database.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
        })
    }
}

#[derive(Deserialize)]
struct ChatRequest {
    connection: ConnectionRequest,
    question: String,
    #[serde(default)]
    model: Option<String>,
}

#[derive(Deserialize)]
struct ExecuteRequest {
    connection: ConnectionRequest,
    sql: String,
}

#[derive(Deserialize)]
struct SampleRequest {
    connection: ConnectionRequest,
    table: String,
    #[serde(default = "default_sample_limit")]
    limit: i64,
}

fn default_sample_limit() -> i64 {
    10
}

#[derive(Deserialize)]
struct ConnectionOnly {
    connection: ConnectionRequest,
}

#[derive(Deserialize)]
struct InvalidateRequest {
    /// Absent means drop every cached context.
    #[serde(default)]
    connection: Option<ConnectionRequest>,
}

#[derive(Serialize)]
struct SchemaResponse {
    database: String,
    table_count: usize,
    schema: crate::schema::SchemaGraph,
    profile: crate::profile::DatabaseProfile,
}

/// Build the router with all API routes.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(health))
        .route("/api/models", get(list_models))
        .route("/api/test-connection", post(test_connection))
        .route("/api/analyze-schema", post(analyze_schema))
        .route("/api/sample-data", post(sample_data))
        .route("/api/chat", post(chat))
        .route("/api/execute-sql", post(execute_sql))
        .route("/api/refresh-context", post(refresh_context))
        .route("/api/cache/stats", get(cache_stats))
        .route("/api/cache/invalidate", post(invalidate_cache))
        .layer(cors)
        .with_state(state)
}

/// Start the web server on the configured port.
pub async fn serve(settings: Settings) -> Result<(), Box<dyn std::error::Error>> {
    let port = settings.server.port;
    let service = QueryService::new(settings)?;
    let state = Arc::new(AppState { service });
    let app = router(state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    println!("sqlsage API");
    println!("   URL: http://localhost:{}", port);
    println!();
    println!("   Press Ctrl+C to stop");

    axum::serve(listener, app).await?;
    Ok(())
}

fn bad_request(message: String) -> (StatusCode, Json<serde_json::Value>) {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message })))
}

/// GET /api/health - liveness plus generator reachability.
async fn health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let generator_available = state.service.list_models().await.is_ok();
    Json(json!({
        "status": "ok",
        "generator_available": generator_available,
    }))
}

/// GET /api/models - models installed on the generation backend.
async fn list_models(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.service.list_models().await {
        Ok(models) => Json(json!({ "models": models })).into_response(),
        Err(err) => (
            StatusCode::BAD_GATEWAY,
            Json(json!({ "error": err.to_string() })),
        )
            .into_response(),
    }
}

/// POST /api/test-connection
async fn test_connection(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ConnectionOnly>,
) -> impl IntoResponse {
    match req.connection.resolve() {
        Ok(config) => {
            let reachable = state.service.test_connection(&config).await;
            Json(json!({ "connected": reachable })).into_response()
        }
        Err(message) => bad_request(message).into_response(),
    }
}

/// POST /api/analyze-schema - extract, profile and cache a context.
async fn analyze_schema(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ConnectionOnly>,
) -> impl IntoResponse {
    let config = match req.connection.resolve() {
        Ok(config) => config,
        Err(message) => return bad_request(message).into_response(),
    };
    match state.service.load_context(&config).await {
        Ok(entry) => Json(SchemaResponse {
            database: entry.database.clone(),
            table_count: entry.schema.table_count(),
            schema: entry.schema,
            profile: entry.profile,
        })
        .into_response(),
        Err(err) => (
            StatusCode::BAD_GATEWAY,
            Json(json!({ "error": err.to_string(), "error_kind": err.kind() })),
        )
            .into_response(),
    }
}

/// POST /api/sample-data
async fn sample_data(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SampleRequest>,
) -> impl IntoResponse {
    match req.connection.resolve() {
        Ok(config) => {
            let result = state.service.sample_rows(&config, &req.table, req.limit).await;
            Json(result).into_response()
        }
        Err(message) => bad_request(message).into_response(),
    }
}

/// POST /api/chat - the full question-to-rows pipeline.
async fn chat(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChatRequest>,
) -> impl IntoResponse {
    match req.connection.resolve() {
        Ok(config) => {
            let result: QueryResult = state
                .service
                .answer_question(&config, &req.question, req.model.as_deref())
                .await;
            Json(result).into_response()
        }
        Err(message) => bad_request(message).into_response(),
    }
}

/// POST /api/execute-sql - validated, read-only execution.
async fn execute_sql(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ExecuteRequest>,
) -> impl IntoResponse {
    match req.connection.resolve() {
        Ok(config) => {
            let result = state.service.execute_query(&config, &req.sql).await;
            Json(result).into_response()
        }
        Err(message) => bad_request(message).into_response(),
    }
}

/// POST /api/refresh-context - rebuild the cached context now.
async fn refresh_context(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ConnectionOnly>,
) -> impl IntoResponse {
    let config = match req.connection.resolve() {
        Ok(config) => config,
        Err(message) => return bad_request(message).into_response(),
    };
    match state.service.refresh_context(&config).await {
        Ok(entry) => Json(json!({
            "refreshed": true,
            "database": entry.database,
            "table_count": entry.schema.table_count(),
        }))
        .into_response(),
        Err(err) => (
            StatusCode::BAD_GATEWAY,
            Json(json!({ "error": err.to_string(), "error_kind": err.kind() })),
        )
            .into_response(),
    }
}

/// GET /api/cache/stats
async fn cache_stats(State(state): State<Arc<AppState>>) -> Json<crate::cache::CacheStats> {
    Json(state.service.cache_stats())
}

/// POST /api/cache/invalidate - one context, or all of them.
async fn invalidate_cache(
    State(state): State<Arc<AppState>>,
    Json(req): Json<InvalidateRequest>,
) -> impl IntoResponse {
    match req.connection {
        Some(connection) => match connection.resolve() {
            Ok(config) => {
                let invalidated = state.service.invalidate_context(&config);
                Json(json!({ "invalidated": invalidated })).into_response()
            }
            Err(message) => bad_request(message).into_response(),
        },
        None => {
            state.service.clear_contexts();
            Json(json!({ "invalidated": true, "cleared_all": true })).into_response()
        }
    }
}
