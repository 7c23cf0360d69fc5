//! Ollama HTTP client.
//!
//! Talks to a local Ollama daemon over its REST API: `/api/tags` to list
//! installed models and `/api/generate` for non-streaming completion. The
//! client holds one `reqwest::Client` and is cheap to clone.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::GeneratorSettings;

/// Result type for generator calls.
pub type GeneratorResult<T> = Result<T, GeneratorError>;

/// Errors from the generation backend.
#[derive(Debug, thiserror::Error)]
pub enum GeneratorError {
    /// The daemon could not be reached, or the call timed out.
    #[error("generator unreachable: {0}")]
    Transport(#[source] reqwest::Error),

    /// The daemon answered with a non-success status.
    #[error("generator returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body did not have the expected shape.
    #[error("generator response malformed: {0}")]
    Decode(#[source] reqwest::Error),
}

impl GeneratorError {
    /// Stable tag for the uniform result envelope.
    pub fn kind(&self) -> &'static str {
        "generator"
    }
}

/// One installed model, as reported by `/api/tags`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub modified_at: String,
}

impl ModelInfo {
    /// Size rendered in binary units with one decimal.
    pub fn human_size(&self) -> String {
        const UNITS: &[&str] = &["B", "KiB", "MiB", "GiB", "TiB"];
        let mut size = self.size as f64;
        let mut unit = 0;
        while size >= 1024.0 && unit < UNITS.len() - 1 {
            size /= 1024.0;
            unit += 1;
        }
        if unit == 0 {
            format!("{} B", self.size)
        } else {
            format!("{:.1} {}", size, UNITS[unit])
        }
    }
}

/// Sampling parameters passed through to the model.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationOptions {
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub repeat_penalty: f32,
    pub num_predict: u32,
}

impl From<&GeneratorSettings> for GenerationOptions {
    fn from(settings: &GeneratorSettings) -> Self {
        Self {
            temperature: settings.temperature,
            top_p: settings.top_p,
            top_k: settings.top_k,
            repeat_penalty: settings.repeat_penalty,
            num_predict: settings.max_tokens,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelInfo>,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: &'a GenerationOptions,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

/// Client for one Ollama daemon.
#[derive(Clone)]
pub struct OllamaClient {
    http: reqwest::Client,
    base_url: String,
}

impl OllamaClient {
    /// Build a client from settings. Fails only if the TLS backend cannot
    /// be initialized.
    pub fn new(settings: &GeneratorSettings) -> GeneratorResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(GeneratorError::Transport)?;
        Ok(Self {
            http,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Models currently installed on the daemon.
    pub async fn list_models(&self) -> GeneratorResult<Vec<ModelInfo>> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(GeneratorError::Transport)?;
        let response = check_status(response).await?;
        let tags: TagsResponse = response.json().await.map_err(GeneratorError::Decode)?;
        Ok(tags.models)
    }

    /// Whether the daemon answers at all.
    pub async fn is_available(&self) -> bool {
        self.list_models().await.is_ok()
    }

    /// Run one non-streaming completion and return the raw response text.
    pub async fn generate(
        &self,
        model: &str,
        prompt: &str,
        options: &GenerationOptions,
    ) -> GeneratorResult<String> {
        let url = format!("{}/api/generate", self.base_url);
        debug!(model, prompt_len = prompt.len(), "requesting completion");

        let request = GenerateRequest {
            model,
            prompt,
            stream: false,
            options,
        };
        let response = self
            .http
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(GeneratorError::Transport)?;
        let response = check_status(response).await?;
        let body: GenerateResponse = response.json().await.map_err(GeneratorError::Decode)?;

        debug!(response_len = body.response.len(), "completion received");
        Ok(body.response)
    }
}

async fn check_status(response: reqwest::Response) -> GeneratorResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(GeneratorError::Status {
        status: status.as_u16(),
        body,
    })
}
