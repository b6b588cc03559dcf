use crate::error::EmbeddingError;
use crate::traits::Embedder;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use tracing::debug;
use url::Url;

pub const EMBEDDING_MODEL: &str = "text-embedding-ada-002";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const API_KEY_VAR: &str = "OPENAI_API_KEY";
const BASE_URL_VAR: &str = "OPENAI_BASE_URL";

#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
}

impl EmbeddingConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: EMBEDDING_MODEL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Reads `OPENAI_API_KEY` (required) and `OPENAI_BASE_URL` (optional) from the
    /// process environment, falling back to the dotenv file at `path`. A missing
    /// file is ignored; blank values count as absent.
    pub fn from_env_file(path: &Path) -> Result<Self, EmbeddingError> {
        let file_vars = read_env_file(path)?;
        Self::from_lookup(
            |name| {
                non_blank(std::env::var(name).ok())
                    .or_else(|| non_blank(file_vars.get(name).cloned()))
            },
            &format!("environment or {}", path.display()),
        )
    }

    fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
        source: &str,
    ) -> Result<Self, EmbeddingError> {
        let api_key = lookup(API_KEY_VAR).ok_or_else(|| {
            EmbeddingError::MissingCredential(format!("{API_KEY_VAR} not found in {source}"))
        })?;

        let mut config = Self::new(api_key);
        if let Some(base_url) = lookup(BASE_URL_VAR) {
            config.base_url = base_url;
        }
        Ok(config)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn endpoint(&self) -> Result<Url, EmbeddingError> {
        Ok(Url::parse(&format!(
            "{}/embeddings",
            self.base_url.trim_end_matches('/')
        ))?)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let value = value.trim().to_string();
        if value.is_empty() {
            None
        } else {
            Some(value)
        }
    })
}

fn read_env_file(path: &Path) -> Result<HashMap<String, String>, EmbeddingError> {
    if !path.is_file() {
        return Ok(HashMap::new());
    }
    let vars = dotenvy::from_path_iter(path)?.collect::<Result<HashMap<_, _>, _>>()?;
    Ok(vars)
}

/// Client for an OpenAI-compatible `/embeddings` endpoint, one request per text.
pub struct OpenAiEmbedder {
    client: Client,
    endpoint: Url,
    api_key: String,
    model: String,
    timeout: Duration,
}

impl OpenAiEmbedder {
    pub fn new(config: EmbeddingConfig) -> Result<Self, EmbeddingError> {
        if config.api_key.trim().is_empty() {
            return Err(EmbeddingError::MissingCredential(
                "api key is blank".to_string(),
            ));
        }

        let endpoint = config.endpoint()?;
        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            client,
            endpoint,
            api_key: config.api_key,
            model: config.model,
            timeout: config.timeout,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn transport_error(&self, error: reqwest::Error) -> EmbeddingError {
        if error.is_timeout() {
            EmbeddingError::Timeout(self.timeout)
        } else {
            EmbeddingError::Http(error)
        }
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let request = EmbeddingRequest {
            input: text,
            model: &self.model,
        };

        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|error| self.transport_error(error))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|error| self.transport_error(error))?;

        if !status.is_success() {
            return Err(EmbeddingError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let vector = parse_embedding_response(&body)?;
        debug!(chars = text.len(), dimension = vector.len(), "embedded text unit");
        Ok(vector)
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    input: &'a str,
    model: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

fn parse_embedding_response(body: &str) -> Result<Vec<f32>, EmbeddingError> {
    let parsed: EmbeddingResponse = serde_json::from_str(body)
        .map_err(|error| EmbeddingError::MalformedResponse(error.to_string()))?;

    let vector = parsed
        .data
        .into_iter()
        .next()
        .map(|entry| entry.embedding)
        .ok_or_else(|| EmbeddingError::MalformedResponse("response has no data".to_string()))?;

    if vector.is_empty() {
        return Err(EmbeddingError::MalformedResponse(
            "embedding vector is empty".to_string(),
        ));
    }

    Ok(vector)
}
