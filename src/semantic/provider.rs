//! Embedding providers.
//!
//! One capability interface, three variants selected by configuration at
//! startup:
//! - `local`: fastembed ONNX models, no key, no per-call network I/O
//! - `openai`: OpenAI-compatible `/embeddings` endpoint
//! - `gemini`: Gemini `batchEmbedContents` endpoint
//!
//! Remote variants own their retry policy: transient failures (rate limit,
//! timeout, 5xx) are retried with exponential backoff and escalate to a
//! fatal error once attempts are exhausted. Fatal failures (auth, unknown
//! model) surface immediately and abort the calling sync pass.

use std::sync::Mutex;
use std::time::Duration;

use fastembed::{InitOptions, TextEmbedding};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Payload ceiling for one remote embedding call.
pub const MAX_REMOTE_BATCH: usize = 100;

const LOCAL_BATCH: usize = 256;

const MAX_ATTEMPTS: usize = 4;
const RETRY_BASE_DELAY: Duration = Duration::from_millis(500);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

const OPENAI_DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1";
const GEMINI_DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, thiserror::Error)]
pub enum EmbeddingError {
    /// Worth retrying: rate limit, timeout, server hiccup.
    #[error("transient embedding failure: {0}")]
    Transient(String),

    /// Not worth retrying: bad credentials, unknown model, exhausted
    /// retries. Aborts the sync pass that hit it.
    #[error("embedding provider failure: {0}")]
    Fatal(String),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Local,
    Openai,
    Gemini,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Local => "local",
            ProviderKind::Openai => "openai",
            ProviderKind::Gemini => "gemini",
        }
    }
}

/// Immutable per-process embedding configuration. Its `version_tag` brands
/// every vector written under it; changing any field here makes previously
/// stored vectors invisible to queries until re-embedded.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default)]
    pub provider: ProviderKind,

    #[serde(default = "default_model")]
    pub model: String,

    /// Endpoint override for remote providers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Requested output dimensionality. Probed from the provider when
    /// absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimension: Option<usize>,

    /// API credential for remote providers. Falls back to the provider's
    /// environment variable when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Local,
            model: default_model(),
            endpoint: None,
            dimension: None,
            api_key: None,
        }
    }
}

fn default_model() -> String {
    crate::semantic::DEFAULT_MODEL.to_string()
}

impl EmbeddingConfig {
    /// Deterministic digest of the fields that define the vector space.
    /// Credentials are deliberately excluded.
    pub fn version_tag(&self) -> [u8; 32] {
        use sha2::{Digest, Sha256};

        let mut hasher = Sha256::new();
        hasher.update(self.provider.as_str().as_bytes());
        hasher.update(b"\n");
        hasher.update(self.model.as_bytes());
        hasher.update(b"\n");
        hasher.update(self.endpoint.as_deref().unwrap_or("").as_bytes());
        hasher.update(b"\n");
        match self.dimension {
            Some(d) => hasher.update(d.to_string().as_bytes()),
            None => hasher.update(b"auto"),
        }
        hasher.finalize().into()
    }

    pub fn describe(&self) -> String {
        format!("{}/{}", self.provider.as_str(), self.model)
    }
}

/// Capability interface every variant conforms to. Batches are ordered:
/// the n-th output vector embeds the n-th input text.
pub trait EmbeddingProvider: Send + Sync {
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;
    fn dimension(&self) -> usize;
    fn version_tag(&self) -> [u8; 32];
    fn describe(&self) -> String;
    fn max_batch(&self) -> usize;

    fn embed_one(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut vectors = self.embed_batch(std::slice::from_ref(&text.to_string()))?;
        vectors
            .pop()
            .ok_or_else(|| EmbeddingError::Fatal("provider returned no embedding".to_string()))
    }
}

/// Build the configured provider. `cache_dir` is only used by the local
/// variant for model files.
pub fn build_provider(
    config: &EmbeddingConfig,
    cache_dir: PathBuf,
) -> Result<Box<dyn EmbeddingProvider>, EmbeddingError> {
    match config.provider {
        ProviderKind::Local => Ok(Box::new(LocalProvider::new(config, cache_dir)?)),
        ProviderKind::Openai => Ok(Box::new(OpenAiProvider::new(config)?)),
        ProviderKind::Gemini => Ok(Box::new(GeminiProvider::new(config)?)),
    }
}

/// Run `call` until it succeeds or fails non-transiently. Exhausted
/// retries escalate to a fatal error so the sync pass aborts cleanly
/// instead of hanging.
pub(crate) fn with_retries<T>(
    max_attempts: usize,
    base_delay: Duration,
    mut call: impl FnMut() -> Result<T, EmbeddingError>,
) -> Result<T, EmbeddingError> {
    let mut attempt = 0usize;
    loop {
        match call() {
            Err(EmbeddingError::Transient(msg)) => {
                attempt += 1;
                if attempt >= max_attempts {
                    return Err(EmbeddingError::Fatal(format!(
                        "giving up after {attempt} attempts: {msg}"
                    )));
                }
                log::warn!("transient embedding failure (attempt {attempt}): {msg}");
                let capped = attempt.min(5) as u32;
                std::thread::sleep(base_delay * (1 << capped));
            }
            other => return other,
        }
    }
}

fn classify_status(status: StatusCode, body: &str) -> EmbeddingError {
    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        EmbeddingError::Transient(format!("provider returned {status}: {body}"))
    } else {
        EmbeddingError::Fatal(format!("provider returned {status}: {body}"))
    }
}

fn classify_request_error(err: reqwest::Error) -> EmbeddingError {
    if err.is_timeout() || err.is_connect() {
        EmbeddingError::Transient(err.to_string())
    } else {
        EmbeddingError::Fatal(err.to_string())
    }
}

fn check_batch_shape(got: usize, expected: usize) -> Result<(), EmbeddingError> {
    if got != expected {
        return Err(EmbeddingError::Fatal(format!(
            "provider returned {got} embeddings for {expected} inputs"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Local (fastembed)
// ---------------------------------------------------------------------------

/// Wraps fastembed's TextEmbedding. Uses a Mutex because embed() requires
/// &mut self.
pub struct LocalProvider {
    model: Mutex<TextEmbedding>,
    model_name: String,
    dimension: usize,
    tag: [u8; 32],
}

impl LocalProvider {
    pub fn new(config: &EmbeddingConfig, cache_dir: PathBuf) -> Result<Self, EmbeddingError> {
        let model_enum = parse_model_name(&config.model)?;

        let models_dir = cache_dir.join("models");
        std::fs::create_dir_all(&models_dir).map_err(|e| {
            EmbeddingError::Fatal(format!("failed to create models directory: {e}"))
        })?;

        let options = InitOptions::new(model_enum)
            .with_cache_dir(models_dir)
            .with_show_download_progress(true);

        let mut model = TextEmbedding::try_new(options)
            .map_err(|e| EmbeddingError::Fatal(format!("model initialization failed: {e}")))?;

        let dimension = match config.dimension {
            Some(d) => d,
            None => probe_dimension(&mut model)?,
        };

        Ok(Self {
            model: Mutex::new(model),
            model_name: config.model.clone(),
            dimension,
            tag: config.version_tag(),
        })
    }
}

impl EmbeddingProvider for LocalProvider {
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let mut model = self
            .model
            .lock()
            .map_err(|e| EmbeddingError::Fatal(format!("model lock poisoned: {e}")))?;

        let vectors = model
            .embed(texts.to_vec(), None)
            .map_err(|e| EmbeddingError::Fatal(format!("embedding generation failed: {e}")))?;

        check_batch_shape(vectors.len(), texts.len())?;
        Ok(vectors)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn version_tag(&self) -> [u8; 32] {
        self.tag
    }

    fn describe(&self) -> String {
        format!("local/{}", self.model_name)
    }

    fn max_batch(&self) -> usize {
        LOCAL_BATCH
    }
}

fn parse_model_name(name: &str) -> Result<fastembed::EmbeddingModel, EmbeddingError> {
    match name.to_lowercase().as_str() {
        "all-minilm-l6-v2" => Ok(fastembed::EmbeddingModel::AllMiniLML6V2),
        "all-minilm-l6-v2-q" => Ok(fastembed::EmbeddingModel::AllMiniLML6V2Q),
        "bge-small-en-v1.5" => Ok(fastembed::EmbeddingModel::BGESmallENV15),
        "bge-small-en-v1.5-q" => Ok(fastembed::EmbeddingModel::BGESmallENV15Q),
        "bge-base-en-v1.5" => Ok(fastembed::EmbeddingModel::BGEBaseENV15),
        "bge-base-en-v1.5-q" => Ok(fastembed::EmbeddingModel::BGEBaseENV15Q),
        "bge-large-en-v1.5" => Ok(fastembed::EmbeddingModel::BGELargeENV15),
        "bge-large-en-v1.5-q" => Ok(fastembed::EmbeddingModel::BGELargeENV15Q),
        _ => Err(EmbeddingError::Fatal(format!(
            "unknown local model: {name}. Supported: all-MiniLM-L6-v2, bge-small-en-v1.5, \
             bge-base-en-v1.5, bge-large-en-v1.5 (add -q suffix for quantized)"
        ))),
    }
}

fn probe_dimension(model: &mut TextEmbedding) -> Result<usize, EmbeddingError> {
    let probe = model
        .embed(vec!["dimension probe"], None)
        .map_err(|e| EmbeddingError::Fatal(format!("failed to probe dimension: {e}")))?;

    probe
        .first()
        .map(|v| v.len())
        .ok_or_else(|| EmbeddingError::Fatal("model returned no embedding".to_string()))
}

// ---------------------------------------------------------------------------
// OpenAI-compatible
// ---------------------------------------------------------------------------

pub struct OpenAiProvider {
    client: reqwest::blocking::Client,
    endpoint: String,
    model: String,
    requested_dimension: Option<usize>,
    dimension: Mutex<Option<usize>>,
    tag: [u8; 32],
}

#[derive(Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    input: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Deserialize)]
struct OpenAiResponse {
    data: Vec<OpenAiEmbedding>,
}

#[derive(Deserialize)]
struct OpenAiEmbedding {
    embedding: Vec<f32>,
    index: usize,
}

impl OpenAiProvider {
    pub fn new(config: &EmbeddingConfig) -> Result<Self, EmbeddingError> {
        let api_key = resolve_api_key(config, &["OPENAI_API_KEY"])?;

        let mut headers = HeaderMap::new();
        let auth = format!("Bearer {}", api_key.trim());
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth)
                .map_err(|_| EmbeddingError::Fatal("invalid OpenAI API key".to_string()))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .default_headers(headers)
            .build()
            .map_err(|e| EmbeddingError::Fatal(format!("failed to build HTTP client: {e}")))?;

        let base = config
            .endpoint
            .as_deref()
            .unwrap_or(OPENAI_DEFAULT_ENDPOINT)
            .trim_end_matches('/');

        Ok(Self {
            client,
            endpoint: format!("{base}/embeddings"),
            model: config.model.clone(),
            requested_dimension: config.dimension,
            dimension: Mutex::new(config.dimension),
            tag: config.version_tag(),
        })
    }

    fn request_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let request = OpenAiRequest {
            model: &self.model,
            input: texts,
            dimensions: self.requested_dimension,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .map_err(classify_request_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(classify_status(status, &body));
        }

        let mut parsed: OpenAiResponse = response
            .json()
            .map_err(|e| EmbeddingError::Fatal(format!("unreadable embedding response: {e}")))?;

        parsed.data.sort_by_key(|entry| entry.index);
        check_batch_shape(parsed.data.len(), texts.len())?;

        Ok(parsed.data.into_iter().map(|e| e.embedding).collect())
    }
}

impl EmbeddingProvider for OpenAiProvider {
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(vec![]);
        }
        if texts.len() > self.max_batch() {
            return Err(EmbeddingError::Fatal(format!(
                "batch of {} exceeds provider limit {}",
                texts.len(),
                self.max_batch()
            )));
        }

        let vectors =
            with_retries(MAX_ATTEMPTS, RETRY_BASE_DELAY, || self.request_batch(texts))?;

        if let Some(first) = vectors.first() {
            let mut dim = self
                .dimension
                .lock()
                .map_err(|e| EmbeddingError::Fatal(format!("dimension lock poisoned: {e}")))?;
            dim.get_or_insert(first.len());
        }

        Ok(vectors)
    }

    fn dimension(&self) -> usize {
        self.dimension.lock().ok().and_then(|d| *d).unwrap_or(0)
    }

    fn version_tag(&self) -> [u8; 32] {
        self.tag
    }

    fn describe(&self) -> String {
        format!("openai/{}", self.model)
    }

    fn max_batch(&self) -> usize {
        MAX_REMOTE_BATCH
    }
}

// ---------------------------------------------------------------------------
// Gemini
// ---------------------------------------------------------------------------

pub struct GeminiProvider {
    client: reqwest::blocking::Client,
    endpoint: String,
    model: String,
    dimension: Mutex<Option<usize>>,
    tag: [u8; 32],
}

#[derive(Serialize)]
struct GeminiBatchRequest<'a> {
    requests: Vec<GeminiEmbedRequest<'a>>,
}

#[derive(Serialize)]
struct GeminiEmbedRequest<'a> {
    model: &'a str,
    content: GeminiContent<'a>,
}

#[derive(Serialize)]
struct GeminiContent<'a> {
    parts: Vec<GeminiPart<'a>>,
}

#[derive(Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GeminiBatchResponse {
    embeddings: Vec<GeminiEmbedding>,
}

#[derive(Deserialize)]
struct GeminiEmbedding {
    values: Vec<f32>,
}

impl GeminiProvider {
    pub fn new(config: &EmbeddingConfig) -> Result<Self, EmbeddingError> {
        let api_key = resolve_api_key(config, &["GEMINI_API_KEY", "GOOGLE_API_KEY"])?;

        let mut headers = HeaderMap::new();
        headers.insert(
            "x-goog-api-key",
            HeaderValue::from_str(api_key.trim())
                .map_err(|_| EmbeddingError::Fatal("invalid Gemini API key".to_string()))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .default_headers(headers)
            .build()
            .map_err(|e| EmbeddingError::Fatal(format!("failed to build HTTP client: {e}")))?;

        let base = config
            .endpoint
            .as_deref()
            .unwrap_or(GEMINI_DEFAULT_ENDPOINT)
            .trim_end_matches('/');
        let model_path = gemini_model_path(&config.model);

        Ok(Self {
            client,
            endpoint: format!("{base}/{model_path}:batchEmbedContents"),
            model: config.model.clone(),
            dimension: Mutex::new(config.dimension),
            tag: config.version_tag(),
        })
    }

    fn request_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let model_path = gemini_model_path(&self.model);
        let request = GeminiBatchRequest {
            requests: texts
                .iter()
                .map(|t| GeminiEmbedRequest {
                    model: &model_path,
                    content: GeminiContent {
                        parts: vec![GeminiPart { text: t }],
                    },
                })
                .collect(),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .map_err(classify_request_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(classify_status(status, &body));
        }

        let parsed: GeminiBatchResponse = response
            .json()
            .map_err(|e| EmbeddingError::Fatal(format!("unreadable embedding response: {e}")))?;

        check_batch_shape(parsed.embeddings.len(), texts.len())?;
        Ok(parsed.embeddings.into_iter().map(|e| e.values).collect())
    }
}

impl EmbeddingProvider for GeminiProvider {
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(vec![]);
        }
        if texts.len() > self.max_batch() {
            return Err(EmbeddingError::Fatal(format!(
                "batch of {} exceeds provider limit {}",
                texts.len(),
                self.max_batch()
            )));
        }

        let vectors =
            with_retries(MAX_ATTEMPTS, RETRY_BASE_DELAY, || self.request_batch(texts))?;

        if let Some(first) = vectors.first() {
            let mut dim = self
                .dimension
                .lock()
                .map_err(|e| EmbeddingError::Fatal(format!("dimension lock poisoned: {e}")))?;
            dim.get_or_insert(first.len());
        }

        Ok(vectors)
    }

    fn dimension(&self) -> usize {
        self.dimension.lock().ok().and_then(|d| *d).unwrap_or(0)
    }

    fn version_tag(&self) -> [u8; 32] {
        self.tag
    }

    fn describe(&self) -> String {
        format!("gemini/{}", self.model)
    }

    fn max_batch(&self) -> usize {
        MAX_REMOTE_BATCH
    }
}

fn gemini_model_path(model: &str) -> String {
    if model.starts_with("models/") {
        model.to_string()
    } else {
        format!("models/{model}")
    }
}

fn resolve_api_key(config: &EmbeddingConfig, env_vars: &[&str]) -> Result<String, EmbeddingError> {
    if let Some(key) = config.api_key.as_deref() {
        if !key.trim().is_empty() {
            return Ok(key.to_string());
        }
    }

    for var in env_vars {
        if let Ok(key) = std::env::var(var) {
            if !key.trim().is_empty() {
                return Ok(key);
            }
        }
    }

    Err(EmbeddingError::Fatal(format!(
        "missing API key for {} provider (set {})",
        config.provider.as_str(),
        env_vars.join(" or ")
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_tag_is_deterministic() {
        let config = EmbeddingConfig::default();
        assert_eq!(config.version_tag(), config.version_tag());
    }

    #[test]
    fn version_tag_changes_with_any_field() {
        let base = EmbeddingConfig::default();

        let mut other_model = base.clone();
        other_model.model = "all-MiniLM-L6-v2".to_string();
        assert_ne!(base.version_tag(), other_model.version_tag());

        let mut other_provider = base.clone();
        other_provider.provider = ProviderKind::Openai;
        assert_ne!(base.version_tag(), other_provider.version_tag());

        let mut other_endpoint = base.clone();
        other_endpoint.endpoint = Some("http://localhost:9999".to_string());
        assert_ne!(base.version_tag(), other_endpoint.version_tag());

        let mut other_dimension = base.clone();
        other_dimension.dimension = Some(256);
        assert_ne!(base.version_tag(), other_dimension.version_tag());
    }

    #[test]
    fn version_tag_ignores_credentials() {
        let base = EmbeddingConfig::default();
        let mut with_key = base.clone();
        with_key.api_key = Some("secret".to_string());
        assert_eq!(base.version_tag(), with_key.version_tag());
    }

    #[test]
    fn retries_transient_then_succeeds() {
        let mut calls = 0;
        let result = with_retries(4, Duration::ZERO, || {
            calls += 1;
            if calls < 3 {
                Err(EmbeddingError::Transient("rate limited".to_string()))
            } else {
                Ok(42)
            }
        });

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls, 3);
    }

    #[test]
    fn exhausted_retries_escalate_to_fatal() {
        let mut calls = 0;
        let result: Result<(), _> = with_retries(3, Duration::ZERO, || {
            calls += 1;
            Err(EmbeddingError::Transient("timeout".to_string()))
        });

        assert_eq!(calls, 3);
        assert!(matches!(result, Err(EmbeddingError::Fatal(_))));
    }

    #[test]
    fn fatal_errors_are_not_retried() {
        let mut calls = 0;
        let result: Result<(), _> = with_retries(5, Duration::ZERO, || {
            calls += 1;
            Err(EmbeddingError::Fatal("bad credentials".to_string()))
        });

        assert_eq!(calls, 1);
        assert!(matches!(result, Err(EmbeddingError::Fatal(_))));
    }

    #[test]
    fn status_classification() {
        assert!(matches!(
            classify_status(StatusCode::TOO_MANY_REQUESTS, ""),
            EmbeddingError::Transient(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::BAD_GATEWAY, ""),
            EmbeddingError::Transient(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::UNAUTHORIZED, ""),
            EmbeddingError::Fatal(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::NOT_FOUND, ""),
            EmbeddingError::Fatal(_)
        ));
    }

    #[test]
    fn openai_request_shape() {
        let texts = vec!["alpha".to_string(), "beta".to_string()];
        let request = OpenAiRequest {
            model: "text-embedding-3-small",
            input: &texts,
            dimensions: None,
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "text-embedding-3-small");
        assert_eq!(json["input"][1], "beta");
        assert!(json.get("dimensions").is_none());
    }

    #[test]
    fn gemini_request_shape() {
        let model_path = gemini_model_path("text-embedding-004");
        assert_eq!(model_path, "models/text-embedding-004");
        assert_eq!(gemini_model_path("models/x"), "models/x");

        let request = GeminiBatchRequest {
            requests: vec![GeminiEmbedRequest {
                model: &model_path,
                content: GeminiContent {
                    parts: vec![GeminiPart { text: "hello" }],
                },
            }],
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["requests"][0]["model"], "models/text-embedding-004");
        assert_eq!(json["requests"][0]["content"]["parts"][0]["text"], "hello");
    }

    #[test]
    fn gemini_response_parses() {
        let body = r#"{"embeddings": [{"values": [0.1, 0.2]}, {"values": [0.3, 0.4]}]}"#;
        let parsed: GeminiBatchResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.embeddings.len(), 2);
        assert_eq!(parsed.embeddings[1].values, vec![0.3, 0.4]);
    }

    #[test]
    fn openai_response_restores_input_order() {
        let body = r#"{"data": [
            {"embedding": [1.0], "index": 1},
            {"embedding": [0.0], "index": 0}
        ]}"#;
        let mut parsed: OpenAiResponse = serde_json::from_str(body).unwrap();
        parsed.data.sort_by_key(|e| e.index);
        assert_eq!(parsed.data[0].embedding, vec![0.0]);
        assert_eq!(parsed.data[1].embedding, vec![1.0]);
    }
}
