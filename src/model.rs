//! Inference backends.
//!
//! [`ModelBackend`] wraps one of two HTTP inference servers behind the core
//! [`Generator`] trait. The kind is fixed at construction from the model
//! path's extension:
//!
//! | Extension | Kind | Server | Endpoint |
//! |-----------|------|--------|----------|
//! | `.gguf` | [`ModelKind::Gguf`] | llama.cpp | `POST /completion` |
//! | anything else | [`ModelKind::Transformer`] | text-generation-inference | `POST /generate` |
//!
//! [`ModelBackend::load`] checks `GET /health` and marks the backend ready.
//! Until then every [`generate`](Generator::generate) call returns
//! [`GenerateError::NotReady`].

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use docchat_core::error::GenerateError;
use docchat_core::generate::Generator;

use crate::config::ModelConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    Gguf,
    Transformer,
}

impl ModelKind {
    /// `.gguf` (any case) selects [`ModelKind::Gguf`].
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("gguf") => ModelKind::Gguf,
            _ => ModelKind::Transformer,
        }
    }
}

/// Sampling parameters sent with every request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sampling {
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
}

/// Connection to an inference server.
pub struct ModelHandle {
    client: reqwest::Client,
    base_url: String,
    sampling: Sampling,
    ready: AtomicBool,
}

pub struct ModelBackend {
    kind: ModelKind,
    handle: ModelHandle,
}

impl ModelBackend {
    pub fn new(config: &ModelConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            kind: ModelKind::from_path(&config.path),
            handle: ModelHandle {
                client,
                base_url: config.url.trim_end_matches('/').to_string(),
                sampling: Sampling {
                    max_tokens: config.max_tokens,
                    temperature: config.temperature,
                    top_p: config.top_p,
                },
                ready: AtomicBool::new(false),
            },
        })
    }

    pub fn kind(&self) -> ModelKind {
        self.kind
    }

    pub fn is_ready(&self) -> bool {
        self.handle.ready.load(Ordering::SeqCst)
    }

    /// Check the server's health endpoint and mark the backend ready.
    pub async fn load(&self) -> Result<()> {
        let url = format!("{}/health", self.handle.base_url);
        let response = self
            .handle
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Inference server unreachable at {}", url))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("Inference server not healthy ({}): {}", status, body);
        }

        self.handle.ready.store(true, Ordering::SeqCst);
        tracing::info!(kind = ?self.kind, url = %self.handle.base_url, "model backend ready");
        Ok(())
    }

    fn request(&self, prompt: &str) -> (String, serde_json::Value) {
        let s = &self.handle.sampling;
        match self.kind {
            ModelKind::Gguf => (
                format!("{}/completion", self.handle.base_url),
                serde_json::json!({
                    "prompt": prompt,
                    "n_predict": s.max_tokens,
                    "temperature": s.temperature,
                    "top_p": s.top_p,
                    "stream": false,
                }),
            ),
            ModelKind::Transformer => (
                format!("{}/generate", self.handle.base_url),
                serde_json::json!({
                    "inputs": prompt,
                    "parameters": {
                        "max_new_tokens": s.max_tokens,
                        "temperature": s.temperature,
                        "top_p": s.top_p,
                    },
                }),
            ),
        }
    }

    async fn call(&self, prompt: &str) -> Result<String> {
        let (url, body) = self.request(prompt);
        let response = self.handle.client.post(&url).json(&body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            bail!("inference server error {}: {}", status, text);
        }

        let json: serde_json::Value = response.json().await?;
        parse_completion(self.kind, &json)
    }
}

#[async_trait]
impl Generator for ModelBackend {
    async fn generate(&self, prompt: &str) -> Result<String, GenerateError> {
        if !self.is_ready() {
            return Err(GenerateError::NotReady(format!(
                "{:?} backend at {} has not been loaded",
                self.kind, self.handle.base_url
            )));
        }
        self.call(prompt)
            .await
            .map_err(|e| GenerateError::Backend(format!("{:#}", e)))
    }
}

/// Pull the generated text out of a server response.
fn parse_completion(kind: ModelKind, json: &serde_json::Value) -> Result<String> {
    let field = match kind {
        ModelKind::Gguf => "content",
        ModelKind::Transformer => "generated_text",
    };

    // TGI may answer with a one-element array.
    let object = match json {
        serde_json::Value::Array(items) => items
            .first()
            .ok_or_else(|| anyhow!("empty response from inference server"))?,
        other => other,
    };

    object
        .get(field)
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .ok_or_else(|| anyhow!("inference response missing '{}'", field))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::path::PathBuf;

    fn config(path: &str) -> ModelConfig {
        ModelConfig {
            path: PathBuf::from(path),
            url: "http://127.0.0.1:9/".to_string(),
            ..ModelConfig::default()
        }
    }

    #[test]
    fn test_kind_from_extension() {
        assert_eq!(ModelKind::from_path(Path::new("models/llama.gguf")), ModelKind::Gguf);
        assert_eq!(ModelKind::from_path(Path::new("MODEL.GGUF")), ModelKind::Gguf);
        assert_eq!(
            ModelKind::from_path(Path::new("models/mistral-7b")),
            ModelKind::Transformer
        );
        assert_eq!(
            ModelKind::from_path(Path::new("model.safetensors")),
            ModelKind::Transformer
        );
    }

    #[tokio::test]
    async fn test_generate_before_load_is_not_ready() {
        let backend = ModelBackend::new(&config("models/default.gguf")).unwrap();
        assert!(!backend.is_ready());
        let err = backend.generate("hi").await.unwrap_err();
        assert!(matches!(err, GenerateError::NotReady(_)));
    }

    #[tokio::test]
    async fn test_load_fails_without_server() {
        let backend = ModelBackend::new(&config("models/default.gguf")).unwrap();
        assert!(backend.load().await.is_err());
        assert!(!backend.is_ready());
    }

    #[test]
    fn test_request_shapes() {
        let gguf = ModelBackend::new(&config("m.gguf")).unwrap();
        let (url, body) = gguf.request("Question: x");
        assert_eq!(url, "http://127.0.0.1:9/completion");
        assert_eq!(body["prompt"], "Question: x");
        assert_eq!(body["n_predict"], 512);

        let tgi = ModelBackend::new(&config("m.bin")).unwrap();
        let (url, body) = tgi.request("Question: x");
        assert_eq!(url, "http://127.0.0.1:9/generate");
        assert_eq!(body["inputs"], "Question: x");
        assert_eq!(body["parameters"]["max_new_tokens"], 512);
    }

    #[test]
    fn test_parse_completion() {
        assert_eq!(
            parse_completion(ModelKind::Gguf, &json!({"content": " Hi there "})).unwrap(),
            "Hi there"
        );
        assert_eq!(
            parse_completion(ModelKind::Transformer, &json!([{"generated_text": "Yes"}])).unwrap(),
            "Yes"
        );
        assert!(parse_completion(ModelKind::Transformer, &json!({"content": "x"})).is_err());
    }
}
