//! Embedding client with retry, sentinels, and bounded-concurrency batching.
//!
//! Calls an OpenAI-compatible `POST {base_url}/embeddings` endpoint. Two
//! deterministic short-circuits avoid needless network traffic:
//!
//! - Blank input (after trimming) embeds to the all-zero vector, a cheap
//!   sentinel meaning "nothing to embed".
//! - Without a configured credential, every input embeds to a placeholder
//!   with a 1.0 first component, so downstream distance math never runs on a
//!   degenerate all-zero vector for every row.
//!
//! Transient provider failures are retried per [`RetryPolicy`]; other
//! failures, and retry exhaustion, propagate to the caller.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;

use crate::config::EmbeddingConfig;
use crate::error::QaError;
use crate::retry::{retry_with_backoff, RetryPolicy};

/// Inputs longer than this are truncated before embedding. A safety bound,
/// not a semantic one.
const MAX_INPUT_CHARS: usize = 8000;

#[derive(Clone)]
pub struct EmbeddingClient {
    http: reqwest::Client,
    api_key: Option<String>,
    model: String,
    dims: usize,
    base_url: String,
    retry: RetryPolicy,
}

impl EmbeddingClient {
    pub fn new(config: &EmbeddingConfig, api_key: Option<String>) -> Result<Self, QaError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            api_key: api_key.filter(|k| !k.is_empty()),
            model: config.model.clone(),
            dims: config.dims,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            retry: RetryPolicy::default(),
        })
    }

    /// Replace the retry policy. Used by tests to run the retry loop without
    /// real backoff delays.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn dims(&self) -> usize {
        self.dims
    }

    /// Embed one text. Blank input returns the zero vector without a network
    /// call; a missing credential returns the non-zero placeholder.
    pub async fn embed_one(&self, text: &str) -> Result<Vec<f32>, QaError> {
        let text = sanitize(text);
        if text.is_empty() {
            return Ok(vec![0.0; self.dims]);
        }

        let Some(api_key) = self.api_key.as_deref() else {
            let mut v = vec![0.0; self.dims];
            v[0] = 1.0;
            return Ok(v);
        };

        retry_with_backoff(&self.retry, || self.request_embedding(api_key, &text)).await
    }

    /// Embed a batch with a bounded worker pool. Workers claim the next
    /// unclaimed index and write results back by original index, so the
    /// output is index-aligned with the input regardless of completion order.
    pub async fn embed_many(
        &self,
        texts: &[String],
        concurrency: usize,
    ) -> Result<Vec<Vec<f32>>, QaError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let texts: Arc<Vec<String>> = Arc::new(texts.to_vec());
        let next_index = Arc::new(AtomicUsize::new(0));
        let slots: Arc<tokio::sync::Mutex<Vec<Option<Vec<f32>>>>> =
            Arc::new(tokio::sync::Mutex::new(vec![None; texts.len()]));

        let workers = concurrency.max(1).min(texts.len());
        let mut pool = JoinSet::new();

        for _ in 0..workers {
            let client = self.clone();
            let texts = Arc::clone(&texts);
            let next_index = Arc::clone(&next_index);
            let slots = Arc::clone(&slots);

            pool.spawn(async move {
                loop {
                    let idx = next_index.fetch_add(1, Ordering::Relaxed);
                    if idx >= texts.len() {
                        return Ok::<(), QaError>(());
                    }
                    let vector = client.embed_one(&texts[idx]).await?;
                    slots.lock().await[idx] = Some(vector);
                }
            });
        }

        while let Some(joined) = pool.join_next().await {
            joined.map_err(|e| QaError::Internal(format!("embedding worker panicked: {e}")))??;
        }

        let mut slots = slots.lock().await;
        let mut out = Vec::with_capacity(slots.len());
        for (i, slot) in slots.iter_mut().enumerate() {
            match slot.take() {
                Some(vector) => out.push(vector),
                None => {
                    return Err(QaError::Internal(format!(
                        "missing embedding for input {i}"
                    )))
                }
            }
        }
        Ok(out)
    }

    async fn request_embedding(&self, api_key: &str, text: &str) -> Result<Vec<f32>, QaError> {
        let body = serde_json::json!({
            "model": self.model,
            "input": text,
        });

        let response = self
            .http
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(QaError::Upstream {
                status: status.as_u16(),
                message,
            });
        }

        let json: serde_json::Value = response.json().await?;
        let embedding = json
            .get("data")
            .and_then(|d| d.get(0))
            .and_then(|item| item.get("embedding"))
            .and_then(|e| e.as_array())
            .ok_or_else(|| QaError::Upstream {
                status: status.as_u16(),
                message: "embedding response missing data[0].embedding".into(),
            })?;

        Ok(embedding
            .iter()
            .map(|v| v.as_f64().unwrap_or(0.0) as f32)
            .collect())
    }
}

/// Trim and cap input before embedding.
fn sanitize(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() > MAX_INPUT_CHARS {
        trimmed.chars().take(MAX_INPUT_CHARS).collect()
    } else {
        trimmed.to_string()
    }
}
