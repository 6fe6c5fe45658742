//! Answer drafting against a completion provider, with a deterministic
//! fallback composer.
//!
//! The drafter takes a question plus retrieved context blocks and produces
//! grounded prose via an OpenAI-compatible `POST {base_url}/chat/completions`
//! call. The prompt is strict: answer only from the context, stay within a
//! sentence budget, emit the fixed insufficiency sentinel when the context
//! does not support an answer, and never reveal source identifiers.
//!
//! Failure ladder:
//! - no credential, or empty context → compose locally, no network call
//! - provider success with blank content → compose locally
//! - non-retryable provider error → compose locally (logged)
//! - transient errors exhausted → propagate; the ask orchestrator applies
//!   its own snippet-stitch fallback

use std::time::Duration;

use tracing::warn;

use crate::config::CompletionConfig;
use crate::error::QaError;
use crate::retry::{retry_with_backoff, RetryPolicy};

/// Emitted when the available context cannot support an answer.
pub const INSUFFICIENT_CONTEXT: &str = "Insufficient information in the provided documents.";

/// Separator between context blocks in the prompt.
pub const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

const SYSTEM_PROMPT: &str = "You are a precise document summarizer. \
Use only the provided CONTEXT. Be concise, neutral, and avoid speculation.";

#[derive(Clone)]
pub struct AnswerDrafter {
    http: reqwest::Client,
    api_key: Option<String>,
    model: String,
    temperature: f32,
    base_url: String,
    retry: RetryPolicy,
}

impl AnswerDrafter {
    pub fn new(config: &CompletionConfig, api_key: Option<String>) -> Result<Self, QaError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            api_key: api_key.filter(|k| !k.is_empty()),
            model: config.model.clone(),
            temperature: config.temperature,
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

    /// Draft an answer for `question` grounded in `contexts`.
    pub async fn draft_answer(
        &self,
        question: &str,
        contexts: &[String],
    ) -> Result<String, QaError> {
        let context = normalize_context(contexts);
        let context = context.trim();

        let Some(api_key) = self.api_key.as_deref() else {
            return Ok(naive_compose(context));
        };
        if context.is_empty() {
            return Ok(naive_compose(context));
        }

        let result = retry_with_backoff(&self.retry, || {
            self.request_completion(api_key, question, context)
        })
        .await;

        match result {
            Ok(content) => {
                let content = content.trim();
                if content.is_empty() {
                    Ok(naive_compose(context))
                } else {
                    Ok(content.to_string())
                }
            }
            // a transient error surviving the retry loop means exhaustion
            Err(e) if e.is_transient() => Err(e),
            Err(e) => {
                warn!(error = %e, "completion provider rejected request, composing fallback");
                Ok(naive_compose(context))
            }
        }
    }

    async fn request_completion(
        &self,
        api_key: &str,
        question: &str,
        context: &str,
    ) -> Result<String, QaError> {
        let body = serde_json::json!({
            "model": self.model,
            "temperature": self.temperature,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": build_user_prompt(question, context) },
            ],
        });

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
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
        let content = json
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|choice| choice.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .unwrap_or_default();

        Ok(content.to_string())
    }
}

/// Join non-empty context blocks with the block separator.
fn normalize_context(contexts: &[String]) -> String {
    contexts
        .iter()
        .filter(|block| !block.is_empty())
        .cloned()
        .collect::<Vec<_>>()
        .join(CONTEXT_SEPARATOR)
}

fn build_user_prompt(question: &str, context: &str) -> String {
    format!(
        "QUESTION:\n{}\n\nCONTEXT (from private documents):\n{}\n\n\
         Write a concise, neutral answer in 3-8 sentences. \
         Answer strictly from the CONTEXT. \
         If the context is insufficient, say: \"{}\" \
         Do not mention file names or any internal metadata.",
        question.trim(),
        if context.is_empty() { "(none)" } else { context },
        INSUFFICIENT_CONTEXT,
    )
}

/// Deterministic composer used when the provider is unavailable or returns
/// nothing: the first few lines of context in a fixed frame, or the
/// insufficiency sentinel when there is no context at all.
fn naive_compose(context: &str) -> String {
    let snippet = context
        .lines()
        .take(8)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string();

    if snippet.is_empty() {
        return INSUFFICIENT_CONTEXT.to_string();
    }

    format!(
        "Based on the provided context, here is a concise answer to your question:\n\n\
         {}\n\n\
         (If more detail is required, please refine the question.)",
        snippet
    )
}
