//! Completion-service client — OpenAI-compatible chat completions over
//! reqwest, with per-attempt timeout, exponential backoff, and a per-scan
//! token budget.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use codemend_core::config::CompletionConfig;
use codemend_core::errors::CompletionError;
use serde::Deserialize;
use serde_json::json;

use super::response::extract_json;

/// Outcome of one completion call.
#[derive(Debug, Clone)]
pub struct CompletionOutcome {
    /// Raw reply text.
    pub content: String,
    /// Parsed JSON, when the reply (or a fenced block inside it) was JSON.
    pub parsed: Option<serde_json::Value>,
    pub tokens_used: u64,
    pub success: bool,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    total_tokens: u64,
}

/// Stateless per-call client; the only mutable state is the token counter,
/// reset per scan.
pub struct CompletionClient {
    http: reqwest::Client,
    config: CompletionConfig,
    tokens_used: AtomicU64,
}

impl CompletionClient {
    /// Build a client from configuration. `None` when no API key is set.
    pub fn from_config(config: &CompletionConfig) -> Option<Self> {
        if !config.is_configured() {
            return None;
        }
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.effective_timeout_secs()))
            .build()
            .ok()?;
        Some(Self {
            http,
            config: config.clone(),
            tokens_used: AtomicU64::new(0),
        })
    }

    /// Send a prompt and return the parsed reply.
    ///
    /// Retries with exponential backoff (1s, 2s, 4s) up to the configured
    /// attempt cap; every failure mode surfaces as a `CompletionError`.
    pub async fn complete(&self, prompt: &str) -> Result<CompletionOutcome, CompletionError> {
        let budget = self.config.effective_max_tokens_per_scan();
        let used = self.tokens_used.load(Ordering::Relaxed);
        if used >= budget {
            return Err(CompletionError::TokenBudgetExhausted { used, budget });
        }

        let max_retries = self.config.effective_max_retries().max(1);
        let mut last_error = String::new();

        for attempt in 0..max_retries {
            match self.try_complete(prompt).await {
                Ok(outcome) => {
                    self.tokens_used
                        .fetch_add(outcome.tokens_used, Ordering::Relaxed);
                    return Ok(outcome);
                }
                Err(e) => {
                    last_error = e.to_string();
                    tracing::warn!(
                        attempt = attempt + 1,
                        max_retries,
                        error = %last_error,
                        "completion attempt failed"
                    );
                    if attempt + 1 < max_retries {
                        // Exponential backoff: 1s, 2s, 4s.
                        tokio::time::sleep(Duration::from_secs(1u64 << attempt.min(6))).await;
                    }
                }
            }
        }

        tracing::error!(%last_error, "completion retries exhausted");
        Err(CompletionError::RetriesExhausted {
            attempts: max_retries,
            last_error,
        })
    }

    async fn try_complete(&self, prompt: &str) -> Result<CompletionOutcome, CompletionError> {
        let url = format!(
            "{}/chat/completions",
            self.config.effective_base_url().trim_end_matches('/')
        );
        let body = json!({
            "model": self.config.effective_model(),
            "messages": [{"role": "user", "content": prompt}],
            "temperature": self.config.effective_temperature(),
            "max_tokens": self.config.effective_max_tokens_per_scan(),
        });

        let timeout = Duration::from_secs(self.config.effective_timeout_secs());
        let request = self
            .http
            .post(&url)
            .bearer_auth(self.config.api_key.as_deref().unwrap_or_default())
            .json(&body)
            .send();

        let response = tokio::time::timeout(timeout, request)
            .await
            .map_err(|_| CompletionError::Timeout {
                seconds: self.config.effective_timeout_secs(),
            })?
            .map_err(|e| CompletionError::Request {
                message: e.to_string(),
            })?;

        let reply: ChatReply =
            response
                .error_for_status()
                .map_err(|e| CompletionError::Request {
                    message: e.to_string(),
                })?
                .json()
                .await
                .map_err(|_| CompletionError::MalformedReply)?;

        let content = reply
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default();
        let tokens_used = reply.usage.map(|u| u.total_tokens).unwrap_or(0);

        let parsed = serde_json::from_str::<serde_json::Value>(&content)
            .ok()
            .or_else(|| extract_json(&content));

        Ok(CompletionOutcome {
            success: parsed.is_some(),
            content,
            parsed,
            tokens_used,
        })
    }

    /// Tokens consumed across all calls since the last reset.
    pub fn tokens_used(&self) -> u64 {
        self.tokens_used.load(Ordering::Relaxed)
    }

    /// Reset the per-scan token counter.
    pub fn reset_token_counter(&self) {
        self.tokens_used.store(0, Ordering::Relaxed);
    }
}
