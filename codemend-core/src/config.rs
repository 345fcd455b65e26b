//! Engine configuration.
//!
//! Deserialized from TOML (or assembled programmatically). Every field is
//! optional in the serialized form; `effective_*` accessors supply defaults
//! so a partial config file stays valid.

use serde::{Deserialize, Serialize};

/// Configuration for the completion-service client.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CompletionConfig {
    /// Model identifier sent to the completion endpoint.
    pub model: Option<String>,
    /// Base URL of the OpenAI-compatible chat-completions endpoint.
    pub base_url: Option<String>,
    /// API key. Absent means the completion service is not configured.
    pub api_key: Option<String>,
    /// Per-call timeout in seconds.
    pub timeout_secs: Option<u64>,
    /// Attempts before falling back to the deterministic template.
    pub max_retries: Option<u32>,
    /// Sampling temperature.
    pub temperature: Option<f32>,
    /// Hard token budget summed across all calls in one scan.
    pub max_tokens_per_scan: Option<u64>,
    /// Minimum risk score required to invoke the completion service at all.
    pub risk_threshold: Option<u32>,
}

impl CompletionConfig {
    pub fn effective_model(&self) -> &str {
        self.model.as_deref().unwrap_or("moonshotai/kimi-k2-instruct")
    }

    pub fn effective_base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or("https://api.groq.com/openai/v1")
    }

    pub fn effective_timeout_secs(&self) -> u64 {
        self.timeout_secs.unwrap_or(30)
    }

    pub fn effective_max_retries(&self) -> u32 {
        self.max_retries.unwrap_or(3)
    }

    pub fn effective_temperature(&self) -> f32 {
        self.temperature.unwrap_or(0.1)
    }

    pub fn effective_max_tokens_per_scan(&self) -> u64 {
        self.max_tokens_per_scan.unwrap_or(4096)
    }

    pub fn effective_risk_threshold(&self) -> u32 {
        self.risk_threshold.unwrap_or(30)
    }

    /// True when an API key is present.
    pub fn is_configured(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.is_empty())
    }
}

/// Configuration for scan admission and dispatch.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ScanConfig {
    /// Files whose UTF-8 content exceeds this byte count are dropped.
    pub max_file_size_bytes: Option<usize>,
    /// At most this many files run inline; above it, a scan is queued to the
    /// background and a poll id is returned.
    pub background_file_threshold: Option<usize>,
    /// TTL for per-file cache entries, in seconds.
    pub cache_ttl_secs: Option<u64>,
}

impl ScanConfig {
    pub fn effective_max_file_size_bytes(&self) -> usize {
        self.max_file_size_bytes.unwrap_or(500_000)
    }

    pub fn effective_background_file_threshold(&self) -> usize {
        self.background_file_threshold.unwrap_or(10)
    }

    pub fn effective_cache_ttl_secs(&self) -> u64 {
        self.cache_ttl_secs.unwrap_or(3600)
    }
}

/// Configuration for the subprocess test harness.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct TestHarnessConfig {
    /// Feature flag; the harness never runs unless enabled.
    pub enabled: Option<bool>,
    /// Wall-clock timeout per generated case, in seconds.
    pub timeout_secs: Option<u64>,
}

impl TestHarnessConfig {
    pub fn effective_enabled(&self) -> bool {
        self.enabled.unwrap_or(false)
    }

    pub fn effective_timeout_secs(&self) -> u64 {
        self.timeout_secs.unwrap_or(5)
    }
}

/// Server-facing settings carried for the HTTP surface that fronts the
/// engine. The engine itself never binds a socket.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub cors_origins: Vec<String>,
}

impl ServerConfig {
    pub fn effective_host(&self) -> &str {
        self.host.as_deref().unwrap_or("0.0.0.0")
    }

    pub fn effective_port(&self) -> u16 {
        self.port.unwrap_or(5001)
    }

    pub fn effective_cors_origins(&self) -> Vec<String> {
        if self.cors_origins.is_empty() {
            vec!["*".to_string()]
        } else {
            self.cors_origins.clone()
        }
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct EngineConfig {
    pub completion: CompletionConfig,
    pub scan: ScanConfig,
    pub test_harness: TestHarnessConfig,
    pub server: ServerConfig,
    /// Path to the JSON-lines audit log.
    pub audit_log_path: Option<String>,
    /// Retry cap for the patch pipeline (generation attempts per violation).
    pub patch_max_retries: Option<u32>,
    /// Whether the pipeline asks the completion service to review its own
    /// patches before rescanning.
    pub patch_review_enabled: Option<bool>,
}

impl EngineConfig {
    /// Parse a configuration from a TOML document.
    pub fn from_toml_str(doc: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(doc)
    }

    /// Apply environment-variable overrides for the secrets that should not
    /// live in config files.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(key) = std::env::var("CODEMEND_API_KEY") {
            if !key.is_empty() {
                self.completion.api_key = Some(key);
            }
        }
        if let Ok(path) = std::env::var("CODEMEND_AUDIT_LOG") {
            if !path.is_empty() {
                self.audit_log_path = Some(path);
            }
        }
        self
    }

    pub fn effective_audit_log_path(&self) -> &str {
        self.audit_log_path.as_deref().unwrap_or("audit.jsonl")
    }

    pub fn effective_patch_max_retries(&self) -> u32 {
        self.patch_max_retries.unwrap_or(2)
    }

    pub fn effective_patch_review_enabled(&self) -> bool {
        self.patch_review_enabled.unwrap_or(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_on_empty_document() {
        let cfg = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(cfg.scan.effective_max_file_size_bytes(), 500_000);
        assert_eq!(cfg.scan.effective_background_file_threshold(), 10);
        assert_eq!(cfg.completion.effective_max_retries(), 3);
        assert_eq!(cfg.completion.effective_risk_threshold(), 30);
        assert!(!cfg.completion.is_configured());
        assert!(!cfg.test_harness.effective_enabled());
        assert_eq!(cfg.effective_audit_log_path(), "audit.jsonl");
    }

    #[test]
    fn partial_document_overrides_only_named_fields() {
        let cfg = EngineConfig::from_toml_str(
            r#"
            [scan]
            max_file_size_bytes = 1024

            [completion]
            model = "test-model"
            api_key = "k"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.scan.effective_max_file_size_bytes(), 1024);
        assert_eq!(cfg.scan.effective_background_file_threshold(), 10);
        assert_eq!(cfg.completion.effective_model(), "test-model");
        assert!(cfg.completion.is_configured());
    }
}
