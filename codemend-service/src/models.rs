//! Request/response contracts — the shapes an HTTP surface would speak.
//!
//! The response schema is a backward-compatible superset of the legacy API:
//! `riskScore` and `testImpact` keep their camelCase spellings via serde
//! renames.

use codemend_analysis::scorer::RiskBreakdown;
use codemend_core::Severity;
use serde::{Deserialize, Serialize};

pub use codemend_engine::pipeline::{PatchFile, PatchResponse, PatchResult, PatchStatus};

/// A single file submitted for scanning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileInput {
    pub path: String,
    pub content: String,
}

/// Scan flavor: full project or pull-request delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanMode {
    #[default]
    Full,
    Pr,
}

/// Request body for a scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ScanRequest {
    pub files: Vec<FileInput>,
    pub scan_mode: ScanMode,
    /// Legacy compatibility: a single combined code string, scanned as the
    /// file `"unknown"`.
    pub combined: Option<String>,
}

/// A code patch suggestion targeting a specific line range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchSuggestion {
    pub file: String,
    pub start_line: u32,
    pub end_line: u32,
    pub new_code: String,
}

/// A single issue in the scan report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub id: String,
    pub severity: Severity,
    pub file: String,
    pub line: u32,
    pub rule_id: String,
    pub issue: String,
    pub explanation: String,
    pub risk: String,
    pub evidence: Vec<String>,
    pub patches: Vec<PatchSuggestion>,
    #[serde(rename = "testImpact")]
    pub test_impact: Vec<String>,
}

/// Audit metadata for a scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub scan_id: String,
    pub files_scanned: usize,
    pub violations_found: usize,
    pub risk_score: u32,
    pub llm_invoked: bool,
    pub llm_tokens_used: u64,
    pub duration_ms: f64,
    pub deterministic_only: bool,
}

/// Full scan report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ScanReport {
    pub issues: Vec<Issue>,
    #[serde(rename = "riskScore")]
    pub risk_score: u32,
    pub risk_breakdown: Option<RiskBreakdown>,
    pub summary: String,
    pub llm_used: bool,
    pub deterministic_only: bool,
    pub audit: Option<AuditEntry>,
}

/// Top-level response for scan requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanResponse {
    pub message: String,
    pub scan_id: String,
    pub report: Option<ScanReport>,
}

impl ScanResponse {
    pub fn error() -> Self {
        Self {
            message: "error".to_string(),
            scan_id: String::new(),
            report: None,
        }
    }
}

/// Lifecycle state of a background scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanStatus {
    Queued,
    Running,
    Complete,
    Failed,
}

/// Response for polling a background scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanStatusResponse {
    pub scan_id: String,
    pub status: ScanStatus,
    pub progress: f64,
    pub report: Option<ScanReport>,
    pub error: Option<String>,
}

/// Request body for a patch run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchRequest {
    pub files: Vec<PatchFile>,
    #[serde(default)]
    pub target_rule_ids: Option<Vec<String>>,
    #[serde(default)]
    pub max_retries: Option<u32>,
    #[serde(default = "default_use_fallback")]
    pub use_fallback: bool,
}

fn default_use_fallback() -> bool {
    true
}

/// A patch suggestion inside a completion-service explanation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmPatchSuggestion {
    pub file: String,
    pub start_line: u32,
    pub end_line: u32,
    pub new_code: String,
    #[serde(default)]
    pub rationale: String,
}

/// Completion-service explanation for one violation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmExplanation {
    pub violation_rule_id: String,
    pub natural_language_explanation: String,
    pub production_risk_summary: String,
    #[serde(default)]
    pub patch_suggestions: Vec<LlmPatchSuggestion>,
}

/// Validated completion-service scan reply — strict schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct LlmScanReply {
    #[serde(default)]
    pub explanations: Vec<LlmExplanation>,
    #[serde(default)]
    pub blast_impact_summary: String,
    #[serde(default)]
    pub overall_recommendation: String,
}
