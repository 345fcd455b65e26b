//! Violation and rule-result model.

use std::collections::BTreeMap;

use codemend_core::Severity;
use serde::{Deserialize, Serialize};

/// A concrete, evidence-bearing pattern match produced by a rule.
///
/// Violations are created by rules and never edited afterwards; the engine
/// only fills `graph_node_id` when the affected function exists in the call
/// graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    pub rule_id: String,
    pub severity: Severity,
    pub file: String,
    pub line: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_line: Option<u32>,
    pub title: String,
    pub description: String,
    /// Human-readable facts that led to the detection — at least three.
    pub evidence: Vec<String>,
    pub affected_function: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub graph_node_id: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl Violation {
    /// A minimal violation; rules fill the descriptive fields.
    pub fn new(rule_id: &str, severity: Severity, file: &str, line: u32) -> Self {
        Self {
            rule_id: rule_id.to_string(),
            severity,
            file: file.to_string(),
            line,
            end_line: None,
            title: String::new(),
            description: String::new(),
            evidence: Vec::new(),
            affected_function: String::new(),
            graph_node_id: None,
            metadata: BTreeMap::new(),
        }
    }
}

/// Result of running the whole catalog over a set of modules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RuleResult {
    pub violations: Vec<Violation>,
    pub rules_executed: Vec<String>,
    pub total_files_scanned: usize,
    pub scan_duration_ms: f64,
}
