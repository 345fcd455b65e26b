//! Risk scorer — explainable weighted scoring of rule violations.
//!
//! Per violation:
//!   factors = 1.0 + 0.3·(blast_radius/max_depth) + 0.2·[mutates_shared_state]
//!             + 0.3·[test_failure_present] + 0.2·[async_boundary_crossing]
//!   weighted = severity_weight · factors
//!
//! Total: Σ weighted / (n · 10 · 2.0) · 100, rounded and clamped to [0,100].
//! Every factor is recorded separately so callers can explain each point.

use codemend_core::{FxHashSet, Severity};
use serde::{Deserialize, Serialize};

use crate::call_graph::{blast_radius, max_depth, CallGraph};
use crate::rules::RuleResult;

/// Rules whose violations imply shared-state mutation.
const STATE_MUTATION_RULES: &[&str] =
    &["shared_mutable_state", "race_condition", "cross_module_mutation"];

/// Rules whose violations cross an async boundary.
const ASYNC_BOUNDARY_RULES: &[&str] =
    &["missing_await", "blocking_io_in_async", "race_condition"];

const FORMULA_TEXT: &str = "risk = Σ(base_weight × factors) / max_possible × 100";

/// How a single violation contributes to the total score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViolationContribution {
    pub rule_id: String,
    pub severity: Severity,
    pub file: String,
    pub line: u32,
    pub base_weight: u32,
    pub blast_radius_factor: f64,
    pub state_mutation_factor: f64,
    pub test_failure_factor: f64,
    pub async_boundary_factor: f64,
    pub total_factor: f64,
    pub weighted_score: f64,
}

/// Full explainable breakdown of the risk score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskBreakdown {
    /// Final risk score, 0-100.
    pub total_score: u32,
    pub max_possible_score: f64,
    pub violation_contributions: Vec<ViolationContribution>,
    pub formula_text: String,
    pub summary: String,
}

impl RiskBreakdown {
    fn zero() -> Self {
        Self {
            total_score: 0,
            max_possible_score: 0.0,
            violation_contributions: Vec::new(),
            formula_text: FORMULA_TEXT.to_string(),
            summary: "No violations detected. Risk score is 0.".to_string(),
        }
    }
}

/// Compute an explainable risk score from rule violations.
pub fn compute_risk_score(
    rule_result: &RuleResult,
    call_graph: Option<&CallGraph>,
    test_failure_rule_ids: &FxHashSet<String>,
) -> RiskBreakdown {
    let violations = &rule_result.violations;
    if violations.is_empty() {
        return RiskBreakdown::zero();
    }

    let max_graph_depth = call_graph.map(max_depth).unwrap_or(1).max(1);

    let mut contributions = Vec::with_capacity(violations.len());
    let mut total_weighted = 0.0f64;

    for violation in violations {
        let base_weight = violation.severity.weight();

        let radius = match (call_graph, violation.graph_node_id.as_deref()) {
            (Some(graph), Some(node_id)) if graph.contains(node_id) => {
                blast_radius(graph, node_id)
            }
            _ => 0,
        };
        let blast_factor = 0.3 * (f64::from(radius) / f64::from(max_graph_depth));

        let state_factor = if STATE_MUTATION_RULES.contains(&violation.rule_id.as_str()) {
            0.2
        } else {
            0.0
        };
        let test_factor = if test_failure_rule_ids.contains(&violation.rule_id) {
            0.3
        } else {
            0.0
        };
        let async_factor = if ASYNC_BOUNDARY_RULES.contains(&violation.rule_id.as_str()) {
            0.2
        } else {
            0.0
        };

        let total_factor = 1.0 + blast_factor + state_factor + test_factor + async_factor;
        let weighted_score = f64::from(base_weight) * total_factor;
        total_weighted += weighted_score;

        contributions.push(ViolationContribution {
            rule_id: violation.rule_id.clone(),
            severity: violation.severity,
            file: violation.file.clone(),
            line: violation.line,
            base_weight,
            blast_radius_factor: round4(blast_factor),
            state_mutation_factor: round4(state_factor),
            test_failure_factor: round4(test_factor),
            async_boundary_factor: round4(async_factor),
            total_factor: round4(total_factor),
            weighted_score: round4(weighted_score),
        });
    }

    // Every violation at critical with all factors saturated.
    let max_possible =
        (violations.len() as f64) * f64::from(Severity::Critical.weight()) * 2.0;
    let raw_score = total_weighted / max_possible * 100.0;
    let total_score = (raw_score.round() as i64).clamp(0, 100) as u32;

    RiskBreakdown {
        total_score,
        max_possible_score: round2(max_possible),
        violation_contributions: contributions,
        formula_text: FORMULA_TEXT.to_string(),
        summary: build_summary(rule_result, total_score),
    }
}

fn build_summary(rule_result: &RuleResult, total_score: u32) -> String {
    let mut counts = [0usize; 4];
    for violation in &rule_result.violations {
        match violation.severity {
            Severity::Critical => counts[0] += 1,
            Severity::High => counts[1] += 1,
            Severity::Medium => counts[2] += 1,
            Severity::Low => counts[3] += 1,
        }
    }

    let labels = ["critical", "high", "medium", "low"];
    let parts: Vec<String> = counts
        .iter()
        .zip(labels)
        .filter(|(count, _)| **count > 0)
        .map(|(count, label)| format!("{count} {label}"))
        .collect();

    format!(
        "Risk score {total_score}/100 based on {} violations ({}). Weighted by \
         blast radius, state mutation impact, test failures, and async boundary \
         crossings.",
        rule_result.violations.len(),
        parts.join(", "),
    )
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
