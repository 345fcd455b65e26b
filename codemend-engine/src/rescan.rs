//! Rescanner — re-runs detection on patched source and computes the
//! accept/retry/rollback verdict.
//!
//! A rescan passes iff the target rule has no remaining violations, no new
//! critical/high violation with a different rule id appeared, and the risk
//! score did not increase.

use codemend_analysis::engine::RuleEngine;
use codemend_analysis::parser::parse_file;
use codemend_analysis::scorer::compute_risk_score;
use codemend_core::FxHashSet;
use serde::{Deserialize, Serialize};

/// Result of re-scanning patched source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RescanResult {
    pub passed: bool,
    pub target_eliminated: bool,
    pub new_violations_introduced: Vec<String>,
    pub risk_score_before: u32,
    pub risk_score_after: u32,
    pub risk_increased: bool,
    pub details: String,
}

/// Re-parse patched source, re-run the full catalog on a single-module map,
/// and compute the verdict.
pub fn rescan_patched_source(
    patched_source: &str,
    file_path: &str,
    target_rule_id: &str,
    original_risk_score: u32,
    rule_engine: &RuleEngine,
) -> RescanResult {
    let mut result = RescanResult {
        risk_score_before: original_risk_score,
        ..RescanResult::default()
    };

    let module_ast = parse_file(patched_source, file_path);
    let modules = vec![(file_path.to_string(), module_ast)];
    let rule_result = rule_engine.run(&modules, None);

    let remaining_target = rule_result
        .violations
        .iter()
        .filter(|v| v.rule_id == target_rule_id)
        .count();
    result.target_eliminated = remaining_target == 0;
    if !result.target_eliminated {
        result.details = format!(
            "Target rule '{target_rule_id}' still present after patch \
             ({remaining_target} violation(s) remaining)"
        );
        tracing::warn!("{}", result.details);
    }

    result.new_violations_introduced = rule_result
        .violations
        .iter()
        .filter(|v| v.rule_id != target_rule_id && v.severity.is_critical_or_high())
        .map(|v| format!("{}: {}", v.rule_id, v.title))
        .collect();

    let risk = compute_risk_score(&rule_result, None, &FxHashSet::default());
    result.risk_score_after = risk.total_score;
    result.risk_increased = result.risk_score_after > original_risk_score;

    result.passed = result.target_eliminated
        && result.new_violations_introduced.is_empty()
        && !result.risk_increased;

    if result.passed {
        result.details = format!(
            "Re-scan passed: rule '{target_rule_id}' eliminated, risk \
             {original_risk_score} → {}",
            result.risk_score_after
        );
        tracing::info!("{}", result.details);
    } else if result.details.is_empty() {
        let mut parts = Vec::new();
        if !result.target_eliminated {
            parts.push("target rule not eliminated".to_string());
        }
        if !result.new_violations_introduced.is_empty() {
            parts.push(format!(
                "{} new critical/high violations",
                result.new_violations_introduced.len()
            ));
        }
        if result.risk_increased {
            parts.push(format!(
                "risk increased {original_risk_score} → {}",
                result.risk_score_after
            ));
        }
        result.details = format!("Re-scan failed: {}", parts.join("; "));
        tracing::warn!("{}", result.details);
    }

    result
}
