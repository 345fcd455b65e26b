//! Strict validation of completion-service scan replies.
//!
//! Rejects replies that fail the schema, reference files outside the scan
//! input, carry rule ids absent from the deterministic output, or propose
//! patches outside the violation line range (± tolerance).

use codemend_core::{FxHashMap, FxHashSet};
use serde_json::Value;

use crate::models::LlmScanReply;

/// Default patch-range tolerance in lines.
pub const LINE_TOLERANCE: u32 = 5;

/// Outcome of scan-reply validation.
#[derive(Debug, Default)]
pub struct ValidationOutcome {
    pub valid: bool,
    pub errors: Vec<String>,
    pub reply: Option<LlmScanReply>,
}

impl ValidationOutcome {
    fn add_error(&mut self, error: String) {
        self.valid = false;
        self.errors.push(error);
    }
}

/// Validate a completion-service reply against strict constraints.
pub fn validate_scan_reply(
    parsed: Option<&Value>,
    valid_file_paths: &FxHashSet<String>,
    valid_rule_ids: &FxHashSet<String>,
    violation_line_ranges: &FxHashMap<String, (u32, u32)>,
    line_tolerance: u32,
) -> ValidationOutcome {
    let mut outcome = ValidationOutcome {
        valid: true,
        ..ValidationOutcome::default()
    };

    let Some(parsed) = parsed else {
        outcome.add_error("completion service returned non-JSON or empty reply".to_string());
        return outcome;
    };

    let reply: LlmScanReply = match serde_json::from_value(parsed.clone()) {
        Ok(reply) => reply,
        Err(e) => {
            outcome.add_error(format!("Schema validation failed: {e}"));
            return outcome;
        }
    };

    for explanation in &reply.explanations {
        if !valid_rule_ids.contains(&explanation.violation_rule_id) {
            outcome.add_error(format!(
                "Hallucinated rule_id: '{}' not in deterministic output",
                explanation.violation_rule_id
            ));
        }

        for patch in &explanation.patch_suggestions {
            if !valid_file_paths.contains(&patch.file) {
                outcome.add_error(format!(
                    "Patch references file '{}' not in scan input",
                    patch.file
                ));
            }

            if let Some(&(viol_start, viol_end)) =
                violation_line_ranges.get(&explanation.violation_rule_id)
            {
                let lower = viol_start.saturating_sub(line_tolerance);
                let upper = viol_end + line_tolerance;
                if patch.start_line < lower || patch.end_line > upper {
                    outcome.add_error(format!(
                        "Patch line range {}-{} is outside tolerance of violation \
                         range {viol_start}-{viol_end} (±{line_tolerance})",
                        patch.start_line, patch.end_line
                    ));
                }
            }
        }
    }

    if outcome.valid {
        outcome.reply = Some(reply);
    } else {
        tracing::warn!(
            errors = outcome.errors.len(),
            "completion reply validation failed"
        );
    }

    outcome
}
