//! Strict parsing of completion replies.
//!
//! The only accepted patch reply is
//! `{explanation, patch: {type: "replace_function", target, new_code},
//! risk_score_after}`; any deviation is a generation failure.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use super::types::{ProposedPatch, ReviewVerdict};

static FENCED_JSON: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```(?:json)?\s*\n(.*?)\n```").expect("fence pattern is valid")
});

/// Extract JSON from reply text: fenced blocks first, then the first
/// balanced `{...}` span.
pub fn extract_json(text: &str) -> Option<Value> {
    if let Some(captures) = FENCED_JSON.captures(text) {
        if let Some(block) = captures.get(1) {
            if let Ok(value) = serde_json::from_str(block.as_str()) {
                return Some(value);
            }
        }
    }

    let start = text.find('{')?;
    let mut depth = 0usize;
    for (offset, ch) in text[start..].char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    let candidate = &text[start..start + offset + 1];
                    return serde_json::from_str(candidate).ok();
                }
            }
            _ => {}
        }
    }
    None
}

/// Parse a patch-generation reply. `None` on any schema deviation.
pub fn parse_patch_generation(value: &Value) -> Option<ProposedPatch> {
    let explanation = value.get("explanation")?.as_str()?.to_string();
    let patch = value.get("patch")?;

    if patch.get("type")?.as_str()? != "replace_function" {
        return None;
    }
    let target = patch.get("target")?.as_str()?.to_string();
    let new_code = patch.get("new_code")?.as_str()?.to_string();
    if target.is_empty() || new_code.trim().is_empty() {
        return None;
    }

    let risk_score_after = value
        .get("risk_score_after")
        .and_then(Value::as_u64)
        .map(|score| score.min(100) as u32)
        .unwrap_or(0);

    Some(ProposedPatch {
        explanation,
        target,
        new_code,
        risk_score_after,
    })
}

/// Parse a self-review reply. `None` on schema deviation.
pub fn parse_review_verdict(value: &Value) -> Option<ReviewVerdict> {
    let safe = value.get("safe")?.as_bool()?;
    let issues = value
        .get("issues")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();
    let recommendation = value
        .get("recommendation")
        .and_then(Value::as_str)
        .unwrap_or("apply")
        .to_string();

    Some(ReviewVerdict {
        safe,
        issues,
        recommendation,
    })
}
