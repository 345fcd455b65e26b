//! Shared types for the patch-source abstraction.

use serde::{Deserialize, Serialize};

/// A replacement function body proposed by a patch source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposedPatch {
    pub explanation: String,
    /// Name of the function the patch replaces.
    pub target: String,
    /// Complete replacement function definition.
    pub new_code: String,
    /// The source's own estimate; the rescanner computes the real one.
    pub risk_score_after: u32,
}

/// Self-review verdict for a proposed patch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewVerdict {
    pub safe: bool,
    pub issues: Vec<String>,
    pub recommendation: String,
}

impl Default for ReviewVerdict {
    fn default() -> Self {
        Self {
            safe: true,
            issues: Vec::new(),
            recommendation: "apply".to_string(),
        }
    }
}
