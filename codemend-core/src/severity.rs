//! Severity model — one enum, fixed weights, string round-trip.
//!
//! Severity is normalized to this enum at construction time; nothing in the
//! workspace compares severities as strings.

use serde::{Deserialize, Serialize};

/// Violation severity with fixed scoring weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// Fixed base weights: critical=10, high=7, medium=4, low=1.
pub const SEVERITY_WEIGHTS: [(Severity, u32); 4] = [
    (Severity::Critical, 10),
    (Severity::High, 7),
    (Severity::Medium, 4),
    (Severity::Low, 1),
];

impl Severity {
    /// Base weight used by the risk scorer.
    pub fn weight(self) -> u32 {
        match self {
            Self::Critical => 10,
            Self::High => 7,
            Self::Medium => 4,
            Self::Low => 1,
        }
    }

    /// Severity name as a string.
    pub fn name(self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }

    /// Parse from string.
    pub fn parse_str(s: &str) -> Option<Self> {
        match s {
            "critical" => Some(Self::Critical),
            "high" => Some(Self::High),
            "medium" => Some(Self::Medium),
            "low" => Some(Self::Low),
            _ => None,
        }
    }

    /// True for the two severities that gate rescan acceptance.
    pub fn is_critical_or_high(self) -> bool {
        matches!(self, Self::Critical | Self::High)
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weights_match_table() {
        for (sev, w) in SEVERITY_WEIGHTS {
            assert_eq!(sev.weight(), w);
        }
    }

    #[test]
    fn string_round_trip() {
        for sev in [Severity::Critical, Severity::High, Severity::Medium, Severity::Low] {
            assert_eq!(Severity::parse_str(sev.name()), Some(sev));
        }
        assert_eq!(Severity::parse_str("severe"), None);
    }
}
