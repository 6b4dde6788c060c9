//! Frozen pattern catalog consumed by the action detectors and the static
//! scanner.
//!
//! Five families:
//! - Secret patterns with fixed priorities (shared by the network detector
//!   and the static scanner; single source of truth)
//! - Command tables: dangerous substrings, fork-bomb, safe/sensitive/system/
//!   network prefixes
//! - Sensitive filesystem paths (the write blocklist)
//! - Webhook/exfil domains and high-risk TLDs
//! - The static scan rule table

use serde::{Deserialize, Serialize};

mod commands;
mod domains;
mod paths;
mod rules;
mod secrets;

pub use commands::{
    dangerous_substring, has_shell_metacharacters, is_fork_bomb, matches_network_prefix,
    matches_safe_prefix, matches_system_prefix, sensitive_command_hit, SENSITIVE_ENV_KEYS,
};
pub use domains::{high_risk_tld, is_webhook_domain};
pub use paths::sensitive_path_hit;
pub use rules::{
    is_excluded_file, RuleCategory, ScanRule, EXCLUDED_DIRS, EXCLUDED_FILES, SCAN_EXTENSIONS,
    SCAN_RULES,
};
pub use secrets::{priority_risk, scan_secrets, truncate_match, SecretHit, SecretPattern, SECRET_PATTERNS};

/// Risk grading shared by scan findings and policy decisions.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    #[default]
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn label(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::RiskLevel;

    #[test]
    fn risk_ordering() {
        assert!(RiskLevel::Low < RiskLevel::Medium);
        assert!(RiskLevel::Medium < RiskLevel::High);
        assert!(RiskLevel::High < RiskLevel::Critical);
    }

    #[test]
    fn risk_serde_snake_case() {
        let json = serde_json::to_string(&RiskLevel::Critical).unwrap();
        assert_eq!(json, "\"critical\"");
        let back: RiskLevel = serde_json::from_str("\"medium\"").unwrap();
        assert_eq!(back, RiskLevel::Medium);
    }

    #[test]
    fn label_matches_display() {
        for level in [
            RiskLevel::Low,
            RiskLevel::Medium,
            RiskLevel::High,
            RiskLevel::Critical,
        ] {
            assert_eq!(level.label(), level.to_string());
        }
    }
}
