//! Protection-level arbitrator: maps scanner decisions to the hook verdict
//! alphabet under the user-chosen posture.
//!
//! The mapping is monotone across levels: for any input, the strict verdict
//! is never more permissive than balanced, and balanced never more
//! permissive than permissive (under deny < ask < allow).

use serde::{Deserialize, Serialize};

use crate::action::{tags, Decision, PolicyDecision};
use crate::patterns::RiskLevel;

/// User-chosen protection posture, stored in `config.json`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProtectionLevel {
    Strict,
    #[default]
    Balanced,
    Permissive,
}

impl ProtectionLevel {
    pub fn label(self) -> &'static str {
        match self {
            Self::Strict => "strict",
            Self::Balanced => "balanced",
            Self::Permissive => "permissive",
        }
    }
}

impl std::fmt::Display for ProtectionLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// The hook output alphabet. Ordered: deny < ask < allow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Deny,
    Ask,
    Allow,
}

impl Verdict {
    pub fn label(self) -> &'static str {
        match self {
            Self::Deny => "deny",
            Self::Ask => "ask",
            Self::Allow => "allow",
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// The `(decision, risk, level)` table.
pub fn arbitrate(decision: Decision, risk: RiskLevel, level: ProtectionLevel) -> Verdict {
    match (level, decision) {
        (ProtectionLevel::Strict, Decision::Deny | Decision::Confirm) => Verdict::Deny,
        (ProtectionLevel::Strict, Decision::Allow) => Verdict::Allow,

        (ProtectionLevel::Balanced, Decision::Deny) => Verdict::Deny,
        (ProtectionLevel::Balanced, Decision::Confirm) => Verdict::Ask,
        (ProtectionLevel::Balanced, Decision::Allow) => Verdict::Allow,

        (ProtectionLevel::Permissive, Decision::Deny) => {
            if risk == RiskLevel::Critical {
                Verdict::Deny
            } else {
                Verdict::Ask
            }
        }
        (ProtectionLevel::Permissive, Decision::Confirm) => {
            if risk >= RiskLevel::High {
                Verdict::Ask
            } else {
                Verdict::Allow
            }
        }
        (ProtectionLevel::Permissive, Decision::Allow) => Verdict::Allow,
    }
}

/// Arbitrate a full policy decision, applying the sensitive-path override:
/// sensitive-path writes stay denied under strict and balanced, and under
/// permissive they downgrade to ask only when no initiating skill is
/// attributed to the write.
pub fn arbitrate_decision(
    decision: &PolicyDecision,
    level: ProtectionLevel,
    initiating_skill: Option<&str>,
) -> Verdict {
    if decision.has_tag(tags::SENSITIVE_PATH) {
        return match level {
            ProtectionLevel::Strict | ProtectionLevel::Balanced => Verdict::Deny,
            ProtectionLevel::Permissive => {
                if initiating_skill.is_none() {
                    Verdict::Ask
                } else {
                    Verdict::Deny
                }
            }
        };
    }
    arbitrate(decision.decision, decision.risk_level, level)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LEVELS: [ProtectionLevel; 3] = [
        ProtectionLevel::Strict,
        ProtectionLevel::Balanced,
        ProtectionLevel::Permissive,
    ];
    const DECISIONS: [Decision; 3] = [Decision::Allow, Decision::Deny, Decision::Confirm];
    const RISKS: [RiskLevel; 4] = [
        RiskLevel::Low,
        RiskLevel::Medium,
        RiskLevel::High,
        RiskLevel::Critical,
    ];

    #[test]
    fn strict_collapses_confirm_to_deny() {
        for risk in RISKS {
            assert_eq!(
                arbitrate(Decision::Confirm, risk, ProtectionLevel::Strict),
                Verdict::Deny
            );
        }
    }

    #[test]
    fn balanced_maps_confirm_to_ask() {
        for risk in RISKS {
            assert_eq!(
                arbitrate(Decision::Confirm, risk, ProtectionLevel::Balanced),
                Verdict::Ask
            );
        }
    }

    #[test]
    fn permissive_table() {
        assert_eq!(
            arbitrate(Decision::Deny, RiskLevel::Critical, ProtectionLevel::Permissive),
            Verdict::Deny
        );
        assert_eq!(
            arbitrate(Decision::Deny, RiskLevel::High, ProtectionLevel::Permissive),
            Verdict::Ask
        );
        assert_eq!(
            arbitrate(Decision::Confirm, RiskLevel::High, ProtectionLevel::Permissive),
            Verdict::Ask
        );
        assert_eq!(
            arbitrate(Decision::Confirm, RiskLevel::Medium, ProtectionLevel::Permissive),
            Verdict::Allow
        );
    }

    #[test]
    fn allow_passes_everywhere() {
        for level in LEVELS {
            for risk in RISKS {
                assert_eq!(arbitrate(Decision::Allow, risk, level), Verdict::Allow);
            }
        }
    }

    #[test]
    fn levels_are_monotone() {
        for decision in DECISIONS {
            for risk in RISKS {
                let strict = arbitrate(decision, risk, ProtectionLevel::Strict);
                let balanced = arbitrate(decision, risk, ProtectionLevel::Balanced);
                let permissive = arbitrate(decision, risk, ProtectionLevel::Permissive);
                assert!(strict <= balanced, "{decision:?}/{risk:?}");
                assert!(balanced <= permissive, "{decision:?}/{risk:?}");
            }
        }
    }

    #[test]
    fn sensitive_path_override() {
        let decision = PolicyDecision {
            decision: Decision::Deny,
            risk_level: RiskLevel::Critical,
            risk_tags: vec![tags::SENSITIVE_PATH.to_string()],
            evidence: Vec::new(),
            explanation: "denied: write to sensitive path".into(),
            effective_capabilities: None,
        };

        assert_eq!(
            arbitrate_decision(&decision, ProtectionLevel::Strict, None),
            Verdict::Deny
        );
        assert_eq!(
            arbitrate_decision(&decision, ProtectionLevel::Balanced, None),
            Verdict::Deny
        );
        assert_eq!(
            arbitrate_decision(&decision, ProtectionLevel::Permissive, None),
            Verdict::Ask
        );
        assert_eq!(
            arbitrate_decision(&decision, ProtectionLevel::Permissive, Some("pdf-helper")),
            Verdict::Deny
        );
    }

    #[test]
    fn verdict_ordering() {
        assert!(Verdict::Deny < Verdict::Ask);
        assert!(Verdict::Ask < Verdict::Allow);
    }

    #[test]
    fn level_serde_default_is_balanced() {
        assert_eq!(ProtectionLevel::default(), ProtectionLevel::Balanced);
        let back: ProtectionLevel = serde_json::from_str("\"strict\"").unwrap();
        assert_eq!(back, ProtectionLevel::Strict);
    }
}
