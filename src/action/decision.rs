//! Policy decisions, evidence, and the detector outcome carried between
//! the per-type detectors and the dispatcher.

use serde::{Deserialize, Serialize};

use crate::patterns::RiskLevel;
use crate::registry::CapabilitySet;

/// The scanner verdict. `Confirm` is the arbitrator's input signalling
/// "ask the user if interactive".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Allow,
    Deny,
    Confirm,
}

impl Decision {
    pub fn label(self) -> &'static str {
        match self {
            Self::Allow => "allow",
            Self::Deny => "deny",
            Self::Confirm => "confirm",
        }
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Machine-readable identifiers for detector findings.
pub mod tags {
    pub const DANGEROUS_COMMAND: &str = "DANGEROUS_COMMAND";
    pub const SENSITIVE_DATA_ACCESS: &str = "SENSITIVE_DATA_ACCESS";
    pub const SYSTEM_COMMAND: &str = "SYSTEM_COMMAND";
    pub const NETWORK_COMMAND: &str = "NETWORK_COMMAND";
    pub const SHELL_INJECTION_RISK: &str = "SHELL_INJECTION_RISK";
    pub const SENSITIVE_ENV_VAR: &str = "SENSITIVE_ENV_VAR";

    pub const INVALID_URL: &str = "INVALID_URL";
    pub const WEBHOOK_EXFIL: &str = "WEBHOOK_EXFIL";
    pub const CRITICAL_SECRET_EXFIL: &str = "CRITICAL_SECRET_EXFIL";
    pub const POTENTIAL_SECRET_EXFIL: &str = "POTENTIAL_SECRET_EXFIL";
    pub const HIGH_RISK_TLD: &str = "HIGH_RISK_TLD";
    pub const UNTRUSTED_DOMAIN: &str = "UNTRUSTED_DOMAIN";

    pub const PATH_NOT_ALLOWED: &str = "PATH_NOT_ALLOWED";
    pub const SENSITIVE_PATH: &str = "SENSITIVE_PATH";
    pub const SECRET_NOT_ALLOWED: &str = "SECRET_NOT_ALLOWED";

    pub const CHAIN_NOT_ALLOWED: &str = "CHAIN_NOT_ALLOWED";
    pub const PERMIT_SIGNATURE: &str = "PERMIT_SIGNATURE";
    pub const UNLIMITED_VALUE: &str = "UNLIMITED_VALUE";
    pub const SECRET_IN_SIGNATURE: &str = "SECRET_IN_SIGNATURE";
    pub const PHISHING_ORIGIN: &str = "PHISHING_ORIGIN";
    pub const MALICIOUS_ADDRESS: &str = "MALICIOUS_ADDRESS";
    pub const HONEYPOT_RELATED: &str = "HONEYPOT_RELATED";
    pub const UNLIMITED_APPROVAL: &str = "UNLIMITED_APPROVAL";
    pub const SIMULATION_UNAVAILABLE: &str = "SIMULATION_UNAVAILABLE";
    pub const USER_NOT_PRESENT: &str = "USER_NOT_PRESENT";

    pub const UNTRUSTED_SKILL: &str = "UNTRUSTED_SKILL";
    pub const CAPABILITY_EXCEEDED: &str = "CAPABILITY_EXCEEDED";
    pub const INVALID_INPUT: &str = "INVALID_INPUT";
    pub const ENGINE_ERROR: &str = "ENGINE_ERROR";
}

/// One piece of supporting evidence for a decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evidence {
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched: Option<String>,
    pub description: String,
}

impl Evidence {
    pub fn new(kind: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            field: None,
            matched: None,
            description: description.into(),
        }
    }

    pub fn field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn matched(mut self, matched: impl Into<String>) -> Self {
        self.matched = Some(matched.into());
        self
    }
}

/// The action scanner output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyDecision {
    pub decision: Decision,
    pub risk_level: RiskLevel,
    pub risk_tags: Vec<String>,
    pub evidence: Vec<Evidence>,
    pub explanation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effective_capabilities: Option<CapabilitySet>,
}

impl PolicyDecision {
    /// A plain allow. Allow carries no user-visible output.
    pub fn allow() -> Self {
        Self {
            decision: Decision::Allow,
            risk_level: RiskLevel::Low,
            risk_tags: Vec::new(),
            evidence: Vec::new(),
            explanation: String::new(),
            effective_capabilities: None,
        }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.risk_tags.iter().any(|t| t == tag)
    }
}

/// Format the user-visible explanation: decision driver, risk tags in
/// square brackets, initiating skill when known.
pub(crate) fn build_explanation(
    driver: &str,
    risk_tags: &[String],
    initiating_skill: Option<&str>,
) -> String {
    let mut out = driver.to_string();
    if !risk_tags.is_empty() {
        out.push_str(&format!(" [{}]", risk_tags.join(", ")));
    }
    if let Some(skill) = initiating_skill {
        out.push_str(&format!(" (initiating skill: {skill})"));
    }
    out
}

/// What a detector reports back to the dispatcher. Detectors are pure
/// functions of input + capabilities; the dispatcher combines outcomes into
/// the final decision.
#[derive(Debug, Clone, Default)]
pub(crate) struct DetectorOutcome {
    pub risk: RiskLevel,
    pub tags: Vec<String>,
    pub evidence: Vec<Evidence>,
    pub should_block: bool,
    pub block_reason: Option<String>,
    /// File/secret/web3 detectors force a decision outright instead of
    /// going through the block/level combinator.
    pub forced: Option<Decision>,
}

impl DetectorOutcome {
    pub fn lift(&mut self, level: RiskLevel) {
        self.risk = self.risk.max(level);
    }

    pub fn tag(&mut self, tag: &str) {
        if !self.tags.iter().any(|t| t == tag) {
            self.tags.push(tag.to_string());
        }
    }

    /// Force a decision, never weakening an earlier deny.
    pub fn force(&mut self, decision: Decision) {
        self.forced = match (self.forced, decision) {
            (Some(Decision::Deny), _) | (_, Decision::Deny) => Some(Decision::Deny),
            (_, d) => Some(d),
        };
    }
}
