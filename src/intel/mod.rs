//! Threat intelligence: phishing checks, address reputation, and
//! transaction simulation for the Web3 risk path.
//!
//! The provider is modelled as a trait so the action scanner never knows
//! whether it is talking to GoPlus or running offline. Unavailability is a
//! first-class result, not an error: every call returns a neutral value
//! with `unavailable = true` when credentials are missing or transport
//! fails, and the scanner degrades to rule-based decisioning.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::patterns::RiskLevel;

mod goplus;

pub use goplus::GoPlusClient;

/// Result of the phishing-site endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhishingCheck {
    pub is_phishing: bool,
    pub unavailable: bool,
}

impl PhishingCheck {
    pub fn unavailable() -> Self {
        Self {
            is_phishing: false,
            unavailable: true,
        }
    }
}

/// Reputation flags for one address.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressSecurity {
    pub is_blacklisted: bool,
    pub is_phishing_activities: bool,
    pub is_stealing_attack: bool,
    pub is_honeypot_related_address: bool,
}

impl AddressSecurity {
    /// Blacklist, phishing, or stealing history: the address is treated as
    /// malicious outright. Honeypot relation is graded separately.
    pub fn is_malicious(&self) -> bool {
        self.is_blacklisted || self.is_phishing_activities || self.is_stealing_attack
    }
}

/// Result of the address-security endpoint for a batch of addresses.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressReport {
    pub addresses: HashMap<String, AddressSecurity>,
    pub unavailable: bool,
}

impl AddressReport {
    pub fn unavailable() -> Self {
        Self {
            addresses: HashMap::new(),
            unavailable: true,
        }
    }

    pub fn for_address(&self, address: &str) -> AddressSecurity {
        self.addresses
            .get(&address.to_ascii_lowercase())
            .copied()
            .unwrap_or_default()
    }
}

/// Transaction to simulate.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationRequest {
    pub chain_id: u64,
    pub from: String,
    pub to: String,
    pub value: String,
    pub data: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceChange {
    pub asset: String,
    pub amount: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalChange {
    pub token: String,
    pub spender: String,
    pub amount: String,
    pub is_unlimited: bool,
}

/// Result of simulating a transaction against provider infrastructure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub success: bool,
    #[serde(default)]
    pub balance_changes: Vec<BalanceChange>,
    #[serde(default)]
    pub approval_changes: Vec<ApprovalChange>,
    #[serde(default)]
    pub risk_tags: Vec<String>,
    #[serde(default)]
    pub risk_level: RiskLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default)]
    pub unavailable: bool,
}

impl SimulationResult {
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }
}

/// The provider seam. Implementations must never raise: degraded results
/// carry `unavailable = true` instead.
#[async_trait]
pub trait ThreatIntel: Send + Sync {
    /// Both credentials present and the client able to make calls.
    fn is_configured(&self) -> bool;

    async fn phishing_site(&self, url: &str) -> PhishingCheck;

    async fn address_security(&self, chain_id: u64, addresses: &[String]) -> AddressReport;

    async fn simulate_transaction(&self, request: &SimulationRequest) -> SimulationResult;
}

/// The degraded provider: every call is unavailable. Used when credentials
/// are absent and by tests exercising the rule-based fallback.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineIntel;

#[async_trait]
impl ThreatIntel for OfflineIntel {
    fn is_configured(&self) -> bool {
        false
    }

    async fn phishing_site(&self, _url: &str) -> PhishingCheck {
        PhishingCheck::unavailable()
    }

    async fn address_security(&self, _chain_id: u64, _addresses: &[String]) -> AddressReport {
        AddressReport::unavailable()
    }

    async fn simulate_transaction(&self, _request: &SimulationRequest) -> SimulationResult {
        SimulationResult::unavailable()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn offline_intel_is_always_unavailable() {
        let intel = OfflineIntel;
        assert!(!intel.is_configured());
        assert!(intel.phishing_site("https://x.dev").await.unavailable);
        assert!(intel.address_security(1, &["0xabc".into()]).await.unavailable);
        let sim = intel
            .simulate_transaction(&SimulationRequest {
                chain_id: 1,
                from: "0xa".into(),
                to: "0xb".into(),
                value: "0".into(),
                data: String::new(),
            })
            .await;
        assert!(sim.unavailable);
        assert!(!sim.success);
    }

    #[test]
    fn address_malice_flags() {
        let mut sec = AddressSecurity::default();
        assert!(!sec.is_malicious());
        sec.is_honeypot_related_address = true;
        assert!(!sec.is_malicious(), "honeypot relation alone is not malice");
        sec.is_stealing_attack = true;
        assert!(sec.is_malicious());
    }

    #[test]
    fn address_report_lookup_is_case_insensitive() {
        let mut report = AddressReport::default();
        report.addresses.insert(
            "0xabcdef".into(),
            AddressSecurity {
                is_blacklisted: true,
                ..AddressSecurity::default()
            },
        );
        assert!(report.for_address("0xABCDEF").is_blacklisted);
        assert!(!report.for_address("0x999999").is_blacklisted);
    }
}
