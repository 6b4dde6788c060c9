//! Web3 detectors and the threat-intel combination path.
//!
//! The pure detector part covers chain allowlists and signature content;
//! the async combination consults the threat intel provider (phishing,
//! address reputation, simulation) with all calls fanned out concurrently
//! and awaited before any grading happens. Intel unavailability degrades to
//! rule-based evaluation, tagged `SIMULATION_UNAVAILABLE`.

use std::sync::LazyLock;

use regex::Regex;

use crate::intel::{AddressReport, PhishingCheck, SimulationRequest, SimulationResult, ThreatIntel};
use crate::patterns::{scan_secrets, RiskLevel};
use crate::registry::{CapabilitySet, TxPolicy};

use super::decision::{tags, Decision, DetectorOutcome, Evidence};

/// `0xffff…` max values or decimal literals of 30+ digits in typed data.
static UNLIMITED_LITERAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"0x[fF]{32,}|\b[0-9]{30,}\b").expect("static web3 pattern must compile")
});

fn chain_gate(chain_id: u64, caps: &CapabilitySet) -> DetectorOutcome {
    let mut out = DetectorOutcome::default();
    let allowed = caps
        .web3
        .as_ref()
        .is_some_and(|web3| web3.allows_chain(chain_id));
    if !allowed {
        out.lift(RiskLevel::High);
        out.tag(tags::CHAIN_NOT_ALLOWED);
        out.force(Decision::Deny);
        out.block_reason = Some(format!("chain {chain_id} is not in the chains allowlist"));
        out.evidence.push(
            Evidence::new(
                "capability",
                format!("chain {chain_id} is not in the chains allowlist"),
            )
            .field("chain_id"),
        );
    }
    out
}

pub(crate) fn analyze_web3_tx(chain_id: u64, caps: &CapabilitySet) -> DetectorOutcome {
    chain_gate(chain_id, caps)
}

pub(crate) fn analyze_web3_sign(
    chain_id: u64,
    message: &str,
    typed_data: Option<&str>,
    caps: &CapabilitySet,
) -> DetectorOutcome {
    let mut out = chain_gate(chain_id, caps);
    if out.forced == Some(Decision::Deny) {
        return out;
    }

    if let Some(typed) = typed_data {
        if typed.to_lowercase().contains("permit") {
            out.tag(tags::PERMIT_SIGNATURE);
            out.lift(RiskLevel::Medium);
            out.force(Decision::Confirm);
            out.evidence.push(
                Evidence::new("pattern", "typed data contains a Permit authorization")
                    .field("typed_data"),
            );
        }
        if UNLIMITED_LITERAL.is_match(typed) {
            out.tag(tags::UNLIMITED_VALUE);
            out.lift(RiskLevel::High);
            out.force(Decision::Confirm);
            out.evidence.push(
                Evidence::new("pattern", "typed data carries an unlimited value")
                    .field("typed_data"),
            );
        }
    }

    if let Some(hit) = scan_secrets(message).first()
        && hit.priority >= 90
    {
        out.tag(tags::SECRET_IN_SIGNATURE);
        out.lift(RiskLevel::Critical);
        out.force(Decision::Deny);
        out.block_reason = Some(format!("signature message contains a {} secret", hit.id));
        out.evidence.push(
            Evidence::new("pattern", format!("critical secret pattern {} in message", hit.id))
                .field("message")
                .matched(hit.matched.clone()),
        );
    }

    out
}

/// Apply the intel-backed combination to a detector outcome. The phishing,
/// address, and simulation calls run concurrently; all are awaited before
/// grading.
#[allow(clippy::too_many_arguments)]
pub(crate) async fn combine_with_intel(
    mut out: DetectorOutcome,
    chain_id: u64,
    origin: Option<&str>,
    target: Option<&str>,
    simulation_request: Option<SimulationRequest>,
    caps: &CapabilitySet,
    intel: &dyn ThreatIntel,
    is_tx: bool,
) -> DetectorOutcome {
    if out.forced == Some(Decision::Deny) {
        return out;
    }

    let (phishing, addresses, simulation) = tokio::join!(
        async {
            match origin {
                Some(origin) => intel.phishing_site(origin).await,
                None => PhishingCheck::default(),
            }
        },
        async {
            match target {
                Some(target) => intel.address_security(chain_id, &[target.to_string()]).await,
                None => AddressReport::default(),
            }
        },
        async {
            match &simulation_request {
                Some(request) if intel.is_configured() => {
                    intel.simulate_transaction(request).await
                }
                Some(_) => SimulationResult::unavailable(),
                None => SimulationResult::default(),
            }
        },
    );

    let degraded = !intel.is_configured()
        || phishing.unavailable
        || addresses.unavailable
        || (simulation_request.is_some() && simulation.unavailable);
    if degraded {
        out.tag(tags::SIMULATION_UNAVAILABLE);
        out.evidence.push(Evidence::new(
            "intel",
            "threat intel unavailable; rule-based evaluation only",
        ));
    }

    if phishing.is_phishing {
        out.lift(RiskLevel::Critical);
        out.tag(tags::PHISHING_ORIGIN);
        out.force(Decision::Deny);
        out.block_reason = Some("origin is a known phishing site".into());
        out.evidence
            .push(Evidence::new("intel", "origin is a known phishing site").field("origin"));
        return out;
    }

    if let Some(target) = target
        && !addresses.unavailable
    {
        let security = addresses.for_address(target);
        if security.is_malicious() {
            out.lift(RiskLevel::Critical);
            out.tag(tags::MALICIOUS_ADDRESS);
            out.force(Decision::Deny);
            out.block_reason = Some(format!("target address {target} is flagged as malicious"));
            out.evidence.push(
                Evidence::new("intel", format!("address {target} has malicious history"))
                    .field("to"),
            );
            return out;
        }
        if security.is_honeypot_related_address {
            out.tag(tags::HONEYPOT_RELATED);
            out.lift(RiskLevel::High);
            out.evidence.push(
                Evidence::new("intel", format!("address {target} is honeypot-related")).field("to"),
            );
        }
    }

    if simulation_request.is_some() && !simulation.unavailable {
        if simulation
            .approval_changes
            .iter()
            .any(|change| change.is_unlimited)
        {
            out.tag(tags::UNLIMITED_APPROVAL);
            out.lift(RiskLevel::High);
            out.force(Decision::Confirm);
            out.evidence.push(Evidence::new(
                "intel",
                "simulation shows an unlimited token approval",
            ));
        }
        for tag in &simulation.risk_tags {
            out.tag(tag);
        }
        if simulation.risk_level >= RiskLevel::High {
            out.lift(simulation.risk_level);
        }
    }

    if is_tx
        && let Some(web3) = &caps.web3
    {
        match web3.tx_policy {
            TxPolicy::Deny => {
                out.force(Decision::Deny);
                out.block_reason = Some("transaction policy is deny".into());
                out.evidence
                    .push(Evidence::new("capability", "transaction policy is deny"));
            }
            TxPolicy::ConfirmHighRisk if out.risk > RiskLevel::Low => {
                out.force(Decision::Confirm);
            }
            _ => {}
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intel::OfflineIntel;
    use crate::registry::Web3Capability;

    fn web3_caps(chains: &[u64], tx_policy: TxPolicy) -> CapabilitySet {
        CapabilitySet {
            web3: Some(Web3Capability {
                chains: chains.to_vec(),
                rpc: Vec::new(),
                tx_policy,
            }),
            ..CapabilitySet::none()
        }
    }

    #[test]
    fn chain_not_allowed_denies_high() {
        let out = analyze_web3_tx(56, &web3_caps(&[1], TxPolicy::Allow));
        assert_eq!(out.forced, Some(Decision::Deny));
        assert_eq!(out.risk, RiskLevel::High);
        assert!(out.tags.iter().any(|t| t == tags::CHAIN_NOT_ALLOWED));
    }

    #[test]
    fn missing_web3_capability_denies_any_chain() {
        let out = analyze_web3_tx(1, &CapabilitySet::none());
        assert_eq!(out.forced, Some(Decision::Deny));
    }

    #[test]
    fn permit_signature_confirms_medium() {
        let out = analyze_web3_sign(
            1,
            "",
            Some(r#"{"primaryType":"Permit","message":{}}"#),
            &web3_caps(&[1], TxPolicy::Allow),
        );
        assert_eq!(out.forced, Some(Decision::Confirm));
        assert_eq!(out.risk, RiskLevel::Medium);
        assert!(out.tags.iter().any(|t| t == tags::PERMIT_SIGNATURE));
    }

    #[test]
    fn unlimited_value_confirms_high() {
        let typed = format!("{{\"value\":\"0x{}\"}}", "f".repeat(64));
        let out = analyze_web3_sign(1, "", Some(&typed), &web3_caps(&[1], TxPolicy::Allow));
        assert_eq!(out.forced, Some(Decision::Confirm));
        assert_eq!(out.risk, RiskLevel::High);
        assert!(out.tags.iter().any(|t| t == tags::UNLIMITED_VALUE));
    }

    #[test]
    fn thirty_digit_literal_is_unlimited() {
        let out = analyze_web3_sign(
            1,
            "",
            Some("{\"amount\":\"115792089237316195423570985008\"}"),
            &web3_caps(&[1], TxPolicy::Allow),
        );
        assert!(out.tags.iter().any(|t| t == tags::UNLIMITED_VALUE));
    }

    #[test]
    fn secret_in_message_denies_critical() {
        let message = format!("sign this: 0x{}", "a".repeat(64));
        let out = analyze_web3_sign(1, &message, None, &web3_caps(&[1], TxPolicy::Allow));
        assert_eq!(out.forced, Some(Decision::Deny));
        assert_eq!(out.risk, RiskLevel::Critical);
        assert!(out.tags.iter().any(|t| t == tags::SECRET_IN_SIGNATURE));
    }

    #[tokio::test]
    async fn offline_intel_tags_simulation_unavailable() {
        let caps = web3_caps(&[1], TxPolicy::Allow);
        let out = analyze_web3_tx(1, &caps);
        let combined = combine_with_intel(
            out,
            1,
            Some("https://dapp.example"),
            Some("0xabc"),
            Some(SimulationRequest {
                chain_id: 1,
                from: "0xa".into(),
                to: "0xabc".into(),
                value: "0".into(),
                data: String::new(),
            }),
            &caps,
            &OfflineIntel,
            true,
        )
        .await;
        assert!(combined.tags.iter().any(|t| t == tags::SIMULATION_UNAVAILABLE));
        assert!(combined.forced.is_none());
        assert_eq!(combined.risk, RiskLevel::Low);
    }

    #[tokio::test]
    async fn tx_policy_deny_overrides() {
        let caps = web3_caps(&[1], TxPolicy::Deny);
        let out = analyze_web3_tx(1, &caps);
        let combined =
            combine_with_intel(out, 1, None, Some("0xabc"), None, &caps, &OfflineIntel, true)
                .await;
        assert_eq!(combined.forced, Some(Decision::Deny));
    }

    #[tokio::test]
    async fn confirm_high_risk_leaves_low_risk_alone() {
        let caps = web3_caps(&[1], TxPolicy::ConfirmHighRisk);
        let out = analyze_web3_tx(1, &caps);
        let combined =
            combine_with_intel(out, 1, None, Some("0xabc"), None, &caps, &OfflineIntel, true)
                .await;
        assert!(combined.forced.is_none());
    }
}
