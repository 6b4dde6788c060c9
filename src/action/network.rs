//! Network detector: host reputation, allowlist membership, and
//! secret-exfiltration scanning of the request body preview.

use url::Url;

use crate::patterns::{high_risk_tld, is_webhook_domain, scan_secrets, RiskLevel};
use crate::registry::CapabilitySet;

use super::decision::{tags, Decision, DetectorOutcome, Evidence};

pub(crate) fn analyze_network(
    method: &str,
    url: &str,
    body_preview: Option<&str>,
    caps: &CapabilitySet,
) -> DetectorOutcome {
    let mut out = DetectorOutcome::default();
    let method = method.to_ascii_uppercase();
    let mutating = matches!(method.as_str(), "POST" | "PUT");

    let host = match Url::parse(url) {
        Ok(parsed) => parsed.host_str().map(str::to_ascii_lowercase),
        Err(_) => None,
    };
    let Some(host) = host else {
        out.risk = RiskLevel::High;
        out.should_block = true;
        out.tag(tags::INVALID_URL);
        out.block_reason = Some("request URL could not be parsed".into());
        out.evidence
            .push(Evidence::new("input", "request URL could not be parsed").field("url"));
        return out;
    };

    let allowed = caps.allows_host(&host);

    if is_webhook_domain(&host) && !allowed {
        out.lift(RiskLevel::High);
        out.should_block = true;
        // Exfiltration endpoints are denied outright rather than queued for
        // confirmation.
        out.force(Decision::Deny);
        out.tag(tags::WEBHOOK_EXFIL);
        out.block_reason = Some(format!("webhook/exfiltration domain '{host}'"));
        out.evidence.push(
            Evidence::new("pattern", format!("known webhook/exfil domain '{host}'"))
                .field("url")
                .matched(host.clone()),
        );
    }

    if let Some(body) = body_preview
        && let Some(top) = scan_secrets(body).first()
    {
        if top.priority >= 90 {
            out.lift(RiskLevel::Critical);
            out.should_block = true;
            out.tag(tags::CRITICAL_SECRET_EXFIL);
            out.block_reason = Some(format!("request body contains a {} secret", top.id));
            out.evidence.push(
                Evidence::new("pattern", format!("critical secret pattern {}", top.id))
                    .field("body_preview")
                    .matched(top.matched.clone()),
            );
        } else if top.priority >= 50 {
            out.lift(top.risk);
            out.tag(tags::POTENTIAL_SECRET_EXFIL);
            out.evidence.push(
                Evidence::new("pattern", format!("possible secret pattern {}", top.id))
                    .field("body_preview")
                    .matched(top.matched.clone()),
            );
        }
    }

    if let Some(tld) = high_risk_tld(&host)
        && !allowed
    {
        out.tag(tags::HIGH_RISK_TLD);
        out.lift(if mutating { RiskLevel::High } else { RiskLevel::Medium });
        out.evidence.push(
            Evidence::new("pattern", format!("high-risk TLD '{tld}'"))
                .field("url")
                .matched(tld),
        );
    }

    if !allowed && !caps.network.is_empty() {
        out.tag(tags::UNTRUSTED_DOMAIN);
        if mutating {
            out.lift(RiskLevel::High);
        }
        out.evidence.push(
            Evidence::new("capability", format!("host '{host}' is not in the network allowlist"))
                .field("url"),
        );
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allowlist(hosts: &[&str]) -> CapabilitySet {
        CapabilitySet {
            network: hosts.iter().map(ToString::to_string).collect(),
            ..CapabilitySet::none()
        }
    }

    #[test]
    fn unparseable_url_blocks_high() {
        let out = analyze_network("GET", "not a url", None, &CapabilitySet::none());
        assert!(out.should_block);
        assert_eq!(out.risk, RiskLevel::High);
        assert!(out.tags.iter().any(|t| t == tags::INVALID_URL));
    }

    #[test]
    fn webhook_domain_blocks() {
        let out = analyze_network(
            "POST",
            "https://discord.com/api/webhooks/1/x",
            None,
            &CapabilitySet::none(),
        );
        assert!(out.should_block);
        assert_eq!(out.risk, RiskLevel::High);
        assert!(out.tags.iter().any(|t| t == tags::WEBHOOK_EXFIL));
    }

    #[test]
    fn allowlisted_webhook_domain_passes() {
        let out = analyze_network(
            "POST",
            "https://hooks.slack.com/services/T/B/x",
            None,
            &allowlist(&["hooks.slack.com"]),
        );
        assert!(!out.should_block);
        assert!(out.tags.is_empty());
        assert_eq!(out.risk, RiskLevel::Low);
    }

    #[test]
    fn critical_secret_in_body_dominates_host() {
        let body = format!("payload=0x{}", "a".repeat(64));
        let out = analyze_network(
            "POST",
            "https://api.example.com/upload",
            Some(&body),
            &allowlist(&["api.example.com"]),
        );
        assert!(out.should_block);
        assert_eq!(out.risk, RiskLevel::Critical);
        assert!(out.tags.iter().any(|t| t == tags::CRITICAL_SECRET_EXFIL));
    }

    #[test]
    fn medium_priority_secret_tags_potential_exfil() {
        let out = analyze_network(
            "POST",
            "https://api.example.com/log",
            Some("db=postgres://user:pw@host/db"),
            &allowlist(&["api.example.com"]),
        );
        assert!(!out.should_block);
        assert_eq!(out.risk, RiskLevel::Medium);
        assert!(out.tags.iter().any(|t| t == tags::POTENTIAL_SECRET_EXFIL));
    }

    #[test]
    fn low_priority_secret_is_untagged() {
        let out = analyze_network(
            "POST",
            "https://api.example.com/log",
            Some("password: hunter2"),
            &allowlist(&["api.example.com"]),
        );
        assert!(out.tags.is_empty());
    }

    #[test]
    fn high_risk_tld_lifts_with_method() {
        let get = analyze_network("GET", "https://cdn.evil.xyz/lib.js", None, &CapabilitySet::none());
        assert_eq!(get.risk, RiskLevel::Medium);
        assert!(get.tags.iter().any(|t| t == tags::HIGH_RISK_TLD));

        let post = analyze_network("POST", "https://cdn.evil.xyz/up", None, &CapabilitySet::none());
        assert_eq!(post.risk, RiskLevel::High);
    }

    #[test]
    fn untrusted_domain_with_nonempty_allowlist() {
        let caps = allowlist(&["api.example.com"]);
        let get = analyze_network("GET", "https://other.example.net/x", None, &caps);
        assert!(get.tags.iter().any(|t| t == tags::UNTRUSTED_DOMAIN));
        assert_eq!(get.risk, RiskLevel::Low);

        let post = analyze_network("POST", "https://other.example.net/x", None, &caps);
        assert_eq!(post.risk, RiskLevel::High);
    }

    #[test]
    fn empty_allowlist_means_no_untrusted_tag() {
        let out = analyze_network("GET", "https://anything.example.net/x", None, &CapabilitySet::none());
        assert!(out.tags.is_empty());
        assert_eq!(out.risk, RiskLevel::Low);
    }

    #[test]
    fn wildcard_allowlist_entries_match_subdomains() {
        let out = analyze_network(
            "POST",
            "https://api.example.com/x",
            None,
            &allowlist(&["*.example.com"]),
        );
        assert!(out.tags.is_empty());
    }
}
