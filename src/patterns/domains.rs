//! Webhook/exfiltration domains and high-risk TLDs for the network detector.

const WEBHOOK_DOMAINS: &[&str] = &[
    "discord.com",
    "discordapp.com",
    "api.telegram.org",
    "hooks.slack.com",
    "webhook.site",
    "requestbin.com",
    "pipedream.com",
    "ngrok.io",
    "ngrok-free.app",
    "beeceptor.com",
    "mockbin.org",
];

const HIGH_RISK_TLDS: &[&str] = &[
    ".xyz", ".top", ".tk", ".ml", ".ga", ".cf", ".gq", ".work", ".click", ".link",
];

/// Exact match or subdomain of a known webhook/exfil domain.
pub fn is_webhook_domain(host: &str) -> bool {
    let host = host.to_ascii_lowercase();
    WEBHOOK_DOMAINS
        .iter()
        .any(|d| host == *d || host.ends_with(&format!(".{d}")))
}

/// Returns the matching high-risk TLD, if any.
pub fn high_risk_tld(host: &str) -> Option<&'static str> {
    let host = host.to_ascii_lowercase();
    HIGH_RISK_TLDS.iter().copied().find(|tld| host.ends_with(tld))
}
