//! Capability records: what an attested skill may do at runtime.
//!
//! Allowlist entries are glob-like: `*` matches within one path segment
//! (never `/`), `**` matches any suffix, and a bare pattern matches exactly
//! or as a path prefix. Named presets are constructors, not stored state.

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Whether a skill may spawn subprocesses at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecPolicy {
    Allow,
    #[default]
    Deny,
}

/// Per-skill policy for Web3 transactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxPolicy {
    Allow,
    #[default]
    ConfirmHighRisk,
    Deny,
}

/// Optional Web3 sub-policy: which chains and RPC endpoints a skill may
/// touch, and how its transactions are gated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Web3Capability {
    #[serde(default)]
    pub chains: Vec<u64>,
    #[serde(default)]
    pub rpc: Vec<String>,
    #[serde(default)]
    pub tx_policy: TxPolicy,
}

impl Web3Capability {
    pub fn allows_chain(&self, chain_id: u64) -> bool {
        self.chains.contains(&chain_id)
    }
}

/// The structured capability record stored per trust record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilitySet {
    #[serde(default)]
    pub network: Vec<String>,
    #[serde(default)]
    pub filesystem: Vec<String>,
    #[serde(default)]
    pub exec: ExecPolicy,
    #[serde(default)]
    pub secrets: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web3: Option<Web3Capability>,
}

impl CapabilitySet {
    /// Deny everything. The lookup default for unknown skills.
    pub fn none() -> Self {
        Self::default()
    }

    /// Filesystem access anywhere, nothing else.
    pub fn read_only() -> Self {
        Self {
            filesystem: vec!["**".into()],
            ..Self::default()
        }
    }

    /// Market-data hosts plus mainnet/L2 trading with high-risk
    /// confirmation.
    pub fn trading_bot() -> Self {
        Self {
            network: vec!["api.binance.com".into(), "*.coingecko.com".into()],
            filesystem: vec!["data/**".into()],
            exec: ExecPolicy::Deny,
            secrets: vec![],
            web3: Some(Web3Capability {
                chains: vec![1, 42161],
                rpc: vec!["*.alchemy.com".into(), "*.infura.io".into()],
                tx_policy: TxPolicy::ConfirmHighRisk,
            }),
        }
    }

    /// Broad DeFi posture: multiple chains, common RPC providers.
    pub fn defi() -> Self {
        Self {
            network: vec!["*.defillama.com".into(), "*.1inch.io".into()],
            filesystem: vec!["data/**".into()],
            exec: ExecPolicy::Deny,
            secrets: vec![],
            web3: Some(Web3Capability {
                chains: vec![1, 10, 137, 8453, 42161],
                rpc: vec!["*.alchemy.com".into(), "*.infura.io".into(), "*.llamarpc.com".into()],
                tx_policy: TxPolicy::ConfirmHighRisk,
            }),
        }
    }

    pub fn allows_host(&self, host: &str) -> bool {
        self.network.iter().any(|p| matches_pattern(p, host))
    }

    pub fn allows_path(&self, path: &str) -> bool {
        self.filesystem.iter().any(|p| matches_pattern(p, path))
    }

    pub fn allows_secret(&self, name: &str) -> bool {
        self.secrets.iter().any(|p| matches_pattern(p, name))
    }

    /// Boolean view over the structured record, computed on demand for the
    /// untrusted-skill overlay. Reads and writes share the filesystem
    /// allowlist, so both booleans derive from it.
    pub fn view(&self) -> CapabilityView {
        CapabilityView {
            can_exec: self.exec == ExecPolicy::Allow,
            can_network: !self.network.is_empty(),
            can_read: !self.filesystem.is_empty(),
            can_write: !self.filesystem.is_empty(),
            can_web3: self.web3.is_some(),
        }
    }
}

/// Derived boolean capability view. Never stored; either computed from a
/// [`CapabilitySet`] or synthesised for unattested skills.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapabilityView {
    pub can_exec: bool,
    pub can_network: bool,
    pub can_read: bool,
    pub can_write: bool,
    pub can_web3: bool,
}

impl CapabilityView {
    /// The synthetic view for skills with no active trust record: read
    /// only, everything else denied.
    pub fn untrusted() -> Self {
        Self {
            can_exec: false,
            can_network: false,
            can_read: true,
            can_write: false,
            can_web3: false,
        }
    }
}

/// Glob-like matching: `**` recursive, `*` within a segment, bare patterns
/// exact or path-prefix.
pub fn matches_pattern(pattern: &str, value: &str) -> bool {
    if pattern == "**" {
        return true;
    }
    if !pattern.contains('*') {
        return value == pattern || value.starts_with(&format!("{pattern}/"));
    }
    let Ok(re) = Regex::new(&glob_to_regex(pattern)) else {
        return false;
    };
    re.is_match(value)
}

fn glob_to_regex(pattern: &str) -> String {
    let mut out = String::from("^");
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '*' {
            if chars.peek() == Some(&'*') {
                chars.next();
                out.push_str(".*");
            } else {
                out.push_str("[^/]*");
            }
        } else {
            out.push_str(&regex::escape(&c.to_string()));
        }
    }
    out.push('$');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_pattern_exact_or_prefix() {
        assert!(matches_pattern("data", "data"));
        assert!(matches_pattern("data", "data/cache.json"));
        assert!(!matches_pattern("data", "database"));
    }

    #[test]
    fn single_star_stays_in_segment() {
        assert!(matches_pattern("data/*.json", "data/cache.json"));
        assert!(!matches_pattern("data/*.json", "data/sub/cache.json"));
        assert!(matches_pattern("*.example.com", "api.example.com"));
        assert!(!matches_pattern("*.example.com", "example.com"));
    }

    #[test]
    fn double_star_matches_any_suffix() {
        assert!(matches_pattern("**", "anything/at/all"));
        assert!(matches_pattern("data/**", "data/deep/nested/file"));
        assert!(!matches_pattern("data/**", "other/file"));
    }

    #[test]
    fn none_preset_denies_everything() {
        let caps = CapabilitySet::none();
        assert!(!caps.allows_host("example.com"));
        assert!(!caps.allows_path("README.md"));
        assert!(!caps.allows_secret("API_KEY"));
        assert_eq!(caps.exec, ExecPolicy::Deny);
        assert!(caps.web3.is_none());
    }

    #[test]
    fn read_only_preset_grants_paths_only() {
        let caps = CapabilitySet::read_only();
        assert!(caps.allows_path("src/main.rs"));
        assert!(!caps.allows_host("example.com"));
        assert_eq!(caps.exec, ExecPolicy::Deny);
    }

    #[test]
    fn trading_bot_preset_chains() {
        let caps = CapabilitySet::trading_bot();
        let web3 = caps.web3.as_ref().unwrap();
        assert!(web3.allows_chain(1));
        assert!(web3.allows_chain(42161));
        assert!(!web3.allows_chain(56));
        assert_eq!(web3.tx_policy, TxPolicy::ConfirmHighRisk);
    }

    #[test]
    fn view_derives_from_structured_record() {
        let view = CapabilitySet::none().view();
        assert!(!view.can_exec && !view.can_network && !view.can_read && !view.can_write);

        let view = CapabilitySet::trading_bot().view();
        assert!(view.can_network && view.can_web3 && !view.can_exec);
    }

    #[test]
    fn untrusted_view_is_read_only() {
        let view = CapabilityView::untrusted();
        assert!(view.can_read);
        assert!(!view.can_exec && !view.can_network && !view.can_write && !view.can_web3);
    }

    #[test]
    fn serde_roundtrip_skips_absent_web3() {
        let caps = CapabilitySet::none();
        let json = serde_json::to_string(&caps).unwrap();
        assert!(!json.contains("web3"));
        let back: CapabilitySet = serde_json::from_str(&json).unwrap();
        assert_eq!(back, caps);
    }
}
