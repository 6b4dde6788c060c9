//! Exec detector: classifies a full command line.
//!
//! Order matters: dangerous patterns short-circuit to a critical block, the
//! safe-command allowlist short-circuits to a clean pass (even when exec is
//! denied by capabilities), and only then do the audit tags accumulate.

use std::collections::HashMap;

use crate::patterns::{
    dangerous_substring, has_shell_metacharacters, is_fork_bomb, matches_network_prefix,
    matches_safe_prefix, matches_system_prefix, sensitive_command_hit, RiskLevel,
    SENSITIVE_ENV_KEYS,
};
use crate::registry::{CapabilitySet, ExecPolicy};

use super::decision::{tags, DetectorOutcome, Evidence};

pub(crate) fn analyze_exec(
    command: &str,
    args: &[String],
    env: &HashMap<String, String>,
    caps: &CapabilitySet,
) -> DetectorOutcome {
    let full = if args.is_empty() {
        command.trim().to_string()
    } else {
        format!("{} {}", command.trim(), args.join(" "))
    };
    let lower = full.to_lowercase();
    let mut out = DetectorOutcome::default();

    // Destructive patterns dominate everything, including trust level.
    if is_fork_bomb(&full) {
        out.risk = RiskLevel::Critical;
        out.should_block = true;
        out.tag(tags::DANGEROUS_COMMAND);
        out.block_reason = Some("fork bomb pattern".into());
        out.evidence.push(
            Evidence::new("pattern", "command matches the fork-bomb pattern")
                .field("command"),
        );
        return out;
    }
    if let Some(hit) = dangerous_substring(&lower) {
        out.risk = RiskLevel::Critical;
        out.should_block = true;
        out.tag(tags::DANGEROUS_COMMAND);
        out.block_reason = Some(format!("destructive command pattern '{hit}'"));
        out.evidence.push(
            Evidence::new("pattern", format!("destructive command pattern '{hit}'"))
                .field("command")
                .matched(hit),
        );
        return out;
    }

    // Safe-command allowlist: plain read/build commands pass without
    // consulting capabilities.
    if !has_shell_metacharacters(&full)
        && sensitive_command_hit(&full).is_none()
        && matches_safe_prefix(&full)
    {
        return out;
    }

    if let Some(hit) = sensitive_command_hit(&full) {
        out.tag(tags::SENSITIVE_DATA_ACCESS);
        out.lift(RiskLevel::High);
        out.evidence.push(
            Evidence::new("pattern", format!("reads sensitive data via '{hit}'"))
                .field("command")
                .matched(hit),
        );
    }
    if let Some(hit) = matches_system_prefix(&full) {
        out.tag(tags::SYSTEM_COMMAND);
        out.lift(RiskLevel::Medium);
        out.evidence
            .push(Evidence::new("pattern", format!("system command '{hit}'")).field("command"));
    }
    if let Some(hit) = matches_network_prefix(&full) {
        out.tag(tags::NETWORK_COMMAND);
        out.lift(RiskLevel::Medium);
        out.evidence
            .push(Evidence::new("pattern", format!("network command '{hit}'")).field("command"));
    }
    if has_shell_metacharacters(&full) {
        out.tag(tags::SHELL_INJECTION_RISK);
        out.lift(RiskLevel::Medium);
        out.evidence.push(
            Evidence::new("pattern", "shell metacharacters allow command injection")
                .field("command"),
        );
    }
    let sensitive_env: Vec<&String> = env
        .keys()
        .filter(|key| {
            let upper = key.to_uppercase();
            SENSITIVE_ENV_KEYS.iter().any(|fragment| upper.contains(fragment))
        })
        .collect();
    if !sensitive_env.is_empty() {
        out.tag(tags::SENSITIVE_ENV_VAR);
        for key in sensitive_env {
            out.evidence.push(
                Evidence::new("input", format!("credential-like env var '{key}'")).field("env"),
            );
        }
    }

    // Capability gate last: risk level stays as computed so the arbitrator
    // can still distinguish a capability denial from a critical pattern.
    if caps.exec == ExecPolicy::Deny && !out.should_block {
        out.should_block = true;
        out.block_reason = Some("Command execution not allowed".into());
        out.evidence
            .push(Evidence::new("capability", "exec capability is denied"));
    }

    out
}
