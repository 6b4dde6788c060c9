//! File detector: path-allowlist enforcement for reads and writes.
//!
//! Sensitive-path writes never reach this detector; the dispatcher
//! short-circuits them before dispatch.

use crate::patterns::RiskLevel;
use crate::registry::CapabilitySet;

use super::decision::{tags, Decision, DetectorOutcome, Evidence};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FileOp {
    Read,
    Write,
}

pub(crate) fn analyze_file(path: &str, op: FileOp, caps: &CapabilitySet) -> DetectorOutcome {
    let mut out = DetectorOutcome::default();
    if caps.allows_path(path) {
        return out;
    }

    let verb = match op {
        FileOp::Read => "read",
        FileOp::Write => "write",
    };
    out.lift(RiskLevel::Medium);
    out.tag(tags::PATH_NOT_ALLOWED);
    out.force(Decision::Deny);
    out.block_reason = Some(format!("{verb} of '{path}' is outside the filesystem allowlist"));
    out.evidence.push(
        Evidence::new(
            "capability",
            format!("{verb} of '{path}' is outside the filesystem allowlist"),
        )
        .field("path"),
    );
    out
}
