//! Secret-access detector: allowlist membership for named secrets.

use crate::patterns::RiskLevel;
use crate::registry::CapabilitySet;

use super::decision::{tags, Decision, DetectorOutcome, Evidence};

pub(crate) fn analyze_secret(
    secret_name: &str,
    access_type: &str,
    caps: &CapabilitySet,
) -> DetectorOutcome {
    let mut out = DetectorOutcome::default();
    if caps.allows_secret(secret_name) {
        return out;
    }

    out.lift(RiskLevel::High);
    out.tag(tags::SECRET_NOT_ALLOWED);
    out.force(Decision::Deny);
    out.block_reason = Some(format!(
        "{access_type} access to secret '{secret_name}' is not in the secrets allowlist"
    ));
    out.evidence.push(
        Evidence::new(
            "capability",
            format!("secret '{secret_name}' is not in the secrets allowlist"),
        )
        .field("secret_name"),
    );
    out
}
