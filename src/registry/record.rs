//! Trust record types and record-key derivation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::capability::CapabilitySet;

/// Unique identity of one skill/plugin version. Two identities with
/// different artifact hashes are distinct even under the same
/// `source + version_ref`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillIdentity {
    pub id: String,
    pub source: String,
    pub version_ref: String,
    pub artifact_hash: String,
}

impl SkillIdentity {
    pub fn record_key(&self) -> String {
        derive_record_key(self)
    }
}

/// Stable short key: `sha256(source ":" version_ref ":" artifact_hash)`
/// truncated to 16 hex chars.
pub fn derive_record_key(skill: &SkillIdentity) -> String {
    let mut hasher = Sha256::new();
    hasher.update(skill.source.as_bytes());
    hasher.update(b":");
    hasher.update(skill.version_ref.as_bytes());
    hasher.update(b":");
    hasher.update(skill.artifact_hash.as_bytes());
    let digest = hasher.finalize();
    hex::encode(digest)[..16].to_string()
}

/// Trust level assigned to a skill. Higher levels grant broader runtime
/// permissions; ordering matters for the attest confirmation rule.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum TrustLevel {
    #[default]
    Untrusted,
    Restricted,
    Trusted,
}

impl TrustLevel {
    pub fn label(self) -> &'static str {
        match self {
            Self::Untrusted => "untrusted",
            Self::Restricted => "restricted",
            Self::Trusted => "trusted",
        }
    }
}

impl std::fmt::Display for TrustLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    Active,
    Revoked,
}

/// Who reviewed the skill and what they found. Attached at attest time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewed_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewed_at: Option<DateTime<Utc>>,
}

/// One attested skill version. Records are never destroyed; revocation and
/// expiry only change how lookups interpret them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustRecord {
    pub record_key: String,
    pub skill: SkillIdentity,
    pub trust_level: TrustLevel,
    pub capabilities: CapabilitySet,
    #[serde(default)]
    pub review: ReviewMetadata,
    pub status: RecordStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revoked_reason: Option<String>,
}

impl TrustRecord {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }

    /// Active, unexpired records carry their stored trust; everything else
    /// is treated as untrusted on lookup.
    pub fn is_effective(&self, now: DateTime<Utc>) -> bool {
        self.status == RecordStatus::Active && !self.is_expired(now)
    }
}
