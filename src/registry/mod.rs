//! Trust registry: identity-keyed trust and capability records.
//!
//! The registry file is the only shared mutable resource in the engine.
//! Writes are serialized behind an exclusive lock and persisted through a
//! temp-file rename; lookups take shared reads and never fail: an absent,
//! revoked, or expired record resolves to untrusted with the `none`
//! capability preset.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::RegistryError;

mod capability;
mod hashing;
mod record;

pub use capability::{
    matches_pattern, CapabilitySet, CapabilityView, ExecPolicy, TxPolicy, Web3Capability,
};
pub use hashing::calculate_artifact_hash;
pub use record::{
    derive_record_key, RecordStatus, ReviewMetadata, SkillIdentity, TrustLevel, TrustRecord,
};

const SCHEMA_VERSION: u32 = 1;

/// The on-disk document: `<state_home>/registry.json`.
#[derive(Debug, Serialize, Deserialize)]
struct RegistryFile {
    version: u32,
    updated_at: DateTime<Utc>,
    #[serde(default)]
    records: Vec<TrustRecord>,
}

impl RegistryFile {
    fn empty() -> Self {
        Self {
            version: SCHEMA_VERSION,
            updated_at: Utc::now(),
            records: Vec::new(),
        }
    }
}

/// Result of a registry lookup. Never an error: effective trust accounts
/// for revocation and expiry and is never higher than the stored value.
#[derive(Debug, Clone)]
pub struct TrustLookup {
    pub record: Option<TrustRecord>,
    pub effective_trust: TrustLevel,
    pub effective_capabilities: CapabilitySet,
}

impl TrustLookup {
    fn untrusted(record: Option<TrustRecord>) -> Self {
        Self {
            record,
            effective_trust: TrustLevel::Untrusted,
            effective_capabilities: CapabilitySet::none(),
        }
    }
}

/// Which records a revoke targets. All populated fields must match; an
/// entirely empty matcher is rejected.
#[derive(Debug, Clone, Default)]
pub struct RevokeMatcher {
    pub source: Option<String>,
    pub version_ref: Option<String>,
    pub record_key: Option<String>,
}

impl RevokeMatcher {
    pub fn is_empty(&self) -> bool {
        self.source.is_none() && self.version_ref.is_none() && self.record_key.is_none()
    }

    fn matches(&self, record: &TrustRecord) -> bool {
        self.source.as_deref().is_none_or(|s| record.skill.source == s)
            && self
                .version_ref
                .as_deref()
                .is_none_or(|v| record.skill.version_ref == v)
            && self.record_key.as_deref().is_none_or(|k| record.record_key == k)
    }
}

/// Filters for [`TrustRegistry::list`].
#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    pub trust_level: Option<TrustLevel>,
    pub status: Option<RecordStatus>,
    pub source_pattern: Option<String>,
    pub include_expired: bool,
}

/// The registry store. Open one per process and share it behind an `Arc`.
pub struct TrustRegistry {
    path: Option<PathBuf>,
    read_only: bool,
    loaded_version: u32,
    state: RwLock<RegistryFile>,
}

impl TrustRegistry {
    /// Open (or create) the registry document at `path`.
    ///
    /// A document with an unknown schema version is served read-only:
    /// lookups work, mutations return [`RegistryError::ReadOnly`]. A
    /// corrupt document is also served read-only (empty) rather than
    /// clobbered.
    pub async fn open(path: &Path) -> Result<Self, RegistryError> {
        if !path.exists() {
            return Ok(Self {
                path: Some(path.to_path_buf()),
                read_only: false,
                loaded_version: SCHEMA_VERSION,
                state: RwLock::new(RegistryFile::empty()),
            });
        }

        let raw = tokio::fs::read_to_string(path).await?;
        match serde_json::from_str::<RegistryFile>(&raw) {
            Ok(file) if file.version == SCHEMA_VERSION => Ok(Self {
                path: Some(path.to_path_buf()),
                read_only: false,
                loaded_version: file.version,
                state: RwLock::new(file),
            }),
            Ok(file) => {
                tracing::warn!(
                    version = file.version,
                    "registry schema version is unknown; opening read-only"
                );
                Ok(Self {
                    path: Some(path.to_path_buf()),
                    read_only: true,
                    loaded_version: file.version,
                    state: RwLock::new(file),
                })
            }
            Err(error) => {
                tracing::warn!(%error, "registry document is corrupt; opening read-only and empty");
                Ok(Self {
                    path: Some(path.to_path_buf()),
                    read_only: true,
                    loaded_version: SCHEMA_VERSION,
                    state: RwLock::new(RegistryFile::empty()),
                })
            }
        }
    }

    /// An ephemeral registry with no backing file. Used by tests and
    /// scan-only integrations.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            read_only: false,
            loaded_version: SCHEMA_VERSION,
            state: RwLock::new(RegistryFile::empty()),
        }
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Resolve a skill identity to its effective trust and capabilities.
    pub async fn lookup(&self, skill: &SkillIdentity) -> TrustLookup {
        let key = derive_record_key(skill);
        let state = self.state.read().await;
        let Some(record) = state.records.iter().find(|r| r.record_key == key) else {
            return TrustLookup::untrusted(None);
        };
        let now = Utc::now();
        if !record.is_effective(now) {
            return TrustLookup::untrusted(Some(record.clone()));
        }
        TrustLookup {
            effective_trust: record.trust_level,
            effective_capabilities: record.capabilities.clone(),
            record: Some(record.clone()),
        }
    }

    /// Find the effective record for a skill id (used by the
    /// initiating-skill overlay, which only knows the id string). When
    /// several versions are attested, the most recently updated wins.
    pub async fn lookup_by_skill_id(&self, skill_id: &str) -> Option<TrustRecord> {
        let now = Utc::now();
        let state = self.state.read().await;
        state
            .records
            .iter()
            .filter(|r| r.skill.id == skill_id && r.is_effective(now))
            .max_by_key(|r| r.updated_at)
            .cloned()
    }

    /// Create or update a trust record.
    ///
    /// Raising the trust level of an existing active record, or touching a
    /// revoked record at all, requires `force`; otherwise
    /// [`RegistryError::NeedsConfirmation`] is returned and nothing is
    /// mutated.
    pub async fn attest(
        &self,
        skill: SkillIdentity,
        trust_level: TrustLevel,
        capabilities: CapabilitySet,
        review: ReviewMetadata,
        force: bool,
    ) -> Result<TrustRecord, RegistryError> {
        self.ensure_writable()?;
        let key = derive_record_key(&skill);
        let now = Utc::now();

        let mut state = self.state.write().await;
        let record = if let Some(existing) =
            state.records.iter_mut().find(|r| r.record_key == key)
        {
            if existing.status == RecordStatus::Revoked && !force {
                return Err(RegistryError::NeedsConfirmation {
                    record_key: key,
                    reason: "record was revoked; re-attest requires force".into(),
                });
            }
            if trust_level > existing.trust_level
                && existing.status == RecordStatus::Active
                && !force
            {
                return Err(RegistryError::NeedsConfirmation {
                    record_key: key,
                    reason: format!(
                        "raising trust from {} to {} requires force",
                        existing.trust_level, trust_level
                    ),
                });
            }
            existing.trust_level = trust_level;
            existing.capabilities = capabilities;
            existing.review = review;
            existing.status = RecordStatus::Active;
            existing.revoked_reason = None;
            existing.updated_at = now;
            existing.clone()
        } else {
            let record = TrustRecord {
                record_key: key,
                skill,
                trust_level,
                capabilities,
                review,
                status: RecordStatus::Active,
                created_at: now,
                updated_at: now,
                expires_at: None,
                revoked_reason: None,
            };
            state.records.push(record.clone());
            record
        };

        state.updated_at = now;
        self.persist(&state).await?;
        Ok(record)
    }

    /// Unconditional upsert: never asks for confirmation.
    pub async fn force_attest(
        &self,
        skill: SkillIdentity,
        trust_level: TrustLevel,
        capabilities: CapabilitySet,
        review: ReviewMetadata,
    ) -> Result<TrustRecord, RegistryError> {
        self.attest(skill, trust_level, capabilities, review, true).await
    }

    /// Revoke every active record the matcher selects. Returns how many
    /// records transitioned to revoked.
    pub async fn revoke(
        &self,
        matcher: &RevokeMatcher,
        reason: &str,
    ) -> Result<usize, RegistryError> {
        self.ensure_writable()?;
        if matcher.is_empty() {
            return Err(RegistryError::InvalidMatch);
        }

        let now = Utc::now();
        let mut state = self.state.write().await;
        let mut revoked = 0;
        for record in &mut state.records {
            if record.status == RecordStatus::Active && matcher.matches(record) {
                record.status = RecordStatus::Revoked;
                record.revoked_reason = Some(reason.to_string());
                record.updated_at = now;
                revoked += 1;
            }
        }

        if revoked > 0 {
            state.updated_at = now;
            self.persist(&state).await?;
        }
        Ok(revoked)
    }

    /// List records, excluding expired ones unless the filter asks for
    /// them. Revoked records are always present (they are never destroyed).
    pub async fn list(&self, filter: &ListFilter) -> Vec<TrustRecord> {
        let now = Utc::now();
        let state = self.state.read().await;
        state
            .records
            .iter()
            .filter(|r| filter.trust_level.is_none_or(|t| r.trust_level == t))
            .filter(|r| filter.status.is_none_or(|s| r.status == s))
            .filter(|r| {
                filter
                    .source_pattern
                    .as_deref()
                    .is_none_or(|p| matches_pattern(p, &r.skill.source))
            })
            .filter(|r| filter.include_expired || !r.is_expired(now))
            .cloned()
            .collect()
    }

    fn ensure_writable(&self) -> Result<(), RegistryError> {
        if self.read_only {
            return Err(RegistryError::ReadOnly {
                version: self.loaded_version,
            });
        }
        Ok(())
    }

    /// Write the document via a temp file so a crash never truncates it.
    async fn persist(&self, state: &RegistryFile) -> Result<(), RegistryError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(state)
            .map_err(|e| RegistryError::Storage(e.to_string()))?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }
}
