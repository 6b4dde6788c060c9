use thiserror::Error;

/// Structured error hierarchy for `AgentGuard`.
///
/// Each subsystem defines its own error variant. Library callers can match on
/// these to decide recovery strategy; internal code continues to use
/// `anyhow::Result` for ad-hoc context chains.
#[derive(Debug, Error)]
pub enum GuardError {
    #[error("registry: {0}")]
    Registry(#[from] RegistryError),

    #[error("scan: {0}")]
    Scan(#[from] ScanError),

    #[error("config: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Errors raised by trust registry operations.
///
/// Lookups never fail; only mutations and artifact hashing surface errors so
/// callers can retry.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// An attest would raise trust over an existing active record, or
    /// reactivate a revoked one, and `force` was not set.
    #[error("attestation for {record_key} requires confirmation: {reason}")]
    NeedsConfirmation { record_key: String, reason: String },

    /// A revoke matcher with no populated fields would match nothing.
    #[error("revoke matcher must set at least one of source, version_ref, record_key")]
    InvalidMatch,

    /// The registry document has an unknown schema version and was opened
    /// read-only; mutations are rejected.
    #[error("registry is read-only (unsupported schema version {version})")]
    ReadOnly { version: u32 },

    #[error("registry storage: {0}")]
    Storage(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by the static scanner.
///
/// Only input errors surface; content-level failures (unreadable files,
/// decode errors) are absorbed into the report's skipped-file count.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("scan path does not exist: {0}")]
    PathNotFound(String),

    #[error("scan path is not a directory: {0}")]
    NotADirectory(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while loading or persisting configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load config: {0}")]
    Load(String),

    #[error("no home directory available to resolve the state dir")]
    NoStateHome,

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

/// Transport-level errors inside the threat intel client.
///
/// These never escape the [`crate::intel::ThreatIntel`] trait surface: the
/// client maps every failure to a neutral `unavailable` result and the
/// action scanner degrades to rule-based decisioning.
#[derive(Debug, Error)]
pub enum IntelError {
    #[error("threat intel credentials not configured")]
    NotConfigured,

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("deadline exceeded after {0}s")]
    Deadline(u64),

    #[error("provider returned status {0}")]
    Status(u16),

    #[error("malformed provider response: {0}")]
    Decode(String),
}
