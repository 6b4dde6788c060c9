//! Sensitive filesystem paths: the hard-coded write blocklist.
//!
//! Matching normalises backslashes to slashes and tests both suffix and
//! `/pattern` containment, so `C:\project\.env`, `/app/.env`, and plain
//! `.env` all hit.

const SENSITIVE_PATHS: &[&str] = &[
    ".env",
    ".env.local",
    ".env.production",
    ".ssh/",
    "id_rsa",
    "id_ed25519",
    ".aws/credentials",
    ".aws/config",
    ".npmrc",
    ".netrc",
    "credentials.json",
    "serviceAccountKey.json",
    ".kube/config",
];

/// Check a path against the sensitive-path set. Returns the matched entry
/// for evidence.
pub fn sensitive_path_hit(path: &str) -> Option<&'static str> {
    let normalized = path.replace('\\', "/");
    SENSITIVE_PATHS.iter().copied().find(|entry| {
        normalized == *entry
            || normalized.ends_with(entry)
            || normalized.contains(&format!("/{entry}"))
    })
}
