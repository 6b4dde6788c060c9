//! Trust registry lifecycle against a real state directory: persistence,
//! revocation monotonicity, and artifact hash stability.

use agentguard::registry::{
    calculate_artifact_hash, CapabilitySet, ListFilter, RecordStatus, ReviewMetadata,
    RevokeMatcher, SkillIdentity, TrustLevel, TrustRegistry,
};
use tempfile::TempDir;

fn skill(version: &str, hash: &str) -> SkillIdentity {
    SkillIdentity {
        id: "lifecycle-skill".into(),
        source: "github.com/acme/lifecycle-skill".into(),
        version_ref: version.into(),
        artifact_hash: hash.into(),
    }
}

#[tokio::test]
async fn revocation_is_monotonic_until_force_reattest() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("registry.json");
    let registry = TrustRegistry::open(&path).await.unwrap();

    registry
        .attest(
            skill("v1", "hash-a"),
            TrustLevel::Trusted,
            CapabilitySet::read_only(),
            ReviewMetadata {
                reviewed_by: Some("security-team".into()),
                notes: Some("initial review".into()),
                reviewed_at: Some(chrono::Utc::now()),
            },
            false,
        )
        .await
        .unwrap();

    let revoked = registry
        .revoke(
            &RevokeMatcher {
                source: Some("github.com/acme/lifecycle-skill".into()),
                version_ref: Some("v1".into()),
                ..RevokeMatcher::default()
            },
            "supply-chain incident",
        )
        .await
        .unwrap();
    assert_eq!(revoked, 1);

    // Revocation survives a reopen of the backing file.
    drop(registry);
    let reopened = TrustRegistry::open(&path).await.unwrap();
    let lookup = reopened.lookup(&skill("v1", "hash-a")).await;
    assert_eq!(lookup.effective_trust, TrustLevel::Untrusted);
    assert_eq!(lookup.effective_capabilities, CapabilitySet::none());
    let record = lookup.record.unwrap();
    assert_eq!(record.status, RecordStatus::Revoked);
    assert_eq!(record.revoked_reason.as_deref(), Some("supply-chain incident"));

    // A plain re-attest is refused; force brings it back.
    assert!(reopened
        .attest(
            skill("v1", "hash-a"),
            TrustLevel::Restricted,
            CapabilitySet::none(),
            ReviewMetadata::default(),
            false,
        )
        .await
        .is_err());
    reopened
        .force_attest(
            skill("v1", "hash-a"),
            TrustLevel::Restricted,
            CapabilitySet::none(),
            ReviewMetadata::default(),
        )
        .await
        .unwrap();
    assert_eq!(
        reopened.lookup(&skill("v1", "hash-a")).await.effective_trust,
        TrustLevel::Restricted
    );
}

#[tokio::test]
async fn a_new_artifact_hash_is_a_distinct_record() {
    let registry = TrustRegistry::in_memory();
    registry
        .attest(
            skill("v1", "hash-a"),
            TrustLevel::Trusted,
            CapabilitySet::none(),
            ReviewMetadata::default(),
            false,
        )
        .await
        .unwrap();
    registry
        .revoke(
            &RevokeMatcher {
                record_key: Some(skill("v1", "hash-a").record_key()),
                ..RevokeMatcher::default()
            },
            "tampered artifact",
        )
        .await
        .unwrap();

    // Same source+version with different content hashes to a new key and
    // attests cleanly.
    registry
        .attest(
            skill("v1", "hash-b"),
            TrustLevel::Restricted,
            CapabilitySet::none(),
            ReviewMetadata::default(),
            false,
        )
        .await
        .unwrap();
    assert_eq!(
        registry.lookup(&skill("v1", "hash-b")).await.effective_trust,
        TrustLevel::Restricted
    );
    assert_eq!(
        registry.lookup(&skill("v1", "hash-a")).await.effective_trust,
        TrustLevel::Untrusted
    );

    let all = registry.list(&ListFilter::default()).await;
    assert_eq!(all.len(), 2);
}

#[tokio::test]
async fn artifact_hash_is_stable_and_content_sensitive() {
    let tree = TempDir::new().unwrap();
    std::fs::create_dir_all(tree.path().join("src")).unwrap();
    std::fs::write(tree.path().join("src/index.js"), "export const x = 1;\n").unwrap();
    std::fs::write(tree.path().join("README.md"), "# skill\n").unwrap();

    let first = calculate_artifact_hash(tree.path()).unwrap();
    let second = calculate_artifact_hash(tree.path()).unwrap();
    assert_eq!(first, second);

    // node_modules content does not participate.
    std::fs::create_dir_all(tree.path().join("node_modules/x")).unwrap();
    std::fs::write(tree.path().join("node_modules/x/i.js"), "junk").unwrap();
    assert_eq!(calculate_artifact_hash(tree.path()).unwrap(), first);

    std::fs::write(tree.path().join("src/index.js"), "export const x = 2;\n").unwrap();
    assert_ne!(calculate_artifact_hash(tree.path()).unwrap(), first);
}
