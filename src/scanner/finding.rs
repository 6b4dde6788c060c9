//! Scan findings and the report roll-up.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::patterns::{RiskLevel, RuleCategory};

/// A single rule hit. `matched_text` is truncated for display and empty in
/// quick scans; `via` names the parent rule when the hit came from decoded
/// base64 content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub rule_id: String,
    pub severity: RiskLevel,
    pub file_path: String,
    pub line: usize,
    pub matched_text: String,
    pub category: RuleCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub via: Option<String>,
}

/// The outcome of one scan. Stateless: the scanner owns nothing between
/// scans.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanReport {
    pub risk_level: RiskLevel,
    pub risk_tags: Vec<String>,
    pub findings: Vec<Finding>,
    pub files_scanned: usize,
    pub skipped_files: usize,
    pub summary: String,
}

impl ScanReport {
    /// Roll findings up into a report: deterministic ordering, max-severity
    /// risk level, distinct tags in triggering order, count-by-category
    /// summary.
    pub fn roll_up(mut findings: Vec<Finding>, files_scanned: usize, skipped_files: usize) -> Self {
        findings.sort_by(|a, b| {
            (&a.file_path, a.line, &a.rule_id).cmp(&(&b.file_path, b.line, &b.rule_id))
        });
        findings.dedup();

        let risk_level = findings
            .iter()
            .map(|f| f.severity)
            .max()
            .unwrap_or(RiskLevel::Low);

        let mut risk_tags: Vec<String> = Vec::new();
        for finding in &findings {
            if !risk_tags.contains(&finding.rule_id) {
                risk_tags.push(finding.rule_id.clone());
            }
        }

        let summary = summarize(&findings, files_scanned, skipped_files);

        Self {
            risk_level,
            risk_tags,
            findings,
            files_scanned,
            skipped_files,
            summary,
        }
    }
}

fn summarize(findings: &[Finding], files_scanned: usize, skipped_files: usize) -> String {
    if findings.is_empty() {
        let mut s = format!("no findings in {files_scanned} files");
        if skipped_files > 0 {
            s.push_str(&format!(" ({skipped_files} skipped)"));
        }
        return s;
    }

    let mut by_category: BTreeMap<&'static str, usize> = BTreeMap::new();
    for finding in findings {
        *by_category.entry(finding.category.label()).or_default() += 1;
    }
    let breakdown = by_category
        .iter()
        .map(|(category, count)| format!("{category}: {count}"))
        .collect::<Vec<_>>()
        .join(", ");

    let mut s = format!(
        "{} findings ({breakdown}) in {files_scanned} files",
        findings.len()
    );
    if skipped_files > 0 {
        s.push_str(&format!(" ({skipped_files} skipped)"));
    }
    s
}
