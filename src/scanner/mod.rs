//! Static scanner: walks a directory, applies the scan rule table per
//! file, and rolls finding severities into an overall risk level.
//!
//! The scan is deterministic: identical trees produce identical reports,
//! with findings ordered by `(file_path, line, rule_id)`. Content-level
//! failures (unreadable files, decode errors) never fail the scan; the
//! affected file is skipped and counted. Dropping the returned future
//! cancels in-flight file tasks, and partial results are never surfaced.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::error::ScanError;
use crate::patterns::{
    is_excluded_file, truncate_match, EXCLUDED_DIRS, SCAN_EXTENSIONS, SCAN_RULES,
};

mod finding;

pub use finding::{Finding, ScanReport};

/// Minimum length of a base64-like token before the full scan attempts a
/// decode-and-rescan pass.
const BASE64_RESCAN_MIN_LEN: usize = 80;

/// The parent rule recorded on findings surfaced from decoded content.
const BASE64_PARENT_RULE: &str = "BASE64_BLOB";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanMode {
    /// Base64 re-scan enabled, snippets included.
    Full,
    /// Hot-path variant: no re-scan, no content snippets.
    Quick,
}

/// Rule-based directory scanner. Stateless between scans; hold one and
/// reuse it freely.
#[derive(Debug, Clone)]
pub struct StaticScanner {
    concurrency: usize,
}

impl Default for StaticScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl StaticScanner {
    pub fn new() -> Self {
        Self { concurrency: 4 }
    }

    /// Bound the number of files processed concurrently (clamped to 1..=8).
    pub fn with_concurrency(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.clamp(1, 8),
        }
    }

    /// Full scan: every rule, plus the base64 decode-and-rescan pass.
    pub async fn scan(&self, dir: &Path) -> Result<ScanReport, ScanError> {
        self.run(dir, ScanMode::Full).await
    }

    /// Quick scan for hot paths (session startup, plugin registration):
    /// no base64 re-scan, no content snippets in findings.
    pub async fn quick_scan(&self, dir: &Path) -> Result<ScanReport, ScanError> {
        self.run(dir, ScanMode::Quick).await
    }

    async fn run(&self, dir: &Path, mode: ScanMode) -> Result<ScanReport, ScanError> {
        if !dir.exists() {
            return Err(ScanError::PathNotFound(dir.display().to_string()));
        }
        if !dir.is_dir() {
            return Err(ScanError::NotADirectory(dir.display().to_string()));
        }

        let files = discover_files(dir)?;
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks = JoinSet::new();

        for file in files {
            let semaphore = Arc::clone(&semaphore);
            let root = dir.to_path_buf();
            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                scan_one_file(&root, &file, mode).await
            });
        }

        let mut findings = Vec::new();
        let mut files_scanned = 0usize;
        let mut skipped_files = 0usize;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Some(file_findings)) => {
                    files_scanned += 1;
                    findings.extend(file_findings);
                }
                Ok(None) | Err(_) => skipped_files += 1,
            }
        }

        Ok(ScanReport::roll_up(findings, files_scanned, skipped_files))
    }
}

/// Read and scan a single file. `None` means the file was skipped
/// (unreadable or not valid UTF-8).
async fn scan_one_file(root: &Path, file: &PathBuf, mode: ScanMode) -> Option<Vec<Finding>> {
    let Ok(content) = tokio::fs::read_to_string(file).await else {
        tracing::debug!(path = %file.display(), "skipping unreadable file");
        return None;
    };

    let relative = file
        .strip_prefix(root)
        .unwrap_or(file)
        .to_string_lossy()
        .replace('\\', "/");
    let extension = file
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    Some(scan_content(&relative, &extension, &content, mode))
}

fn scan_content(relative: &str, extension: &str, content: &str, mode: ScanMode) -> Vec<Finding> {
    let mut findings = Vec::new();

    for rule in SCAN_RULES.iter().filter(|r| r.applies_to(extension)) {
        for (idx, line) in content.lines().enumerate() {
            if let Some(matched) = rule.find(line) {
                findings.push(Finding {
                    rule_id: rule.id.to_string(),
                    severity: rule.severity,
                    file_path: relative.to_string(),
                    line: idx + 1,
                    matched_text: snippet(matched, mode),
                    category: rule.category,
                    via: None,
                });
            }
        }
    }

    if mode == ScanMode::Full {
        findings.extend(rescan_base64(relative, content, mode));
    }

    findings
}

/// Decode base64-like tokens of length >= 80 and re-apply the full rule set
/// to the decoded text. New findings are tagged as originating from the
/// base64 rule and anchored to the token's line.
fn rescan_base64(relative: &str, content: &str, mode: ScanMode) -> Vec<Finding> {
    let mut findings = Vec::new();

    for (line_number, candidate) in extract_base64_candidates(content) {
        let Ok(decoded_bytes) = BASE64_STANDARD.decode(candidate) else {
            continue;
        };
        let Ok(decoded) = std::str::from_utf8(&decoded_bytes) else {
            continue;
        };

        for rule in SCAN_RULES.iter() {
            if rule.id == BASE64_PARENT_RULE {
                continue;
            }
            if let Some(matched) = rule.find(decoded) {
                findings.push(Finding {
                    rule_id: rule.id.to_string(),
                    severity: rule.severity,
                    file_path: relative.to_string(),
                    line: line_number,
                    matched_text: snippet(matched, mode),
                    category: rule.category,
                    via: Some(BASE64_PARENT_RULE.to_string()),
                });
            }
        }
    }

    findings
}

/// Contiguous runs of base64 alphabet characters, with the 1-based line
/// they start on.
fn extract_base64_candidates(text: &str) -> Vec<(usize, &str)> {
    let mut candidates = Vec::new();
    let mut line = 1usize;
    let mut start: Option<(usize, usize)> = None;

    for (i, c) in text.char_indices() {
        let is_b64 = c.is_ascii_alphanumeric() || matches!(c, '+' | '/' | '=');
        if is_b64 {
            if start.is_none() {
                start = Some((i, line));
            }
        } else {
            if let Some((s, at_line)) = start.take() {
                let run = &text[s..i];
                if run.len() >= BASE64_RESCAN_MIN_LEN {
                    candidates.push((at_line, run));
                }
            }
            if c == '\n' {
                line += 1;
            }
        }
    }
    if let Some((s, at_line)) = start {
        let run = &text[s..];
        if run.len() >= BASE64_RESCAN_MIN_LEN {
            candidates.push((at_line, run));
        }
    }

    candidates
}

fn snippet(matched: &str, mode: ScanMode) -> String {
    match mode {
        ScanMode::Full => truncate_match(matched),
        ScanMode::Quick => String::new(),
    }
}

/// Glob files by extension, excluding generated directories and lockfiles.
/// Only the root read is fatal; unreadable subdirectories are skipped.
fn discover_files(dir: &Path) -> Result<Vec<PathBuf>, ScanError> {
    let mut files = Vec::new();
    let entries = std::fs::read_dir(dir)?;
    walk_entries(entries, &mut files);
    files.sort();
    Ok(files)
}

fn walk_entries(entries: std::fs::ReadDir, out: &mut Vec<PathBuf>) {
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_symlink() {
            continue;
        }
        if path.is_dir() {
            let name = entry.file_name();
            if EXCLUDED_DIRS.contains(&name.to_string_lossy().as_ref()) {
                continue;
            }
            if let Ok(sub) = std::fs::read_dir(&path) {
                walk_entries(sub, out);
            }
        } else if path.is_file() {
            let name = entry.file_name();
            if is_excluded_file(&name.to_string_lossy()) {
                continue;
            }
            let scannable = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|ext| SCAN_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()));
            if scannable {
                out.push(path);
            }
        }
    }
}
