//! Audit log: one JSON line per evaluation at `<state_home>/audit.jsonl`.
//!
//! Writes are best-effort. Audit I/O must never block or fail an
//! evaluation, so failures are logged at warn and swallowed.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;

use crate::action::{Decision, PolicyDecision};
use crate::patterns::RiskLevel;

const SUMMARY_MAX_CHARS: usize = 200;

/// One audit line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub tool_name: String,
    pub tool_input_summary: String,
    pub decision: Decision,
    pub risk_level: RiskLevel,
    pub risk_tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initiating_skill: Option<String>,
}

impl AuditEntry {
    /// Build an entry from an evaluation result. The input summary is
    /// truncated to 200 chars.
    pub fn from_decision(
        tool_name: &str,
        tool_input: &str,
        decision: &PolicyDecision,
        initiating_skill: Option<&str>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            tool_name: tool_name.to_string(),
            tool_input_summary: truncate_chars(tool_input, SUMMARY_MAX_CHARS),
            decision: decision.decision,
            risk_level: decision.risk_level,
            risk_tags: decision.risk_tags.clone(),
            initiating_skill: initiating_skill.map(ToString::to_string),
        }
    }
}

/// Append-only JSONL sink.
#[derive(Debug, Clone)]
pub struct AuditLog {
    path: PathBuf,
}

impl AuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn at_state_home(state_home: &Path) -> Self {
        Self::new(crate::config::audit_path(state_home))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one entry. Best-effort: failures are logged and swallowed.
    pub async fn record(&self, entry: &AuditEntry) {
        if let Err(error) = self.append(entry).await {
            tracing::warn!(%error, path = %self.path.display(), "audit append failed");
        }
    }

    async fn append(&self, entry: &AuditEntry) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut line = serde_json::to_string(entry)?;
        line.push('\n');
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        s.chars().take(max).collect()
    }
}
