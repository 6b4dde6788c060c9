//! Hook integration surface: the adapter contract platform transports
//! implement, the rendered exit semantics, and the process-wide hook state.
//!
//! Adapters are external collaborators. The core exposes
//! `decide(envelope)`; an adapter translates platform events into
//! envelopes, and translates the arbitrated verdict back into the
//! transport's exit contract. Post-event evaluations produce only audit
//! entries.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};

use crate::action::{ActionEnvelope, ActionType};
use crate::arbiter::Verdict;
use crate::scanner::ScanReport;

/// Plugin auto-scans are bounded to this many concurrent scans.
const MAX_CONCURRENT_PLUGIN_SCANS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookEvent {
    Pre,
    Post,
}

/// Parsed platform event, normalised across transports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HookInput {
    pub tool_name: String,
    pub tool_input: serde_json::Value,
    pub event: HookEvent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwd: Option<String>,
}

/// Contract every platform adapter supplies.
pub trait HookAdapter: Send + Sync {
    /// Parse the raw transport payload into a [`HookInput`].
    fn parse_input(&self, raw: &str) -> anyhow::Result<HookInput>;

    /// Map a platform tool name to an action type; `None` means the tool is
    /// not policy-relevant and passes through.
    fn map_tool_to_action_type(&self, tool_name: &str) -> Option<ActionType>;

    /// Build the action envelope for an input, or `None` when the input
    /// carries nothing evaluable.
    fn build_envelope(
        &self,
        input: &HookInput,
        initiating_skill: Option<&str>,
    ) -> Option<ActionEnvelope>;

    /// Infer which skill initiated the tool call, when the transport
    /// exposes that.
    fn infer_initiating_skill(&self, input: &HookInput) -> Option<String>;
}

/// Single-line structured reply for `ask` verdicts.
#[derive(Debug, Serialize)]
struct AskReply<'a> {
    event: &'a str,
    #[serde(rename = "permissionDecision")]
    permission_decision: &'a str,
    #[serde(rename = "permissionDecisionReason")]
    permission_decision_reason: &'a str,
}

/// The rendered transport response.
///
/// Exit semantics: allow exits 0 with no output; deny exits 2 with the
/// reason on stderr; ask exits 0 with one structured JSON line on stdout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookResponse {
    pub exit_code: i32,
    pub stdout: Option<String>,
    pub stderr: Option<String>,
}

impl HookResponse {
    pub fn from_verdict(verdict: Verdict, reason: &str) -> Self {
        match verdict {
            Verdict::Allow => Self {
                exit_code: 0,
                stdout: None,
                stderr: None,
            },
            Verdict::Deny => Self {
                exit_code: 2,
                stdout: None,
                stderr: Some(reason.to_string()),
            },
            Verdict::Ask => {
                let reply = AskReply {
                    event: "pre",
                    permission_decision: "ask",
                    permission_decision_reason: reason,
                };
                Self {
                    exit_code: 0,
                    stdout: serde_json::to_string(&reply).ok(),
                    stderr: None,
                }
            }
        }
    }
}

/// Process-wide hook state: the plugin scan cache and the tool→plugin map.
///
/// Held as an explicit long-lived value handed to adapters rather than
/// module-level statics, so tests can construct isolated instances. Both
/// maps are append-only for the process lifetime.
pub struct HookState {
    scan_cache: Mutex<HashMap<PathBuf, ScanReport>>,
    tool_plugins: Mutex<HashMap<String, String>>,
    scan_slots: Arc<Semaphore>,
}

impl Default for HookState {
    fn default() -> Self {
        Self::new()
    }
}

impl HookState {
    pub fn new() -> Self {
        Self {
            scan_cache: Mutex::new(HashMap::new()),
            tool_plugins: Mutex::new(HashMap::new()),
            scan_slots: Arc::new(Semaphore::new(MAX_CONCURRENT_PLUGIN_SCANS)),
        }
    }

    /// Previously cached scan report for a plugin directory.
    pub async fn cached_scan(&self, plugin_dir: &Path) -> Option<ScanReport> {
        self.scan_cache.lock().await.get(plugin_dir).cloned()
    }

    /// Cache a scan report. First write wins; entries are append-only.
    pub async fn cache_scan(&self, plugin_dir: &Path, report: ScanReport) {
        self.scan_cache
            .lock()
            .await
            .entry(plugin_dir.to_path_buf())
            .or_insert(report);
    }

    /// Record which plugin registered a tool. First registration wins.
    pub async fn register_tool(&self, tool_name: &str, plugin_id: &str) {
        self.tool_plugins
            .lock()
            .await
            .entry(tool_name.to_string())
            .or_insert_with(|| plugin_id.to_string());
    }

    pub async fn plugin_for_tool(&self, tool_name: &str) -> Option<String> {
        self.tool_plugins.lock().await.get(tool_name).cloned()
    }

    /// Acquire one of the bounded plugin-scan slots. Holding the permit
    /// bounds auto-scanning at three concurrent scans.
    pub async fn acquire_scan_slot(&self) -> Option<OwnedSemaphorePermit> {
        Arc::clone(&self.scan_slots).acquire_owned().await.ok()
    }
}
