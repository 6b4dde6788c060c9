//! The action envelope: actor, typed action payload, and evaluation
//! context. Envelopes are single-use; the scanner keeps no state derived
//! from them.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::registry::SkillIdentity;

/// Who proposed the action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub skill: SkillIdentity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_key: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvKind {
    #[default]
    Prod,
    Dev,
    Test,
}

/// Evaluation context carried alongside the action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionContext {
    pub session_id: String,
    pub user_present: bool,
    #[serde(default)]
    pub env: EnvKind,
    pub time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initiating_skill: Option<String>,
}

impl ActionContext {
    /// An interactive context for the current instant.
    pub fn interactive(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            user_present: true,
            env: EnvKind::Prod,
            time: Utc::now(),
            initiating_skill: None,
        }
    }
}

/// The seven action types the scanner evaluates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    NetworkRequest,
    ExecCommand,
    ReadFile,
    WriteFile,
    SecretAccess,
    Web3Tx,
    Web3Sign,
}

impl ActionType {
    pub fn label(self) -> &'static str {
        match self {
            Self::NetworkRequest => "network_request",
            Self::ExecCommand => "exec_command",
            Self::ReadFile => "read_file",
            Self::WriteFile => "write_file",
            Self::SecretAccess => "secret_access",
            Self::Web3Tx => "web3_tx",
            Self::Web3Sign => "web3_sign",
        }
    }
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Type-tagged action payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionData {
    NetworkRequest {
        method: String,
        url: String,
        #[serde(default, skip_serializing_if = "HashMap::is_empty")]
        headers: HashMap<String, String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        body_preview: Option<String>,
    },
    ExecCommand {
        command: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        args: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cwd: Option<String>,
        #[serde(default, skip_serializing_if = "HashMap::is_empty")]
        env: HashMap<String, String>,
    },
    ReadFile {
        path: String,
    },
    WriteFile {
        path: String,
    },
    SecretAccess {
        secret_name: String,
        access_type: String,
    },
    Web3Tx {
        chain_id: u64,
        from: String,
        to: String,
        value: String,
        #[serde(default)]
        data: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        origin: Option<String>,
    },
    Web3Sign {
        chain_id: u64,
        #[serde(default)]
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        typed_data: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        origin: Option<String>,
    },
}

impl ActionData {
    pub fn action_type(&self) -> ActionType {
        match self {
            Self::NetworkRequest { .. } => ActionType::NetworkRequest,
            Self::ExecCommand { .. } => ActionType::ExecCommand,
            Self::ReadFile { .. } => ActionType::ReadFile,
            Self::WriteFile { .. } => ActionType::WriteFile,
            Self::SecretAccess { .. } => ActionType::SecretAccess,
            Self::Web3Tx { .. } => ActionType::Web3Tx,
            Self::Web3Sign { .. } => ActionType::Web3Sign,
        }
    }
}

/// The structured request submitted to the action scanner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionEnvelope {
    pub actor: Actor,
    pub action: ActionData,
    pub context: ActionContext,
}
