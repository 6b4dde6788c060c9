//! State home resolution and the engine configuration file.
//!
//! State lives under `~/.agentguard/` by default; `AGENTGUARD_HOME`
//! overrides it. `config.json` carries the protection level (default
//! balanced) and the scan-only/auto-register switch.

use std::path::{Path, PathBuf};

use directories::UserDirs;
use serde::{Deserialize, Serialize};

use crate::arbiter::ProtectionLevel;
use crate::error::ConfigError;

/// Environment variable overriding the state home directory.
pub const STATE_HOME_ENV: &str = "AGENTGUARD_HOME";

const STATE_DIR_NAME: &str = ".agentguard";

/// Resolve the state home: `$AGENTGUARD_HOME` if set, else
/// `~/.agentguard/`.
pub fn state_home() -> Result<PathBuf, ConfigError> {
    if let Ok(custom) = std::env::var(STATE_HOME_ENV) {
        let trimmed = custom.trim();
        if !trimmed.is_empty() {
            return Ok(PathBuf::from(trimmed));
        }
    }
    UserDirs::new()
        .map(|dirs| dirs.home_dir().join(STATE_DIR_NAME))
        .ok_or(ConfigError::NoStateHome)
}

pub fn registry_path(state_home: &Path) -> PathBuf {
    state_home.join("registry.json")
}

pub fn audit_path(state_home: &Path) -> PathBuf {
    state_home.join("audit.jsonl")
}

pub fn config_path(state_home: &Path) -> PathBuf {
    state_home.join("config.json")
}

/// `<state_home>/config.json`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GuardConfig {
    #[serde(default)]
    pub level: ProtectionLevel,
    /// Whether scanned skills are auto-registered into the trust registry.
    /// Defaults to scan-only: the hook layer never mutates the registry
    /// unless this is set explicitly.
    #[serde(default)]
    pub auto_register_scanned: bool,
}

impl GuardConfig {
    /// Load the config, falling back to defaults when the file is absent.
    /// A malformed file is an error; silently downgrading the protection
    /// level would not be acceptable.
    pub async fn load(state_home: &Path) -> Result<Self, ConfigError> {
        let path = config_path(state_home);
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = tokio::fs::read_to_string(&path).await?;
        serde_json::from_str(&raw).map_err(|e| ConfigError::Load(e.to_string()))
    }

    pub async fn save(&self, state_home: &Path) -> Result<(), ConfigError> {
        tokio::fs::create_dir_all(state_home).await?;
        let json = serde_json::to_string_pretty(self).map_err(|e| ConfigError::Load(e.to_string()))?;
        tokio::fs::write(config_path(state_home), json).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn missing_config_defaults_to_balanced_scan_only() {
        let tmp = TempDir::new().unwrap();
        let config = GuardConfig::load(tmp.path()).await.unwrap();
        assert_eq!(config.level, ProtectionLevel::Balanced);
        assert!(!config.auto_register_scanned);
    }

    #[tokio::test]
    async fn config_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let config = GuardConfig {
            level: ProtectionLevel::Strict,
            auto_register_scanned: true,
        };
        config.save(tmp.path()).await.unwrap();
        let loaded = GuardConfig::load(tmp.path()).await.unwrap();
        assert_eq!(loaded, config);
    }

    #[tokio::test]
    async fn malformed_config_is_an_error() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(config_path(tmp.path()), "{not json").unwrap();
        assert!(matches!(
            GuardConfig::load(tmp.path()).await,
            Err(ConfigError::Load(_))
        ));
    }

    #[test]
    fn level_field_parses_from_wire() {
        let config: GuardConfig = serde_json::from_str(r#"{"level":"permissive"}"#).unwrap();
        assert_eq!(config.level, ProtectionLevel::Permissive);
    }

    #[test]
    fn state_paths_join() {
        let home = Path::new("/tmp/guard-home");
        assert_eq!(registry_path(home), home.join("registry.json"));
        assert_eq!(audit_path(home), home.join("audit.jsonl"));
        assert_eq!(config_path(home), home.join("config.json"));
    }
}
