//! User-level configuration
//!
//! Stored as TOML at `<config dir>/cowork/config.toml`. Missing files and
//! missing keys fall back to defaults.

use anyhow::{bail, Context, Result};
use cowork_watcher::WorkerConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    pub user: UserSection,
    pub worker: WorkerSection,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserSection {
    /// Default username; `$USER` is used when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerSection {
    pub recheck_interval_secs: u64,
    pub event_capacity: usize,
}

impl Default for WorkerSection {
    fn default() -> Self {
        Self {
            recheck_interval_secs: 3,
            event_capacity: 256,
        }
    }
}

impl SystemConfig {
    pub fn validate(&self) -> Result<()> {
        if let Some(name) = &self.user.name {
            cowork_core::layout::validate_username(name)?;
        }
        if !(1..=3600).contains(&self.worker.recheck_interval_secs) {
            bail!(
                "worker.recheck_interval_secs must be between 1 and 3600, got {}",
                self.worker.recheck_interval_secs
            );
        }
        if !(16..=65536).contains(&self.worker.event_capacity) {
            bail!(
                "worker.event_capacity must be between 16 and 65536, got {}",
                self.worker.event_capacity
            );
        }
        Ok(())
    }

    pub fn worker_config(&self) -> WorkerConfig {
        WorkerConfig {
            recheck_interval: Duration::from_secs(self.worker.recheck_interval_secs),
            event_capacity: self.worker.event_capacity,
            ..WorkerConfig::default()
        }
    }
}

/// Location of the config file
///
/// `COWORK_CONFIG` overrides the platform config directory.
pub fn config_file_path() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os("COWORK_CONFIG") {
        return Some(PathBuf::from(path));
    }
    dirs::config_dir().map(|dir| dir.join("cowork").join("config.toml"))
}

pub fn load() -> Result<SystemConfig> {
    let Some(path) = config_file_path() else {
        return Ok(SystemConfig::default());
    };
    if !path.exists() {
        return Ok(SystemConfig::default());
    }

    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let config: SystemConfig = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("Invalid configuration in {}", path.display()))?;
    Ok(config)
}

pub fn save(config: &SystemConfig) -> Result<()> {
    config.validate()?;
    let path = config_file_path().context("Could not determine config file path")?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let contents = toml::to_string_pretty(config).context("Failed to serialize configuration")?;
    std::fs::write(&path, contents).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

/// Write the default configuration if no file exists yet
pub fn init_if_missing() -> Result<PathBuf> {
    let path = config_file_path().context("Could not determine config file path")?;
    if !path.exists() {
        save(&SystemConfig::default())?;
    }
    Ok(path)
}

pub fn example_config() -> &'static str {
    r#"# Cowork configuration

[user]
# Username used when --user is not given (defaults to $USER)
name = "alice"

[worker]
# Seconds between workspace and snapshot re-checks (1-3600)
recheck_interval_secs = 3
# Buffered worker events per subscriber (16-65536)
event_capacity = 256
"#
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = SystemConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.worker_config().recheck_interval, Duration::from_secs(3));
    }

    #[test]
    fn test_example_parses() {
        let config: SystemConfig = toml::from_str(example_config()).unwrap();
        assert_eq!(config.user.name.as_deref(), Some("alice"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: SystemConfig = toml::from_str("[worker]\nevent_capacity = 64\n").unwrap();
        assert_eq!(config.worker.event_capacity, 64);
        assert_eq!(config.worker.recheck_interval_secs, 3);
        assert_eq!(config.user.name, None);
    }

    #[test]
    fn test_out_of_range_values_rejected() {
        let mut config = SystemConfig::default();
        config.worker.recheck_interval_secs = 0;
        assert!(config.validate().is_err());

        let mut config = SystemConfig::default();
        config.worker.event_capacity = 1_000_000;
        assert!(config.validate().is_err());

        let mut config = SystemConfig::default();
        config.user.name = Some(".hidden".into());
        assert!(config.validate().is_err());
    }
}
