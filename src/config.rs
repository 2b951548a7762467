//! Configuration for the reconcile driver.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (CTRLKIT_RECONCILE_TIMEOUT_MS, CTRLKIT_TRACE_STEPS)
//! 2. Config file (explicit path, or .ctrlkit/config.yaml in the current
//!    directory or one of its parents)
//! 3. Defaults
//!
//! The resolved config is handed to the driver explicitly; nothing is cached
//! globally.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const ENV_RECONCILE_TIMEOUT_MS: &str = "CTRLKIT_RECONCILE_TIMEOUT_MS";
pub const ENV_TRACE_STEPS: &str = "CTRLKIT_TRACE_STEPS";

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub reconcile: ReconcileSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReconcileSection {
    /// Ambient deadline for one reconcile invocation
    pub timeout_ms: Option<u64>,
    /// Attach the tracing hook to workflow leaves
    pub trace_steps: Option<bool>,
}

/// Resolved driver configuration
#[derive(Debug, Clone, Serialize)]
pub struct ReconcilerConfig {
    /// Deadline for one reconcile invocation in milliseconds (default: 30s)
    pub reconcile_timeout_ms: u64,

    /// Log every leaf step through the tracing hook (default: true)
    pub trace_steps: bool,

    /// Path to config file (if one was used)
    pub config_file: Option<PathBuf>,
}

fn default_reconcile_timeout_ms() -> u64 {
    30_000
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            reconcile_timeout_ms: default_reconcile_timeout_ms(),
            trace_steps: true,
            config_file: None,
        }
    }
}

impl ReconcilerConfig {
    /// Load configuration from all sources
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let config_file = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => find_config_file(),
        };

        let mut config = Self::default();
        if let Some(path) = config_file {
            let file = load_config_file(&path)?;
            config.apply_file(&file);
            config.config_file = Some(path);
        }

        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Overlay values present in a config file
    pub fn apply_file(&mut self, file: &ConfigFile) {
        if let Some(timeout_ms) = file.reconcile.timeout_ms {
            self.reconcile_timeout_ms = timeout_ms;
        }
        if let Some(trace_steps) = file.reconcile.trace_steps {
            self.trace_steps = trace_steps;
        }
    }

    /// Overlay values from the environment, looked up through `lookup`
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(raw) = lookup(ENV_RECONCILE_TIMEOUT_MS) {
            self.reconcile_timeout_ms = raw
                .trim()
                .parse()
                .with_context(|| format!("Invalid {}: {}", ENV_RECONCILE_TIMEOUT_MS, raw))?;
        }
        if let Some(raw) = lookup(ENV_TRACE_STEPS) {
            self.trace_steps = match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                _ => anyhow::bail!("Invalid {}: {}", ENV_TRACE_STEPS, raw),
            };
        }
        Ok(())
    }

    /// Reject settings the driver cannot honor
    pub fn validate(&self) -> Result<()> {
        if self.reconcile_timeout_ms == 0 {
            anyhow::bail!("Reconcile timeout must be greater than zero");
        }
        Ok(())
    }

    pub fn reconcile_timeout(&self) -> Duration {
        Duration::from_millis(self.reconcile_timeout_ms)
    }
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(".ctrlkit").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = ReconcilerConfig::default();
        assert_eq!(config.reconcile_timeout(), Duration::from_secs(30));
        assert!(config.trace_steps);
        assert!(config.config_file.is_none());
    }

    #[test]
    fn test_config_file_parsing() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("config.yaml");
        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(
            file,
            r#"
reconcile:
  timeout_ms: 1500
  trace_steps: false
"#
        )
        .unwrap();

        let config = ReconcilerConfig::load(Some(&config_path)).unwrap();
        assert_eq!(config.reconcile_timeout_ms, 1500);
        assert!(!config.trace_steps);
        assert_eq!(config.config_file, Some(config_path));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let temp = TempDir::new().unwrap();
        let result = ReconcilerConfig::load(Some(&temp.path().join("absent.yaml")));
        assert!(result.is_err());
    }

    #[test]
    fn test_env_overrides_file() {
        let mut config = ReconcilerConfig::default();
        config.apply_file(&ConfigFile {
            reconcile: ReconcileSection {
                timeout_ms: Some(1000),
                trace_steps: Some(true),
            },
        });

        let env: HashMap<&str, &str> = [
            (ENV_RECONCILE_TIMEOUT_MS, "250"),
            (ENV_TRACE_STEPS, "off"),
        ]
        .into_iter()
        .collect();
        config
            .apply_env(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.reconcile_timeout_ms, 250);
        assert!(!config.trace_steps);
    }

    #[test]
    fn test_invalid_env_values() {
        let mut config = ReconcilerConfig::default();
        assert!(config
            .apply_env(|key| (key == ENV_RECONCILE_TIMEOUT_MS).then(|| "soon".to_string()))
            .is_err());
        assert!(config
            .apply_env(|key| (key == ENV_TRACE_STEPS).then(|| "maybe".to_string()))
            .is_err());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let config = ReconcilerConfig {
            reconcile_timeout_ms: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
