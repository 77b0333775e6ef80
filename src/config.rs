//! Configuration - identifier prefix, stack limits, finalization and logging
//!
//! Loaded from TOML; every field has a default so partial files are valid.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::error::{ConfigError, ConfigResult};
use crate::logging::{self, LogConfig};
use tracing_appender::non_blocking::WorkerGuard;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BindConfig {
    /// Prepended to every handle identifier (metatable and finalizer keys)
    #[serde(default = "default_prefix")]
    pub identifier_prefix: String,

    #[serde(default)]
    pub stack: StackConfig,

    #[serde(default)]
    pub gc: GcConfig,

    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackConfig {
    #[serde(default = "default_initial_capacity")]
    pub initial_capacity: usize,

    /// Hard ceiling enforced by `check_stack`
    #[serde(default = "default_max_slots")]
    pub max_slots: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GcConfig {
    /// Run every pending `__gc` when the state is dropped
    #[serde(default = "default_true")]
    pub finalize_on_close: bool,
}

impl Default for BindConfig {
    fn default() -> Self {
        Self {
            identifier_prefix: default_prefix(),
            stack: StackConfig::default(),
            gc: GcConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl Default for StackConfig {
    fn default() -> Self {
        Self {
            initial_capacity: default_initial_capacity(),
            max_slots: default_max_slots(),
        }
    }
}

impl Default for GcConfig {
    fn default() -> Self {
        Self {
            finalize_on_close: true,
        }
    }
}

fn default_prefix() -> String { "stackbind.".to_string() }
fn default_initial_capacity() -> usize { 32 }
fn default_max_slots() -> usize { 1_000_000 }
fn default_true() -> bool { true }

impl BindConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn to_toml_string(&self) -> ConfigResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Write configuration to a TOML file
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        fs::write(path, self.to_toml_string()?)?;
        Ok(())
    }

    /// Install the global subscriber from the `[log]` section (first call wins)
    ///
    /// Keep the returned guard alive while logging to a file.
    pub fn init_logging(&self) -> Option<WorkerGuard> {
        logging::init_with_config(&self.log)
    }
}

impl FromStr for BindConfig {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_toml_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::{LogFormat, LogLevel};
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = BindConfig::default();
        assert_eq!(config.identifier_prefix, "stackbind.");
        assert_eq!(config.stack.initial_capacity, 32);
        assert_eq!(config.stack.max_slots, 1_000_000);
        assert!(config.gc.finalize_on_close);
    }

    #[test]
    fn test_partial_toml() {
        let config: BindConfig = r#"
            identifier_prefix = "game."

            [stack]
            max_slots = 64
        "#
        .parse()
        .unwrap();

        assert_eq!(config.identifier_prefix, "game.");
        assert_eq!(config.stack.max_slots, 64);
        assert_eq!(config.stack.initial_capacity, 32);
        assert!(config.gc.finalize_on_close);
    }

    #[test]
    fn test_log_section() {
        let config = BindConfig::from_toml_str(
            r#"
            [log]
            level = "trace"
            format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(config.log.level, LogLevel::Trace);
        assert_eq!(config.log.format, LogFormat::Json);
    }

    #[test]
    fn test_log_section_installs_subscriber() {
        let config = BindConfig::from_toml_str("[log]\nlevel = \"debug\"").unwrap();
        let _guard = config.init_logging();
        assert!(logging::is_initialized());

        // Already installed: a second call is a no-op
        assert!(config.init_logging().is_none());
    }

    #[test]
    fn test_invalid_toml() {
        let err = BindConfig::from_toml_str("[stack]\nmax_slots = \"many\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_file_roundtrip() {
        let mut config = BindConfig::default();
        config.identifier_prefix = "app.".to_string();
        config.gc.finalize_on_close = false;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stackbind.toml");
        config.save(&path).unwrap();

        assert_eq!(BindConfig::from_file(&path).unwrap(), config);
    }

    #[test]
    fn test_file_from_handwritten() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[gc]\nfinalize_on_close = false").unwrap();

        let config = BindConfig::from_file(file.path()).unwrap();
        assert!(!config.gc.finalize_on_close);
        assert_eq!(config.identifier_prefix, "stackbind.");
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = BindConfig::from_file(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
