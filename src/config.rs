//! Configuration for vtconsole.
//!
//! Settings are read from `~/.vtconsole/config.toml`. Every section and key is
//! optional:
//!
//! ```toml
//! [console]
//! # Attach to the console of the parent process when started from one
//! attach_parent = true
//! # Console output modes enabled at startup
//! processed_output = true
//! wrap_at_eol = true
//!
//! [input]
//! # Delay between key polls, in milliseconds
//! poll_interval_ms = 10
//!
//! [logging]
//! # tracing filter directive, RUST_LOG overrides it
//! level = "info"
//! # Defaults to ~/.vtconsole/vtconsole.log
//! file = "C:/temp/vtconsole.log"
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

const CONFIG_DIR: &str = ".vtconsole";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Failed to write config: {0}")]
    Write(#[source] std::io::Error),

    #[error("Could not determine config path")]
    NoHome,
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Main configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub console: ConsoleConfig,
    pub input: InputConfig,
    pub logging: LoggingConfig,
}

/// Console setup done once at startup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    pub attach_parent: bool,
    pub processed_output: bool,
    pub wrap_at_eol: bool,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            attach_parent: true,
            processed_output: true,
            wrap_at_eol: true,
        }
    }
}

/// Key input settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    pub poll_interval_ms: u64,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self { poll_interval_ms: 10 }
    }
}

impl InputConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

/// Log output settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

impl LoggingConfig {
    /// Log file to use: the configured one, or the default next to the config
    pub fn log_path(&self) -> PathBuf {
        self.file
            .clone()
            .or_else(|| config_dir().map(|dir| dir.join("vtconsole.log")))
            .unwrap_or_else(|| PathBuf::from("vtconsole.log"))
    }
}

impl Config {
    /// Load configuration from the default file, falling back to defaults
    pub fn load() -> Self {
        let Some(path) = Self::get_config_path() else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }
        match Self::load_from(&path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Ignoring config: {}", e);
                Self::default()
            }
        }
    }

    /// Load configuration from a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Save configuration to the default file
    pub fn save(&self) -> Result<()> {
        let path = Self::get_config_path().ok_or(ConfigError::NoHome)?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(ConfigError::Write)?;
        }
        fs::write(path, content).map_err(ConfigError::Write)
    }

    /// Get config file path
    fn get_config_path() -> Option<PathBuf> {
        config_dir().map(|dir| dir.join("config.toml"))
    }
}

fn config_dir() -> Option<PathBuf> {
    home_dir().map(|home| home.join(CONFIG_DIR))
}

/// Get home directory
fn home_dir() -> Option<PathBuf> {
    std::env::var_os("USERPROFILE")
        .or_else(|| std::env::var_os("HOME"))
        .map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(config.console.attach_parent);
        assert!(config.console.processed_output);
        assert!(config.console.wrap_at_eol);
        assert_eq!(config.input.poll_interval(), Duration::from_millis(10));
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_partial_file() {
        let config = Config::parse(
            r#"
            [console]
            wrap_at_eol = false

            [logging]
            level = "debug"
            file = "out.log"
            "#,
        )
        .unwrap();

        assert!(!config.console.wrap_at_eol);
        assert!(config.console.processed_output);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.log_path(), PathBuf::from("out.log"));
        assert_eq!(config.input, InputConfig::default());
    }

    #[test]
    fn test_invalid_file() {
        let err = Config::parse("[input]\npoll_interval_ms = \"soon\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_zero_poll_interval_clamped() {
        let config = Config::parse("[input]\npoll_interval_ms = 0").unwrap();
        assert_eq!(config.input.poll_interval(), Duration::from_millis(1));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = std::env::temp_dir().join(format!("vtconsole-config-{}", std::process::id()));
        let path = dir.join("config.toml");

        let mut config = Config::default();
        config.console.attach_parent = false;
        config.logging.file = Some(PathBuf::from("x.log"));
        config.save_to(&path).unwrap();

        assert_eq!(Config::load_from(&path).unwrap(), config);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_missing_file() {
        let err = Config::load_from(Path::new("/nonexistent/vtconsole.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
