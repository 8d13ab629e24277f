//! Configuration module for the ocshim bridge
//!
//! This module provides TOML-based configuration parsing and validation
//! for the static library.

use crate::auth::CertVerdict;
use crate::error::{Result, ShimError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// How variadic progress messages are handed to Rust
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProgressMode {
    /// Format in C, deliver finished text
    #[default]
    Formatted,
    /// Deliver the format string with an unconsumed argument cursor
    Forward,
}

/// Progress callback settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProgressConfig {
    #[serde(default)]
    pub mode: ProgressMode,
}

/// Certificate validation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CertificateConfig {
    /// Verdict returned when no handler is registered or the handler panics
    #[serde(default = "default_unhandled_verdict")]
    pub unhandled: CertVerdict,
}

impl Default for CertificateConfig {
    fn default() -> Self {
        Self {
            unhandled: default_unhandled_verdict(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Register a handler that re-emits library messages through `log`
    #[serde(default)]
    pub forward_to_log: bool,
    /// Target used for forwarded records
    #[serde(default = "default_log_target")]
    pub target: String,
    /// Most verbose level forwarded
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            forward_to_log: false,
            target: default_log_target(),
            level: default_log_level(),
        }
    }
}

impl LoggingConfig {
    pub fn level_filter(&self) -> Result<log::LevelFilter> {
        self.level
            .parse::<log::LevelFilter>()
            .map_err(|_| ShimError::Config(format!("Unknown log level: {}", self.level)))
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BridgeConfig {
    #[serde(default)]
    pub progress: ProgressConfig,
    #[serde(default)]
    pub certificates: CertificateConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl BridgeConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;

        <Self as FromStr>::from_str(&contents)
    }

    /// Convert configuration to TOML string
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| ShimError::Config(format!("Failed to serialize config: {e}")))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.logging.target.is_empty() {
            return Err(ShimError::Config("Log target cannot be empty".to_string()));
        }

        self.logging.level_filter()?;

        Ok(())
    }
}

impl FromStr for BridgeConfig {
    type Err = ShimError;

    fn from_str(content: &str) -> Result<Self> {
        let config: BridgeConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }
}

// Default value functions for serde
fn default_unhandled_verdict() -> CertVerdict {
    CertVerdict::Reject
}

fn default_log_target() -> String {
    "openconnect".to_string()
}

fn default_log_level() -> String {
    "trace".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_config_parsing() {
        let toml_content = r#"
[progress]
mode = "forward"

[certificates]
unhandled = "accept"

[logging]
forward_to_log = true
target = "vpn"
level = "info"
"#;

        let config = toml_content
            .parse::<BridgeConfig>()
            .expect("Failed to parse config");
        assert_eq!(config.progress.mode, ProgressMode::Forward);
        assert_eq!(config.certificates.unhandled, CertVerdict::Accept);
        assert!(config.logging.forward_to_log);
        assert_eq!(config.logging.target, "vpn");
        assert_eq!(config.logging.level_filter().unwrap(), log::LevelFilter::Info);
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = "".parse::<BridgeConfig>().expect("empty config is valid");
        assert_eq!(config.progress.mode, ProgressMode::Formatted);
        assert_eq!(config.certificates.unhandled, CertVerdict::Reject);
        assert!(!config.logging.forward_to_log);
        assert_eq!(config.logging.target, "openconnect");
        assert_eq!(config.logging.level_filter().unwrap(), log::LevelFilter::Trace);
    }

    #[test]
    fn test_unknown_mode_rejected() {
        let err = "[progress]\nmode = \"simplified\"\n"
            .parse::<BridgeConfig>()
            .unwrap_err();
        assert!(matches!(err, ShimError::Config(_)));
    }

    #[test]
    fn test_config_validation() {
        let mut config = BridgeConfig::default();
        assert!(config.validate().is_ok());

        config.logging.level = "loud".to_string();
        assert!(config.validate().is_err());

        config.logging.level = "warn".to_string();
        config.logging.target = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_round_trip_keeps_mode() {
        let mut config = BridgeConfig::default();
        config.progress.mode = ProgressMode::Forward;
        let text = config.to_toml().unwrap();
        let parsed = text.parse::<BridgeConfig>().unwrap();
        assert_eq!(parsed.progress.mode, ProgressMode::Forward);
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[certificates]\nunhandled = \"accept\"").unwrap();
        let config = BridgeConfig::from_file(file.path()).unwrap();
        assert_eq!(config.certificates.unhandled, CertVerdict::Accept);

        let missing = BridgeConfig::from_file("/nonexistent/ocshim.toml");
        assert!(matches!(missing, Err(ShimError::Io(_))));
    }
}
