//! Configuration file management.
//!
//! This module handles loading, parsing, and merging configuration from TOML
//! files and command-line arguments. Settings can be specified in multiple
//! places with clear precedence rules.
//!
//! # Configuration Precedence
//!
//! 1. Default values (lowest priority)
//! 2. Configuration file (certwarn.toml or specified with --config)
//! 3. Command-line arguments (highest priority)
//!
//! # Example Configuration File
//!
//! ```toml
//! hosts = ["example.com", "example.org"]
//! timeout_secs = 30
//!
//! [warn]
//! years = 0
//! months = 0
//! days = 30
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::{WarningThreshold, DEFAULT_TIMEOUT_SECS};

/// Main configuration structure.
///
/// All fields are optional to support partial configuration and merging.
/// Missing values will be filled in by defaults or overridden by CLI
/// arguments.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    /// List of hosts to check
    pub hosts: Option<Vec<String>>,
    /// Connect/read timeout in seconds
    pub timeout_secs: Option<u64>,
    /// Warning window configuration
    pub warn: Option<WarnConfig>,
}

/// Warning window configuration.
///
/// Certificates expiring within this window of the current time are
/// reported.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WarnConfig {
    pub years: Option<u32>,
    pub months: Option<u32>,
    pub days: Option<u32>,
}

impl Config {
    /// Loads configuration from a TOML file.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the TOML configuration file
    ///
    /// # Returns
    ///
    /// * `Ok(Config)` - Successfully parsed configuration
    /// * `Err(ConfigError::Io)` - File could not be read
    /// * `Err(ConfigError::Parse)` - File contains invalid TOML
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content =
            fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io(e.to_string()))?;

        let config: Config =
            toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;

        Ok(config)
    }

    /// Creates a default configuration with sensible defaults.
    ///
    /// # Default Values
    ///
    /// - `hosts`: None (must be provided)
    /// - `timeout_secs`: 30
    /// - `warn`: {0 years, 0 months, 30 days}
    pub fn default() -> Self {
        Config {
            hosts: None,
            timeout_secs: Some(DEFAULT_TIMEOUT_SECS),
            warn: Some(WarnConfig {
                years: Some(0),
                months: Some(0),
                days: Some(30),
            }),
        }
    }

    /// Merges this configuration with another, prioritizing the other's
    /// values.
    ///
    /// For each field, if the `other` config has a value (Some), it
    /// overrides this config's value. If the `other` value is None, keeps
    /// the current value.
    pub fn merge_with(mut self, other: Config) -> Self {
        if other.hosts.is_some() {
            self.hosts = other.hosts;
        }
        if other.timeout_secs.is_some() {
            self.timeout_secs = other.timeout_secs;
        }
        if let Some(other_warn) = other.warn {
            if let Some(ref mut self_warn) = self.warn {
                if other_warn.years.is_some() {
                    self_warn.years = other_warn.years;
                }
                if other_warn.months.is_some() {
                    self_warn.months = other_warn.months;
                }
                if other_warn.days.is_some() {
                    self_warn.days = other_warn.days;
                }
            } else {
                self.warn = Some(other_warn);
            }
        }
        self
    }

    /// Creates a Config from command-line arguments for merging.
    ///
    /// Only provided arguments (Some values) will override other
    /// configurations.
    pub fn from_cli_args(
        hosts: Option<Vec<String>>,
        timeout_secs: Option<u64>,
        warn_years: Option<u32>,
        warn_months: Option<u32>,
        warn_days: Option<u32>,
    ) -> Self {
        Config {
            hosts,
            timeout_secs,
            warn: Some(WarnConfig {
                years: warn_years,
                months: warn_months,
                days: warn_days,
            }),
        }
    }

    /// The warning threshold this configuration resolves to.
    pub fn warning_threshold(&self) -> WarningThreshold {
        let defaults = WarningThreshold::default();
        match &self.warn {
            Some(warn) => WarningThreshold {
                years: warn.years.unwrap_or(defaults.years),
                months: warn.months.unwrap_or(defaults.months),
                days: warn.days.unwrap_or(defaults.days),
            },
            None => defaults,
        }
    }

    /// The connect/read timeout this configuration resolves to.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }

    /// Generates an example configuration file in TOML format.
    ///
    /// Creates a sample configuration with all available options set to
    /// example values. Useful for bootstrapping a new configuration file.
    pub fn example_toml() -> String {
        let example = Config {
            hosts: Some(vec![
                "example.com".to_string(),
                "example.org".to_string(),
                "expired.badssl.com".to_string(),
            ]),
            timeout_secs: Some(DEFAULT_TIMEOUT_SECS),
            warn: Some(WarnConfig {
                years: Some(0),
                months: Some(0),
                days: Some(30),
            }),
        };

        toml::to_string_pretty(&example)
            .unwrap_or_else(|_| "# Error generating example".to_string())
    }
}

/// Errors that can occur during configuration loading and parsing.
#[derive(Debug)]
pub enum ConfigError {
    /// I/O error (file not found, permission denied, etc.)
    Io(String),
    /// TOML parsing error (invalid syntax, type mismatch, etc.)
    Parse(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(msg) => write!(f, "IO Error: {}", msg),
            ConfigError::Parse(msg) => write!(f, "Parse Error: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_config_from_toml() {
        let toml_content = r#"
            hosts = ["example.com", "example.org"]
            timeout_secs = 10

            [warn]
            years = 1
            months = 2
            days = 3
        "#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();

        let config = Config::from_file(temp_file.path()).unwrap();

        assert_eq!(
            config.hosts,
            Some(vec!["example.com".to_string(), "example.org".to_string()])
        );
        assert_eq!(config.timeout_secs, Some(10));

        let warn = config.warn.unwrap();
        assert_eq!(warn.years, Some(1));
        assert_eq!(warn.months, Some(2));
        assert_eq!(warn.days, Some(3));
    }

    #[test]
    fn test_config_merge() {
        let base_config = Config {
            hosts: Some(vec!["base.com".to_string()]),
            timeout_secs: Some(30),
            warn: Some(WarnConfig {
                years: Some(0),
                months: Some(0),
                days: Some(30),
            }),
        };

        let override_config = Config {
            hosts: Some(vec!["override.com".to_string()]),
            timeout_secs: None,
            warn: Some(WarnConfig {
                years: None,
                months: None,
                days: Some(14),
            }),
        };

        let merged = base_config.merge_with(override_config);

        // Override config should take precedence where specified
        assert_eq!(merged.hosts, Some(vec!["override.com".to_string()]));
        assert_eq!(merged.timeout_secs, Some(30)); // From base (not overridden)

        let warn = merged.warn.unwrap();
        assert_eq!(warn.years, Some(0)); // From base
        assert_eq!(warn.months, Some(0)); // From base
        assert_eq!(warn.days, Some(14)); // Overridden
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();

        assert_eq!(config.hosts, None);
        assert_eq!(config.timeout_secs, Some(30));

        let warn = config.warn.unwrap();
        assert_eq!(warn.years, Some(0));
        assert_eq!(warn.months, Some(0));
        assert_eq!(warn.days, Some(30));
    }

    #[test]
    fn test_config_from_cli_args() {
        let config = Config::from_cli_args(
            Some(vec!["cli.com".to_string()]),
            Some(5),
            None,
            Some(6),
            Some(7),
        );

        assert_eq!(config.hosts, Some(vec!["cli.com".to_string()]));
        assert_eq!(config.timeout_secs, Some(5));

        let warn = config.warn.unwrap();
        assert_eq!(warn.years, None);
        assert_eq!(warn.months, Some(6));
        assert_eq!(warn.days, Some(7));
    }

    #[test]
    fn test_warning_threshold_resolution() {
        let config = Config::default().merge_with(Config::from_cli_args(
            None,
            None,
            None,
            Some(6),
            None,
        ));

        let threshold = config.warning_threshold();
        assert_eq!(threshold.years, 0);
        assert_eq!(threshold.months, 6);
        assert_eq!(threshold.days, 30);
    }

    #[test]
    fn test_timeout_resolution() {
        let config = Config::default();
        assert_eq!(config.timeout(), Duration::from_secs(30));

        let config = config.merge_with(Config::from_cli_args(None, Some(5), None, None, None));
        assert_eq!(config.timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_invalid_toml() {
        let invalid_toml = "hosts = [invalid toml";

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(invalid_toml.as_bytes()).unwrap();

        let result = Config::from_file(temp_file.path());
        assert!(result.is_err());

        match result.unwrap_err() {
            ConfigError::Parse(_) => {} // Expected
            other => panic!("Expected ParseError, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_file() {
        let result = Config::from_file("/nonexistent/certwarn.toml");
        match result.unwrap_err() {
            ConfigError::Io(_) => {} // Expected
            other => panic!("Expected IoError, got {:?}", other),
        }
    }

    #[test]
    fn test_example_toml_generation() {
        let example = Config::example_toml();

        // Should be valid TOML
        let parsed: Config = toml::from_str(&example).unwrap();

        // Should contain expected fields
        assert!(parsed.hosts.is_some());
        assert!(parsed.timeout_secs.is_some());
        assert!(parsed.warn.is_some());
    }
}
