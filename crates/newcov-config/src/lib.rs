//! Configuration parsing and management for newcov.
//!
//! This crate provides:
//! - The `newcov.toml` file format
//! - Discovery of the file from the current directory upwards
//! - Precedence handling (CLI > config file > defaults)

use newcov_ports::DEFAULT_SOURCE_EXTENSION;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name searched for by [`discover_config`].
pub const CONFIG_FILE_NAME: &str = "newcov.toml";

/// Default mainline references the baseline is computed against.
pub const DEFAULT_MAINLINE: [&str; 2] = ["master", "origin/master"];

/// Default command producing the coverage report.
pub const DEFAULT_COVERAGE_COMMAND: &str = "python runtests.py";

// ============================================================================
// Errors
// ============================================================================

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Invalid configuration value.
    #[error("Invalid config value: {0}")]
    InvalidValue(String),
}

// ============================================================================
// Configuration Types
// ============================================================================

/// Output format of the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    /// Aligned text lines and a total.
    #[default]
    Text,
    /// Pretty-printed JSON.
    Json,
}

/// Contents of a `newcov.toml` file. Every key is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Baseline ref used instead of the merge-base with the mainline refs.
    #[serde(default)]
    pub base: Option<String>,

    /// Mainline refs the merge-base is computed against.
    #[serde(default)]
    pub mainline: Option<Vec<String>>,

    /// Shell command that runs the tests and prints the coverage report.
    #[serde(default)]
    pub coverage_command: Option<String>,

    /// Pre-generated coverage report, relative to the working directory.
    #[serde(default)]
    pub report: Option<PathBuf>,

    /// Extension of the source files, without the dot.
    #[serde(default)]
    pub source_extension: Option<String>,

    /// Output format.
    #[serde(default)]
    pub format: Option<Format>,
}

// ============================================================================
// Effective Configuration
// ============================================================================

/// Effective configuration with all values resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectiveConfig {
    pub base: Option<String>,
    pub mainline: Vec<String>,
    pub coverage_command: String,
    pub report: Option<PathBuf>,
    pub source_extension: String,
    pub format: Format,
}

impl Default for EffectiveConfig {
    fn default() -> Self {
        Self {
            base: None,
            mainline: DEFAULT_MAINLINE.iter().map(|r| r.to_string()).collect(),
            coverage_command: DEFAULT_COVERAGE_COMMAND.to_string(),
            report: None,
            source_extension: DEFAULT_SOURCE_EXTENSION.to_string(),
            format: Format::Text,
        }
    }
}

// ============================================================================
// Configuration Loading
// ============================================================================

/// Load configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Load configuration from a TOML string.
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(content)?;
    validate_config(&config)?;
    Ok(config)
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if let Some(mainline) = &config.mainline
        && (mainline.is_empty() || mainline.iter().any(|r| r.trim().is_empty()))
    {
        return Err(ConfigError::InvalidValue(
            "mainline must list at least one non-empty ref".to_string(),
        ));
    }
    if let Some(command) = &config.coverage_command
        && command.trim().is_empty()
    {
        return Err(ConfigError::InvalidValue(
            "coverage_command must not be blank".to_string(),
        ));
    }
    if let Some(ext) = &config.source_extension {
        validate_extension(ext)?;
    }
    Ok(())
}

/// Check that `ext` is a bare extension such as `py`.
pub fn validate_extension(ext: &str) -> Result<(), ConfigError> {
    if ext.is_empty() || ext.starts_with('.') || ext.contains(['/', '\\']) {
        return Err(ConfigError::InvalidValue(format!(
            "source_extension must be a bare extension like \"py\", got {:?}",
            ext
        )));
    }
    Ok(())
}

/// Try to find and load configuration from the standard location.
///
/// Searches for `newcov.toml` in `start` and its parent directories. A file
/// that exists but fails to load is returned as an error rather than skipped.
pub fn discover_config(start: &Path) -> Result<Option<(PathBuf, Config)>, ConfigError> {
    let mut current = start.to_path_buf();

    loop {
        let config_path = current.join(CONFIG_FILE_NAME);
        if config_path.is_file() {
            let config = load_config(&config_path)?;
            return Ok(Some((config_path, config)));
        }

        if !current.pop() {
            break;
        }
    }

    Ok(None)
}

// ============================================================================
// Precedence Resolution
// ============================================================================

/// CLI override options.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub base: Option<String>,
    pub report: Option<PathBuf>,
    pub format: Option<Format>,
}

/// Resolve effective configuration from the config file and CLI overrides.
///
/// Precedence: CLI > config file > defaults
pub fn resolve_config(config: Option<&Config>, cli: &CliOverrides) -> EffectiveConfig {
    let mut effective = EffectiveConfig::default();

    if let Some(config) = config {
        if let Some(base) = &config.base {
            effective.base = Some(base.clone());
        }
        if let Some(mainline) = &config.mainline {
            effective.mainline = mainline.clone();
        }
        if let Some(command) = &config.coverage_command {
            effective.coverage_command = command.clone();
        }
        if let Some(report) = &config.report {
            effective.report = Some(report.clone());
        }
        if let Some(ext) = &config.source_extension {
            effective.source_extension = ext.clone();
        }
        if let Some(format) = config.format {
            effective.format = format;
        }
    }

    if let Some(base) = &cli.base {
        effective.base = Some(base.clone());
    }
    if let Some(report) = &cli.report {
        effective.report = Some(report.clone());
    }
    if let Some(format) = cli.format {
        effective.format = format;
    }

    effective
}
