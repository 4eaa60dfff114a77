//! Configuration loading and discovery for `overlay-labels.toml`
//!
//! Provides functions to find, load, and merge configuration.

use super::schema::LabelsConfig;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name searched for during discovery
pub const CONFIG_FILE_NAME: &str = "overlay-labels.toml";

/// Configuration loading error
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// File I/O error
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error
    #[error("Failed to parse overlay-labels.toml: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error
    #[error("Config validation failed:\n{}", bullet_list(.0))]
    Validation(Vec<String>),
}

fn bullet_list(errors: &[String]) -> String {
    errors.iter().map(|e| format!("  - {}", e)).collect::<Vec<_>>().join("\n")
}

/// CLI arguments that can override config values
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    /// Override HTTP timeout
    pub timeout_secs: Option<u64>,
    /// Number of `-v` flags given
    pub verbose: u8,
}

/// Find the config file by walking up from the current working directory,
/// then falling back to the XDG config directory.
pub fn find_config() -> Option<PathBuf> {
    if let Ok(cwd) = env::current_dir() {
        if let Some(path) = find_config_from(cwd) {
            return Some(path);
        }
    }

    find_xdg_config()
}

/// Find the config file in the XDG config directory.
///
/// Checks XDG_CONFIG_HOME/overlay-labels/ or ~/.config/overlay-labels/
pub fn find_xdg_config() -> Option<PathBuf> {
    let xdg_config = env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|_| env::var("HOME").map(|h| PathBuf::from(h).join(".config")))
        .ok()?;

    let config_path = xdg_config.join("overlay-labels").join(CONFIG_FILE_NAME);
    config_path.exists().then_some(config_path)
}

/// Find the config file by walking up from a specific directory.
pub fn find_config_from(start: PathBuf) -> Option<PathBuf> {
    let mut current = start;

    loop {
        let config_path = current.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            return None;
        }
    }
}

/// Load configuration.
///
/// If a path is provided, loads from that file. Otherwise, uses
/// `find_config()`; when nothing is found the defaults are returned.
pub fn load_config(path: Option<&Path>) -> Result<LabelsConfig, ConfigError> {
    let config_path = match path {
        Some(p) => Some(p.to_path_buf()),
        None => find_config(),
    };

    match config_path {
        Some(p) => load_config_file(&p),
        None => Ok(LabelsConfig::default()),
    }
}

/// Load configuration from a specific file path.
fn load_config_file(path: &Path) -> Result<LabelsConfig, ConfigError> {
    let contents = fs::read_to_string(path)?;
    let config: LabelsConfig = toml::from_str(&contents)?;

    let errors = config.validate();
    if !errors.is_empty() {
        return Err(ConfigError::Validation(errors.into_iter().map(|e| e.to_string()).collect()));
    }

    Ok(config)
}

/// Merge CLI overrides into a configuration.
///
/// CLI arguments take precedence over config file values; each `-v` raises
/// the configured log level by one step.
pub fn merge_cli_overrides(config: &mut LabelsConfig, overrides: &CliOverrides) {
    if let Some(timeout) = overrides.timeout_secs {
        config.registry.timeout_secs = timeout;
    }

    if overrides.verbose > 0 {
        config.log.level = config.log.level.raised_by(overrides.verbose);
    }
}
