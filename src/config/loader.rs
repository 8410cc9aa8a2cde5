// Configuration loader
// Loads ~/.notestop/config.toml (or $NOTESTOP_CONFIG), falling back to defaults

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use super::settings::{Config, ConfigError};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV: &str = "NOTESTOP_CONFIG";

/// Default config location: ~/.notestop/config.toml
pub fn config_path() -> Result<PathBuf, ConfigError> {
    let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
    Ok(home.join(".notestop").join("config.toml"))
}

/// Parse a config file. Missing keys take their defaults.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Load configuration
///
/// An explicit path (CLI flag, then environment) must exist. The default
/// location is optional: when it is absent the built-in defaults are used.
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    let from_env = std::env::var_os(CONFIG_ENV)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from);

    if let Some(path) = explicit.map(Path::to_path_buf).or(from_env) {
        let config = load_config_from(&path)
            .with_context(|| crate::errors::config_parse_error(&path.display().to_string()))?;
        tracing::debug!(path = %path.display(), "Loaded config");
        return Ok(config);
    }

    let path = config_path()?;
    if !path.exists() {
        tracing::debug!("No config at {}, using defaults", path.display());
        return Ok(Config::default());
    }

    let config = load_config_from(&path)
        .with_context(|| crate::errors::config_parse_error(&path.display().to_string()))?;
    tracing::debug!(path = %path.display(), "Loaded config");
    Ok(config)
}
