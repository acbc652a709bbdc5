//! Process environment: `.env`, config directory, and the loaded config.

use coordinator_core::config::CoordinatorConfig;
use coordinator_core::error::CoreError;

use std::env;
use std::path::PathBuf;

use log::debug;

/// Environment variable naming the directory that holds `coordinator.json`.
pub const CONFIG_DIR_ENV: &str = "WS_COORDINATOR_CONFIG_DIR";

/// Used when [`CONFIG_DIR_ENV`] is unset or empty.
pub const DEFAULT_CONFIG_DIR: &str = ".";

/// Load a `.env` file from the working directory or its parents, if any.
///
/// Returns the path that was loaded. Variables already set in the process
/// environment win over the file.
pub fn load_dotenv() -> Option<PathBuf> {
    dotenvy::dotenv().ok()
}

/// Resolve the config directory from a raw env value.
pub fn config_dir_from(value: Option<String>) -> PathBuf {
    match value {
        Some(dir) if !dir.trim().is_empty() => PathBuf::from(dir),
        _ => PathBuf::from(DEFAULT_CONFIG_DIR),
    }
}

/// Config directory from [`CONFIG_DIR_ENV`].
pub fn config_dir() -> PathBuf {
    config_dir_from(env::var(CONFIG_DIR_ENV).ok())
}

/// Load and validate `coordinator.json` from [`config_dir`].
///
/// # Errors
///
/// Returns [`CoreError::Config`] when the file exists but is unreadable or invalid.
pub fn load_config() -> Result<CoordinatorConfig, CoreError> {
    let dir = config_dir();
    debug!("Loading config from {}", dir.display());
    Ok(CoordinatorConfig::load(&dir)?)
}
