pub mod chat;
pub mod config_cmd;
pub mod doctor;
pub mod serve;

use std::path::Path;

use codecoach_config::{AppConfig, ConfigError};

/// Read the config file and environment overrides without validating,
/// so diagnostics can report on an incomplete setup.
pub(crate) fn load_unvalidated(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let config_path = match path {
        Some(p) => p.to_path_buf(),
        None => AppConfig::config_dir().join("config.toml"),
    };
    let mut config = AppConfig::load_from(&config_path)?;
    config.apply_env(|key| std::env::var(key).ok())?;
    Ok(config)
}
