//! Configuration validation utilities.

use std::collections::HashSet;

use super::error::{ConfigError, ConfigResult};
use super::schema::{ContainerSettings, LogOutput, LoggingConfig, WeaveConfig};

/// Validates the entire configuration.
pub fn validate_config(config: &WeaveConfig) -> ConfigResult<()> {
    validate_logging_config(&config.logging)?;
    validate_container_settings(&config.container)?;
    Ok(())
}

fn validate_logging_config(logging: &LoggingConfig) -> ConfigResult<()> {
    for target in logging.filters.keys() {
        if target.trim().is_empty() {
            return Err(ConfigError::validation("Log filter target cannot be empty"));
        }
        if target.contains(['=', ',', ' ']) {
            return Err(ConfigError::validation(format!(
                "Invalid log filter target: '{target}'"
            )));
        }
    }

    if logging.output == LogOutput::File {
        if logging.file_path.is_none() {
            return Err(ConfigError::missing_field("logging.file_path"));
        }
        if logging.max_file_size == 0 {
            return Err(ConfigError::validation(
                "Maximum log file size must be greater than 0",
            ));
        }
        if logging.max_files == 0 {
            return Err(ConfigError::validation(
                "Maximum number of log files must be greater than 0",
            ));
        }
    }

    Ok(())
}

fn validate_container_settings(container: &ContainerSettings) -> ConfigResult<()> {
    if container.root.as_os_str().is_empty() {
        return Err(ConfigError::missing_field("container.root"));
    }

    let mut seen = HashSet::new();
    for path in &container.plugins {
        if path.as_os_str().is_empty() {
            return Err(ConfigError::validation(
                "Plugin descriptor path cannot be empty",
            ));
        }
        if !seen.insert(path) {
            return Err(ConfigError::DuplicatePluginPath(path.clone()));
        }
    }

    Ok(())
}
