//! Runtime error types.

use std::path::PathBuf;

use thiserror::Error;
use weave_core::ConfigurationError;

use crate::config::ConfigError;

/// Errors that can occur while setting up or running the container.
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A plugin descriptor is malformed.
    #[error("Invalid plugin declaration: {0}")]
    Declaration(#[from] ConfigurationError),

    #[error("Plugin descriptor not found: {0}")]
    DescriptorNotFound(PathBuf),

    /// A descriptor file exists but could not be read or parsed.
    #[error("Failed to load plugin descriptor {path}: {message}")]
    DescriptorLoad { path: PathBuf, message: String },

    #[error("Runtime already started")]
    AlreadyStarted,
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
