//! Weave Runtime - hosting layer for the Weave service container.
//!
//! This crate provides:
//! - Layered configuration (`weave.toml`, profiles, `WEAVE_*` variables)
//! - Logging setup from configuration
//! - Plugin descriptor files
//! - A [`ModuleRegistry`] collecting `#[register_module]` factories
//! - Runtime orchestration ([`WeaveRuntime`])
//!
//! ```ignore
//! use weave_runtime::WeaveRuntime;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // Reads weave.toml, sets up logging, loads `container.plugins`
//!     let runtime = WeaveRuntime::new();
//!
//!     // Resolves every service, then runs until Ctrl+C
//!     runtime.run().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod descriptors;
pub mod error;
pub mod logging;
pub mod modules;
pub mod runtime;

// Re-exports
pub use config::{
    ConfigError, ConfigLoader, ConfigResult, ContainerSettings, LoggingConfig, Profile,
    WeaveConfig,
};
pub use descriptors::{load_descriptor, load_descriptors};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::{LoggingBuilder, SpanEvents};
pub use modules::ModuleRegistry;
pub use runtime::{RuntimeBuilder, WeaveRuntime};

// Re-export tracing for use by other crates
pub use tracing;
pub use tracing_subscriber;

/// Logging macros for module code.
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
