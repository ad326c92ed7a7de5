//! # Weave
//!
//! A plugin service container.  Plugins declare named services, what each
//! service needs, and which services other plugins may see.  The container
//! resolves every service concurrently as soon as its requirements are
//! available and reports anything that cannot be resolved.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────┐     ┌──────────────────────────────────────────────┐
//! │    Runtime    │────▶│ Container                                    │
//! │ (config, logs,│     │  Registry: exported name ──▶ Pending value   │
//! │  descriptors) │     │  Plugin "A" ── Service A.a ── Service A.b    │
//! └───────────────┘     │  Plugin "B" ── Service B.a ──▶ (A.b export)  │
//!         │             └──────────────────────────────────────────────┘
//!         ▼                                │
//!  ModuleRegistry  ◀──── module paths ─────┘
//! ```
//!
//! - **Core** (`weave-core`): values, factories, requirements, futures
//! - **Framework** (`weave-framework`): plugins, services, the container
//! - **Runtime** (`weave-runtime`): configuration, logging, lifecycle
//! - **Macros** (`weave-macros`): compile-time module registration
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use weave::prelude::*;
//!
//! #[register_module("greeter/hello")]
//! fn hello(_: Arguments) -> FactoryResult {
//!     Ok(Produced::value("hello"))
//! }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = WeaveRuntime::new().with_plugin(
//!         PluginDescriptor::new("greeter")
//!             .with_path("greeter")
//!             .service("greeter.hello", "./hello")
//!             .export("greeter.hello"),
//!     );
//!     runtime.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `macros`: `#[register_module]` / `#[register_library]` (default)
//! - `toml-config` / `yaml-config`: configuration and descriptor formats
//! - `json-log`: JSON log output

pub use weave_core as core;
pub use weave_framework as framework;
pub use weave_runtime as runtime;

pub use weave_core::{
    Arguments, BoxError, ConfigurationError, Factory, FactoryResult, Produced, Requirement,
    ResolveError, ServiceConfig, ServiceStatus, ServiceValue,
};
pub use weave_framework::{Container, ContainerContext, ContainerInfo, PluginDescriptor};
#[cfg(feature = "macros")]
pub use weave_macros::{register_library, register_module};
pub use weave_runtime::{ModuleRegistry, RuntimeError, WeaveRuntime};

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use weave::prelude::*;
/// ```
pub mod prelude {
    // Runtime - main entry point
    pub use weave_runtime::{ModuleRegistry, WeaveRuntime};

    // Declaring plugins and services
    pub use weave_core::{Requirement, ServiceConfig};
    pub use weave_framework::PluginDescriptor;

    // Writing factories
    pub use weave_core::{Arguments, BoxError, Factory, FactoryResult, Produced, ServiceValue};

    // Looking services up
    pub use weave_core::{ResolveError, ServiceStatus};
    pub use weave_framework::{Container, ContainerContext};

    #[cfg(feature = "macros")]
    pub use weave_macros::{register_library, register_module};

    pub use weave_runtime::prelude::*;
}
