//! # Weave Core
//!
//! Building blocks shared by every layer of the Weave service container:
//!
//! - **Values**: type-erased service values and the factory calling
//!   convention ([`ServiceValue`], [`Arguments`], [`Produced`], [`Factory`])
//! - **Declarations**: requirements and service declarations, including the
//!   compact `module << deps << async` shorthand ([`Requirement`],
//!   [`ServiceSpec`], [`ServiceConfig`])
//! - **Futures**: the single-assignment [`Pending`] slot each service
//!   publishes its value through
//! - **Status**: the [`ServiceStatus`] state machine
//! - **Module resolution**: the [`ModuleLoader`] boundary and the
//!   compile-time [`MODULE_REGISTRY`] / [`LIBRARY_REGISTRY`]
//! - **Errors**: [`ConfigurationError`], [`ResolveError`], [`ArgumentError`],
//!   [`LoadError`]

pub mod config;
pub mod error;
pub mod loader;
pub mod pending;
pub mod requirement;
pub mod status;
pub mod value;

pub use config::{FactorySource, ServiceConfig, ServiceDecl, ServiceSpec, parse_shorthand};
pub use error::{
    ArgumentError, BoxError, ConfigurationError, ErrorKind, LoadError, ResolveError,
};
pub use loader::{
    LIBRARY_REGISTRY, LibraryEntry, MODULE_REGISTRY, Module, ModuleEntry, ModuleLoader,
    NoModules, join_module_path,
};
pub use pending::{Outcome, Pending};
pub use requirement::{EXTERNAL_PREFIX, Requirement, RequirementSpec};
pub use status::ServiceStatus;
pub use value::{
    Arguments, DeferredValue, Factory, FactoryResult, ModuleFn, Produced, ServiceValue,
};

// Used by `#[register_module]` / `#[register_library]` expansions.
#[doc(hidden)]
pub use linkme;
