//! # Weave Framework
//!
//! The resolution engine of the Weave service container.
//!
//! This layer provides:
//! - [`PluginDescriptor`]: declarative plugin description (services + exports)
//! - [`Plugin`] / [`Service`]: live plugins and the per-service state machine
//! - [`Registry`]: exported-name → future map, populated before resolution
//! - [`ServiceTable`]: name-keyed table in declaration order
//! - [`Container`]: validation, pre-registration, concurrent resolution and
//!   lookup, with a static dependency-cycle check
//! - [`ContainerInfo`]: serializable diagnostics snapshot with a table view

pub mod container;
mod cycle;
pub mod diagnostics;
pub mod plugin;
pub mod registry;
pub mod table;

pub use container::{Container, ContainerBuilder, ContainerContext};
pub use diagnostics::{
    ContainerInfo, ErrorInfo, PluginInfo, RequirementInfo, RequirementState, ServiceInfo,
};
pub use plugin::{Plugin, PluginDescriptor, Service};
pub use registry::{CONTEXT_SERVICE, ErrorReport, Registry};
pub use table::ServiceTable;
