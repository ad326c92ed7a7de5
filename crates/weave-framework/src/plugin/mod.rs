//! Plugins and the services they own.
//!
//! - [`PluginDescriptor`]: declarative description, deserializable from files
//! - [`Plugin`]: the live namespace built from a descriptor
//! - [`Service`]: one service and its resolution state machine

mod core;
mod descriptor;
mod service;

pub use self::core::Plugin;
pub use descriptor::PluginDescriptor;
pub use service::Service;

pub(crate) use descriptor::PluginDecl;
pub(crate) use service::ResolveEnv;
