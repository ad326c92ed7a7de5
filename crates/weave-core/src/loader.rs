//! Module resolution boundary.
//!
//! The container never knows where factories live.  It asks a
//! [`ModuleLoader`] to turn a module path (relative to the owning plugin's
//! path) into a [`Module`], and an external library identifier into a value.
//!
//! Crates can contribute modules and libraries at compile time through the
//! [`MODULE_REGISTRY`] and [`LIBRARY_REGISTRY`] distributed slices, usually via
//! the `#[register_module]` / `#[register_library]` attribute macros.

use linkme::distributed_slice;

use crate::error::LoadError;
use crate::value::{Factory, ModuleFn, ServiceValue};

/// What a module path resolves to.
#[derive(Debug, Clone)]
pub enum Module {
    /// A callable factory.
    Factory(Factory),
    /// A plain value; not usable as a factory.
    Value(ServiceValue),
}

/// Resolves module paths and library identifiers.
pub trait ModuleLoader: Send + Sync {
    /// Resolves `module` relative to `plugin_path`.
    fn load_module(&self, plugin_path: &str, module: &str) -> Result<Module, LoadError>;

    /// Resolves an external library by identifier.
    fn load_library(&self, identifier: &str) -> Result<ServiceValue, LoadError>;
}

/// Loader that knows no modules; every lookup fails.
///
/// Useful when every service supplies its factory directly.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoModules;

impl ModuleLoader for NoModules {
    fn load_module(&self, plugin_path: &str, module: &str) -> Result<Module, LoadError> {
        Err(LoadError::ModuleNotFound(join_module_path(plugin_path, module)))
    }

    fn load_library(&self, identifier: &str) -> Result<ServiceValue, LoadError> {
        Err(LoadError::LibraryNotFound(identifier.to_string()))
    }
}

/// Joins a plugin path and a module path into a registry key.
///
/// Segments are separated by `/`; empty and `.` segments are dropped and `..`
/// pops the previous segment.
///
/// ```rust,ignore
/// assert_eq!(join_module_path("plugins/a/", "./b.js"), "plugins/a/b.js");
/// ```
pub fn join_module_path(plugin_path: &str, module: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for segment in plugin_path.split('/').chain(module.split('/')) {
        match segment.trim() {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            s => parts.push(s),
        }
    }
    parts.join("/")
}

// =============================================================================
// Compile-time registries (linkme distributed slices)
// =============================================================================

/// A factory registered under a full module path.
#[derive(Debug, Clone, Copy)]
pub struct ModuleEntry {
    pub path: &'static str,
    pub factory: ModuleFn,
}

/// An external library registered under an identifier.
#[derive(Debug, Clone, Copy)]
pub struct LibraryEntry {
    pub name: &'static str,
    pub load: fn() -> ServiceValue,
}

/// Every `#[register_module]` factory linked into the binary.
#[distributed_slice]
pub static MODULE_REGISTRY: [ModuleEntry];

/// Every `#[register_library]` library linked into the binary.
#[distributed_slice]
pub static LIBRARY_REGISTRY: [LibraryEntry];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_module_path() {
        assert_eq!(join_module_path("pluginA", "./a.js"), "pluginA/a.js");
        assert_eq!(join_module_path("pluginA/", "/a"), "pluginA/a");
        assert_eq!(join_module_path("", "common/timeout"), "common/timeout");
        assert_eq!(join_module_path("plugins/b", "../common/x"), "plugins/common/x");
    }

    #[test]
    fn test_no_modules_always_fails() {
        assert_eq!(
            NoModules.load_module("p", "./m").unwrap_err(),
            LoadError::ModuleNotFound("p/m".into())
        );
        assert!(NoModules.load_library("serde").is_err());
    }
}
