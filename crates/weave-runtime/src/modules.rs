//! Table-backed [`ModuleLoader`].
//!
//! A [`ModuleRegistry`] maps full module paths (`pluginA/a.js`) to factories
//! or values, and library identifiers to values.  Entries come from the
//! `#[register_module]` / `#[register_library]` distributed slices, from code,
//! or both.

use std::collections::HashMap;

use tracing::{debug, warn};

use weave_core::{
    Factory, LIBRARY_REGISTRY, LoadError, MODULE_REGISTRY, Module, ModuleLoader, ServiceValue,
    join_module_path,
};

#[derive(Debug, Clone, Default)]
pub struct ModuleRegistry {
    modules: HashMap<String, Module>,
    libraries: HashMap<String, ServiceValue>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collects every module and library linked into the binary.
    pub fn collect_all() -> Self {
        let mut registry = Self::new();
        for entry in MODULE_REGISTRY {
            registry.insert_module(entry.path, Module::Factory(Factory::from_fn(entry.factory)));
        }
        for entry in LIBRARY_REGISTRY {
            registry.insert_library(entry.name, (entry.load)());
        }
        debug!(
            modules = registry.modules.len(),
            libraries = registry.libraries.len(),
            "Collected registered modules"
        );
        registry
    }

    /// Registers a factory under `path`.
    pub fn module(mut self, path: &str, factory: Factory) -> Self {
        self.insert_module(path, Module::Factory(factory));
        self
    }

    /// Registers a plain value under `path`; it cannot serve as a factory.
    pub fn value(mut self, path: &str, value: ServiceValue) -> Self {
        self.insert_module(path, Module::Value(value));
        self
    }

    pub fn library(mut self, name: &str, value: ServiceValue) -> Self {
        self.insert_library(name, value);
        self
    }

    /// Inserts a module unless its normalized path is taken.  Returns `false`
    /// on a duplicate; the first entry is kept.
    pub fn insert_module(&mut self, path: &str, module: Module) -> bool {
        let key = join_module_path("", path);
        if self.modules.contains_key(&key) {
            warn!(path = %key, "Duplicate module registration, keeping the first");
            return false;
        }
        self.modules.insert(key, module);
        true
    }

    pub fn insert_library(&mut self, name: &str, value: ServiceValue) -> bool {
        if self.libraries.contains_key(name) {
            warn!(library = name, "Duplicate library registration, keeping the first");
            return false;
        }
        self.libraries.insert(name.to_string(), value);
        true
    }

    /// Absorbs `other`; entries already present win.
    pub fn extend(&mut self, other: ModuleRegistry) {
        for (path, module) in other.modules {
            self.insert_module(&path, module);
        }
        for (name, value) in other.libraries {
            self.insert_library(&name, value);
        }
    }

    pub fn module_paths(&self) -> impl Iterator<Item = &str> {
        self.modules.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.modules.len() + self.libraries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty() && self.libraries.is_empty()
    }
}

impl ModuleLoader for ModuleRegistry {
    fn load_module(&self, plugin_path: &str, module: &str) -> Result<Module, LoadError> {
        let key = join_module_path(plugin_path, module);
        self.modules
            .get(&key)
            .cloned()
            .ok_or(LoadError::ModuleNotFound(key))
    }

    fn load_library(&self, identifier: &str) -> Result<ServiceValue, LoadError> {
        self.libraries
            .get(identifier)
            .cloned()
            .ok_or_else(|| LoadError::LibraryNotFound(identifier.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weave_core::{Arguments, Produced};

    fn seven(_: Arguments) -> weave_core::FactoryResult {
        Ok(Produced::value(7_u32))
    }

    #[test]
    fn test_lookup_relative_to_plugin_path() {
        let registry = ModuleRegistry::new()
            .module("pluginA/a.js", Factory::from_fn(seven))
            .value("pluginA/data", ServiceValue::new(1_u8));

        assert!(matches!(
            registry.load_module("pluginA", "./a.js"),
            Ok(Module::Factory(_))
        ));
        assert!(matches!(
            registry.load_module("pluginA/", "data"),
            Ok(Module::Value(_))
        ));
        assert_eq!(
            registry.load_module("pluginB", "./a.js").unwrap_err(),
            LoadError::ModuleNotFound("pluginB/a.js".into())
        );
    }

    #[test]
    fn test_first_registration_wins() {
        let mut registry = ModuleRegistry::new().library("serde", ServiceValue::new("first"));
        assert!(!registry.insert_library("serde", ServiceValue::new("second")));
        assert!(registry.insert_module("./x", Module::Value(ServiceValue::new(0_u8))));
        assert!(!registry.insert_module("x", Module::Value(ServiceValue::new(1_u8))));

        let value = registry.load_library("serde").unwrap();
        assert_eq!(value.downcast_ref::<&str>(), Some(&"first"));
        assert!(registry.load_library("tokio").is_err());
    }
}
