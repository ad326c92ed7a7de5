use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use weave_core::{ConfigurationError, ServiceConfig, ServiceSpec};

use crate::table::ServiceTable;

/// Declarative description of a plugin.
///
/// Descriptors are usually deserialized from a file, but can be built in code
/// as well:
///
/// ```rust,ignore
/// let desc = PluginDescriptor::new("pluginB")
///     .with_path("pluginB")
///     .service("B.a", "./a << timeout")
///     .service("B.b", ServiceConfig::func(my_factory).require(Requirement::service("B.a")))
///     .export("B.a")
///     .export("B.b");
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PluginDescriptor {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Base path that module paths are resolved against.
    #[serde(default)]
    pub path: String,

    #[serde(default)]
    pub services: ServiceTable<ServiceSpec>,

    /// Names of services visible to other plugins.
    #[serde(default)]
    pub exports: Vec<String>,
}

impl PluginDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Declares a service; a later declaration with the same name replaces it.
    pub fn service(mut self, name: impl Into<String>, spec: impl Into<ServiceSpec>) -> Self {
        self.services.insert(name.into(), spec.into());
        self
    }

    pub fn export(mut self, name: impl Into<String>) -> Self {
        self.exports.push(name.into());
        self
    }

    /// Normalizes every service declaration and validates the export list.
    pub(crate) fn normalize(&self) -> Result<PluginDecl, ConfigurationError> {
        let services = self
            .services
            .iter()
            .map(|(name, spec)| {
                spec.normalize(name)
                    .map(|config| (name.to_string(), config))
                    .map_err(|e| e.in_service(&self.name, name))
            })
            .collect::<Result<ServiceTable<_>, _>>()?;

        let mut exports = BTreeSet::new();
        for name in &self.exports {
            if !services.contains_key(name) {
                return Err(ConfigurationError::UnknownExport {
                    plugin: self.name.clone(),
                    service: name.clone(),
                });
            }
            exports.insert(name.clone());
        }

        Ok(PluginDecl {
            name: self.name.clone(),
            description: self.description.clone(),
            path: self.path.clone(),
            services,
            exports,
        })
    }
}

/// A descriptor after normalization; every declaration is well-formed.
#[derive(Debug, Clone)]
pub(crate) struct PluginDecl {
    pub name: String,
    pub description: Option<String>,
    pub path: String,
    pub services: ServiceTable<ServiceConfig>,
    pub exports: BTreeSet<String>,
}
