use std::collections::BTreeSet;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{Instrument, debug, debug_span, info};

use weave_core::{Pending, ServiceStatus};

use super::descriptor::PluginDecl;
use super::service::{ResolveEnv, Service};
use crate::registry::Registry;
use crate::table::ServiceTable;

/// A namespace of services, a subset of which is exported.
///
/// Non-exported services are only visible to services of the same plugin,
/// and a local name shadows an export of the same name from another plugin.
#[derive(Debug)]
pub struct Plugin {
    name: String,
    description: Option<String>,
    path: String,
    services: ServiceTable<Arc<Service>>,
    exports: BTreeSet<String>,
}

impl Plugin {
    /// Builds every service; exported ones adopt the future pre-allocated in
    /// `registry`.
    pub(crate) fn new(decl: PluginDecl, registry: &Registry) -> Self {
        info!(plugin = %decl.name, path = %decl.path, "Initializing services");

        let services = decl
            .services
            .into_iter()
            .map(|(name, config)| {
                let exported = decl.exports.contains(&name);
                let pending = if exported {
                    debug!(plugin = %decl.name, service = %name, "Registering public service");
                    registry.get(&name).unwrap_or_default()
                } else {
                    Pending::new()
                };
                let service = Service::new(&decl.name, &name, config, exported, pending);
                (name, Arc::new(service))
            })
            .collect();

        Self {
            name: decl.name,
            description: decl.description,
            path: decl.path,
            services,
            exports: decl.exports,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Base path module paths are resolved against.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns `true` if the plugin declares a service called `name`,
    /// exported or not.
    pub fn has(&self, name: &str) -> bool {
        self.services.contains_key(name)
    }

    /// Future of a local service.
    pub fn get(&self, name: &str) -> Option<Pending> {
        self.services.get(name).map(|s| s.pending().clone())
    }

    pub fn service(&self, name: &str) -> Option<&Arc<Service>> {
        self.services.get(name)
    }

    pub fn services(&self) -> impl Iterator<Item = &Arc<Service>> {
        self.services.values()
    }

    pub fn exports(&self) -> impl Iterator<Item = &str> {
        self.exports.iter().map(String::as_str)
    }

    pub fn is_exported(&self, name: &str) -> bool {
        self.exports.contains(name)
    }

    /// Spawns one resolution task per pending service.
    pub(crate) fn resolve_services(self: &Arc<Self>, env: &ResolveEnv) -> Vec<JoinHandle<()>> {
        self.services
            .values()
            .filter(|service| service.status() == ServiceStatus::Pending)
            .map(|service| {
                let plugin = Arc::clone(self);
                let service = Arc::clone(service);
                let env = env.clone();
                let span = debug_span!("resolve", plugin = %plugin.name, service = %service.name());
                tokio::spawn(
                    async move { service.resolve(&plugin, &env).await }.instrument(span),
                )
            })
            .collect()
    }
}
