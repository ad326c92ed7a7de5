//! A single service and its resolution task.
//!
//! ```text
//! Pending ──► Resolved ──► Ready
//!    │           │
//!    │           └──► Error         (deferred value failed)
//!    ├──► Unresolvable              (no factory, missing requirement, cycle)
//!    └──► Error                     (dependency failed, factory failed)
//! ```
//!
//! Whatever the outcome, the service's own [`Pending`] is settled exactly once,
//! so dependents never wait on a service that has already given up.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::try_join_all;
use parking_lot::Mutex;
use tracing::{debug, error};

use weave_core::{
    Arguments, Factory, FactorySource, Module, ModuleLoader, Pending, Produced, Requirement,
    ResolveError, ServiceConfig, ServiceStatus, ServiceValue,
};

use super::Plugin;
use crate::registry::{ErrorReport, Registry};

/// Shared handles every resolution task needs.
#[derive(Clone)]
pub(crate) struct ResolveEnv {
    pub registry: Arc<Registry>,
    pub loader: Arc<dyn ModuleLoader>,
}

#[derive(Debug, Default)]
struct ServiceState {
    status: ServiceStatus,
    last_error: Option<ResolveError>,
}

/// A requirement gathered in step 2: either a value or a future to await.
enum Slot {
    Ready(ServiceValue),
    Awaiting { name: String, pending: Pending },
}

/// One named unit of work owned by a [`Plugin`].
#[derive(Debug)]
pub struct Service {
    name: String,
    plugin: String,
    config: ServiceConfig,
    exported: bool,
    pending: Pending,
    state: Mutex<ServiceState>,
}

impl Service {
    pub(crate) fn new(
        plugin: &str,
        name: &str,
        config: ServiceConfig,
        exported: bool,
        pending: Pending,
    ) -> Self {
        Self {
            name: name.to_string(),
            plugin: plugin.to_string(),
            config,
            exported,
            pending,
            state: Mutex::new(ServiceState::default()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the owning plugin.
    pub fn plugin(&self) -> &str {
        &self.plugin
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn requirements(&self) -> &[Requirement] {
        &self.config.requirements
    }

    pub fn is_exported(&self) -> bool {
        self.exported
    }

    pub fn status(&self) -> ServiceStatus {
        self.state.lock().status
    }

    pub fn last_error(&self) -> Option<ResolveError> {
        self.state.lock().last_error.clone()
    }

    /// The service's own future; for exported services this is the registry entry.
    pub fn pending(&self) -> &Pending {
        &self.pending
    }

    fn advance(&self, next: ServiceStatus) -> bool {
        let mut state = self.state.lock();
        if !state.status.can_transition_to(next) {
            return false;
        }
        state.status = next;
        true
    }

    /// Moves the service to the terminal status of `error`, reports it and
    /// settles the own future with it.  A service that is already terminal
    /// is left untouched.
    pub(crate) fn fail(&self, error: ResolveError, registry: &Registry) {
        let status = error.status();
        {
            let mut state = self.state.lock();
            if state.status.is_terminal() {
                return;
            }
            state.status = status;
            state.last_error = Some(error.clone());
        }

        error!(
            plugin = %self.plugin,
            service = %self.name,
            status = %status,
            error = %error,
            "Service failed"
        );
        registry.report(ErrorReport {
            plugin: self.plugin.clone(),
            service: self.name.clone(),
            status,
            error: error.clone(),
        });
        self.pending.settle(Err(error));
    }

    /// Runs the resolution algorithm once.  Does nothing unless the service
    /// is still pending.
    pub(crate) async fn resolve(&self, plugin: &Plugin, env: &ResolveEnv) {
        if self.status() != ServiceStatus::Pending {
            return;
        }

        match self.produce(plugin, env).await {
            Ok(value) => {
                self.advance(ServiceStatus::Ready);
                debug!(
                    plugin = %self.plugin,
                    service = %self.name,
                    value = value.type_name(),
                    "Service ready"
                );
                self.pending.settle(Ok(value));
            }
            Err(error) => self.fail(error, &env.registry),
        }
    }

    async fn produce(&self, plugin: &Plugin, env: &ResolveEnv) -> Result<ServiceValue, ResolveError> {
        let factory = self.locate_factory(plugin, env.loader.as_ref())?;
        let slots = self.gather(plugin, env)?;

        let args = try_join_all(slots.into_iter().map(|slot| self.settle_slot(slot))).await?;

        self.advance(ServiceStatus::Resolved);
        debug!(plugin = %self.plugin, service = %self.name, "Requirements resolved");

        let produced = match std::panic::catch_unwind(AssertUnwindSafe(|| {
            factory.call(Arguments::new(args))
        })) {
            Ok(Ok(produced)) => produced,
            Ok(Err(e)) => return Err(self.factory_failed(e.to_string())),
            Err(panic) => return Err(self.factory_failed(panic_message(panic.as_ref()))),
        };

        match produced {
            Produced::Value(value) => Ok(value),
            Produced::Deferred(_) if !self.config.is_async => Err(ResolveError::UnexpectedDeferred {
                service: self.name.clone(),
            }),
            Produced::Deferred(deferred) => {
                debug!(plugin = %self.plugin, service = %self.name, "Awaiting deferred value");
                match AssertUnwindSafe(deferred).catch_unwind().await {
                    Ok(Ok(value)) => Ok(value),
                    Ok(Err(e)) => Err(self.factory_failed(e.to_string())),
                    Err(panic) => Err(self.factory_failed(panic_message(panic.as_ref()))),
                }
            }
        }
    }

    /// Whether resolution would fail before waiting on any requirement.
    pub(crate) fn fails_immediately(&self, plugin: &Plugin, env: &ResolveEnv) -> bool {
        self.locate_factory(plugin, env.loader.as_ref()).is_err() || self.gather(plugin, env).is_err()
    }

    // ─── Steps ────────────────────────────────────────────────────────────────

    fn locate_factory(&self, plugin: &Plugin, loader: &dyn ModuleLoader) -> Result<Factory, ResolveError> {
        let path = match &self.config.factory {
            FactorySource::Func(factory) => return Ok(factory.clone()),
            FactorySource::Module(path) => path,
        };

        match loader.load_module(plugin.path(), path) {
            Ok(Module::Factory(factory)) => Ok(factory),
            Ok(Module::Value(value)) => Err(ResolveError::FactoryNotFound {
                service: self.name.clone(),
                reason: format!("module '{path}' is a {} value, not a factory", value.type_name()),
            }),
            Err(e) => Err(ResolveError::FactoryNotFound {
                service: self.name.clone(),
                reason: e.to_string(),
            }),
        }
    }

    /// Loads external requirements and collects service futures, without waiting.
    fn gather(&self, plugin: &Plugin, env: &ResolveEnv) -> Result<Vec<Slot>, ResolveError> {
        self.config
            .requirements
            .iter()
            .map(|requirement| match requirement {
                Requirement::External(identifier) => env
                    .loader
                    .load_library(identifier)
                    .map(Slot::Ready)
                    .map_err(|e| ResolveError::ExternalUnavailable {
                        service: self.name.clone(),
                        identifier: identifier.clone(),
                        reason: e.to_string(),
                    }),
                Requirement::Service(name) => plugin
                    .get(name)
                    .or_else(|| env.registry.get(name))
                    .map(|pending| Slot::Awaiting {
                        name: name.clone(),
                        pending,
                    })
                    .ok_or_else(|| ResolveError::MissingRequirement {
                        service: self.name.clone(),
                        requirement: name.clone(),
                    }),
            })
            .collect()
    }

    async fn settle_slot(&self, slot: Slot) -> Result<ServiceValue, ResolveError> {
        match slot {
            Slot::Ready(value) => Ok(value),
            Slot::Awaiting { name, pending } => {
                pending
                    .wait()
                    .await
                    .map_err(|cause| ResolveError::DependencyFailed {
                        service: self.name.clone(),
                        dependency: name,
                        cause: Arc::new(cause),
                    })
            }
        }
    }

    fn factory_failed(&self, message: String) -> ResolveError {
        ResolveError::FactoryFailed {
            service: self.name.clone(),
            message,
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("factory panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("factory panicked: {s}")
    } else {
        "factory panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panic_message_extracts_payload() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "factory panicked: boom");

        let payload: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(payload.as_ref()), "factory panicked: bang");

        let payload: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(payload.as_ref()), "factory panicked");
    }

    #[test]
    fn test_fail_is_terminal_and_settles_once() {
        let registry = Registry::preallocate(Vec::new(), Pending::new());
        let service = Service::new(
            "p",
            "a",
            ServiceConfig::module("./a"),
            false,
            Pending::new(),
        );

        service.fail(
            ResolveError::MissingRequirement {
                service: "a".into(),
                requirement: "missing".into(),
            },
            &registry,
        );
        service.fail(
            ResolveError::FactoryFailed {
                service: "a".into(),
                message: "late".into(),
            },
            &registry,
        );

        assert_eq!(service.status(), ServiceStatus::Unresolvable);
        assert_eq!(registry.report_count(), 1);
        assert!(matches!(
            service.pending().peek(),
            Some(Err(ResolveError::MissingRequirement { .. }))
        ));
    }
}
