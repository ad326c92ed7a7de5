//! The service container.
//!
//! [`Container`] is the central owner of every plugin.  It:
//!
//! - Normalizes all [`PluginDescriptor`]s up front and rejects malformed
//!   declarations, duplicate plugins and conflicting exports.
//! - Allocates one future per exported name in the [`Registry`] **before**
//!   any plugin is constructed, so a service can depend on an export of a
//!   plugin that is constructed after it.
//! - Optionally fails every service on a static dependency cycle.
//! - Spawns one resolution task per service; none of them waits for another
//!   to start.
//! - Answers [`get`](Container::get) / [`has`](Container::has) for external
//!   callers and, through [`ContainerContext`], for services themselves.
//!
//! # Example
//!
//! ```rust,ignore
//! let container = Container::builder()
//!     .plugin(plugin_x)
//!     .plugin(plugin_y)
//!     .loader(Arc::new(ModuleRegistry::collect_all()))
//!     .build()?;
//! container.start();
//! container.settled().await;
//! let value = container.get("Y.b").await?;
//! ```

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use futures::future::join_all;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use weave_core::{
    ConfigurationError, ModuleLoader, NoModules, Pending, Requirement, ResolveError,
    ServiceStatus, ServiceValue,
};

use crate::cycle::find_cycles;
use crate::diagnostics::{
    ContainerInfo, ErrorInfo, PluginInfo, RequirementInfo, RequirementState, ServiceInfo,
};
use crate::plugin::{Plugin, PluginDecl, PluginDescriptor, ResolveEnv};
use crate::registry::{CONTEXT_SERVICE, ErrorReport, Registry};

// =============================================================================
// ContainerBuilder
// =============================================================================

/// Collects descriptors and settings for a [`Container`].
pub struct ContainerBuilder {
    descriptors: Vec<PluginDescriptor>,
    loader: Arc<dyn ModuleLoader>,
    detect_cycles: bool,
}

impl Default for ContainerBuilder {
    fn default() -> Self {
        Self {
            descriptors: Vec::new(),
            loader: Arc::new(NoModules),
            detect_cycles: true,
        }
    }
}

impl ContainerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn plugin(mut self, descriptor: PluginDescriptor) -> Self {
        self.descriptors.push(descriptor);
        self
    }

    pub fn plugins(mut self, descriptors: impl IntoIterator<Item = PluginDescriptor>) -> Self {
        self.descriptors.extend(descriptors);
        self
    }

    /// Sets the loader used for module paths and external libraries.
    pub fn loader(mut self, loader: Arc<dyn ModuleLoader>) -> Self {
        self.loader = loader;
        self
    }

    /// Enables or disables the static cycle check run by
    /// [`Container::start`].  Enabled by default; when disabled, services on
    /// a cycle stay pending forever.
    pub fn detect_cycles(mut self, enabled: bool) -> Self {
        self.detect_cycles = enabled;
        self
    }

    /// Validates every descriptor, pre-registers every export and constructs
    /// the plugins.  Nothing is resolved until [`Container::start`].
    pub fn build(self) -> Result<Container, ConfigurationError> {
        let mut decls: Vec<PluginDecl> = Vec::with_capacity(self.descriptors.len());
        let mut names: HashSet<String> = HashSet::new();
        let mut owners: HashMap<String, String> = HashMap::new();

        for descriptor in &self.descriptors {
            let decl = descriptor.normalize()?;
            if !names.insert(decl.name.clone()) {
                return Err(ConfigurationError::DuplicatePlugin(decl.name));
            }
            for export in &decl.exports {
                if export == CONTEXT_SERVICE {
                    return Err(ConfigurationError::ReservedName {
                        plugin: decl.name.clone(),
                        name: export.clone(),
                    });
                }
                if let Some(first) = owners.insert(export.clone(), decl.name.clone()) {
                    return Err(ConfigurationError::DuplicateExport {
                        service: export.clone(),
                        first,
                        second: decl.name.clone(),
                    });
                }
            }
            decls.push(decl);
        }

        let loader = self.loader;
        let detect_cycles = self.detect_cycles;
        let inner = Arc::new_cyclic(|weak: &Weak<ContainerInner>| {
            let context = Pending::ready(ServiceValue::new(ContainerContext {
                inner: weak.clone(),
            }));
            let registry = Arc::new(Registry::preallocate(owners.keys().cloned(), context));
            info!(exports = registry.len(), "Registered public services");

            let plugins = decls
                .into_iter()
                .map(|decl| (decl.name.clone(), Arc::new(Plugin::new(decl, &registry))))
                .collect::<BTreeMap<_, _>>();
            info!(plugins = plugins.len(), "Loaded plugins");

            ContainerInner {
                registry,
                plugins,
                owners,
                loader,
                detect_cycles,
                started: AtomicBool::new(false),
                tasks: Mutex::new(Vec::new()),
            }
        });

        Ok(Container { inner })
    }
}

// =============================================================================
// Container
// =============================================================================

pub(crate) struct ContainerInner {
    registry: Arc<Registry>,
    plugins: BTreeMap<String, Arc<Plugin>>,
    /// Exported name → owning plugin.
    owners: HashMap<String, String>,
    loader: Arc<dyn ModuleLoader>,
    detect_cycles: bool,
    started: AtomicBool,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Drop for ContainerInner {
    fn drop(&mut self) {
        for task in self.tasks.get_mut().drain(..) {
            task.abort();
        }
    }
}

/// A set of plugins whose services resolve concurrently.
///
/// Cheap to clone; all clones share the same plugins and registry.
#[derive(Clone)]
pub struct Container {
    inner: Arc<ContainerInner>,
}

impl Container {
    pub fn builder() -> ContainerBuilder {
        ContainerBuilder::new()
    }

    /// Builds a container from `descriptors` and starts it.
    pub fn load(
        descriptors: impl IntoIterator<Item = PluginDescriptor>,
        loader: Arc<dyn ModuleLoader>,
    ) -> Result<Self, ConfigurationError> {
        let container = Self::builder().plugins(descriptors).loader(loader).build()?;
        container.start();
        Ok(container)
    }

    /// Spawns one resolution task per service.  Must be called from within a
    /// tokio runtime.  Returns `false` if the container was already started.
    pub fn start(&self) -> bool {
        if self.inner.started.swap(true, Ordering::SeqCst) {
            warn!("Container already started");
            return false;
        }

        info!("Done loading plugins, resolving services");
        let env = ResolveEnv {
            registry: Arc::clone(&self.inner.registry),
            loader: Arc::clone(&self.inner.loader),
        };
        if self.inner.detect_cycles {
            let members = find_cycles(&self.inner.plugins, &self.inner.owners, |plugin, service| {
                service.fails_immediately(plugin, &env)
            });
            for member in members {
                let error = ResolveError::CyclicDependency {
                    service: member.service.name().to_string(),
                    cycle: member.cycle,
                };
                member.service.fail(error, &self.inner.registry);
            }
        }

        let mut tasks = self.inner.tasks.lock();
        for plugin in self.inner.plugins.values() {
            tasks.extend(plugin.resolve_services(&env));
        }
        debug!(tasks = tasks.len(), "Spawned resolution tasks");
        true
    }

    pub fn is_started(&self) -> bool {
        self.inner.started.load(Ordering::SeqCst)
    }

    /// Waits for the exported service `name`.
    ///
    /// Returns `Ok(None)` if nothing exports `name`, and the service's error
    /// if it failed.
    pub async fn get(&self, name: &str) -> Result<Option<ServiceValue>, ResolveError> {
        match self.inner.registry.get(name) {
            Some(pending) => pending.wait().await.map(Some),
            None => Ok(None),
        }
    }

    /// Returns `true` if `name` is exported (or is `context`).
    pub fn has(&self, name: &str) -> bool {
        self.inner.registry.has(name)
    }

    /// Raw future of an exported service.
    pub fn pending(&self, name: &str) -> Option<Pending> {
        self.inner.registry.get(name)
    }

    pub fn plugin(&self, name: &str) -> Option<&Arc<Plugin>> {
        self.inner.plugins.get(name)
    }

    pub fn plugins(&self) -> impl Iterator<Item = &Arc<Plugin>> {
        self.inner.plugins.values()
    }

    pub fn registry(&self) -> &Registry {
        &self.inner.registry
    }

    /// Every failure reported so far, oldest first.
    pub fn errors(&self) -> Vec<ErrorReport> {
        self.inner.registry.reports()
    }

    /// Waits until every service has settled.
    ///
    /// Returns immediately if the container was never started.  Never
    /// returns while a service on an undetected cycle is still waiting.
    pub async fn settled(&self) {
        if !self.is_started() {
            return;
        }
        let waits = self
            .inner
            .plugins
            .values()
            .flat_map(|plugin| plugin.services())
            .map(|service| service.pending().clone())
            .collect::<Vec<_>>();
        join_all(waits.iter().map(|pending| pending.wait())).await;
    }

    /// Snapshot of every plugin, service and error.
    pub fn info(&self) -> ContainerInfo {
        let plugins = self
            .inner
            .plugins
            .values()
            .map(|plugin| (plugin.name().to_string(), self.describe(plugin)))
            .collect();
        let errors = self
            .errors()
            .into_iter()
            .map(|report| ErrorInfo {
                message: report.error.to_string(),
                plugin: report.plugin,
                service: report.service,
                status: report.status,
            })
            .collect();
        ContainerInfo { plugins, errors }
    }

    /// Snapshot of one plugin.
    pub fn plugin_info(&self, name: &str) -> Option<PluginInfo> {
        self.plugin(name).map(|plugin| self.describe(plugin))
    }

    fn describe(&self, plugin: &Plugin) -> PluginInfo {
        let services = plugin
            .services()
            .map(|service| {
                let requirements = service
                    .requirements()
                    .iter()
                    .map(|requirement| RequirementInfo {
                        requirement: requirement.to_string(),
                        state: self.requirement_state(plugin, requirement),
                    })
                    .collect();
                let info = ServiceInfo {
                    exported: service.is_exported(),
                    status: service.status(),
                    requirements,
                    error: service.last_error().map(|e| e.to_string()),
                };
                (service.name().to_string(), info)
            })
            .collect();

        PluginInfo {
            name: plugin.name().to_string(),
            description: plugin.description().map(str::to_string),
            path: plugin.path().to_string(),
            services,
        }
    }

    /// Same lookup order as resolution: local first, then exports.
    fn requirement_state(&self, plugin: &Plugin, requirement: &Requirement) -> RequirementState {
        let name = match requirement {
            Requirement::External(_) => return RequirementState::Lib,
            Requirement::Service(name) => name.as_str(),
        };
        if let Some(service) = plugin.service(name) {
            return RequirementState::Service(service.status());
        }
        if name == CONTEXT_SERVICE {
            return RequirementState::Service(ServiceStatus::Ready);
        }
        self.inner
            .owners
            .get(name)
            .and_then(|owner| self.inner.plugins.get(owner))
            .and_then(|owner| owner.service(name))
            .map_or(RequirementState::Missing, |service| {
                RequirementState::Service(service.status())
            })
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("plugins", &self.inner.plugins.keys().collect::<Vec<_>>())
            .field("exports", &self.inner.registry.len())
            .field("started", &self.is_started())
            .finish()
    }
}

// =============================================================================
// ContainerContext
// =============================================================================

/// Value of the reserved `context` service.
///
/// Holds a weak handle, so a service keeping its context alive does not keep
/// the container alive.
#[derive(Clone)]
pub struct ContainerContext {
    inner: Weak<ContainerInner>,
}

impl ContainerContext {
    /// The container, if it still exists.
    pub fn container(&self) -> Option<Container> {
        self.inner.upgrade().map(|inner| Container { inner })
    }

    pub fn has(&self, name: &str) -> bool {
        self.inner
            .upgrade()
            .is_some_and(|inner| inner.registry.has(name))
    }

    /// Same as [`Container::get`]; `Ok(None)` once the container is gone.
    pub async fn get(&self, name: &str) -> Result<Option<ServiceValue>, ResolveError> {
        let pending = self
            .inner
            .upgrade()
            .and_then(|inner| inner.registry.get(name));
        match pending {
            Some(pending) => pending.wait().await.map(Some),
            None => Ok(None),
        }
    }
}

impl fmt::Debug for ContainerContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContainerContext")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use tokio_test::{assert_pending, assert_ready, task};

    use weave_core::{
        Arguments, BoxError, Factory, LoadError, Module, Produced, ServiceConfig,
    };

    fn constant<T: Clone + Send + Sync + 'static>(value: T) -> ServiceConfig {
        ServiceConfig::func(Factory::new(move |_| Ok(Produced::value(value.clone()))))
    }

    fn doubler() -> ServiceConfig {
        ServiceConfig::func(Factory::new(|args: Arguments| {
            let a = args.get::<i64>(0)?;
            Ok(Produced::value(*a * 2))
        }))
    }

    fn plugin_x() -> PluginDescriptor {
        PluginDescriptor::new("X")
            .service("X.a", constant(10_i64))
            .export("X.a")
    }

    fn plugin_y() -> PluginDescriptor {
        PluginDescriptor::new("Y")
            .service("Y.b", doubler().require(Requirement::service("X.a")))
            .export("Y.b")
    }

    async fn started(builder: ContainerBuilder) -> Container {
        let container = builder.build().unwrap();
        container.start();
        container.settled().await;
        container
    }

    fn status(container: &Container, plugin: &str, service: &str) -> ServiceStatus {
        container
            .plugin(plugin)
            .and_then(|p| p.service(service))
            .map(|s| s.status())
            .unwrap()
    }

    #[tokio::test]
    async fn test_cross_plugin_value_in_either_order() {
        for order in [[plugin_x(), plugin_y()], [plugin_y(), plugin_x()]] {
            let container = started(Container::builder().plugins(order)).await;
            let value = container.get("Y.b").await.unwrap().unwrap();
            assert_eq!(value.downcast_ref::<i64>(), Some(&20));
            assert_eq!(status(&container, "Y", "Y.b"), ServiceStatus::Ready);
            assert!(container.errors().is_empty());
        }
    }

    #[tokio::test]
    async fn test_get_waits_until_resolved() {
        let container = Container::builder()
            .plugin(plugin_y())
            .plugin(plugin_x())
            .build()
            .unwrap();

        let mut get = task::spawn(container.get("Y.b"));
        assert_pending!(get.poll());

        container.start();
        container.settled().await;

        assert!(get.is_woken());
        let value = assert_ready!(get.poll()).unwrap().unwrap();
        assert_eq!(value.downcast_ref::<i64>(), Some(&20));
    }

    #[tokio::test]
    async fn test_exports_are_registered_before_start() {
        let container = Container::builder()
            .plugin(plugin_y())
            .plugin(plugin_x())
            .build()
            .unwrap();

        assert!(container.has("X.a"));
        assert!(container.has("Y.b"));
        assert!(container.has(CONTEXT_SERVICE));
        assert!(!container.pending("X.a").unwrap().is_settled());

        let service = container.plugin("X").and_then(|p| p.service("X.a")).unwrap();
        assert!(service.pending().ptr_eq(&container.pending("X.a").unwrap()));
    }

    #[tokio::test]
    async fn test_missing_requirement_is_unresolvable() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let factory = Factory::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Produced::value(()))
        });
        let desc = PluginDescriptor::new("P")
            .service(
                "a",
                ServiceConfig::func(factory).require(Requirement::service("missing")),
            )
            .service("b", constant(1_u8))
            .export("a");

        let container = started(Container::builder().plugin(desc)).await;

        assert_eq!(status(&container, "P", "a"), ServiceStatus::Unresolvable);
        assert_eq!(status(&container, "P", "b"), ServiceStatus::Ready);
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let errors = container.errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].service, "a");
        assert_eq!(errors[0].plugin, "P");
        assert_eq!(errors[0].status, ServiceStatus::Unresolvable);
        assert!(matches!(
            container.get("a").await,
            Err(ResolveError::MissingRequirement { .. })
        ));
    }

    #[tokio::test]
    async fn test_async_dependency_passes_its_value() {
        let b = ServiceConfig::func(Factory::new(|_| {
            Ok(Produced::deferred(async {
                tokio::time::sleep(Duration::from_millis(5)).await;
                Ok::<_, BoxError>("ok".to_string())
            }))
        }))
        .set_async(true);
        let a = ServiceConfig::func(Factory::new(|args: Arguments| {
            let b = args.get::<String>(0)?;
            Ok(Produced::value(format!("got {b}")))
        }))
        .require(Requirement::service("B"));

        let desc = PluginDescriptor::new("P")
            .service("A", a)
            .service("B", b)
            .export("A");
        let container = started(Container::builder().plugin(desc)).await;

        let value = container.get("A").await.unwrap().unwrap();
        assert_eq!(value.downcast_ref::<String>().unwrap(), "got ok");
    }

    #[tokio::test]
    async fn test_failure_propagates_transitively() {
        let failing = ServiceConfig::func(Factory::new(|_| Err("boom".into())));
        let desc = PluginDescriptor::new("P")
            .service("c", failing)
            .service("b", constant(1_u8).require(Requirement::service("c")))
            .service("a", constant(1_u8).require(Requirement::service("b")))
            .service("unrelated", constant(2_u8))
            .export("a");

        let container = started(Container::builder().plugin(desc)).await;

        assert_eq!(status(&container, "P", "c"), ServiceStatus::Error);
        assert_eq!(status(&container, "P", "b"), ServiceStatus::Error);
        assert_eq!(status(&container, "P", "a"), ServiceStatus::Error);
        assert_eq!(status(&container, "P", "unrelated"), ServiceStatus::Ready);
        assert_eq!(container.errors().len(), 3);

        let err = container.get("a").await.unwrap_err();
        assert!(matches!(
            err.root_cause(),
            ResolveError::FactoryFailed { service, message } if service == "c" && message == "boom"
        ));
    }

    #[tokio::test]
    async fn test_dependent_of_unresolvable_reaches_error() {
        let desc = PluginDescriptor::new("P")
            .service("b", ServiceConfig::module("./nowhere"))
            .service("a", constant(1_u8).require(Requirement::service("b")));
        let container = started(Container::builder().plugin(desc)).await;

        assert_eq!(status(&container, "P", "b"), ServiceStatus::Unresolvable);
        assert_eq!(status(&container, "P", "a"), ServiceStatus::Error);
    }

    #[tokio::test]
    async fn test_local_name_shadows_export() {
        let other = PluginDescriptor::new("other")
            .service("shared", constant("public"))
            .export("shared");
        let own = PluginDescriptor::new("own")
            .service("shared", constant("local"))
            .service(
                "reader",
                ServiceConfig::func(Factory::new(|args: Arguments| {
                    let s = args.get::<&str>(0)?;
                    Ok(Produced::value(*s))
                }))
                .require(Requirement::service("shared")),
            )
            .export("reader");

        let container = started(Container::builder().plugin(other).plugin(own)).await;
        let value = container.get("reader").await.unwrap().unwrap();
        assert_eq!(value.downcast_ref::<&str>(), Some(&"local"));
        let value = container.get("shared").await.unwrap().unwrap();
        assert_eq!(value.downcast_ref::<&str>(), Some(&"public"));
    }

    #[tokio::test]
    async fn test_arguments_follow_declaration_order() {
        let join = ServiceConfig::func(Factory::new(|args: Arguments| {
            let parts = (0..args.len())
                .map(|i| args.get::<&str>(i).map(|s| *s))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Produced::value(parts.join(",")))
        }))
        .require(Requirement::service("c"))
        .require(Requirement::service("a"))
        .require(Requirement::service("b"));

        let desc = PluginDescriptor::new("P")
            .service("a", constant("a"))
            .service("b", constant("b"))
            .service("c", constant("c"))
            .service("joined", join)
            .export("joined");
        let container = started(Container::builder().plugin(desc)).await;

        let value = container.get("joined").await.unwrap().unwrap();
        assert_eq!(value.downcast_ref::<String>().unwrap(), "c,a,b");
    }

    #[tokio::test]
    async fn test_cycle_fails_members_and_dependents() {
        let desc = PluginDescriptor::new("P")
            .service("a", constant(1_u8).require(Requirement::service("b")))
            .service("b", constant(1_u8).require(Requirement::service("a")))
            .service("c", constant(1_u8).require(Requirement::service("a")));
        let container = started(Container::builder().plugin(desc)).await;

        assert_eq!(status(&container, "P", "a"), ServiceStatus::Unresolvable);
        assert_eq!(status(&container, "P", "b"), ServiceStatus::Unresolvable);
        assert_eq!(status(&container, "P", "c"), ServiceStatus::Error);

        let a = container.plugin("P").and_then(|p| p.service("a")).unwrap();
        assert!(matches!(
            a.last_error(),
            Some(ResolveError::CyclicDependency { cycle, .. }) if cycle == ["a", "b", "a"]
        ));
    }

    #[tokio::test]
    async fn test_cycle_without_detection_stays_pending() {
        let desc = PluginDescriptor::new("P")
            .service("a", constant(1_u8).require(Requirement::service("b")))
            .service("b", constant(1_u8).require(Requirement::service("a")));
        let container = Container::builder()
            .plugin(desc)
            .detect_cycles(false)
            .build()
            .unwrap();
        container.start();

        let settled = tokio::time::timeout(Duration::from_millis(20), container.settled()).await;
        assert!(settled.is_err());
        assert_eq!(status(&container, "P", "a"), ServiceStatus::Pending);
        assert!(container.errors().is_empty());
    }

    #[tokio::test]
    async fn test_loop_through_failing_service_is_not_a_cycle() {
        let desc = PluginDescriptor::new("P")
            .service(
                "a",
                constant(1_u8)
                    .require(Requirement::service("b"))
                    .require(Requirement::service("missing")),
            )
            .service("b", constant(1_u8).require(Requirement::service("a")))
            .service("c", ServiceConfig::module("./nowhere").require(Requirement::service("d")))
            .service("d", constant(1_u8).require(Requirement::service("c")));
        let container = started(Container::builder().plugin(desc)).await;

        assert_eq!(status(&container, "P", "a"), ServiceStatus::Unresolvable);
        assert_eq!(status(&container, "P", "b"), ServiceStatus::Error);
        assert_eq!(status(&container, "P", "c"), ServiceStatus::Unresolvable);
        assert_eq!(status(&container, "P", "d"), ServiceStatus::Error);

        let service = |name: &str| {
            container
                .plugin("P")
                .and_then(|p| p.service(name))
                .cloned()
                .unwrap()
        };
        assert!(matches!(
            service("a").last_error(),
            Some(ResolveError::MissingRequirement { requirement, .. }) if requirement == "missing"
        ));
        assert!(matches!(
            service("c").last_error(),
            Some(ResolveError::FactoryNotFound { .. })
        ));
        assert!(!container.errors().iter().any(|report| matches!(
            report.error,
            ResolveError::CyclicDependency { .. }
        )));
    }

    #[tokio::test]
    async fn test_context_sees_other_exports() {
        let lookup = ServiceConfig::func(Factory::new(|args: Arguments| {
            let context = args.get::<ContainerContext>(0)?;
            Ok(Produced::deferred(async move {
                let value = context.get("X.a").await?.ok_or("X.a not exported")?;
                let a = value.downcast_ref::<i64>().copied().unwrap_or_default();
                Ok::<_, BoxError>(a + 1)
            }))
        }))
        .require(Requirement::service(CONTEXT_SERVICE))
        .set_async(true);

        let desc = PluginDescriptor::new("Z").service("Z.c", lookup).export("Z.c");
        let container = started(Container::builder().plugin(plugin_x()).plugin(desc)).await;

        let value = container.get("Z.c").await.unwrap().unwrap();
        assert_eq!(value.downcast_ref::<i64>(), Some(&11));
    }

    #[tokio::test]
    async fn test_get_unknown_name_is_none() {
        let container = started(Container::builder().plugin(plugin_x())).await;
        assert!(container.get("nope").await.unwrap().is_none());
        assert!(!container.has("nope"));
    }

    #[tokio::test]
    async fn test_factory_panic_and_unexpected_deferred() {
        let desc = PluginDescriptor::new("P")
            .service(
                "panics",
                ServiceConfig::func(Factory::new(|_| panic!("kaboom"))),
            )
            .service(
                "sync_deferred",
                ServiceConfig::func(Factory::new(|_| {
                    Ok(Produced::deferred(async { Ok::<_, BoxError>(1_u8) }))
                })),
            )
            .service("async_value", constant(3_u8).set_async(true));
        let container = started(Container::builder().plugin(desc)).await;

        let p = container.plugin("P").unwrap();
        assert!(matches!(
            p.service("panics").unwrap().last_error(),
            Some(ResolveError::FactoryFailed { message, .. }) if message.contains("kaboom")
        ));
        assert!(matches!(
            p.service("sync_deferred").unwrap().last_error(),
            Some(ResolveError::UnexpectedDeferred { .. })
        ));
        assert_eq!(
            p.service("async_value").unwrap().status(),
            ServiceStatus::Ready
        );
    }

    struct TestLoader;

    impl ModuleLoader for TestLoader {
        fn load_module(&self, plugin_path: &str, module: &str) -> Result<Module, LoadError> {
            match weave_core::join_module_path(plugin_path, module).as_str() {
                "lib/ten" => Ok(Module::Factory(Factory::constant(ServiceValue::new(10_i64)))),
                "lib/data" => Ok(Module::Value(ServiceValue::new(1_u8))),
                other => Err(LoadError::ModuleNotFound(other.to_string())),
            }
        }

        fn load_library(&self, identifier: &str) -> Result<ServiceValue, LoadError> {
            match identifier {
                "greeting" => Ok(ServiceValue::new("hello")),
                other => Err(LoadError::LibraryNotFound(other.to_string())),
            }
        }
    }

    #[tokio::test]
    async fn test_module_loader_resolution() {
        let desc = PluginDescriptor::new("P")
            .with_path("lib")
            .service("ten", "./ten")
            .service("data", "./data")
            .service(
                "greet",
                ServiceConfig::func(Factory::new(|args: Arguments| {
                    let g = args.get::<&str>(0)?;
                    let n = args.get::<i64>(1)?;
                    Ok(Produced::value(format!("{g} {n}")))
                }))
                .require(Requirement::external("greeting"))
                .require(Requirement::service("ten")),
            )
            .service("no_lib", "./ten << ::absent")
            .export("greet");

        let container = started(
            Container::builder()
                .plugin(desc)
                .loader(Arc::new(TestLoader)),
        )
        .await;

        let value = container.get("greet").await.unwrap().unwrap();
        assert_eq!(value.downcast_ref::<String>().unwrap(), "hello 10");

        let p = container.plugin("P").unwrap();
        assert!(matches!(
            p.service("data").unwrap().last_error(),
            Some(ResolveError::FactoryNotFound { .. })
        ));
        assert!(matches!(
            p.service("no_lib").unwrap().last_error(),
            Some(ResolveError::ExternalUnavailable { identifier, .. }) if identifier == "absent"
        ));
    }

    #[test]
    fn test_build_rejects_bad_descriptors() {
        let dup_plugin = Container::builder()
            .plugin(plugin_x())
            .plugin(plugin_x())
            .build();
        assert!(matches!(
            dup_plugin,
            Err(ConfigurationError::DuplicatePlugin(name)) if name == "X"
        ));

        let clash = PluginDescriptor::new("X2")
            .service("X.a", constant(1_i64))
            .export("X.a");
        let dup_export = Container::builder().plugin(plugin_x()).plugin(clash).build();
        assert!(matches!(
            dup_export,
            Err(ConfigurationError::DuplicateExport { first, second, .. })
                if first == "X" && second == "X2"
        ));

        let reserved = PluginDescriptor::new("R")
            .service(CONTEXT_SERVICE, constant(1_u8))
            .export(CONTEXT_SERVICE);
        assert!(matches!(
            Container::builder().plugin(reserved).build(),
            Err(ConfigurationError::ReservedName { .. })
        ));
    }

    #[tokio::test]
    async fn test_info_reports_requirement_states() {
        let desc = PluginDescriptor::new("Y")
            .service(
                "Y.b",
                doubler()
                    .require(Requirement::service("X.a"))
                    .require(Requirement::external("lib")),
            )
            .service("Y.c", constant(1_u8).require(Requirement::service("gone")))
            .export("Y.b");
        let container = started(Container::builder().plugin(plugin_x()).plugin(desc)).await;

        let info = container.info();
        let y = &info.plugins["Y"];
        let b = &y.services["Y.b"];
        assert!(b.exported);
        assert_eq!(b.requirements[0].state, RequirementState::Service(ServiceStatus::Ready));
        assert_eq!(b.requirements[1].requirement, "::lib");
        assert_eq!(b.requirements[1].state, RequirementState::Lib);
        assert_eq!(y.services["Y.c"].requirements[0].state, RequirementState::Missing);
        assert_eq!(info.errors.len(), 2);

        let x = container.plugin_info("X").unwrap();
        assert_eq!(x.services["X.a"].status, ServiceStatus::Ready);
        assert!(container.plugin_info("Z").is_none());
    }

    #[tokio::test]
    async fn test_info_lists_services_as_declared() {
        let desc = PluginDescriptor::new("P")
            .service("zeta", constant(1_u8))
            .service("alpha", constant(2_u8))
            .service("mid", constant(3_u8));
        let container = started(Container::builder().plugin(desc)).await;

        let info = container.plugin_info("P").unwrap();
        assert_eq!(info.services.names().collect::<Vec<_>>(), ["zeta", "alpha", "mid"]);
        let text = info.to_string();
        let position = |name: &str| text.find(&format!("| {name} ")).unwrap();
        assert!(position("zeta") < position("alpha"));
        assert!(position("alpha") < position("mid"));
    }

    #[tokio::test]
    async fn test_start_twice_is_noop() {
        let container = Container::builder().plugin(plugin_x()).build().unwrap();
        assert!(container.start());
        assert!(!container.start());
        container.settled().await;
        assert!(container.errors().is_empty());
    }
}
