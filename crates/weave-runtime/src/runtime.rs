//! Runtime orchestration: configuration, logging, descriptor loading and the
//! container lifecycle.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use weave_runtime::WeaveRuntime;
//!
//! // Auto-loads weave.toml from the current directory
//! let runtime = WeaveRuntime::new();
//! runtime.run().await?;
//!
//! // Custom configuration path
//! let runtime = WeaveRuntime::builder()
//!     .config_file("config/weave.toml")
//!     .build()?;
//! ```

use std::future::Future;
use std::path::Path;
use std::sync::{Arc, OnceLock};

use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use weave_core::ServiceStatus;
use weave_framework::{Container, ContainerInfo, PluginDescriptor};

use crate::config::{ConfigLoader, ConfigResult, WeaveConfig};
use crate::descriptors::load_descriptors;
use crate::error::{RuntimeError, RuntimeResult};
use crate::logging;
use crate::modules::ModuleRegistry;

/// Owns the configuration and one container.
///
/// Descriptor files listed under `container.plugins` are read when the
/// runtime starts; descriptors added with [`with_plugin`](Self::with_plugin)
/// come after them.  Modules default to everything registered with
/// `#[register_module]` / `#[register_library]`.
///
/// ```rust,ignore
/// let runtime = WeaveRuntime::new()
///     .with_plugin(PluginDescriptor::new("extra").service("x", ServiceConfig::func(f)))
///     .with_modules(ModuleRegistry::new().library("clock", ServiceValue::new(Clock)));
/// runtime.run().await?;
/// ```
pub struct WeaveRuntime {
    config: WeaveConfig,
    descriptors: Vec<PluginDescriptor>,
    modules: ModuleRegistry,
    shutdown: CancellationToken,
    container: OnceLock<Container>,
}

impl WeaveRuntime {
    /// Creates a runtime, loading configuration from the current directory.
    ///
    /// Falls back to defaults if the configuration cannot be loaded.
    pub fn new() -> Self {
        let config = ConfigLoader::new()
            .with_current_dir()
            .load()
            .unwrap_or_else(|e| {
                eprintln!("Warning: Failed to load config ({e}), using defaults");
                WeaveConfig::default()
            });

        Self::from_config(&config)
    }

    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Creates a runtime from configuration and initializes logging.
    pub fn from_config(config: &WeaveConfig) -> Self {
        logging::init_from_config(&config.logging);

        info!(
            log_level = %config.logging.level,
            log_format = ?config.logging.format,
            root = %config.container.root.display(),
            descriptors = config.container.plugins.len(),
            "Runtime initialized from configuration"
        );

        Self {
            config: config.clone(),
            descriptors: Vec::new(),
            modules: ModuleRegistry::collect_all(),
            shutdown: CancellationToken::new(),
            container: OnceLock::new(),
        }
    }

    /// Adds a descriptor supplied in code.
    pub fn with_plugin(mut self, descriptor: PluginDescriptor) -> Self {
        self.descriptors.push(descriptor);
        self
    }

    /// Adds modules and libraries; names already registered are kept.
    pub fn with_modules(mut self, modules: ModuleRegistry) -> Self {
        self.modules.extend(modules);
        self
    }

    pub fn config(&self) -> &WeaveConfig {
        &self.config
    }

    /// Token cancelled by [`stop`](Self::stop); cancelling it ends
    /// [`run`](Self::run).
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// The container, once started.
    pub fn container(&self) -> Option<&Container> {
        self.container.get()
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Builds the container and starts resolving.  Must be called inside a
    /// Tokio runtime.
    pub fn start(&self) -> RuntimeResult<Container> {
        if self.container.get().is_some() {
            return Err(RuntimeError::AlreadyStarted);
        }

        let settings = &self.config.container;
        let mut descriptors = load_descriptors(&settings.root, &settings.plugins)?;
        descriptors.extend(self.descriptors.iter().cloned());

        let container = Container::builder()
            .plugins(descriptors)
            .loader(Arc::new(self.modules.clone()))
            .detect_cycles(settings.detect_cycles)
            .build()?;

        if self.container.set(container.clone()).is_err() {
            return Err(RuntimeError::AlreadyStarted);
        }
        container.start();

        info!(
            plugins = container.plugins().count(),
            exports = container.registry().len(),
            "Container started"
        );
        Ok(container)
    }

    /// Starts, logs a summary once every service has settled, and runs until
    /// Ctrl+C, SIGTERM or [`stop`](Self::stop).
    pub async fn run(&self) -> RuntimeResult<()> {
        let container = self.start()?;

        tokio::select! {
            _ = self.await_settled(&container) => {}
            _ = self.shutdown.cancelled() => {
                self.stop();
                return Ok(());
            }
        }

        info!("Weave runtime is now running. Press Ctrl+C to stop.");
        tokio::select! {
            _ = wait_for_signal() => {}
            _ = self.shutdown.cancelled() => {}
        }

        self.stop();
        Ok(())
    }

    /// Like [`run`](Self::run), but stops when `shutdown` completes instead of
    /// on a signal.
    pub async fn run_until<F>(&self, shutdown: F) -> RuntimeResult<()>
    where
        F: Future<Output = ()>,
    {
        let container = self.start()?;
        tokio::pin!(shutdown);

        tokio::select! {
            _ = self.await_settled(&container) => {}
            _ = &mut shutdown => {
                self.stop();
                return Ok(());
            }
        }

        shutdown.await;
        self.stop();
        Ok(())
    }

    /// Cancels the shutdown token.
    pub fn stop(&self) {
        if self.shutdown.is_cancelled() {
            return;
        }
        self.shutdown.cancel();
        info!("Runtime stopped");
    }

    async fn await_settled(&self, container: &Container) -> ContainerInfo {
        container.settled().await;
        let info = container.info();
        self.log_summary(&info);
        info
    }

    fn log_summary(&self, info: &ContainerInfo) {
        let ready = info.count(ServiceStatus::Ready);
        let failed = info.count(ServiceStatus::Unresolvable) + info.count(ServiceStatus::Error);
        let pending = info.service_count() - ready - failed;

        if failed > 0 {
            warn!(ready, failed, pending, "Container settled with errors");
        } else {
            info!(ready, pending, "Container settled");
        }
        if self.config.container.report {
            info!("Container report:\n{info}");
        }
    }
}

impl Default for WeaveRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for WeaveRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeaveRuntime")
            .field("descriptors", &self.descriptors.len())
            .field("modules", &self.modules.len())
            .field("started", &self.container.get().is_some())
            .finish()
    }
}

/// Waits for Ctrl+C or SIGTERM.  If no handler can be installed, waits
/// forever and leaves shutdown to the token.
async fn wait_for_signal() {
    #[cfg(unix)]
    {
        let mut sigterm = match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(sigterm) => sigterm,
            Err(e) => {
                warn!(error = %e, "Failed to register SIGTERM handler");
                return wait_for_ctrl_c().await;
            }
        };

        tokio::select! {
            _ = wait_for_ctrl_c() => {}
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down");
            }
        }
    }

    #[cfg(not(unix))]
    wait_for_ctrl_c().await;
}

async fn wait_for_ctrl_c() {
    match signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, shutting down"),
        Err(e) => {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    }
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder for a [`WeaveRuntime`] with custom configuration.
///
/// ```rust,ignore
/// let runtime = WeaveRuntime::builder()
///     .config_file("config/weave.toml")
///     .profile("production")
///     .build()?;
/// ```
pub struct RuntimeBuilder {
    config_loader: ConfigLoader,
}

impl RuntimeBuilder {
    pub fn new() -> Self {
        Self {
            config_loader: ConfigLoader::new().with_current_dir(),
        }
    }

    pub fn config_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        self.config_loader = self.config_loader.profile(profile);
        self
    }

    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.search_path(path);
        self
    }

    pub fn with_env(mut self) -> Self {
        self.config_loader = self.config_loader.with_env();
        self
    }

    pub fn without_env(mut self) -> Self {
        self.config_loader = self.config_loader.without_env();
        self
    }

    /// Base values; files and the environment override them.
    pub fn merge(mut self, config: WeaveConfig) -> Self {
        self.config_loader = self.config_loader.merge(config);
        self
    }

    pub fn build(self) -> ConfigResult<WeaveRuntime> {
        let config = self.config_loader.load()?;
        debug!(plugins = config.container.plugins.len(), "Building runtime");
        Ok(WeaveRuntime::from_config(&config))
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::Duration;

    use figment::Jail;
    use weave_core::{
        Arguments, Factory, FactoryResult, Produced, Requirement, ServiceConfig, ServiceValue,
    };

    fn double(args: Arguments) -> FactoryResult {
        let base = args.get::<u32>(0)?;
        Ok(Produced::value(*base * 2))
    }

    fn runtime() -> WeaveRuntime {
        WeaveRuntime::from_config(&WeaveConfig::default())
    }

    #[tokio::test]
    async fn test_programmatic_plugins_resolve() {
        let runtime = runtime()
            .with_plugin(
                PluginDescriptor::new("base")
                    .with_path("base")
                    .service("base.n", "./n")
                    .service("base.raw", "./raw")
                    .export("base.n")
                    .export("base.raw"),
            )
            .with_plugin(
                PluginDescriptor::new("user")
                    .service(
                        "user.d",
                        ServiceConfig::func(Factory::from_fn(double))
                            .require(Requirement::service("base.n")),
                    )
                    .export("user.d"),
            )
            .with_modules(
                ModuleRegistry::new()
                    .module("base/n", Factory::constant(ServiceValue::new(21_u32)))
                    .value("base/raw", ServiceValue::new(0_u8)),
            );

        runtime.run_until(async {}).await.unwrap();
        assert!(runtime.shutdown_token().is_cancelled());

        let container = runtime.container().unwrap();
        let doubled = container.get("user.d").await.unwrap().unwrap();
        assert_eq!(doubled.downcast_ref::<u32>(), Some(&42));

        // Plain values cannot serve as factories.
        assert!(container.get("base.raw").await.is_err());
        container.settled().await;
        assert_eq!(container.info().count(ServiceStatus::Unresolvable), 1);
    }

    #[tokio::test]
    async fn test_start_twice_fails() {
        let runtime = runtime().with_plugin(
            PluginDescriptor::new("p").service("p.x", ServiceConfig::func(Factory::constant(ServiceValue::new(1_u8)))),
        );
        runtime.start().unwrap();
        assert!(matches!(runtime.start(), Err(RuntimeError::AlreadyStarted)));
    }

    #[tokio::test]
    async fn test_stop_ends_run() {
        let runtime = Arc::new(
            runtime().with_plugin(
                PluginDescriptor::new("p")
                    .service(
                        "p.x",
                        ServiceConfig::func(Factory::constant(ServiceValue::new(5_i64))),
                    )
                    .export("p.x"),
            ),
        );

        let token = runtime.shutdown_token();
        let handle = tokio::spawn({
            let runtime = Arc::clone(&runtime);
            async move { runtime.run().await }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        token.cancel();

        let result = tokio::time::timeout(Duration::from_secs(1), handle).await;
        assert!(matches!(result, Ok(Ok(Ok(())))));
        let value = runtime.container().unwrap().get("p.x").await.unwrap().unwrap();
        assert_eq!(value.downcast_ref::<i64>(), Some(&5));
    }

    #[test]
    fn test_descriptor_files_from_config() {
        Jail::expect_with(|jail| {
            jail.create_dir("pluginA")?;
            jail.create_file(
                "pluginA/plugin.json",
                r#"{ "name": "pluginA", "services": { "A.a": "./a", "A.b": "./b << A.a" }, "exports": ["A.b"] }"#,
            )?;

            let mut config = WeaveConfig::default();
            config.container.root = jail.directory().to_path_buf();
            config.container.plugins = vec![PathBuf::from("pluginA/plugin.json")];

            let runtime = WeaveRuntime::from_config(&config).with_modules(
                ModuleRegistry::new()
                    .module("pluginA/a", Factory::constant(ServiceValue::new(4_u32)))
                    .module("pluginA/b", Factory::from_fn(double)),
            );

            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .map_err(|e| e.to_string())?;
            let value = rt.block_on(async {
                runtime.run_until(async {}).await.map_err(|e| e.to_string())?;
                let container = runtime.container().ok_or("not started")?;
                container.get("A.b").await.map_err(|e| e.to_string())
            })?;

            assert_eq!(value.and_then(|v| v.downcast::<u32>()).as_deref(), Some(&8));
            Ok(())
        });
    }

    #[test]
    fn test_missing_descriptor_file() {
        let mut config = WeaveConfig::default();
        config.container.plugins = vec![PathBuf::from("does/not/exist.json")];
        let runtime = WeaveRuntime::from_config(&config);

        assert!(matches!(
            runtime.start(),
            Err(RuntimeError::DescriptorNotFound(_))
        ));
        assert!(runtime.container().is_none());
    }
}
