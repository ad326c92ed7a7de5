//! Error types for the Weave container.
//!
//! Errors are split by *when* they happen:
//!
//! - [`ConfigurationError`]: detected while a container is being built from
//!   plugin descriptors.  Building fails as a whole.
//! - [`ResolveError`]: detected while a single service resolves.  It is
//!   stored on the service, published through the service's future and
//!   recorded in the container's error reports; it never aborts siblings.
//! - [`ArgumentError`]: raised by factories that read their arguments with
//!   the wrong type.
//! - [`LoadError`]: returned by a [`ModuleLoader`](crate::ModuleLoader).

use std::sync::Arc;

use thiserror::Error;

use crate::status::ServiceStatus;

/// Boxed error returned by user factories.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

// ─── ConfigurationError ───────────────────────────────────────────────────────

/// A plugin descriptor or service declaration is malformed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    /// Shorthand declaration without a module path.
    #[error("empty module path in service declaration '{declaration}'")]
    EmptyModulePath { declaration: String },

    /// Shorthand async flag that is neither `true` nor `false`.
    #[error("invalid async flag '{flag}' in service declaration '{declaration}'")]
    InvalidAsyncFlag { declaration: String, flag: String },

    /// Shorthand declaration with more than three `<<` segments.
    #[error("too many '<<' segments in service declaration '{declaration}'")]
    TooManySegments { declaration: String },

    /// A requirement with an empty name or identifier.
    #[error("empty requirement name")]
    EmptyRequirement,

    /// A structured declaration with neither `module` nor `func`.
    #[error("service '{service}' declares neither a module nor a factory function")]
    MissingFactory { service: String },

    /// A structured declaration with both `module` and `func`.
    #[error("service '{service}' declares both a module and a factory function")]
    ConflictingFactory { service: String },

    /// An exported name that the plugin does not declare as a service.
    #[error("plugin '{plugin}' exports '{service}' but declares no such service")]
    UnknownExport { plugin: String, service: String },

    /// The same name exported by two plugins.
    #[error("service '{service}' is exported by both '{first}' and '{second}'")]
    DuplicateExport {
        service: String,
        first: String,
        second: String,
    },

    /// Two descriptors with the same plugin name.
    #[error("plugin '{0}' is declared more than once")]
    DuplicatePlugin(String),

    /// An attempt to export a name reserved by the container.
    #[error("plugin '{plugin}' cannot export reserved name '{name}'")]
    ReservedName { plugin: String, name: String },

    /// Wraps a failure with the plugin and service it was found in.
    #[error("plugin '{plugin}', service '{service}': {source}")]
    InService {
        plugin: String,
        service: String,
        #[source]
        source: Box<ConfigurationError>,
    },
}

impl ConfigurationError {
    /// Attaches plugin/service context to this error.
    pub fn in_service(self, plugin: impl Into<String>, service: impl Into<String>) -> Self {
        Self::InService {
            plugin: plugin.into(),
            service: service.into(),
            source: Box::new(self),
        }
    }
}

// ─── ResolveError ─────────────────────────────────────────────────────────────

/// Broad classification of a [`ResolveError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Something the service needs does not exist.  Leads to
    /// [`ServiceStatus::Unresolvable`].
    Configuration,
    /// Something failed while running.  Leads to [`ServiceStatus::Error`].
    Runtime,
}

/// Why a service did not become ready.
#[derive(Debug, Clone, Error)]
pub enum ResolveError {
    /// The factory could not be located, or the module is not callable.
    #[error("cannot find factory function for service '{service}': {reason}")]
    FactoryNotFound { service: String, reason: String },

    /// A service requirement is neither local to the plugin nor exported.
    #[error(
        "unmet dependency: '{service}' requires '{requirement}' but it cannot be found by the container"
    )]
    MissingRequirement { service: String, requirement: String },

    /// An external library requirement could not be loaded.
    #[error("unmet dependency: '{service}' requires library '{identifier}': {reason}")]
    ExternalUnavailable {
        service: String,
        identifier: String,
        reason: String,
    },

    /// The service sits on a dependency cycle.
    #[error("service '{service}' is part of a dependency cycle: {}", .cycle.join(" -> "))]
    CyclicDependency { service: String, cycle: Vec<String> },

    /// A required service failed.
    #[error("service '{service}' depends on '{dependency}', which failed")]
    DependencyFailed {
        service: String,
        dependency: String,
        #[source]
        cause: Arc<ResolveError>,
    },

    /// The factory returned an error, its deferred value failed, or it panicked.
    #[error("factory for service '{service}' failed: {message}")]
    FactoryFailed { service: String, message: String },

    /// A service not declared `async` produced a deferred value.
    #[error("service '{service}' produced a deferred value but is not declared async")]
    UnexpectedDeferred { service: String },
}

impl ResolveError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::FactoryNotFound { .. }
            | Self::MissingRequirement { .. }
            | Self::ExternalUnavailable { .. }
            | Self::CyclicDependency { .. } => ErrorKind::Configuration,
            Self::DependencyFailed { .. }
            | Self::FactoryFailed { .. }
            | Self::UnexpectedDeferred { .. } => ErrorKind::Runtime,
        }
    }

    /// Terminal status a service reaches when it fails with this error.
    pub fn status(&self) -> ServiceStatus {
        match self.kind() {
            ErrorKind::Configuration => ServiceStatus::Unresolvable,
            ErrorKind::Runtime => ServiceStatus::Error,
        }
    }

    /// Name of the service this error belongs to.
    pub fn service(&self) -> &str {
        match self {
            Self::FactoryNotFound { service, .. }
            | Self::MissingRequirement { service, .. }
            | Self::ExternalUnavailable { service, .. }
            | Self::CyclicDependency { service, .. }
            | Self::DependencyFailed { service, .. }
            | Self::FactoryFailed { service, .. }
            | Self::UnexpectedDeferred { service } => service,
        }
    }

    /// Follows `DependencyFailed` links down to the failure that started the chain.
    pub fn root_cause(&self) -> &ResolveError {
        let mut current = self;
        while let Self::DependencyFailed { cause, .. } = current {
            current = cause.as_ref();
        }
        current
    }
}

// ─── ArgumentError ────────────────────────────────────────────────────────────

/// A factory read an argument that is absent or has another type.
#[derive(Debug, Clone, Error)]
pub enum ArgumentError {
    #[error("argument {index} is missing")]
    Missing { index: usize },

    #[error("argument {index} has type '{actual}', expected '{expected}'")]
    TypeMismatch {
        index: usize,
        expected: &'static str,
        actual: &'static str,
    },
}

// ─── LoadError ────────────────────────────────────────────────────────────────

/// A module or library lookup failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error("module '{0}' not found")]
    ModuleNotFound(String),

    #[error("library '{0}' not found")]
    LibraryNotFound(String),

    #[error("{0}")]
    Custom(String),
}

impl LoadError {
    pub fn custom(msg: impl Into<String>) -> Self {
        Self::Custom(msg.into())
    }
}
