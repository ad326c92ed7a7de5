//! Public service registry and error-report sink.
//!
//! The registry is created once per [`Container`](crate::Container), before
//! any plugin is constructed, with one [`Pending`] per exported name.  The
//! set of names never changes afterwards; only the futures inside settle.

use std::collections::HashMap;

use parking_lot::Mutex;

use weave_core::{Pending, ResolveError, ServiceStatus};

/// Name of the always-present export holding a
/// [`ContainerContext`](crate::ContainerContext).
pub const CONTEXT_SERVICE: &str = "context";

/// One failed service, recorded in resolution order.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub plugin: String,
    pub service: String,
    pub status: ServiceStatus,
    pub error: ResolveError,
}

/// Exported-name → future map plus the shared error reports.
#[derive(Debug)]
pub struct Registry {
    exports: HashMap<String, Pending>,
    reports: Mutex<Vec<ErrorReport>>,
}

impl Registry {
    /// Allocates one future per exported name, plus the settled `context` entry.
    pub(crate) fn preallocate<I>(names: I, context: Pending) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let mut exports: HashMap<String, Pending> =
            names.into_iter().map(|name| (name, Pending::new())).collect();
        exports.insert(CONTEXT_SERVICE.to_string(), context);
        Self {
            exports,
            reports: Mutex::new(Vec::new()),
        }
    }

    pub fn has(&self, name: &str) -> bool {
        self.exports.contains_key(name)
    }

    /// Returns the future for an exported name.
    pub fn get(&self, name: &str) -> Option<Pending> {
        self.exports.get(name).cloned()
    }

    /// Exported names, including `context`.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.exports.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.exports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exports.is_empty()
    }

    pub(crate) fn report(&self, report: ErrorReport) {
        self.reports.lock().push(report);
    }

    /// Snapshot of every error report so far, oldest first.
    pub fn reports(&self) -> Vec<ErrorReport> {
        self.reports.lock().clone()
    }

    pub fn report_count(&self) -> usize {
        self.reports.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weave_core::ServiceValue;

    #[test]
    fn test_preallocates_every_name() {
        let registry = Registry::preallocate(
            ["X.a".to_string(), "Y.b".to_string()],
            Pending::ready(ServiceValue::new(())),
        );

        assert_eq!(registry.len(), 3);
        assert!(registry.has("X.a"));
        assert!(registry.has(CONTEXT_SERVICE));
        assert!(!registry.has("missing"));
        assert!(!registry.get("X.a").unwrap().is_settled());
        assert!(registry.get(CONTEXT_SERVICE).unwrap().is_settled());
    }

    #[test]
    fn test_get_returns_shared_future() {
        let registry = Registry::preallocate(["a".to_string()], Pending::new());
        let first = registry.get("a").unwrap();
        let second = registry.get("a").unwrap();
        assert!(first.ptr_eq(&second));
    }
}
