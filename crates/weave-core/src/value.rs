//! Type-erased service values and the factory calling convention.
//!
//! Every service produces exactly one [`ServiceValue`].  Values are shared
//! between all dependents, so they are stored behind an `Arc` and handed out
//! by cloning the handle, never the underlying data.
//!
//! A factory is called with the values of its requirements as positional
//! [`Arguments`] and answers with a [`Produced`] value: either final, or a
//! deferred future that the container awaits for services declared `async`.
//!
//! ```rust,ignore
//! let double = Factory::new(|args: Arguments| {
//!     let a = args.get::<i64>(0)?;
//!     Ok(Produced::value(*a * 2))
//! });
//! ```

use std::any::{Any, type_name};
use std::fmt;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;

use crate::error::{ArgumentError, BoxError};

// ─── ServiceValue ─────────────────────────────────────────────────────────────

/// A type-erased, cheaply clonable value produced by a service.
#[derive(Clone)]
pub struct ServiceValue {
    inner: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl ServiceValue {
    /// Wraps `value` in a new shared allocation.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            inner: Arc::new(value),
            type_name: type_name::<T>(),
        }
    }

    /// Wraps an existing `Arc` without re-allocating.
    pub fn from_arc<T: Any + Send + Sync>(value: Arc<T>) -> Self {
        Self {
            inner: value,
            type_name: type_name::<T>(),
        }
    }

    /// Returns `true` if the stored value is a `T`.
    pub fn is<T: Any>(&self) -> bool {
        self.inner.is::<T>()
    }

    /// Borrows the stored value as a `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }

    /// Returns a shared handle to the stored value as a `T`.
    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        Arc::clone(&self.inner).downcast::<T>().ok()
    }

    /// Name of the concrete type stored in this value.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Debug for ServiceValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ServiceValue<{}>", self.type_name)
    }
}

// ─── Arguments ────────────────────────────────────────────────────────────────

/// Positional requirement values passed to a factory.
///
/// Index `i` holds the value of the `i`-th declared requirement.
#[derive(Debug, Clone, Default)]
pub struct Arguments {
    values: Vec<ServiceValue>,
}

impl Arguments {
    pub fn new(values: Vec<ServiceValue>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns the raw value at `index`.
    pub fn value(&self, index: usize) -> Option<&ServiceValue> {
        self.values.get(index)
    }

    /// Returns the value at `index` downcast to `T`.
    pub fn get<T: Any + Send + Sync>(&self, index: usize) -> Result<Arc<T>, ArgumentError> {
        let value = self
            .values
            .get(index)
            .ok_or(ArgumentError::Missing { index })?;
        value.downcast::<T>().ok_or(ArgumentError::TypeMismatch {
            index,
            expected: type_name::<T>(),
            actual: value.type_name(),
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &ServiceValue> {
        self.values.iter()
    }

    pub fn into_vec(self) -> Vec<ServiceValue> {
        self.values
    }
}

impl From<Vec<ServiceValue>> for Arguments {
    fn from(values: Vec<ServiceValue>) -> Self {
        Self::new(values)
    }
}

// ─── Produced ─────────────────────────────────────────────────────────────────

/// Future returned by a factory whose value is not available yet.
pub type DeferredValue = BoxFuture<'static, Result<ServiceValue, BoxError>>;

/// What a factory hands back to the container.
pub enum Produced {
    /// The final value.
    Value(ServiceValue),
    /// A value that settles later; only legal for services declared `async`.
    Deferred(DeferredValue),
}

impl Produced {
    /// Shorthand for `Produced::Value(ServiceValue::new(value))`.
    pub fn value<T: Any + Send + Sync>(value: T) -> Self {
        Self::Value(ServiceValue::new(value))
    }

    /// Wraps a future producing a plain `T`.
    pub fn deferred<F, T>(future: F) -> Self
    where
        F: Future<Output = Result<T, BoxError>> + Send + 'static,
        T: Any + Send + Sync,
    {
        Self::Deferred(future.map(|r| r.map(ServiceValue::new)).boxed())
    }

    pub fn is_deferred(&self) -> bool {
        matches!(self, Self::Deferred(_))
    }
}

impl fmt::Debug for Produced {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Self::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

impl From<ServiceValue> for Produced {
    fn from(value: ServiceValue) -> Self {
        Self::Value(value)
    }
}

// ─── Factory ──────────────────────────────────────────────────────────────────

/// Result of calling a factory.
pub type FactoryResult = Result<Produced, BoxError>;

/// Plain function pointer form of a factory, as stored in the compile-time
/// module registry.
pub type ModuleFn = fn(Arguments) -> FactoryResult;

/// A shareable, callable service factory.
#[derive(Clone)]
pub struct Factory(Arc<dyn Fn(Arguments) -> FactoryResult + Send + Sync>);

impl Factory {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(Arguments) -> FactoryResult + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Builds a factory from a function pointer.
    pub fn from_fn(f: ModuleFn) -> Self {
        Self(Arc::new(f))
    }

    /// Factory that ignores its arguments and always yields a clone of `value`.
    pub fn constant(value: ServiceValue) -> Self {
        Self::new(move |_| Ok(Produced::Value(value.clone())))
    }

    pub fn call(&self, args: Arguments) -> FactoryResult {
        (self.0)(args)
    }
}

impl fmt::Debug for Factory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Factory(..)")
    }
}
