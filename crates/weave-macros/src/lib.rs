//! Procedural macros for the Weave service container.
//!
//! - `#[register_module("path")]` - contributes a factory to the module table
//! - `#[register_library("name")]` - contributes an external library value
//!
//! Both leave the decorated function untouched and append a
//! `linkme` distributed-slice entry in `weave-core`, so the runtime's
//! `ModuleRegistry::collect_all()` finds them without any manual wiring.
//!
//! ```rust,ignore
//! use weave::prelude::*;
//!
//! #[register_module("pluginA/a")]
//! fn a(args: Arguments) -> FactoryResult {
//!     let timeout = args.get::<u64>(0)?;
//!     Ok(Produced::value(*timeout * 2))
//! }
//!
//! // Async functions become deferred factories; declare the service `async`.
//! #[register_module("pluginB/b")]
//! async fn b(args: Arguments) -> Result<String, BoxError> {
//!     Ok(format!("got {}", args.get::<String>(0)?))
//! }
//!
//! #[register_library("clock")]
//! fn clock() -> ServiceValue {
//!     ServiceValue::new(SystemClock)
//! }
//! ```

mod register;

use proc_macro::TokenStream;

/// Registers a factory function under a module path.
///
/// The function takes one `Arguments` parameter.  A plain `fn` returns
/// `FactoryResult`; an `async fn` returns `Result<T, BoxError>` and is
/// wrapped in `Produced::deferred`.
#[proc_macro_attribute]
pub fn register_module(attr: TokenStream, item: TokenStream) -> TokenStream {
    register::register_module(attr, item)
}

/// Registers a `fn() -> ServiceValue` as an external library.
#[proc_macro_attribute]
pub fn register_library(attr: TokenStream, item: TokenStream) -> TokenStream {
    register::register_library(attr, item)
}
