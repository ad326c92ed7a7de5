//! Modules and libraries behind the demo's plugin descriptors.
//!
//! ```text
//! common/timeout  <- ::clock
//! pluginA/a       <- ::logger, B.a
//! pluginA/b       <- timeout                (async)
//! pluginB/a       <- timeout, A.b           (async)
//! ```

use std::time::{Duration, Instant};

use tracing::info;
use weave::prelude::*;

// ============================================================================
// Libraries
// ============================================================================

/// Process start, shared by everything that reports timings.
#[derive(Debug, Clone, Copy)]
pub struct Clock {
    started: Instant,
}

impl Clock {
    pub fn elapsed_ms(&self) -> u128 {
        self.started.elapsed().as_millis()
    }
}

#[register_library("clock")]
fn clock() -> ServiceValue {
    ServiceValue::new(Clock {
        started: Instant::now(),
    })
}

#[derive(Debug, Clone)]
pub struct Logger {
    prefix: &'static str,
}

impl Logger {
    pub fn log(&self, message: &str) {
        info!("[{}] {message}", self.prefix);
    }
}

#[register_library("logger")]
fn logger() -> ServiceValue {
    ServiceValue::new(Logger { prefix: "demo" })
}

// ============================================================================
// common
// ============================================================================

/// Delays measured against the shared clock.
#[derive(Debug, Clone)]
pub struct Timeout {
    clock: Clock,
}

impl Timeout {
    /// Sleeps for `ms` and returns the clock reading afterwards.
    pub async fn after(&self, ms: u64) -> u128 {
        tokio::time::sleep(Duration::from_millis(ms)).await;
        self.clock.elapsed_ms()
    }
}

#[register_module("common/timeout")]
fn timeout(args: Arguments) -> FactoryResult {
    let clock = args.get::<Clock>(0)?;
    Ok(Produced::value(Timeout { clock: *clock }))
}

// ============================================================================
// pluginA
// ============================================================================

#[register_module("pluginA/a")]
fn plugin_a_a(args: Arguments) -> FactoryResult {
    let logger = args.get::<Logger>(0)?;
    let text = args.get::<String>(1)?;
    logger.log(&format!("A.a received: {text}"));
    Ok(Produced::value(format!("A.a wraps ({text})")))
}

#[register_module("pluginA/b")]
async fn plugin_a_b(args: Arguments) -> Result<String, BoxError> {
    let timeout = args.get::<Timeout>(0)?;
    let at = timeout.after(200).await;
    Ok(format!("A.b ready after {at}ms"))
}

// ============================================================================
// pluginB
// ============================================================================

#[register_module("pluginB/a")]
async fn plugin_b_a(args: Arguments) -> Result<String, BoxError> {
    let timeout = args.get::<Timeout>(0)?;
    let from_a = args.get::<String>(1)?;
    let at = timeout.after(100).await;
    Ok(format!("B.a got \"{from_a}\" at {at}ms"))
}
