//! Keel Metrics - counters and timings for the model graph
//!
//! Provides zero-cost abstractions for tracking how often components are
//! written and rules fire, and how long each rule callback takes. Everything
//! vanishes when the `metrics` feature is off.
//!
//! # Feature Flags
//!
//! - `metrics` - Enable metrics collection (default: disabled)
//!
//! # Usage
//!
//! ```ignore
//! use keel_metrics::{Counter, RuleProfiler};
//!
//! let mut counter = Counter::new();
//! counter.increment("rules.fired", 1);
//!
//! let mut profiler = RuleProfiler::new();
//! let started = std::time::Instant::now();
//! // ... run the rule ...
//! profiler.record("resolve-ancestors", started.elapsed());
//! ```
//!
//! In production builds (without `metrics` feature), all instrumentation
//! is compiled out to zero overhead.

#[cfg(feature = "metrics")]
mod counter;
#[cfg(feature = "metrics")]
mod rule_profiler;

#[cfg(feature = "metrics")]
pub use counter::Counter;
#[cfg(feature = "metrics")]
pub use rule_profiler::RuleProfiler;

// ============================================================================
// Macros for conditional compilation
// ============================================================================

/// Execute code only when metrics are enabled
#[macro_export]
macro_rules! metrics {
    ($($tt:tt)*) => {
        #[cfg(feature = "metrics")]
        {
            $($tt)*
        }
    };
}

// ============================================================================
// No-op stubs when metrics disabled
// ============================================================================

#[cfg(not(feature = "metrics"))]
#[derive(Debug, Default)]
pub struct Counter;

#[cfg(not(feature = "metrics"))]
impl Counter {
    pub fn new() -> Self { Self }
    pub fn increment(&mut self, _name: &str, _value: usize) {}
    pub fn get(&self, _name: &str) -> usize { 0 }
    pub fn reset_all(&mut self) {}
}

#[cfg(not(feature = "metrics"))]
#[derive(Debug, Default)]
pub struct RuleProfiler;

#[cfg(not(feature = "metrics"))]
impl RuleProfiler {
    pub fn new() -> Self { Self }
    pub fn record(&mut self, _name: &str, _elapsed: std::time::Duration) {}
    pub fn get_timing(&self, _name: &str) -> std::time::Duration { std::time::Duration::ZERO }
    pub fn invocations(&self, _name: &str) -> usize { 0 }
}
