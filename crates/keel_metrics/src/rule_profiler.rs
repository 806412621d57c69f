//! Rule profiler for timing named rule callbacks

use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Default, Clone, Copy)]
struct RuleTiming {
    total: Duration,
    invocations: usize,
}

#[derive(Debug, Default)]
pub struct RuleProfiler {
    timings: HashMap<String, RuleTiming>,
}

impl RuleProfiler {
    pub fn new() -> Self {
        Self {
            timings: HashMap::new(),
        }
    }

    /// Charge one invocation taking `elapsed` to `name`.
    ///
    /// Nested rules are charged to both the outer and the inner rule.
    pub fn record(&mut self, name: &str, elapsed: Duration) {
        match self.timings.get_mut(name) {
            Some(timing) => {
                timing.total += elapsed;
                timing.invocations += 1;
            }
            None => {
                self.timings.insert(
                    name.to_string(),
                    RuleTiming {
                        total: elapsed,
                        invocations: 1,
                    },
                );
            }
        }
    }

    pub fn get_timing(&self, name: &str) -> Duration {
        self.timings
            .get(name)
            .map(|timing| timing.total)
            .unwrap_or(Duration::ZERO)
    }

    pub fn invocations(&self, name: &str) -> usize {
        self.timings
            .get(name)
            .map(|timing| timing.invocations)
            .unwrap_or(0)
    }

    pub fn reset(&mut self) {
        self.timings.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Duration, usize)> {
        self.timings
            .iter()
            .map(|(name, timing)| (name.as_str(), timing.total, timing.invocations))
    }
}
