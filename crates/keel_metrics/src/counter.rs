//! Named counters for tracking model graph activity

use std::collections::BTreeMap;

#[derive(Debug, Default)]
pub struct Counter {
    counters: BTreeMap<String, usize>,
}

impl Counter {
    pub fn new() -> Self {
        Self {
            counters: BTreeMap::new(),
        }
    }

    pub fn increment(&mut self, name: &str, value: usize) {
        match self.counters.get_mut(name) {
            Some(count) => *count += value,
            None => {
                self.counters.insert(name.to_string(), value);
            }
        }
    }

    pub fn get(&self, name: &str) -> usize {
        self.counters.get(name).copied().unwrap_or(0)
    }

    pub fn reset_all(&mut self) {
        self.counters.clear();
    }

    /// Counters in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.counters.iter().map(|(name, count)| (name.as_str(), *count))
    }
}
