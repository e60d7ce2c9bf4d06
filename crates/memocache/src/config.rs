//! Cache configuration

use serde::{Deserialize, Serialize};

/// Capacity used when none is configured
pub const DEFAULT_CAPACITY: usize = 128;

/// Settings for a memoized function
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Name used in log lines
    pub name: String,

    /// Maximum number of cached results; 0 disables caching
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            name: "anonymous".to_string(),
            capacity: DEFAULT_CAPACITY,
        }
    }
}

impl CacheConfig {
    /// Default config with the given name
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Set the capacity
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }
}
