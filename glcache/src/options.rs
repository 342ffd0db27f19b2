use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Options for a [`GraphicsContext`](crate::GraphicsContext) and its state cache.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextOptions {
    /// Track at most this many texture units. Never more than the context reports.
    pub texture_units: Option<u32>,
    /// Track at most this many vertex attribute locations. Never more than the
    /// context reports.
    pub vertex_attributes: Option<u32>,
}

/// Options for a [`ResourceCache`](crate::ResourceCache).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceCacheOptions {
    /// How much time [`update`](crate::ResourceCache::update) accumulates before
    /// polling sources for changes.
    pub poll_interval: Duration,
    /// Start monitoring as soon as the cache is created.
    pub monitor_on_start: bool,
}

impl Default for ResourceCacheOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            monitor_on_start: false,
        }
    }
}
