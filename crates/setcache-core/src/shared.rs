//! Serialized access to a dirty cache from several threads.
//!
//! The cache is single-writer. Embedders whose policy layer and flush run on
//! different threads share one of these; every call holds the lock for its
//! whole duration, so a flush never observes a half-applied mutation.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::Config;
use crate::dirty_cache::{new_dirty_cache, DirtyCache};
use crate::reporter::InvariantReporter;

/// A dirty cache behind a mutex. Cloning shares the same cache.
#[derive(Clone)]
pub struct SharedDirtyCache {
    inner: Arc<Mutex<Box<dyn DirtyCache>>>,
}

impl SharedDirtyCache {
    pub fn new(cache: Box<dyn DirtyCache>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(cache)),
        }
    }

    /// Build the configured variant and wrap it.
    pub fn from_config(config: &Config, reporter: Arc<dyn InvariantReporter>) -> Self {
        Self::new(new_dirty_cache(config, reporter))
    }

    /// Run `f` with exclusive access to the cache.
    pub fn with<R>(&self, f: impl FnOnce(&mut dyn DirtyCache) -> R) -> R {
        let mut cache = self.inner.lock();
        f(&mut **cache)
    }

    /// Sets currently pending (add/update, destroy).
    pub fn dirty_counts(&self) -> (usize, usize) {
        let cache = self.inner.lock();
        (cache.num_sets_to_add_or_update(), cache.num_sets_to_destroy())
    }
}
