use lazy_static::lazy_static;
use parking_lot::ReentrantMutex;
use serde::Serialize;
use std::cell::RefCell;
use std::sync::Arc;

use crate::metadata_cache::{CacheStats, MetadataCache};

// State shared by every map instance in this module.
pub struct ModuleState {
    // Footers and lengths of the LODES files seen so far
    pub metadata: Arc<MetadataCache>,

    // Number of queries started and failed since load
    pub queries_started: usize,
    pub queries_failed: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleStats {
    #[serde(flatten)]
    pub cache: CacheStats,
    pub queries_started: usize,
    pub queries_failed: usize,
}

lazy_static! {
    static ref MODULE_STATE: ReentrantMutex<RefCell<ModuleState>> =
        ReentrantMutex::new(RefCell::new(ModuleState::new()));
}

impl Default for ModuleState {
    fn default() -> Self {
        Self::new()
    }
}

impl ModuleState {
    pub fn new() -> Self {
        ModuleState {
            metadata: Arc::new(MetadataCache::new()),
            queries_started: 0,
            queries_failed: 0,
        }
    }

    pub fn with_mut<F, R>(f: F) -> R
    where
        F: FnOnce(&mut ModuleState) -> R,
    {
        let guard = MODULE_STATE.lock();
        let mut borrow = guard.borrow_mut();
        f(&mut borrow)
    }

    pub fn with<F, R>(f: F) -> R
    where
        F: FnOnce(&ModuleState) -> R,
    {
        let guard = MODULE_STATE.lock();
        let borrow = guard.borrow();
        f(&borrow)
    }

    /// Handle to the shared metadata cache.
    pub fn metadata_cache() -> Arc<MetadataCache> {
        Self::with(|state| Arc::clone(&state.metadata))
    }

    pub fn record_query(succeeded: bool) {
        Self::with_mut(|state| {
            state.queries_started += 1;
            if !succeeded {
                state.queries_failed += 1;
            }
        });
    }

    pub fn stats(&self) -> ModuleStats {
        ModuleStats {
            cache: self.metadata.stats(),
            queries_started: self.queries_started,
            queries_failed: self.queries_failed,
        }
    }

    pub fn clear_all_caches(&mut self) {
        self.metadata.clear();
    }
}
