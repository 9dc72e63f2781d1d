//! Shared ownership of the decompression pool.
//!
//! Every live backend holds an `Arc` to the same pool. The registry keeps
//! only a weak reference, so the pool is released together with the last
//! backend and rebuilt by the next create. Building and publishing happen
//! under one lock; concurrent creates never build two pools.

use crate::pool::DecompressionPool;
use crate::Result;
use parking_lot::Mutex;
use std::sync::{Arc, OnceLock, Weak};

/// Holder of the shared decompression pool.
#[derive(Debug, Default)]
pub struct PoolRegistry {
    pool: Mutex<Weak<DecompressionPool>>,
}

impl PoolRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide registry used by [`ZstdBackend::create`](crate::ZstdBackend::create).
    pub fn global() -> &'static PoolRegistry {
        static GLOBAL: OnceLock<PoolRegistry> = OnceLock::new();
        GLOBAL.get_or_init(PoolRegistry::new)
    }

    /// Return the live pool, or build and publish one with `build`.
    ///
    /// A pool that already exists is never touched by a failing `build`.
    ///
    /// # Errors
    ///
    /// Returns whatever `build` returns; the registry stays empty.
    pub fn acquire<F>(&self, build: F) -> Result<Arc<DecompressionPool>>
    where
        F: FnOnce() -> Result<DecompressionPool>,
    {
        let mut slot = self.pool.lock();
        if let Some(pool) = slot.upgrade() {
            return Ok(pool);
        }

        let pool = Arc::new(build()?);
        *slot = Arc::downgrade(&pool);
        tracing::info!(cores = pool.cores(), "shared decompression pool built");
        Ok(pool)
    }

    /// Whether a pool is currently alive.
    #[must_use]
    pub fn is_built(&self) -> bool {
        self.pool.lock().strong_count() > 0
    }

    /// Number of backends holding the pool.
    #[must_use]
    pub fn live_backends(&self) -> usize {
        self.pool.lock().strong_count()
    }
}
