//! The backend contract consumed by the compressed block store.
//!
//! Build order is compression context, then the shared decompression pool.
//! A failure at either step releases only what that call built: the
//! compression context drops on the way out and a pool that other backends
//! already hold is left alone.

use crate::alloc::{AllocTier, SystemAllocator, WorkspaceAllocator};
use crate::compress::CompressionContext;
use crate::config::BackendConfig;
use crate::cpu::CoreId;
use crate::pool::DecompressionPool;
use crate::registry::PoolRegistry;
use crate::stats::{BackendStats, Counters};
use crate::{Result, PAGE_SIZE};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// Page compression backend as seen by the block store.
pub trait ZcompBackend: Send + Sync {
    /// Identifying name.
    fn name(&self) -> &'static str;

    /// Compress one page into `dst` and return the compressed length.
    ///
    /// On failure the caller stores the page uncompressed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Compression`](crate::Error::Compression).
    fn compress(&self, src: &[u8; PAGE_SIZE], dst: &mut [u8]) -> Result<usize>;

    /// Decompress `src` into a full page.
    ///
    /// On failure the caller reports a read error for the page.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decompression`](crate::Error::Decompression).
    fn decompress(&self, src: &[u8], dst: &mut [u8; PAGE_SIZE]) -> Result<()>;
}

/// Builder for [`ZstdBackend`].
pub struct BackendBuilder<'r> {
    config: BackendConfig,
    allocator: Option<Arc<dyn WorkspaceAllocator>>,
    registry: &'r PoolRegistry,
}

impl Default for BackendBuilder<'static> {
    fn default() -> Self {
        Self::new()
    }
}

impl BackendBuilder<'static> {
    /// Builder with default config, the system allocator and the global
    /// registry.
    #[must_use]
    pub fn new() -> Self {
        Self { config: BackendConfig::default(), allocator: None, registry: PoolRegistry::global() }
    }
}

impl<'r> BackendBuilder<'r> {
    /// Use `config`.
    #[must_use]
    pub fn config(mut self, config: BackendConfig) -> Self {
        self.config = config;
        self
    }

    /// Draw workspaces from `allocator`.
    #[must_use]
    pub fn allocator(mut self, allocator: Arc<dyn WorkspaceAllocator>) -> Self {
        self.allocator = Some(allocator);
        self
    }

    /// Share the decompression pool through `registry` instead of the
    /// global one.
    #[must_use]
    pub fn registry<'a>(self, registry: &'a PoolRegistry) -> BackendBuilder<'a> {
        BackendBuilder { config: self.config, allocator: self.allocator, registry }
    }

    /// Build the backend.
    ///
    /// When the registry already holds a pool it is reused as is, including
    /// its core count.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`](crate::Error::Config) for an invalid config,
    /// otherwise the allocation or engine-init error of the failing step.
    pub fn build(self) -> Result<ZstdBackend> {
        self.config.validate()?;
        let allocator: Arc<dyn WorkspaceAllocator> = match self.allocator {
            Some(allocator) => allocator,
            None => Arc::new(SystemAllocator::new()),
        };
        let policy = self.config.alloc_policy();

        let comp = CompressionContext::init(&allocator, policy).inspect_err(|e| {
            tracing::warn!(error = %e, "compression context init failed");
        })?;

        let cores = self.config.core_count();
        let pool = self
            .registry
            .acquire(|| DecompressionPool::init_all(&allocator, policy, cores))?;

        tracing::info!(
            cores = pool.cores(),
            comp_tier = ?comp.tier(),
            "zstd backend created"
        );

        Ok(ZstdBackend { comp: Mutex::new(comp), pool, counters: Counters::default() })
    }
}

/// zstd backend: one shared compression context plus the per-core
/// decompression pool.
pub struct ZstdBackend {
    comp: Mutex<CompressionContext>,
    pool: Arc<DecompressionPool>,
    counters: Counters,
}

impl ZstdBackend {
    /// Backend name.
    pub const NAME: &'static str = "zstd";

    /// Create a backend with default settings.
    ///
    /// # Errors
    ///
    /// See [`BackendBuilder::build`].
    pub fn create() -> Result<Self> {
        BackendBuilder::new().build()
    }

    /// Start a builder.
    #[must_use]
    pub fn builder() -> BackendBuilder<'static> {
        BackendBuilder::new()
    }

    /// Destroy the backend held in `slot`, if any.
    ///
    /// Idempotent: an empty slot is left as is. Dropping a backend has the
    /// same effect.
    pub fn destroy(slot: &mut Option<Self>) {
        if let Some(backend) = slot.take() {
            let remaining = Arc::strong_count(&backend.pool) - 1;
            drop(backend);
            tracing::debug!(remaining, "zstd backend destroyed");
        }
    }

    /// Decompress using the context of an explicit core.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decompression`](crate::Error::Decompression).
    pub fn decompress_on(&self, core: CoreId, src: &[u8], dst: &mut [u8; PAGE_SIZE]) -> Result<()> {
        let result = self.pool.decompress_on(core, src, dst);
        self.record_decompress(&result);
        result
    }

    /// Number of per-core decompression contexts.
    #[must_use]
    pub fn cores(&self) -> usize {
        self.pool.cores()
    }

    /// Tier the compression workspace came from.
    #[must_use]
    pub fn compression_tier(&self) -> AllocTier {
        self.comp.lock().tier()
    }

    /// Total workspace bytes reachable from this backend.
    #[must_use]
    pub fn workspace_bytes(&self) -> usize {
        self.comp.lock().workspace_bytes() + self.pool.workspace_bytes()
    }

    /// Counter snapshot.
    #[must_use]
    pub fn stats(&self) -> BackendStats {
        self.counters.snapshot()
    }

    /// Zero all counters.
    pub fn reset_stats(&self) {
        self.counters.reset();
    }

    fn record_decompress(&self, result: &Result<()>) {
        match result {
            Ok(()) => self.counters.decompressed(),
            Err(_) => self.counters.decompress_failed(),
        }
    }
}

impl ZcompBackend for ZstdBackend {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn compress(&self, src: &[u8; PAGE_SIZE], dst: &mut [u8]) -> Result<usize> {
        let result = self.comp.lock().compress(src, dst);
        match &result {
            Ok(len) => self.counters.compressed(PAGE_SIZE, *len),
            Err(_) => self.counters.compress_failed(),
        }
        result
    }

    fn decompress(&self, src: &[u8], dst: &mut [u8; PAGE_SIZE]) -> Result<()> {
        let result = self.pool.decompress(src, dst);
        self.record_decompress(&result);
        result
    }
}

impl fmt::Debug for ZstdBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ZstdBackend")
            .field("cores", &self.pool.cores())
            .field("stats", &self.counters.snapshot())
            .finish_non_exhaustive()
    }
}
