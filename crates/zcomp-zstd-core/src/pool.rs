//! Per-core decompression contexts.
//!
//! One context per possible core, built all-or-nothing at startup. The read
//! path binds to the slot of the core it runs on. User space cannot stop the
//! scheduler from migrating a thread mid-call, so every slot carries its own
//! lock; the lock is uncontended unless a thread was migrated, and any slot
//! decodes any page because contexts keep no state between calls.

use crate::alloc::{allocate, AllocPolicy, WorkspaceAllocator};
use crate::cpu::CoreId;
use crate::engine::{decompress_workspace_size, DecompressEngine};
use crate::{Error, Result, PAGE_SIZE};
use parking_lot::Mutex;
use std::sync::Arc;

/// Workspace plus engine handle for decompressing pages on one core.
#[derive(Debug)]
pub struct DecompressionContext {
    engine: DecompressEngine,
}

impl DecompressionContext {
    /// Size, allocate, and bind a decompression context.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfMemory`] or [`Error::EngineInit`]; nothing stays
    /// allocated on failure.
    pub fn init(allocator: &Arc<dyn WorkspaceAllocator>, policy: AllocPolicy) -> Result<Self> {
        let workspace = allocate(allocator, decompress_workspace_size(), policy)?;
        Ok(Self { engine: DecompressEngine::bind(workspace)? })
    }

    /// Decompress `src` into a full page.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decompression`] on an engine error or when the frame
    /// does not expand to exactly one page.
    pub fn decompress(&mut self, src: &[u8], dst: &mut [u8; PAGE_SIZE]) -> Result<()> {
        let len = self.engine.decompress(src, dst)?;
        if len != PAGE_SIZE {
            return Err(Error::Decompression {
                code: 0,
                name: format!("decompressed size mismatch: expected {PAGE_SIZE}, got {len}"),
            });
        }
        Ok(())
    }

    /// Workspace size in bytes.
    #[must_use]
    pub fn workspace_bytes(&self) -> usize {
        self.engine.workspace().len()
    }
}

#[repr(align(64))]
#[derive(Debug)]
struct Slot(Mutex<DecompressionContext>);

/// Core-indexed collection of decompression contexts.
#[derive(Debug)]
pub struct DecompressionPool {
    slots: Box<[Slot]>,
}

impl DecompressionPool {
    /// Build one context per core, in ascending core order.
    ///
    /// If the context for core *k* fails, the contexts for cores `0..k` and
    /// the collection are released before the error is returned.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for `cores == 0`, otherwise the error
    /// of the first context that failed.
    pub fn init_all(
        allocator: &Arc<dyn WorkspaceAllocator>,
        policy: AllocPolicy,
        cores: usize,
    ) -> Result<Self> {
        if cores == 0 {
            return Err(Error::InvalidInput("pool needs at least one core".to_string()));
        }

        let mut slots: Vec<Slot> = Vec::new();
        slots.try_reserve_exact(cores).map_err(|_| Error::OutOfMemory {
            size: cores.saturating_mul(std::mem::size_of::<Slot>()),
        })?;

        for core in 0..cores {
            match DecompressionContext::init(allocator, policy) {
                Ok(ctx) => slots.push(Slot(Mutex::new(ctx))),
                Err(e) => {
                    tracing::warn!(
                        core,
                        built = slots.len(),
                        error = %e,
                        "decompression pool build failed"
                    );
                    return Err(e);
                }
            }
        }

        tracing::debug!(cores, workspace = decompress_workspace_size(), "decompression pool ready");
        Ok(Self { slots: slots.into_boxed_slice() })
    }

    /// Decompress using the context of the calling core.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decompression`]; the page should be reported to the
    /// caller as a read error.
    pub fn decompress(&self, src: &[u8], dst: &mut [u8; PAGE_SIZE]) -> Result<()> {
        self.decompress_on(CoreId::current(), src, dst)
    }

    /// Decompress using the context of `core`.
    ///
    /// Cores beyond the pool size wrap around, which only happens when the
    /// kernel reports a core outside the possible set.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decompression`].
    pub fn decompress_on(&self, core: CoreId, src: &[u8], dst: &mut [u8; PAGE_SIZE]) -> Result<()> {
        let slot = &self.slots[core.index() % self.slots.len()];
        slot.0.lock().decompress(src, dst).inspect_err(|e| {
            if let Error::Decompression { code, name } = e {
                tracing::error!(
                    target: "zcomp_zstd",
                    %core,
                    code,
                    name = %name,
                    "decompress error"
                );
            }
        })
    }

    /// Number of per-core contexts.
    #[must_use]
    pub fn cores(&self) -> usize {
        self.slots.len()
    }

    /// Total workspace bytes held by the pool.
    #[must_use]
    pub fn workspace_bytes(&self) -> usize {
        self.slots.iter().map(|s| s.0.lock().workspace_bytes()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alloc::SystemAllocator;
    use crate::compress::CompressionContext;
    use crate::COMPRESS_BOUND;

    fn system() -> Arc<dyn WorkspaceAllocator> {
        Arc::new(SystemAllocator::new())
    }

    fn compressed(page: &[u8; PAGE_SIZE]) -> Vec<u8> {
        let mut ctx = CompressionContext::init(&system(), AllocPolicy::default()).unwrap();
        let mut dst = vec![0u8; COMPRESS_BOUND];
        let n = ctx.compress(page, &mut dst).unwrap();
        dst.truncate(n);
        dst
    }

    #[test]
    fn test_zero_cores_rejected() {
        let err = DecompressionPool::init_all(&system(), AllocPolicy::default(), 0).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_huge_core_count_is_out_of_memory() {
        let alloc = system();
        let err = DecompressionPool::init_all(&alloc, AllocPolicy::default(), usize::MAX / 2)
            .unwrap_err();
        assert!(matches!(err, Error::OutOfMemory { size: usize::MAX }));
    }

    #[test]
    fn test_pool_sizes() {
        let pool = DecompressionPool::init_all(&system(), AllocPolicy::default(), 3).unwrap();
        assert_eq!(pool.cores(), 3);
        assert_eq!(pool.workspace_bytes(), 3 * decompress_workspace_size());
    }

    #[test]
    fn test_every_core_decodes() {
        let pool = DecompressionPool::init_all(&system(), AllocPolicy::default(), 4).unwrap();
        let page = [0x42u8; PAGE_SIZE];
        let frame = compressed(&page);

        for core in 0..4 {
            let mut out = [0u8; PAGE_SIZE];
            pool.decompress_on(CoreId(core), &frame, &mut out).unwrap();
            assert_eq!(out, page);
        }
    }

    #[test]
    fn test_out_of_range_core_wraps() {
        let pool = DecompressionPool::init_all(&system(), AllocPolicy::default(), 2).unwrap();
        let page = [7u8; PAGE_SIZE];
        let frame = compressed(&page);
        let mut out = [0u8; PAGE_SIZE];
        pool.decompress_on(CoreId(9), &frame, &mut out).unwrap();
        assert_eq!(out, page);
    }

    #[test]
    fn test_current_core_path() {
        let pool = DecompressionPool::init_all(&system(), AllocPolicy::default(), 1).unwrap();
        let page = [0u8; PAGE_SIZE];
        let frame = compressed(&page);
        let mut out = [0xFFu8; PAGE_SIZE];
        pool.decompress(&frame, &mut out).unwrap();
        assert_eq!(out, page);
    }

    #[test]
    fn test_truncated_frame_rejected() {
        let pool = DecompressionPool::init_all(&system(), AllocPolicy::default(), 1).unwrap();
        let mut page = [0u8; PAGE_SIZE];
        for (i, byte) in page.iter_mut().enumerate() {
            *byte = (i * 7 % 256) as u8;
        }
        let frame = compressed(&page);
        let mut out = [0u8; PAGE_SIZE];
        let err = pool.decompress_on(CoreId(0), &frame[..frame.len() / 2], &mut out).unwrap_err();
        assert!(matches!(err, Error::Decompression { .. }));
    }

    #[test]
    fn test_short_frame_is_malformed() {
        let pool = DecompressionPool::init_all(&system(), AllocPolicy::default(), 1).unwrap();
        let frame = zstd::bulk::compress(&[1u8; 100], 1).unwrap();
        let mut out = [0u8; PAGE_SIZE];
        match pool.decompress_on(CoreId(0), &frame, &mut out) {
            Err(Error::Decompression { name, .. }) => assert!(name.contains("size mismatch")),
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
