//! Shared compression context used by the write path.

use crate::alloc::{allocate, AllocPolicy, AllocTier, WorkspaceAllocator};
use crate::engine::{compress_workspace_size, CompressEngine};
use crate::{Error, Result, COMPRESS_BOUND, PAGE_SIZE};
use std::sync::Arc;

/// Workspace plus engine handle for compressing pages.
///
/// One instance exists per backend. It is not reentrant: the backend keeps
/// it behind a lock.
#[derive(Debug)]
pub struct CompressionContext {
    engine: CompressEngine,
}

impl CompressionContext {
    /// Size, allocate, and bind a compression context.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfMemory`] when no tier can supply the workspace
    /// and [`Error::EngineInit`] when the engine rejects it. Nothing stays
    /// allocated on failure.
    pub fn init(allocator: &Arc<dyn WorkspaceAllocator>, policy: AllocPolicy) -> Result<Self> {
        let size = compress_workspace_size();
        let workspace = allocate(allocator, size, policy)?;
        let tier = workspace.tier();
        let engine = CompressEngine::bind(workspace)?;
        tracing::debug!(size, ?tier, "compression context ready");
        Ok(Self { engine })
    }

    /// Compress one page into `dst`.
    ///
    /// At most `min(dst.len(), COMPRESS_BOUND)` bytes are written. A failure
    /// is not retried; the caller stores the page uncompressed instead.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Compression`] when the engine reports an error.
    pub fn compress(&mut self, src: &[u8; PAGE_SIZE], dst: &mut [u8]) -> Result<usize> {
        let cap = dst.len().min(COMPRESS_BOUND);
        self.engine.compress(src, &mut dst[..cap]).inspect_err(|e| {
            if let Error::Compression { code, name } = e {
                tracing::error!(target: "zcomp_zstd", code, name = %name, "compress error");
            }
        })
    }

    /// Workspace size in bytes.
    #[must_use]
    pub fn workspace_bytes(&self) -> usize {
        self.engine.workspace().len()
    }

    /// Tier the workspace came from.
    #[must_use]
    pub fn tier(&self) -> AllocTier {
        self.engine.workspace().tier()
    }
}
