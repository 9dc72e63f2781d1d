//! zstd engine handles bound to caller-provided workspaces.
//!
//! The engine is placed inside its workspace with the static-context API, so
//! it never allocates after binding. Each handle owns its [`Workspace`]; the
//! handle cannot outlive the memory it lives in.

use crate::alloc::Workspace;
use crate::{Error, Result, PAGE_SIZE, ZSTD_LEVEL};
use std::ffi::{c_int, c_void, CStr};
use std::fmt;
use std::ptr::NonNull;
use zstd_sys as sys;

/// Workspace size needed by a compression context for one page at
/// [`ZSTD_LEVEL`].
#[must_use]
pub fn compress_workspace_size() -> usize {
    // SAFETY: pure parameter computations.
    unsafe {
        let params = sys::ZSTD_getCParams(ZSTD_LEVEL as c_int, PAGE_SIZE as u64, 0);
        sys::ZSTD_estimateCCtxSize_usingCParams(params)
    }
}

/// Workspace size needed by a decompression context. Independent of level.
#[must_use]
pub fn decompress_workspace_size() -> usize {
    // SAFETY: pure computation.
    unsafe { sys::ZSTD_estimateDCtxSize() }
}

/// Worst-case compressed size for `len` input bytes.
#[must_use]
pub fn compress_bound(len: usize) -> usize {
    // SAFETY: pure computation.
    unsafe { sys::ZSTD_compressBound(len) }
}

/// Engine result code split into error code and name.
fn check(ret: usize) -> std::result::Result<usize, (usize, String)> {
    // SAFETY: ZSTD_isError/ZSTD_getErrorName accept any code and return a
    // static string.
    unsafe {
        if sys::ZSTD_isError(ret) == 0 {
            return Ok(ret);
        }
        let name = CStr::from_ptr(sys::ZSTD_getErrorName(ret)).to_string_lossy().into_owned();
        Err((0usize.wrapping_sub(ret), name))
    }
}

/// Compression context placed inside its workspace.
pub struct CompressEngine {
    cctx: NonNull<sys::ZSTD_CCtx>,
    // Declared last: the context lives inside this block.
    workspace: Workspace,
}

// SAFETY: the context is only reachable through &mut self.
unsafe impl Send for CompressEngine {}

impl CompressEngine {
    /// Place a compression context in `workspace`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EngineInit`] when the engine rejects the workspace
    /// (too small or misaligned). The workspace is released.
    pub fn bind(mut workspace: Workspace) -> Result<Self> {
        let len = workspace.len();
        // SAFETY: the block is valid for len bytes and exclusively ours.
        let raw = unsafe { sys::ZSTD_initStaticCCtx(workspace.as_mut_ptr().cast::<c_void>(), len) };
        let cctx = NonNull::new(raw).ok_or_else(|| {
            Error::EngineInit(format!("compression context rejected {len} byte workspace"))
        })?;
        Ok(Self { cctx, workspace })
    }

    /// Compress one page into `dst`, writing at most `dst.len()` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Compression`] with the engine's code.
    pub fn compress(&mut self, src: &[u8; PAGE_SIZE], dst: &mut [u8]) -> Result<usize> {
        // SAFETY: cctx lives in our workspace; src/dst are valid for the
        // lengths passed.
        let ret = unsafe {
            sys::ZSTD_compressCCtx(
                self.cctx.as_ptr(),
                dst.as_mut_ptr().cast::<c_void>(),
                dst.len(),
                src.as_ptr().cast::<c_void>(),
                PAGE_SIZE,
                ZSTD_LEVEL as c_int,
            )
        };
        check(ret).map_err(|(code, name)| Error::Compression { code, name })
    }

    /// Workspace backing this context.
    #[must_use]
    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }
}

impl fmt::Debug for CompressEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompressEngine").field("workspace", &self.workspace).finish()
    }
}

/// Decompression context placed inside its workspace.
pub struct DecompressEngine {
    dctx: NonNull<sys::ZSTD_DCtx>,
    workspace: Workspace,
}

// SAFETY: the context is only reachable through &mut self.
unsafe impl Send for DecompressEngine {}

impl DecompressEngine {
    /// Place a decompression context in `workspace`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EngineInit`] when the engine rejects the workspace.
    pub fn bind(mut workspace: Workspace) -> Result<Self> {
        let len = workspace.len();
        // SAFETY: the block is valid for len bytes and exclusively ours.
        let raw = unsafe { sys::ZSTD_initStaticDCtx(workspace.as_mut_ptr().cast::<c_void>(), len) };
        let dctx = NonNull::new(raw).ok_or_else(|| {
            Error::EngineInit(format!("decompression context rejected {len} byte workspace"))
        })?;
        Ok(Self { dctx, workspace })
    }

    /// Decompress `src` into `dst`, returning the number of bytes produced.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decompression`] with the engine's code.
    pub fn decompress(&mut self, src: &[u8], dst: &mut [u8; PAGE_SIZE]) -> Result<usize> {
        // SAFETY: dctx lives in our workspace; src/dst are valid for the
        // lengths passed.
        let ret = unsafe {
            sys::ZSTD_decompressDCtx(
                self.dctx.as_ptr(),
                dst.as_mut_ptr().cast::<c_void>(),
                PAGE_SIZE,
                src.as_ptr().cast::<c_void>(),
                src.len(),
            )
        };
        check(ret).map_err(|(code, name)| Error::Decompression { code, name })
    }

    /// Workspace backing this context.
    #[must_use]
    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }
}

impl fmt::Debug for DecompressEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecompressEngine").field("workspace", &self.workspace).finish()
    }
}
