//! Workspace allocation with a fast tier and a page-mapped fallback tier.
//!
//! Workspaces are requested on the swap-out path, so neither tier may retry,
//! log, or recurse into I/O. The fast tier is the global heap allocator. The
//! fallback tier maps anonymous pages directly, which tolerates heap
//! fragmentation at the cost of page granularity.
//!
//! ## Usage
//!
//! ```
//! use std::sync::Arc;
//! use zcomp_zstd_core::alloc::{allocate, AllocPolicy, SystemAllocator, WorkspaceAllocator};
//!
//! let allocator: Arc<dyn WorkspaceAllocator> = Arc::new(SystemAllocator::new());
//! let ws = allocate(&allocator, 16 * 1024, AllocPolicy::default()).unwrap();
//! assert!(ws.as_slice().iter().all(|&b| b == 0));
//! ```

use crate::{Error, Result};
use std::alloc::Layout;
use std::fmt;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Alignment of fast-tier blocks. The engine needs 8, a cache line keeps
/// per-core workspaces from sharing lines.
pub const WORKSPACE_ALIGN: usize = 64;

/// Which tier produced a workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocTier {
    /// Zeroed heap allocation.
    Fast,
    /// Zero-filled anonymous page mapping.
    Fallback,
}

/// Allocation policy applied by [`allocate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocPolicy {
    /// Try the fallback tier when the fast tier fails.
    pub fallback: bool,
}

impl Default for AllocPolicy {
    fn default() -> Self {
        Self { fallback: true }
    }
}

/// Source of zeroed workspace memory.
///
/// Both tiers must return zero-initialised memory aligned to at least
/// 8 bytes, or `None` without side effects.
pub trait WorkspaceAllocator: Send + Sync {
    /// Fast, zeroed allocation. Must not retry or warn on failure.
    fn allocate_fast(&self, size: usize) -> Option<NonNull<u8>>;

    /// Slower, page-granular zeroed allocation.
    fn allocate_fallback(&self, size: usize) -> Option<NonNull<u8>>;

    /// Release a block.
    ///
    /// # Safety
    ///
    /// `ptr` must have been returned by the method matching `tier` on this
    /// allocator with the same `size`, and must not have been released yet.
    unsafe fn release(&self, ptr: NonNull<u8>, size: usize, tier: AllocTier);
}

/// Zeroed memory block owned by exactly one engine context.
///
/// Released once, on drop, through the tier that produced it.
pub struct Workspace {
    ptr: NonNull<u8>,
    size: usize,
    tier: AllocTier,
    allocator: Arc<dyn WorkspaceAllocator>,
}

// SAFETY: the block is exclusively owned; access goes through &mut self or
// &self for reads only.
unsafe impl Send for Workspace {}

impl Workspace {
    /// Size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.size
    }

    /// Workspaces are never empty; kept for clippy's `len_without_is_empty`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Tier that produced this block.
    #[must_use]
    pub fn tier(&self) -> AllocTier {
        self.tier
    }

    /// View the block as bytes.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        // SAFETY: ptr is valid for size bytes and was zero-initialised.
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.size) }
    }

    pub(crate) fn as_mut_ptr(&mut self) -> *mut u8 {
        self.ptr.as_ptr()
    }
}

impl fmt::Debug for Workspace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Workspace")
            .field("ptr", &self.ptr)
            .field("size", &self.size)
            .field("tier", &self.tier)
            .finish_non_exhaustive()
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        // SAFETY: ptr/size/tier are exactly what the allocator handed out,
        // and Drop runs once.
        unsafe { self.allocator.release(self.ptr, self.size, self.tier) };
    }
}

/// Obtain a zeroed workspace of `size` bytes.
///
/// Tries the fast tier, then the fallback tier when `policy.fallback` is set.
///
/// # Errors
///
/// Returns [`Error::OutOfMemory`] when every permitted tier fails, and
/// [`Error::InvalidInput`] for a zero-size request.
pub fn allocate(
    allocator: &Arc<dyn WorkspaceAllocator>,
    size: usize,
    policy: AllocPolicy,
) -> Result<Workspace> {
    if size == 0 {
        return Err(Error::InvalidInput("workspace size must be non-zero".to_string()));
    }

    let (ptr, tier) = if let Some(ptr) = allocator.allocate_fast(size) {
        (ptr, AllocTier::Fast)
    } else if !policy.fallback {
        return Err(Error::OutOfMemory { size });
    } else if let Some(ptr) = allocator.allocate_fallback(size) {
        tracing::debug!(size, "workspace served from fallback tier");
        (ptr, AllocTier::Fallback)
    } else {
        return Err(Error::OutOfMemory { size });
    };

    Ok(Workspace { ptr, size, tier, allocator: Arc::clone(allocator) })
}

/// Counters for [`SystemAllocator`].
#[derive(Debug, Default)]
pub struct AllocStats {
    /// Blocks served by the fast tier.
    pub fast_allocations: AtomicU64,
    /// Blocks served by the fallback tier.
    pub fallback_allocations: AtomicU64,
    /// Tier attempts that returned nothing.
    pub failed_allocations: AtomicU64,
    /// Blocks currently outstanding.
    pub live_blocks: AtomicU64,
    /// Bytes currently outstanding (as requested, before rounding).
    pub live_bytes: AtomicU64,
}

impl AllocStats {
    /// Blocks currently outstanding.
    #[must_use]
    pub fn live_blocks(&self) -> u64 {
        self.live_blocks.load(Ordering::Relaxed)
    }

    /// Bytes currently outstanding.
    #[must_use]
    pub fn live_bytes(&self) -> u64 {
        self.live_bytes.load(Ordering::Relaxed)
    }

    fn record_alloc(&self, tier: AllocTier, size: usize) {
        match tier {
            AllocTier::Fast => self.fast_allocations.fetch_add(1, Ordering::Relaxed),
            AllocTier::Fallback => self.fallback_allocations.fetch_add(1, Ordering::Relaxed),
        };
        self.live_blocks.fetch_add(1, Ordering::Relaxed);
        self.live_bytes.fetch_add(size as u64, Ordering::Relaxed);
    }

    fn record_release(&self, size: usize) {
        self.live_blocks.fetch_sub(1, Ordering::Relaxed);
        self.live_bytes.fetch_sub(size as u64, Ordering::Relaxed);
    }
}

/// Heap for the fast tier, anonymous `mmap` for the fallback tier.
#[derive(Debug, Default)]
pub struct SystemAllocator {
    stats: AllocStats,
}

impl SystemAllocator {
    /// Create a new system allocator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocation counters.
    #[must_use]
    pub fn stats(&self) -> &AllocStats {
        &self.stats
    }

    fn fast_layout(size: usize) -> Option<Layout> {
        Layout::from_size_align(size, WORKSPACE_ALIGN).ok()
    }
}

impl WorkspaceAllocator for SystemAllocator {
    fn allocate_fast(&self, size: usize) -> Option<NonNull<u8>> {
        let layout = Self::fast_layout(size)?;
        // SAFETY: layout has non-zero size (checked by `allocate`).
        let ptr = NonNull::new(unsafe { std::alloc::alloc_zeroed(layout) });
        match ptr {
            Some(_) => self.stats.record_alloc(AllocTier::Fast, size),
            None => {
                self.stats.failed_allocations.fetch_add(1, Ordering::Relaxed);
            }
        }
        ptr
    }

    fn allocate_fallback(&self, size: usize) -> Option<NonNull<u8>> {
        let ptr = map_anonymous(size);
        match ptr {
            Some(_) => self.stats.record_alloc(AllocTier::Fallback, size),
            None => {
                self.stats.failed_allocations.fetch_add(1, Ordering::Relaxed);
            }
        }
        ptr
    }

    unsafe fn release(&self, ptr: NonNull<u8>, size: usize, tier: AllocTier) {
        match tier {
            AllocTier::Fast => {
                if let Some(layout) = Self::fast_layout(size) {
                    // SAFETY: caller guarantees ptr came from allocate_fast(size).
                    unsafe { std::alloc::dealloc(ptr.as_ptr(), layout) };
                }
            }
            // SAFETY: caller guarantees ptr came from allocate_fallback(size).
            AllocTier::Fallback => unsafe { unmap_anonymous(ptr, size) },
        }
        self.stats.record_release(size);
    }
}

/// OS page size, 4 KiB when the platform does not say.
#[must_use]
pub fn os_page_size() -> usize {
    // SAFETY: sysconf has no memory-safety preconditions.
    let raw = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    usize::try_from(raw).ok().filter(|&p| p > 0).unwrap_or(4096)
}

fn round_to_pages(size: usize) -> Option<usize> {
    let page = os_page_size();
    size.checked_add(page - 1).map(|s| s & !(page - 1))
}

fn map_anonymous(size: usize) -> Option<NonNull<u8>> {
    use libc::{mmap, MAP_ANONYMOUS, MAP_FAILED, MAP_NORESERVE, MAP_PRIVATE, PROT_READ, PROT_WRITE};

    let len = round_to_pages(size)?;
    // SAFETY: anonymous private mapping, no fd, kernel chooses the address.
    let ptr = unsafe {
        mmap(
            std::ptr::null_mut(),
            len,
            PROT_READ | PROT_WRITE,
            MAP_PRIVATE | MAP_ANONYMOUS | MAP_NORESERVE,
            -1,
            0,
        )
    };
    if ptr == MAP_FAILED {
        return None;
    }
    NonNull::new(ptr.cast::<u8>())
}

/// # Safety
///
/// `ptr` must come from `map_anonymous(size)` and be unmapped once.
unsafe fn unmap_anonymous(ptr: NonNull<u8>, size: usize) {
    if let Some(len) = round_to_pages(size) {
        // SAFETY: forwarded from the caller.
        unsafe { libc::munmap(ptr.as_ptr().cast(), len) };
    }
}
