//! zstd compression backend for compressed-memory block devices.
//!
//! This crate owns the resources around the zstd engine: zeroed workspaces
//! drawn from a fast heap tier with a page-mapped fallback, one shared
//! compression context for the write path, and one decompression context
//! per possible core for the read path. The read path never allocates.
//!
//! # Example
//!
//! ```
//! use zcomp_zstd_core::{ZcompBackend, ZstdBackend, COMPRESS_BOUND, PAGE_SIZE};
//!
//! let backend = ZstdBackend::create().unwrap();
//!
//! let page = [0u8; PAGE_SIZE];
//! let mut frame = vec![0u8; COMPRESS_BOUND];
//! let len = backend.compress(&page, &mut frame).unwrap();
//!
//! let mut out = [0xFFu8; PAGE_SIZE];
//! backend.decompress(&frame[..len], &mut out).unwrap();
//! assert_eq!(page, out);
//! ```

#![deny(missing_docs)]
#![deny(clippy::panic)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod alloc;
mod backend;
pub mod benchmark;
pub mod compress;
mod config;
pub mod cpu;
pub mod engine;
mod error;
pub mod pool;
mod registry;
mod stats;

pub use backend::{BackendBuilder, ZcompBackend, ZstdBackend};
pub use config::{BackendConfig, DEFAULT_CONFIG_PATH, MAX_CORES};
pub use error::{Error, Result};
pub use registry::PoolRegistry;
pub use stats::BackendStats;

/// Memory page size handled by the backend.
pub const PAGE_SIZE: usize = 4096;

/// Destination capacity for one compressed page (worst-case expansion fits).
pub const COMPRESS_BOUND: usize = 2 * PAGE_SIZE;

/// Fixed zstd level, chosen for throughput.
pub const ZSTD_LEVEL: i32 = 1;
