//! # zcomp-zstd
//!
//! Per-core zstd compression backend for compressed-memory block devices.
//!
//! This is the workspace root crate that re-exports core functionality.
//! For direct usage, depend on individual sub-crates:
//!
//! - [`zcomp-zstd-core`] - Workspace allocator, contexts, backend lifecycle
//! - [`zcomp-zstd-cli`] - CLI tool (`zcomp-zstd` binary)

pub use zcomp_zstd_core::*;
