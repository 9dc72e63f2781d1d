//! Backend statistics.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Snapshot of backend counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BackendStats {
    /// Pages compressed successfully.
    pub pages_compressed: u64,
    /// Pages the engine refused to compress.
    pub compress_failures: u64,
    /// Pages decompressed successfully.
    pub pages_decompressed: u64,
    /// Frames the engine refused to decompress.
    pub decompress_failures: u64,
    /// Bytes fed to the compressor.
    pub bytes_in: u64,
    /// Bytes produced by the compressor.
    pub bytes_out: u64,
}

impl BackendStats {
    /// Overall compression ratio (input / output), 1.0 when nothing was
    /// compressed.
    #[must_use]
    pub fn overall_ratio(&self) -> f64 {
        if self.bytes_out == 0 {
            return 1.0;
        }
        self.bytes_in as f64 / self.bytes_out as f64
    }
}

#[derive(Debug, Default)]
pub(crate) struct Counters {
    pages_compressed: AtomicU64,
    compress_failures: AtomicU64,
    pages_decompressed: AtomicU64,
    decompress_failures: AtomicU64,
    bytes_in: AtomicU64,
    bytes_out: AtomicU64,
}

impl Counters {
    pub(crate) fn compressed(&self, bytes_in: usize, bytes_out: usize) {
        self.pages_compressed.fetch_add(1, Ordering::Relaxed);
        self.bytes_in.fetch_add(bytes_in as u64, Ordering::Relaxed);
        self.bytes_out.fetch_add(bytes_out as u64, Ordering::Relaxed);
    }

    pub(crate) fn compress_failed(&self) {
        self.compress_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn decompressed(&self) {
        self.pages_decompressed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn decompress_failed(&self) {
        self.decompress_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> BackendStats {
        BackendStats {
            pages_compressed: self.pages_compressed.load(Ordering::Relaxed),
            compress_failures: self.compress_failures.load(Ordering::Relaxed),
            pages_decompressed: self.pages_decompressed.load(Ordering::Relaxed),
            decompress_failures: self.decompress_failures.load(Ordering::Relaxed),
            bytes_in: self.bytes_in.load(Ordering::Relaxed),
            bytes_out: self.bytes_out.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn reset(&self) {
        for counter in [
            &self.pages_compressed,
            &self.compress_failures,
            &self.pages_decompressed,
            &self.decompress_failures,
            &self.bytes_in,
            &self.bytes_out,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}
