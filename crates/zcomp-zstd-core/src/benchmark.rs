//! Sample pages and a simple throughput benchmark for the backend.

use crate::backend::{ZcompBackend, ZstdBackend};
use crate::cpu::CoreId;
use crate::{Error, Result, COMPRESS_BOUND, PAGE_SIZE};
use serde::Serialize;
use std::time::{Duration, Instant};

/// Data pattern for test page generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataPattern {
    /// All zeros (highly compressible).
    Zero,
    /// Pseudo-random data (incompressible).
    Random,
    /// Text-like repeating content.
    Text,
    /// Rotation of all patterns.
    Mixed,
}

impl DataPattern {
    /// Parse pattern from string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "zero" | "zeros" => Some(Self::Zero),
            "random" => Some(Self::Random),
            "text" => Some(Self::Text),
            "mixed" => Some(Self::Mixed),
            _ => None,
        }
    }
}

/// Generate `count` pages with the given pattern. Deterministic.
#[must_use]
pub fn generate_test_pages(count: usize, pattern: DataPattern) -> Vec<[u8; PAGE_SIZE]> {
    let mut pages = Vec::with_capacity(count);
    let mut rng_state = 12345u64;

    for i in 0..count {
        let mut page = [0u8; PAGE_SIZE];
        match pattern {
            DataPattern::Zero => {}
            DataPattern::Random => fill_random(&mut page, &mut rng_state),
            DataPattern::Text => {
                fill_text(&mut page, b"The quick brown fox jumps over the lazy dog. ");
            }
            DataPattern::Mixed => match i % 4 {
                1 => fill_random(&mut page, &mut rng_state),
                2 => fill_pattern(&mut page),
                3 => fill_text(&mut page, b"Lorem ipsum dolor sit amet, consectetur. "),
                _ => {}
            },
        }
        pages.push(page);
    }

    pages
}

fn fill_random(page: &mut [u8; PAGE_SIZE], rng_state: &mut u64) {
    for byte in page.iter_mut() {
        *rng_state = rng_state.wrapping_mul(6364136223846793005).wrapping_add(1);
        *byte = (*rng_state >> 33) as u8;
    }
}

fn fill_text(page: &mut [u8; PAGE_SIZE], text: &[u8]) {
    for (j, byte) in page.iter_mut().enumerate() {
        *byte = text[j % text.len()];
    }
}

fn fill_pattern(page: &mut [u8; PAGE_SIZE]) {
    for (j, byte) in page.iter_mut().enumerate() {
        *byte = (j % 16) as u8;
    }
}

/// Result of one benchmark run.
#[derive(Debug, Clone, Serialize)]
pub struct BenchmarkResult {
    /// Pages processed.
    pub pages: usize,
    /// Input bytes.
    pub bytes_in: usize,
    /// Compressed bytes.
    pub bytes_out: usize,
    /// Time spent compressing.
    pub compress_time: Duration,
    /// Time spent decompressing.
    pub decompress_time: Duration,
}

impl BenchmarkResult {
    /// Compression throughput in bytes per second.
    #[must_use]
    pub fn compress_throughput(&self) -> f64 {
        self.bytes_in as f64 / self.compress_time.as_secs_f64()
    }

    /// Decompression throughput in bytes per second.
    #[must_use]
    pub fn decompress_throughput(&self) -> f64 {
        self.bytes_in as f64 / self.decompress_time.as_secs_f64()
    }

    /// Compression ratio (input / output).
    #[must_use]
    pub fn compression_ratio(&self) -> f64 {
        if self.bytes_out > 0 {
            self.bytes_in as f64 / self.bytes_out as f64
        } else {
            1.0
        }
    }
}

/// Compress then decompress every page, verifying the output.
///
/// # Errors
///
/// Returns the backend's error, or [`Error::Decompression`] if a page does
/// not round-trip.
pub fn run_benchmark(backend: &ZstdBackend, pages: &[[u8; PAGE_SIZE]]) -> Result<BenchmarkResult> {
    let mut frames = Vec::with_capacity(pages.len());
    let mut bytes_out = 0usize;

    let start = Instant::now();
    for page in pages {
        let mut frame = vec![0u8; COMPRESS_BOUND];
        let len = backend.compress(page, &mut frame)?;
        frame.truncate(len);
        bytes_out += len;
        frames.push(frame);
    }
    let compress_time = start.elapsed();

    let start = Instant::now();
    let mut out = [0u8; PAGE_SIZE];
    for (page, frame) in pages.iter().zip(&frames) {
        backend.decompress(frame, &mut out)?;
        if &out != page {
            return Err(mismatch());
        }
    }
    let decompress_time = start.elapsed();

    Ok(BenchmarkResult {
        pages: pages.len(),
        bytes_in: pages.len() * PAGE_SIZE,
        bytes_out,
        compress_time,
        decompress_time,
    })
}

/// Round-trip `pages` through the context of every core in turn.
///
/// Returns the number of decompressions performed.
///
/// # Errors
///
/// Returns the first failure, tagged with the core that produced it.
pub fn verify_all_cores(backend: &ZstdBackend, pages: &[[u8; PAGE_SIZE]]) -> Result<usize> {
    let mut checked = 0;
    let mut frame = vec![0u8; COMPRESS_BOUND];
    let mut out = [0u8; PAGE_SIZE];

    for page in pages {
        let len = backend.compress(page, &mut frame)?;
        for core in (0..backend.cores()).map(CoreId) {
            backend.decompress_on(core, &frame[..len], &mut out).map_err(|e| on_core(core, &e))?;
            if &out != page {
                return Err(on_core(core, &mismatch()));
            }
            checked += 1;
        }
    }
    Ok(checked)
}

fn on_core(core: CoreId, e: &Error) -> Error {
    Error::Decompression { code: 0, name: format!("{core}: {e}") }
}

fn mismatch() -> Error {
    Error::Decompression { code: 0, name: "round-trip mismatch".to_string() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BackendConfig, PoolRegistry};

    fn backend(registry: &PoolRegistry, cores: usize) -> ZstdBackend {
        ZstdBackend::builder()
            .config(BackendConfig { cores: Some(cores), ..Default::default() })
            .registry(registry)
            .build()
            .unwrap()
    }

    #[test]
    fn test_data_pattern_parse() {
        assert_eq!(DataPattern::parse("zero"), Some(DataPattern::Zero));
        assert_eq!(DataPattern::parse("zeros"), Some(DataPattern::Zero));
        assert_eq!(DataPattern::parse("random"), Some(DataPattern::Random));
        assert_eq!(DataPattern::parse("TEXT"), Some(DataPattern::Text));
        assert_eq!(DataPattern::parse("mixed"), Some(DataPattern::Mixed));
        assert_eq!(DataPattern::parse("invalid"), None);
    }

    #[test]
    fn test_generate_random_pages_differ() {
        let pages = generate_test_pages(2, DataPattern::Random);
        assert!(!pages[0].iter().all(|&b| b == 0));
        assert_ne!(pages[0], pages[1]);
    }

    #[test]
    fn test_generate_mixed_pages() {
        let pages = generate_test_pages(8, DataPattern::Mixed);
        assert_eq!(pages.len(), 8);
        assert!(pages[0].iter().all(|&b| b == 0));
        assert!(!pages[1].iter().all(|&b| b == 0));
        assert_eq!(pages[2][17], 1);
    }

    #[test]
    fn test_run_benchmark_mixed() {
        let registry = PoolRegistry::new();
        let b = backend(&registry, 1);
        let pages = generate_test_pages(12, DataPattern::Mixed);
        let result = run_benchmark(&b, &pages).unwrap();

        assert_eq!(result.pages, 12);
        assert_eq!(result.bytes_in, 12 * PAGE_SIZE);
        assert!(result.bytes_out < result.bytes_in);
        assert!(result.compression_ratio() > 1.0);
    }

    #[test]
    fn test_verify_all_cores() {
        let registry = PoolRegistry::new();
        let b = backend(&registry, 3);
        let pages = generate_test_pages(4, DataPattern::Mixed);
        assert_eq!(verify_all_cores(&b, &pages).unwrap(), 12);
    }
}
