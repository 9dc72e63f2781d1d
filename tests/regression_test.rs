//! Regression tests for known edge cases.

use zcomp_zstd::{BackendConfig, Error, PoolRegistry, ZcompBackend, ZstdBackend, PAGE_SIZE};

fn backend(registry: &PoolRegistry) -> ZstdBackend {
    ZstdBackend::builder()
        .config(BackendConfig { cores: Some(1), ..Default::default() })
        .registry(registry)
        .build()
        .unwrap()
}

#[test]
fn test_empty_frame_is_decompression_error() {
    let registry = PoolRegistry::new();
    let b = backend(&registry);
    let mut out = [0u8; PAGE_SIZE];
    assert!(matches!(b.decompress(&[], &mut out), Err(Error::Decompression { .. })));
}

#[test]
fn test_empty_destination_is_compression_error() {
    let registry = PoolRegistry::new();
    let b = backend(&registry);
    assert!(matches!(
        b.compress(&[0u8; PAGE_SIZE], &mut []),
        Err(Error::Compression { .. })
    ));
}

#[test]
fn test_oversized_frame_is_rejected() {
    // Two pages of data in one frame must not overflow a one-page destination.
    let registry = PoolRegistry::new();
    let b = backend(&registry);
    let frame = zstd::bulk::compress(&[0x77u8; 2 * PAGE_SIZE], 1).unwrap();
    let mut out = [0u8; PAGE_SIZE];
    assert!(matches!(b.decompress(&frame, &mut out), Err(Error::Decompression { .. })));
}
