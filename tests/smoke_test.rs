//! Smoke tests for the re-exported backend.

use zcomp_zstd::{ZcompBackend, ZstdBackend, COMPRESS_BOUND, PAGE_SIZE};

#[test]
fn test_version_exists() {
    let version = env!("CARGO_PKG_VERSION");
    let parts: Vec<&str> = version.split('.').collect();
    assert_eq!(parts.len(), 3, "Version should be semver: {version}");
}

#[test]
fn test_create_with_defaults() {
    let mut slot = Some(ZstdBackend::create().unwrap());
    let backend = slot.as_ref().unwrap();
    assert_eq!(backend.name(), "zstd");
    assert_eq!(backend.cores(), zcomp_zstd::cpu::possible_cores());

    let page = [0u8; PAGE_SIZE];
    let mut frame = vec![0u8; COMPRESS_BOUND];
    let n = backend.compress(&page, &mut frame).unwrap();
    assert!(n > 0 && n < PAGE_SIZE);

    let mut out = [1u8; PAGE_SIZE];
    backend.decompress(&frame[..n], &mut out).unwrap();
    assert_eq!(out, page);

    ZstdBackend::destroy(&mut slot);
    ZstdBackend::destroy(&mut slot);
}
