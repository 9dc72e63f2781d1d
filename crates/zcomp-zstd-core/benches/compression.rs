//! Backend benchmarks using Criterion.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use zcomp_zstd_core::benchmark::{generate_test_pages, DataPattern};
use zcomp_zstd_core::cpu::CoreId;
use zcomp_zstd_core::{
    BackendConfig, PoolRegistry, ZcompBackend, ZstdBackend, COMPRESS_BOUND, PAGE_SIZE,
};

fn backend(registry: &PoolRegistry) -> ZstdBackend {
    ZstdBackend::builder()
        .config(BackendConfig::default())
        .registry(registry)
        .build()
        .unwrap()
}

fn benchmark_compress(c: &mut Criterion) {
    let registry = PoolRegistry::new();
    let b = backend(&registry);

    for pattern in [DataPattern::Zero, DataPattern::Text, DataPattern::Random, DataPattern::Mixed] {
        let pages = generate_test_pages(256, pattern);
        let mut group = c.benchmark_group(format!("compress/{pattern:?}"));
        group.throughput(Throughput::Bytes((pages.len() * PAGE_SIZE) as u64));

        group.bench_function("shared_context", |bench| {
            let mut frame = vec![0u8; COMPRESS_BOUND];
            bench.iter(|| {
                for page in &pages {
                    black_box(b.compress(page, &mut frame).unwrap());
                }
            });
        });
        group.finish();
    }
}

fn benchmark_decompress(c: &mut Criterion) {
    let registry = PoolRegistry::new();
    let b = backend(&registry);
    let pages = generate_test_pages(256, DataPattern::Mixed);

    let frames: Vec<Vec<u8>> = pages
        .iter()
        .map(|page| {
            let mut frame = vec![0u8; COMPRESS_BOUND];
            let n = b.compress(page, &mut frame).unwrap();
            frame.truncate(n);
            frame
        })
        .collect();

    let mut group = c.benchmark_group("decompress/Mixed");
    group.throughput(Throughput::Bytes((pages.len() * PAGE_SIZE) as u64));

    group.bench_function("current_core", |bench| {
        let mut out = [0u8; PAGE_SIZE];
        bench.iter(|| {
            for frame in &frames {
                b.decompress(frame, &mut out).unwrap();
                black_box(&out);
            }
        });
    });

    group.bench_function("explicit_core", |bench| {
        let mut out = [0u8; PAGE_SIZE];
        bench.iter(|| {
            for frame in &frames {
                b.decompress_on(CoreId(0), frame, &mut out).unwrap();
                black_box(&out);
            }
        });
    });

    group.finish();
}

fn benchmark_create(c: &mut Criterion) {
    c.bench_function("create_destroy", |bench| {
        bench.iter(|| {
            let registry = PoolRegistry::new();
            let mut slot = Some(backend(&registry));
            ZstdBackend::destroy(&mut slot);
        });
    });
}

criterion_group!(benches, benchmark_compress, benchmark_decompress, benchmark_create);
criterion_main!(benches);
