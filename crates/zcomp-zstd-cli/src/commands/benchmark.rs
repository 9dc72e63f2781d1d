//! Benchmark command for compression performance testing.

use crate::output::{format_size, format_throughput, print_json, OutputFormat};
use clap::Args;
use serde::Serialize;
use zcomp_zstd_core::benchmark::{generate_test_pages, run_benchmark, DataPattern};
use zcomp_zstd_core::{BackendConfig, ZstdBackend};

/// Arguments for benchmark command.
#[derive(Args)]
pub struct BenchmarkArgs {
    /// Number of pages to compress.
    #[arg(short, long, default_value = "10000")]
    pub pages: usize,

    /// Data pattern (zero, random, text, mixed).
    #[arg(short = 'P', long, default_value = "mixed")]
    pub pattern: String,
}

#[derive(Debug, Serialize)]
struct BenchmarkOutput {
    pattern: String,
    pages: usize,
    bytes_in: usize,
    bytes_out: usize,
    ratio: f64,
    compress_bytes_per_sec: f64,
    decompress_bytes_per_sec: f64,
}

/// Run the round-trip benchmark on a freshly built backend.
pub fn benchmark(
    args: &BenchmarkArgs,
    config: BackendConfig,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let pattern = DataPattern::parse(&args.pattern)
        .ok_or_else(|| anyhow::anyhow!("unknown pattern: {}", args.pattern))?;
    let pages = generate_test_pages(args.pages, pattern);

    let backend = ZstdBackend::builder().config(config).build()?;
    tracing::info!(pages = pages.len(), ?pattern, cores = backend.cores(), "running benchmark");
    let result = run_benchmark(&backend, &pages)?;

    let out = BenchmarkOutput {
        pattern: args.pattern.to_lowercase(),
        pages: result.pages,
        bytes_in: result.bytes_in,
        bytes_out: result.bytes_out,
        ratio: result.compression_ratio(),
        compress_bytes_per_sec: result.compress_throughput(),
        decompress_bytes_per_sec: result.decompress_throughput(),
    };

    match format {
        OutputFormat::Json => print_json(&out)?,
        OutputFormat::Table => {
            println!(
                "{:<8} {:>8} {:>10} {:>10} {:>12} {:>12} {:>7}",
                "PATTERN", "PAGES", "IN", "OUT", "COMPRESS", "DECOMPRESS", "RATIO"
            );
            println!(
                "{:<8} {:>8} {:>10} {:>10} {:>12} {:>12} {:>6.2}x",
                out.pattern,
                out.pages,
                format_size(out.bytes_in as u64),
                format_size(out.bytes_out as u64),
                format_throughput(out.compress_bytes_per_sec),
                format_throughput(out.decompress_bytes_per_sec),
                out.ratio
            );
        }
    }
    Ok(())
}
