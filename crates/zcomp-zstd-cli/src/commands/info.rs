//! Info command: workspace sizing and core layout.

use crate::output::{format_size, print_json, OutputFormat};
use serde::Serialize;
use zcomp_zstd_core::engine::{compress_workspace_size, decompress_workspace_size};
use zcomp_zstd_core::{BackendConfig, ZstdBackend, COMPRESS_BOUND, PAGE_SIZE, ZSTD_LEVEL};

#[derive(Debug, Serialize)]
struct InfoOutput {
    name: &'static str,
    level: i32,
    page_size: usize,
    compress_bound: usize,
    cores: usize,
    compress_workspace: usize,
    decompress_workspace: usize,
    total_workspace: usize,
    fallback_tier: bool,
}

/// Print the backend layout without building it.
pub fn info(config: &BackendConfig, format: OutputFormat) -> anyhow::Result<()> {
    let cores = config.core_count();
    let out = InfoOutput {
        name: ZstdBackend::NAME,
        level: ZSTD_LEVEL,
        page_size: PAGE_SIZE,
        compress_bound: COMPRESS_BOUND,
        cores,
        compress_workspace: compress_workspace_size(),
        decompress_workspace: decompress_workspace_size(),
        total_workspace: compress_workspace_size() + cores * decompress_workspace_size(),
        fallback_tier: config.fallback_tier,
    };

    match format {
        OutputFormat::Json => print_json(&out)?,
        OutputFormat::Table => {
            println!("{:<22} {}", "backend", out.name);
            println!("{:<22} {}", "level", out.level);
            println!("{:<22} {}", "page size", out.page_size);
            println!("{:<22} {}", "compress bound", out.compress_bound);
            println!("{:<22} {}", "cores", out.cores);
            println!("{:<22} {}", "compress workspace", format_size(out.compress_workspace as u64));
            println!(
                "{:<22} {} x {}",
                "decompress workspace",
                format_size(out.decompress_workspace as u64),
                out.cores
            );
            println!("{:<22} {}", "total workspace", format_size(out.total_workspace as u64));
            println!("{:<22} {}", "fallback tier", if out.fallback_tier { "on" } else { "off" });
        }
    }
    Ok(())
}
