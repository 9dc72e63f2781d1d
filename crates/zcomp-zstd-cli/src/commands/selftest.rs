//! Selftest command: round-trip sample pages on every core.

use crate::output::{print_json, OutputFormat};
use clap::Args;
use serde::Serialize;
use zcomp_zstd_core::benchmark::{generate_test_pages, verify_all_cores, DataPattern};
use zcomp_zstd_core::{BackendConfig, ZstdBackend};

/// Arguments for selftest command.
#[derive(Args)]
pub struct SelftestArgs {
    /// Pages per pattern.
    #[arg(short, long, default_value = "16")]
    pub pages: usize,
}

#[derive(Debug, Serialize)]
struct SelftestOutput {
    cores: usize,
    pages: usize,
    checks: usize,
    passed: bool,
}

/// Build a backend, round-trip every pattern through every core, destroy it.
pub fn selftest(
    args: &SelftestArgs,
    config: BackendConfig,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let mut slot = Some(ZstdBackend::builder().config(config).build()?);
    let Some(backend) = slot.as_ref() else {
        anyhow::bail!("backend slot empty after create");
    };

    let mut checks = 0;
    let mut pages = 0;
    for pattern in [DataPattern::Zero, DataPattern::Text, DataPattern::Random, DataPattern::Mixed] {
        let sample = generate_test_pages(args.pages, pattern);
        pages += sample.len();
        checks += verify_all_cores(backend, &sample)?;
        tracing::debug!(?pattern, checks, "pattern verified");
    }
    let cores = backend.cores();
    ZstdBackend::destroy(&mut slot);

    let out = SelftestOutput { cores, pages, checks, passed: true };
    match format {
        OutputFormat::Json => print_json(&out)?,
        OutputFormat::Table => {
            println!(
                "selftest passed: {} pages x {} cores = {} round trips",
                out.pages, out.cores, out.checks
            );
        }
    }
    Ok(())
}
