//! CLI command implementations.

mod benchmark;
mod info;
mod selftest;

pub use benchmark::{benchmark, BenchmarkArgs};
pub use info::info;
pub use selftest::{selftest, SelftestArgs};
