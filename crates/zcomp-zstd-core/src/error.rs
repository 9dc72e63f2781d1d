//! Error types for zcomp-zstd-core.

use thiserror::Error;

/// Errors that can occur while building or driving the backend.
#[derive(Debug, Error)]
pub enum Error {
    /// Both allocation tiers failed to provide a workspace.
    #[error("out of memory: could not allocate {size} byte workspace")]
    OutOfMemory {
        /// Requested size in bytes.
        size: usize,
    },

    /// The engine rejected a workspace of the size it asked for.
    #[error("engine init failed: {0}")]
    EngineInit(String),

    /// The engine failed to compress a page.
    #[error("compression failed: {name} (code {code})")]
    Compression {
        /// Engine error code.
        code: usize,
        /// Engine error name.
        name: String,
    },

    /// The engine failed to decompress a page, or produced a short page.
    #[error("decompression failed: {name} (code {code})")]
    Decompression {
        /// Engine error code.
        code: usize,
        /// Engine error name.
        name: String,
    },

    /// Input data is invalid or malformed.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Configuration could not be parsed or is inconsistent.
    #[error("invalid config: {0}")]
    Config(String),

    /// I/O error (config file, sysfs).
    #[error("I/O error: {0}")]
    IoError(String),
}

impl Error {
    /// Whether the error came from an allocation failure.
    #[must_use]
    pub fn is_out_of_memory(&self) -> bool {
        matches!(self, Self::OutOfMemory { .. })
    }
}

/// Result type for backend operations.
pub type Result<T> = std::result::Result<T, Error>;
