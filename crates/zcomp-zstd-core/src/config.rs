//! Backend configuration.

use crate::alloc::AllocPolicy;
use crate::{cpu, Error, Result};
use serde::Deserialize;
use std::path::Path;

/// Default location of the configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/zcomp-zstd.conf";

/// Largest accepted `cores` value (the kernel's `NR_CPUS` ceiling).
pub const MAX_CORES: usize = 8192;

/// Tunables for building a backend.
///
/// The compression level is fixed and has no knob here.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BackendConfig {
    /// Number of per-core decompression contexts. `None` uses every
    /// possible core.
    #[serde(default)]
    pub cores: Option<usize>,

    /// Fall back to page-mapped workspaces when the heap cannot serve one.
    #[serde(default = "default_fallback_tier")]
    pub fallback_tier: bool,
}

fn default_fallback_tier() -> bool {
    true
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self { cores: None, fallback_tier: default_fallback_tier() }
    }
}

impl BackendConfig {
    /// Parse a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] on syntax errors, unknown keys, or a
    /// `cores` value outside `1..=MAX_CORES`.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IoError`] when the file cannot be read and
    /// [`Error::Config`] when it does not parse.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::IoError(format!("failed to read {}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    /// Load from [`DEFAULT_CONFIG_PATH`], or defaults when it does not exist.
    ///
    /// # Errors
    ///
    /// Same as [`BackendConfig::load`] for an existing file.
    pub fn load_default() -> Result<Self> {
        if Path::new(DEFAULT_CONFIG_PATH).is_file() {
            Self::load(DEFAULT_CONFIG_PATH)
        } else {
            Ok(Self::default())
        }
    }

    /// Check internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for `cores = 0` or `cores > MAX_CORES`.
    pub fn validate(&self) -> Result<()> {
        match self.cores {
            Some(0) => Err(Error::Config("cores must be at least 1".to_string())),
            Some(n) if n > MAX_CORES => {
                Err(Error::Config(format!("cores must be at most {MAX_CORES}, got {n}")))
            }
            _ => Ok(()),
        }
    }

    /// Resolved core count.
    #[must_use]
    pub fn core_count(&self) -> usize {
        self.cores.unwrap_or_else(cpu::possible_cores)
    }

    /// Allocation policy derived from this config.
    #[must_use]
    pub fn alloc_policy(&self) -> AllocPolicy {
        AllocPolicy { fallback: self.fallback_tier }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BackendConfig::default();
        assert_eq!(config.cores, None);
        assert!(config.fallback_tier);
        assert!(config.core_count() >= 1);
        assert!(config.alloc_policy().fallback);
    }

    #[test]
    fn test_parse_empty() {
        assert_eq!(BackendConfig::from_toml_str("").unwrap(), BackendConfig::default());
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
            cores = 4
            fallback_tier = false
        "#;
        let config = BackendConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.core_count(), 4);
        assert!(!config.alloc_policy().fallback);
    }

    #[test]
    fn test_zero_cores_rejected() {
        let err = BackendConfig::from_toml_str("cores = 0").unwrap_err();
        assert!(err.to_string().contains("cores must be at least 1"));
    }

    #[test]
    fn test_huge_core_count_rejected() {
        let err = BackendConfig::from_toml_str("cores = 9223372036854775807").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("at most 8192"));

        let config = BackendConfig::from_toml_str(&format!("cores = {MAX_CORES}")).unwrap();
        assert_eq!(config.core_count(), MAX_CORES);
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(matches!(BackendConfig::from_toml_str("level = 3"), Err(Error::Config(_))));
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("zcomp-zstd-{}.conf", std::process::id()));
        std::fs::write(&path, "cores = 2\n").unwrap();
        let config = BackendConfig::load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(config.cores, Some(2));
    }

    #[test]
    fn test_load_missing_file() {
        let err = BackendConfig::load("/nonexistent/zcomp-zstd.conf").unwrap_err();
        assert!(matches!(err, Error::IoError(_)));
    }
}
