//! Cache bounds and log level, loaded from `CELLCRYPT_*` environment variables.
//!
//! Every field has a default, so an empty environment yields a valid config.

use anyhow::{Context, Result};
use serde::Deserialize;

/// Entry bound used by every cache when nothing else is configured.
pub const DEFAULT_CACHE_CAPACITY: usize = 1024;

const ENV_PREFIX: &str = "CELLCRYPT";

/// Validated crypto-layer configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CryptoConfig {
    /// Max algorithm instances per [`CryptoContext`](crate::CryptoContext).
    #[serde(default = "default_capacity")]
    pub algorithm_cache_capacity: usize,

    /// Max codec instances per [`CodecRegistry`](crate::CodecRegistry).
    #[serde(default = "default_capacity")]
    pub codec_cache_capacity: usize,

    /// Max unwrapped data keys per caching provider.
    #[serde(default = "default_capacity")]
    pub unwrapped_key_cache_capacity: usize,

    /// Max signature verification results per caching provider.
    #[serde(default = "default_capacity")]
    pub signature_cache_capacity: usize,

    /// Fallback level for [`init_tracing`](crate::telemetry::init_tracing)
    /// when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_capacity() -> usize {
    DEFAULT_CACHE_CAPACITY
}
fn default_log_level() -> String {
    "info".into()
}

impl Default for CryptoConfig {
    fn default() -> Self {
        Self {
            algorithm_cache_capacity: default_capacity(),
            codec_cache_capacity: default_capacity(),
            unwrapped_key_cache_capacity: default_capacity(),
            signature_cache_capacity: default_capacity(),
            log_level: default_log_level(),
        }
    }
}

impl CryptoConfig {
    /// Load and validate configuration from `CELLCRYPT_*` variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable cannot be parsed or a capacity is zero.
    pub fn from_env() -> Result<Self> {
        Self::from_env_source(config::Environment::with_prefix(ENV_PREFIX))
    }

    /// Load from an explicit environment source.
    pub fn from_env_source(source: config::Environment) -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(source.try_parsing(true))
            .build()
            .context("failed to build configuration from environment")?;

        let c: CryptoConfig = cfg
            .try_deserialize()
            .context("failed to deserialise configuration")?;

        c.validate()?;
        Ok(c)
    }

    /// Reject zero capacities and an empty log level.
    pub fn validate(&self) -> Result<()> {
        ensure_positive(self.algorithm_cache_capacity, "ALGORITHM_CACHE_CAPACITY")?;
        ensure_positive(self.codec_cache_capacity, "CODEC_CACHE_CAPACITY")?;
        ensure_positive(self.unwrapped_key_cache_capacity, "UNWRAPPED_KEY_CACHE_CAPACITY")?;
        ensure_positive(self.signature_cache_capacity, "SIGNATURE_CACHE_CAPACITY")?;
        if self.log_level.trim().is_empty() {
            anyhow::bail!("{ENV_PREFIX}_LOG_LEVEL must not be empty");
        }
        Ok(())
    }
}

fn ensure_positive(value: usize, name: &str) -> Result<()> {
    if value == 0 {
        anyhow::bail!("{ENV_PREFIX}_{name} must be > 0");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(vars: &[(&str, &str)]) -> config::Environment {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        config::Environment::with_prefix(ENV_PREFIX).source(Some(map))
    }

    #[test]
    fn defaults_are_correct() {
        assert_eq!(default_capacity(), 1024);
        assert_eq!(default_log_level(), "info");
        assert!(CryptoConfig::default().validate().is_ok());
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let cfg = CryptoConfig::from_env_source(env(&[])).unwrap();
        assert_eq!(cfg, CryptoConfig::default());
    }

    #[test]
    fn reads_prefixed_variables() {
        let cfg = CryptoConfig::from_env_source(env(&[
            ("CELLCRYPT_ALGORITHM_CACHE_CAPACITY", "16"),
            ("CELLCRYPT_SIGNATURE_CACHE_CAPACITY", "8"),
            ("CELLCRYPT_LOG_LEVEL", "debug"),
        ]))
        .unwrap();
        assert_eq!(cfg.algorithm_cache_capacity, 16);
        assert_eq!(cfg.signature_cache_capacity, 8);
        assert_eq!(cfg.codec_cache_capacity, 1024);
        assert_eq!(cfg.log_level, "debug");
    }

    #[test]
    fn rejects_zero_capacity() {
        let err = CryptoConfig::from_env_source(env(&[("CELLCRYPT_CODEC_CACHE_CAPACITY", "0")]))
            .unwrap_err();
        assert!(err.to_string().contains("CODEC_CACHE_CAPACITY"));
    }

    #[test]
    fn rejects_unparseable_capacity() {
        assert!(CryptoConfig::from_env_source(env(&[(
            "CELLCRYPT_UNWRAPPED_KEY_CACHE_CAPACITY",
            "lots"
        )]))
        .is_err());
    }

    #[test]
    fn validate_rejects_blank_log_level() {
        let cfg = CryptoConfig {
            log_level: " ".into(),
            ..CryptoConfig::default()
        };
        assert!(cfg.validate().is_err());
    }
}
