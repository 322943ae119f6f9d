//! Tracing subscriber setup for host applications.
//!
//! The library only emits `tracing` events. Applications that already install
//! a subscriber should not call [`init_tracing`].
//!
//! No key material, plaintext, or ciphertext bytes appear in any log field;
//! events carry key names, key paths, type ids, and lengths only.

use anyhow::{Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install a global JSON subscriber filtered by `RUST_LOG`, or by `log_level`
/// when `RUST_LOG` is unset.
///
/// # Errors
///
/// Returns an error if `log_level` is not a valid filter directive or a global
/// subscriber is already installed.
pub fn init_tracing(log_level: &str) -> Result<()> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid log level '{log_level}'"))?,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().json())
        .try_init()
        .context("failed to initialise tracing subscriber")?;

    Ok(())
}
