//! Logging bootstrap
//!
//! Installs a compact `tracing_subscriber::fmt` subscriber. `RUST_LOG`
//! overrides the default directive.

use crate::{LedToneError, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing_subscriber::EnvFilter;

static INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Install the global subscriber
///
/// `default_directive` is used when `RUST_LOG` is unset, e.g. `"ledtone=info"`.
/// Calling this again, or after another subscriber was installed, is a no-op.
pub fn init(default_directive: &str) -> Result<()> {
    if INITIALIZED.load(Ordering::Acquire) {
        return Ok(());
    }
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_directive).map_err(|e| {
            LedToneError::ConfigError(format!("bad log directive {:?}: {}", default_directive, e))
        })?,
    };

    if tracing_subscriber::fmt()
        .with_env_filter(filter)
        .compact()
        .try_init()
        .is_err()
    {
        tracing::debug!("global subscriber already installed");
    }
    INITIALIZED.store(true, Ordering::Release);
    Ok(())
}
