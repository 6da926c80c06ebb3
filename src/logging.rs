//! Logging setup.
//!
//! The library only emits `tracing` events. Hosts that have no subscriber of
//! their own call [`init`] once; `JNI_OnLoad` and the CLI do.

use std::sync::Once;

use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

/// Filter used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_FILTER: &str = "warn";

/// Install a `fmt` subscriber filtered by `RUST_LOG` (falling back to
/// `default_filter`). Later calls, or an already installed global subscriber,
/// leave things as they are.
pub fn init_with_default(default_filter: &str) {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
        let installed = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_level(true)
            .try_init();
        if installed.is_err() {
            tracing::debug!("global subscriber already set, keeping it");
        }
    });
}

pub fn init() {
    init_with_default(DEFAULT_FILTER);
}
