//! Logging setup.
//!
//! Embedders that already install a `tracing` subscriber should skip this;
//! the bridge only ever emits through the `tracing` macros.

use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;
use tracing_subscriber::EnvFilter;

use crate::config::BridgeConfig;
use crate::errors::BridgeError;

/// Builds the filter: `RUST_LOG` when set, else `default_level`.
///
/// # Errors
///
/// Returns [`BridgeError::Config`] if `default_level` is not a valid filter.
pub fn env_filter(default_level: &str) -> Result<EnvFilter, BridgeError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(default_level)
            .map_err(|e| BridgeError::config(format!("invalid log filter {default_level:?}: {e}"))),
    }
}

/// Installs a global fmt subscriber, compact or JSON.
///
/// # Errors
///
/// Returns [`BridgeError::Config`] for a bad filter or when a global
/// subscriber is already installed.
pub fn init_tracing(default_level: &str, json: bool) -> Result<(), BridgeError> {
    let filter = env_filter(default_level)?;
    let registry = tracing_subscriber::registry().with(filter);

    let result = if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(false))
            .try_init()
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().compact().with_target(true))
            .try_init()
    };

    result.map_err(|e| BridgeError::config(format!("failed to init tracing subscriber: {e}")))
}

/// Installs logging as described by `config`.
///
/// # Errors
///
/// See [`init_tracing`].
pub fn init_from_config(config: &BridgeConfig) -> Result<(), BridgeError> {
    init_tracing(&config.log_level, config.json_logs)
}
