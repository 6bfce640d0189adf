//! Tracing subscriber setup for hosts that do not install their own.

use scaling_core::config::GeneralConfig;
use scaling_core::error::{Result, ScalingError};
use tracing_subscriber::EnvFilter;

/// Output format of the installed subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

/// Build the filter: `RUST_LOG` wins, otherwise `general.log_level`.
///
/// # Errors
/// Returns `ScalingError::Config` if `log_level` is not a valid directive.
pub fn filter(config: &GeneralConfig) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(&config.log_level)
        .map_err(|e| ScalingError::Config(format!("general.log_level `{}`: {e}", config.log_level)))
}

/// Install a global `tracing` subscriber.
///
/// Returns `Ok(false)` if a subscriber was already installed (by the host or
/// an earlier call), which is not an error.
///
/// # Errors
/// Returns `ScalingError::Config` if the log level is invalid.
pub fn init(config: &GeneralConfig, format: LogFormat) -> Result<bool> {
    let filter = filter(config)?;
    let installed = match format {
        LogFormat::Pretty => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .try_init()
            .is_ok(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .try_init()
            .is_ok(),
    };
    if installed {
        tracing::info!(level = %config.log_level, ?format, "Difficulty logging initialised");
    }
    Ok(installed)
}
