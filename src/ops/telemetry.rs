//! Structured logging setup.
//!
//! The library only emits `tracing` events. Binaries and tests that want to
//! see them call [`init_tracing`] once at startup.

use crate::core::config::TelemetryConfig;
use anyhow::Result;

/// Filter directive used when `RUST_LOG` is unset or invalid.
pub fn default_directive(config: &TelemetryConfig) -> String {
    config.log_level.to_lowercase()
}

/// Install a global fmt subscriber.
///
/// `RUST_LOG` takes precedence over the configured level. Fails if a global
/// subscriber is already installed.
#[cfg(feature = "telemetry")]
pub fn init_tracing(config: &TelemetryConfig) -> Result<()> {
    use anyhow::Context;
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directive(config)))
        .context("invalid log level")?;

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(config.with_target))
        .with(filter)
        .try_init()
        .context("tracing subscriber already installed")?;
    Ok(())
}

#[cfg(not(feature = "telemetry"))]
pub fn init_tracing(_config: &TelemetryConfig) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directive_is_lowercased() {
        let config = TelemetryConfig {
            log_level: "DEBUG".to_string(),
            ..Default::default()
        };
        assert_eq!(default_directive(&config), "debug");
    }

    #[cfg(feature = "telemetry")]
    #[test]
    fn second_install_is_rejected() {
        let config = TelemetryConfig::default();
        let _ = init_tracing(&config);
        assert!(init_tracing(&config).is_err());
    }
}
