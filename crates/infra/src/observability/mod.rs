//! Tracing subscriber setup

use cachefront_domain::{CacheError, CacheResult, LoggingSettings};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the global tracing subscriber
///
/// `RUST_LOG` overrides the configured level. Fails if a global subscriber
/// is already installed.
pub fn init_tracing(settings: &LoggingSettings) -> CacheResult<()> {
    let filter = build_filter(settings)?;
    let subscriber = tracing_subscriber::registry().with(filter);

    if settings.json {
        subscriber
            .with(fmt::layer().json())
            .try_init()
            .map_err(|e| CacheError::configuration(format!("Failed to init logging: {e}")))?;
    } else {
        subscriber
            .with(fmt::layer())
            .try_init()
            .map_err(|e| CacheError::configuration(format!("Failed to init logging: {e}")))?;
    }

    info!(level = %settings.level, json = settings.json, "Tracing initialized");
    Ok(())
}

fn build_filter(settings: &LoggingSettings) -> CacheResult<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(&settings.level)
        .map_err(|e| CacheError::configuration(format!("Invalid log level '{}': {e}", settings.level)))
}
