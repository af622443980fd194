pub mod calibration;
pub mod commands;
pub mod config;
pub mod devices;
pub mod errors;
pub mod geometry;
pub mod media;
pub mod render;

use crate::commands::Composer;
use crate::config::AppConfig;
use crate::devices::{DeviceRegistry, FileStore};

/// Install the global `tracing` subscriber. `RUST_LOG` overrides the default
/// `info` filter. Calling this more than once is harmless.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init();
}

/// Start-up sequence for the shell: logging, `.env`, config, stored devices.
pub fn bootstrap() -> Composer {
    init_tracing();

    // Load .env file if present (ignore error if not found)
    let _ = dotenvy::dotenv();

    let config = match config::load_config() {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!(error = %e, "Failed to load config; using defaults");
            AppConfig::default()
        }
    };

    let dir = config.storage.resolved_dir();
    tracing::info!(dir = %dir.display(), "opening device storage");
    let registry = DeviceRegistry::load(Box::new(FileStore::new(dir)), config.storage.key.clone());

    Composer::new(config, registry)
}
