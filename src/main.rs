//! thumbor-guard
//!
//! Validates thumbor URL signatures in front of the image service and
//! repairs paths that were mangled in transit (collapsed slashes, double
//! escaping, unescaped image URLs) so that correctly signed requests still
//! reach the upstream with a path it accepts.
//!
//! ```text
//!     client ──▶ http server ──▶ signature cascade ──▶ upstream thumbor
//!                    │                  │
//!                    │                  └─ per-image key store (optional)
//!                    └─ config watcher (hot reload)
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use thumbor_guard::config::{load_config_with, validate_config, ConfigOverrides, ConfigWatcher, GuardConfig};
use thumbor_guard::lifecycle::{wait_for_signal, GuardRuntime, Shutdown};
use thumbor_guard::observability::{logging, metrics};
use thumbor_guard::HttpServer;

#[derive(Parser)]
#[command(name = "thumbor-guard")]
#[command(about = "Signature-repairing guard for a thumbor image service", long_about = None)]
struct Args {
    /// TOML configuration file. Watched for changes.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Overrides `security.security_key`.
    #[arg(long, env = "THUMBOR_GUARD_SECURITY_KEY", hide_env_values = true)]
    security_key: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let overrides = ConfigOverrides {
        security_key: args.security_key,
    };

    let config = match &args.config {
        Some(path) => load_config_with(path, &overrides)?,
        None => {
            let mut config = GuardConfig::default();
            overrides.apply(&mut config);
            config
        }
    };

    logging::init_logging(&config.observability.log_level);
    tracing::info!("thumbor-guard v{} starting", env!("CARGO_PKG_VERSION"));

    if let Err(errors) = validate_config(&config) {
        for error in &errors {
            tracing::error!(error = %error, "Invalid configuration");
        }
        return Err(format!("{} configuration error(s)", errors.len()).into());
    }

    tracing::info!(
        bind_address = %config.listener.bind_address,
        upstream = %config.upstream.address,
        per_image_keys = config.security.stores_crypto_key_for_each_image,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    // Keep the watcher alive for the life of the server.
    let (config_updates, _watcher) = match &args.config {
        Some(path) => {
            let (watcher, updates) = ConfigWatcher::new(path, overrides.clone());
            match watcher.run() {
                Ok(handle) => (updates, Some(handle)),
                Err(e) => {
                    tracing::warn!(error = %e, "Config watcher unavailable, hot reload disabled");
                    (updates, None)
                }
            }
        }
        None => (tokio::sync::mpsc::unbounded_channel().1, None),
    };

    let shutdown = Shutdown::new();
    let server = HttpServer::new(GuardRuntime::from_config(config)?);
    let server_shutdown = shutdown.subscribe();

    let server_task = tokio::spawn(server.run(listener, config_updates, server_shutdown));

    wait_for_signal().await;
    shutdown.trigger();

    server_task.await??;

    tracing::info!("Shutdown complete");
    Ok(())
}
