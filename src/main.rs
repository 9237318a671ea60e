//! Infrastructure probe - main entry point.
//!
//! Loads configuration, initializes logging and the global tracer, then
//! verifies connectivity to the configured database and cache. Exits
//! non-zero when any mandatory dependency is unreachable.

use clap::Parser;
use platform_infra::cache::CacheClient;
use platform_infra::config::Config;
use platform_infra::db::DbClient;
use platform_infra::telemetry;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber for logging.
fn init_logging(config: &Config, otel_layer: Option<impl tracing_subscriber::Layer<tracing_subscriber::Registry> + Send + Sync>) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(otel_layer).with(filter);

    if config.json_logs {
        subscriber.with(fmt::layer().json()).init();
    } else {
        subscriber
            .with(fmt::layer().with_target(true).with_thread_ids(false))
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::parse();

    if let Err(e) = config.validate() {
        eprintln!("Error: invalid configuration: {e}");
        std::process::exit(1);
    }

    // Tracing is mandatory infrastructure when a collector is configured:
    // a failed bootstrap terminates the process.
    let otel_layer = match &config.otlp_endpoint {
        Some(endpoint) => match telemetry::init(&config.service_name, endpoint) {
            Ok(tracer) => Some(tracing_opentelemetry::layer().with_tracer(tracer)),
            Err(e) => {
                eprintln!("Error: failed to init tracing: {e}");
                std::process::exit(1);
            }
        },
        None => None,
    };

    init_logging(&config, otel_layer);

    info!(
        service_name = %config.service_name,
        "Starting infrastructure probe v{}",
        env!("CARGO_PKG_VERSION")
    );

    let db = DbClient::connect(&config.database_url, &config.pool_options()).await?;
    db.ping().await?;
    info!("Database reachable");

    if let Some(redis_url) = &config.redis_url {
        let cache = CacheClient::new(redis_url, config.cache_connect_timeout())?;
        match cache.ping().await {
            Ok(()) => info!("Cache reachable"),
            Err(e) => {
                error!(error = %e, "Cache unreachable");
                db.close().await;
                return Err(e.into());
            }
        }
    }

    db.close().await;
    info!("Probe complete");
    Ok(())
}
