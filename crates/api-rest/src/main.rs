//! Standalone REST API server binary.
//!
//! ## Purpose
//! Runs the REST API server on its own.
//!
//! ## Intended use
//! Useful for development and debugging against the frontend. The workspace's main
//! `telehealth-run` binary serves the same router.

use api_rest::{config_from_env, rest_addr_from_env, router, AppState};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the telehealth REST API server
///
/// # Environment Variables
/// - `TELEHEALTH_REST_ADDR`: Server address (default: "0.0.0.0:5000")
/// - `TELEHEALTH_DATA_DIR`: Account storage root (default: "telehealth_data")
/// - `TELEHEALTH_TOKEN_SECRET`: HMAC key for bearer tokens (required, at least 32 bytes)
/// - `TELEHEALTH_TOKEN_TTL_SECS`: Token lifetime (default: 86400)
/// - `TELEHEALTH_HASH_ITERATIONS`: PBKDF2 iterations (default: 10000)
///
/// # Errors
/// Returns an error if:
/// - the logging/tracing configuration cannot be initialised,
/// - the configuration is invalid,
/// - the server address cannot be bound, or
/// - the HTTP server fails while running.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("api_rest=info".parse()?)
                .add_directive("telehealth_core=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cfg = Arc::new(config_from_env()?);
    let addr = rest_addr_from_env();

    tracing::info!("-- Starting telehealth REST API on {}", addr);
    tracing::info!("-- Account data under {}", cfg.data_dir().display());

    let app = router(AppState::from_config(cfg));

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
