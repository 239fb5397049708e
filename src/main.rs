use api_rest::{AppState, config_from_env, rest_addr_from_env, router};
use api_shared::HealthService;
use std::sync::Arc;
use telehealth_core::AccountService;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the telehealth application
///
/// Serves the REST API (with Swagger UI) until interrupted with Ctrl-C.
///
/// # Environment Variables
/// - `TELEHEALTH_REST_ADDR`: REST server address (default: "0.0.0.0:5000")
/// - `TELEHEALTH_DATA_DIR`: Directory for account storage (default: "telehealth_data")
/// - `TELEHEALTH_TOKEN_SECRET`: HMAC key for bearer tokens (required, at least 32 bytes)
/// - `TELEHEALTH_TOKEN_TTL_SECS`: Token lifetime in seconds (default: 86400)
/// - `TELEHEALTH_HASH_ITERATIONS`: PBKDF2 iterations for password hashing (default: 10000)
///
/// # Returns
/// * `Ok(())` - If the server starts and shuts down cleanly
/// * `Err(anyhow::Error)` - If configuration, startup or the server fails
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("telehealth_run=info".parse()?)
                .add_directive("telehealth_core=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cfg = Arc::new(config_from_env()?);
    let rest_addr = rest_addr_from_env();

    let accounts = AccountService::with_file_store(cfg.clone());
    let registered = accounts.list_accounts()?.len();

    tracing::info!("++ Starting telehealth REST on {}", rest_addr);
    tracing::info!(
        "++ {} account(s) under {}",
        registered,
        cfg.data_dir().display()
    );
    tracing::info!("++ {}", HealthService::check_health().message);

    let app = router(AppState::new(accounts));

    let listener = tokio::net::TcpListener::bind(&rest_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("++ Telehealth REST stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {e}");
    }
}
