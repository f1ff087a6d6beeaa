use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use zonepos::api::guard::load_pin_digest;
use zonepos::config::Config;
use zonepos::engine::{ExpiryMonitor, InactivityWatchdog};
use zonepos::notifications::AlertService;
use zonepos::AppState;

#[derive(Parser, Debug)]
#[command(name = "zonepos")]
#[command(author, version, about = "Gaming lounge point-of-sale and session manager", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "zonepos.toml")]
    config: PathBuf,

    /// Override log level
    #[arg(short, long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(&cli.config)?;

    // Initialize logging
    let log_level = cli
        .log_level
        .as_ref()
        .unwrap_or(&config.logging.level)
        .clone();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting ZonePOS v{}", env!("CARGO_PKG_VERSION"));

    // Ensure data directory exists
    std::fs::create_dir_all(&config.server.data_dir)?;

    // Initialize database
    let db = zonepos::db::init(&config.server.data_dir).await?;

    if config.sessions.seed_sample_products {
        zonepos::db::seed_sample_products(&db).await?;
    }

    // The screen starts locked when a PIN was configured on a previous run
    let pin_set = load_pin_digest(&db).await?.is_some();

    let state = Arc::new(AppState::new(config.clone(), db.clone(), pin_set));

    // Session expiry sweep
    let expiry = ExpiryMonitor::new(db.clone(), config.sessions.expiry_tick_secs);
    tokio::spawn(async move {
        expiry.run().await;
    });

    // Inactivity watchdog
    let watchdog = InactivityWatchdog::new(
        state.guard.clone(),
        AlertService::new(db.clone()),
        config.guard.watchdog_interval_secs,
        config.guard.inactivity_minutes,
    );
    tokio::spawn(async move {
        watchdog.run().await;
    });

    let app = zonepos::api::create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("API server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
