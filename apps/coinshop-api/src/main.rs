//! # Coinshop API server
//!
//! ## Startup / Shutdown
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  load config ─► init tracing ─► connect pool (+ migrations)             │
//! │       ─► build facade ─► serve HTTP                                     │
//! │                              │                                          │
//! │                      Ctrl+C / SIGTERM                                   │
//! │                              ▼                                          │
//! │            drain in-flight requests ─► close pool                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::env;
use std::path::PathBuf;

use anyhow::{bail, Context};
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use coinshop_api::config::{AppConfig, LogFormat};
use coinshop_api::{routes, LedgerFacade};
use coinshop_db::Database;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_file = config_file_from_args()?;
    let config = AppConfig::load(config_file.as_deref()).context("loading configuration")?;

    init_tracing(config.log_format);

    info!("Starting Coinshop API server...");
    info!(
        bind = %config.http.bind_address(),
        database = %config.database.path,
        max_connections = config.database.max_connections,
        token_ttl_secs = ?config.auth.token_ttl_secs,
        "Configuration loaded"
    );

    if config.auth.uses_dev_secret() {
        warn!("Using the built-in development JWT secret; set COINSHOP__AUTH__JWT_SECRET in production");
    }

    let db = Database::new(config.database.to_db_config())
        .await
        .context("connecting to database")?;
    info!("Database ready");

    let facade = LedgerFacade::new(
        db.clone(),
        config.auth.session_issuer(),
        config.auth.credential_hasher()?,
    );

    let app = routes::router(facade);

    let listener = TcpListener::bind(config.http.bind_address())
        .await
        .with_context(|| format!("binding {}", config.http.bind_address()))?;
    info!(addr = %config.http.bind_address(), "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db.close().await;
    info!("Server shutdown complete");
    Ok(())
}

/// `--config-file <path>`, falling back to `COINSHOP_CONFIG_FILE`.
fn config_file_from_args() -> anyhow::Result<Option<PathBuf>> {
    let mut args = env::args().skip(1);

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config-file" => match args.next() {
                Some(path) => return Ok(Some(PathBuf::from(path))),
                None => bail!("--config-file needs a path"),
            },
            other => bail!("unknown argument: {}", other),
        }
    }

    Ok(env::var_os("COINSHOP_CONFIG_FILE").map(PathBuf::from))
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    match format {
        LogFormat::Pretty => builder.pretty().init(),
        LogFormat::Json => builder.json().init(),
    }
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown...");
}
