//! # Khata Server Entry Point
//!
//! ## Startup Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Server Startup                                    │
//! │                                                                         │
//! │  1. Initialize Logging ──── EnvFilter, RUST_LOG overrides the default   │
//! │  2. Load Configuration ──── defaults → khata.toml → KHATA_* env         │
//! │  3. Open Database ───────── SQLite pool, WAL, embedded migrations       │
//! │  4. Seed (optional) ─────── demo shop into an empty catalog             │
//! │  5. Serve ───────────────── axum, graceful shutdown on Ctrl+C/SIGTERM   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```bash
//! khata-server                       # default config locations
//! khata-server --config ./khata.toml
//! ```

use std::path::PathBuf;

use tokio::net::TcpListener;
use tracing::{error, info};

use khata_db::Database;
use khata_server::{init_tracing, router, seed, AppState, ServerConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    info!("Starting Khata server");

    let config = ServerConfig::load(config_path_from_args())?;
    let addr = config.socket_addr()?;
    info!(
        %addr,
        db_path = %config.database.path.display(),
        max_connections = config.database.max_connections,
        "Configuration loaded"
    );

    if let Some(parent) = config.database.path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let db = Database::new(config.db_config()).await?;
    info!("Database connected and migrations applied");

    let state = AppState::new(db);

    if config.server.seed_demo {
        if let Err(e) = seed::seed_demo(&state.engine).await {
            // The server is still useful without demo data.
            error!(error = %e, "Demo seed failed");
        }
    }

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "HTTP server listening");

    axum::serve(listener, router(state.clone()))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    state.engine.store().close().await;
    info!("Server shutdown complete");
    Ok(())
}

/// `--config <path>` / `-c <path>`; anything else is ignored.
fn config_path_from_args() -> Option<PathBuf> {
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config" || arg == "-c" {
            return args.next().map(PathBuf::from);
        }
    }
    None
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
