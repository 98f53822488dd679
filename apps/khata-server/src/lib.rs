//! # khata-server
//!
//! JSON-over-HTTP surface for Khata.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Khata Server                                     │
//! │                                                                         │
//! │  Browser ───► axum (routes/) ───► BillingEngine ───► khata-db (SQLite)  │
//! │                    │                    ▲                               │
//! │                    └── reads/CRUD ──────┘ engine.store()                │
//! │                                                                         │
//! │  main.rs ─────► config, logging, database, seed, serve                  │
//! │  bin/seed.rs ─► demo data only                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration
//! See [`config`]: defaults, then `khata.toml`, then `KHATA_*` variables.

pub mod config;
pub mod error;
pub mod routes;
pub mod seed;

use tracing_subscriber::EnvFilter;

use khata_billing::BillingEngine;
use khata_core::Store;

// Re-exports
pub use config::{ConfigError, ServerConfig};
pub use error::{ApiError, ErrorCode};
pub use routes::router;

/// Shared application state.
pub struct AppState<S> {
    pub engine: BillingEngine<S>,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        AppState {
            engine: self.engine.clone(),
        }
    }
}

impl<S: Store> AppState<S> {
    pub fn new(store: S) -> Self {
        AppState {
            engine: BillingEngine::new(store),
        }
    }
}

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=khata_billing=trace` - Trace the billing engine only
/// - Default: `info,khata=debug,sqlx=warn`
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,khata=debug,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}
