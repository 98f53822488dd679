//! # khata-db: Database Layer for Khata
//!
//! This crate provides SQLite storage for Khata and implements the
//! khata-core store contracts (`CatalogStore`, `LedgerStore`, `Store`).
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Khata Data Flow                                  │
//! │                                                                         │
//! │  BillingEngine<Database>::create_sale                                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐    │
//! │  │                     khata-db (THIS CRATE)                       │    │
//! │  │                                                                 │    │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐    │    │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │    │    │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │    │    │
//! │  │   │               │    │ ProductRepo   │    │ 001_initial  │    │    │
//! │  │   │ SqlitePool    │◄───│ CustomerRepo  │    │ _schema.sql  │    │    │
//! │  │   │ store.rs      │    │ LedgerRepo    │    │              │    │    │
//! │  │   │ unit_of_work  │    │ ReportRepo    │    │              │    │    │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘    │    │
//! │  │                                                                 │    │
//! │  └─────────────────────────────────────────────────────────────────┘    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐    │
//! │  │                     SQLite Database (khata.db)                  │    │
//! │  └─────────────────────────────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations
//! - [`store`] - Store trait implementations for [`Database`]
//! - [`unit_of_work`] - Transactional scope over one connection
//!
//! ## Usage
//!
//! ```rust,ignore
//! use khata_core::{CatalogStore, ProductFilter};
//! use khata_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("path/to/khata.db")).await?;
//! let low = db.list_products(&ProductFilter { low_stock: true, ..Default::default() }).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod store;
pub mod unit_of_work;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use unit_of_work::SqliteUnitOfWork;

// Repository re-exports for convenience
pub use repository::customer::CustomerRepository;
pub use repository::ledger::LedgerRepository;
pub use repository::product::ProductRepository;
pub use repository::report::ReportRepository;
