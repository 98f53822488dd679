//! # khata-billing: Billing Engine for Khata
//!
//! Turns a sale or payment request into one atomic change across the catalog
//! (stock) and the ledger (transaction rows, customer credit).
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   khata-server (HTTP)          tests / demo seed                        │
//! │          │                            │                                 │
//! │          └──────────────┬─────────────┘                                 │
//! │                         ▼                                               │
//! │   ┌─────────────────────────────────────────────────────────────────┐   │
//! │   │                 khata-billing (THIS CRATE)                      │   │
//! │   │                                                                 │   │
//! │   │   BillingEngine<S: Store>                                       │   │
//! │   │   ├── create_sale     plan → check → UnitOfWork → commit        │   │
//! │   │   └── record_payment  plan → check → UnitOfWork → commit        │   │
//! │   │                                                                 │   │
//! │   │   MemoryStore         in-process Store with fail points         │   │
//! │   └─────────────────────────────────────────────────────────────────┘   │
//! │                         │                                               │
//! │                         ▼                                               │
//! │   khata-core::Store  ◄── implemented by khata-db::Database (SQLite)     │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod engine;
pub mod error;
pub mod memory;

pub use engine::BillingEngine;
pub use error::{BillingError, BillingResult, Entity};
pub use memory::{FailPoint, MemoryStore, MemoryUnitOfWork};
