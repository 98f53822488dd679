//! # khata-core: Pure Domain Logic for Khata
//!
//! This crate is the **heart** of Khata, a shop billing, inventory and credit
//! ("udhar") ledger. It holds the domain types, integer money, validation,
//! pure sale/payment planning and the store contracts, with zero I/O.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Khata Architecture                              │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐    │
//! │  │                 apps/khata-server (axum)                        │    │
//! │  │   /api/products  /api/customers  /api/billing  /api/dashboard   │    │
//! │  └─────────────────────────────┬───────────────────────────────────┘    │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐    │
//! │  │              khata-billing (BillingEngine<S: Store>)            │    │
//! │  │        create_sale, record_payment: one unit of work each       │    │
//! │  └─────────────────────────────┬───────────────────────────────────┘    │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐    │
//! │  │               ★ khata-core (THIS CRATE) ★                       │    │
//! │  │                                                                 │    │
//! │  │  ┌─────────┐ ┌─────────┐ ┌──────────┐ ┌─────────┐ ┌─────────┐   │    │
//! │  │  │  types  │ │  money  │ │validation│ │ billing │ │  store  │   │    │
//! │  │  │ Product │ │  Money  │ │  rules   │ │SalePlan │ │ traits  │   │    │
//! │  │  └─────────┘ └─────────┘ └──────────┘ └─────────┘ └─────────┘   │    │
//! │  │                                                                 │    │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS            │    │
//! │  └─────────────────────────────────────────────────────────────────┘    │
//! │                                ▲                                        │
//! │  ┌─────────────────────────────┴───────────────────────────────────┐    │
//! │  │            khata-db (implements the store traits)               │    │
//! │  │              SQLite queries, migrations, unit of work           │    │
//! │  └─────────────────────────────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Customer, Transaction, requests)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`error`] - Validation and store error types
//! - [`validation`] - Field rules for catalog and customer input
//! - [`billing`] - Pure sale and payment planning
//! - [`store`] - Catalog, ledger and unit-of-work contracts
//!
//! ## Example Usage
//!
//! ```rust
//! use khata_core::billing::plan_sale;
//! use khata_core::{PaymentMethod, SaleLine, SaleRequest};
//!
//! let request = SaleRequest::new(
//!     vec![
//!         SaleLine { product_id: 1, quantity: 1, unit_price: 23500 },
//!         SaleLine { product_id: 2, quantity: 2, unit_price: 2500 },
//!     ],
//!     PaymentMethod::Credit,
//! )
//! .for_customer(1);
//!
//! let plan = plan_sale(&request).unwrap();
//! assert_eq!(plan.total.minor(), 28500);
//! assert_eq!(plan.credit_delta.minor(), 28500);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod billing;
pub mod error;
pub mod money;
pub mod store;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use khata_core::Money` instead of
// `use khata_core::money::Money`

pub use error::{StoreError, StoreResult, ValidationError};
pub use money::Money;
pub use store::{CatalogStore, LedgerStore, Store, UnitOfWork};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// History page size when the caller does not ask for one.
pub const DEFAULT_HISTORY_LIMIT: i64 = 50;

/// Upper bound on a history page.
pub const MAX_HISTORY_LIMIT: i64 = 500;

/// Reorder threshold for products created without one.
pub const DEFAULT_MIN_STOCK_LEVEL: i64 = 5;

/// Stocking unit for products created without one.
pub const DEFAULT_UNIT: &str = "pcs";

/// Note on a sale that put nothing on credit.
pub const FULL_PAYMENT_NOTE: &str = "Full payment";

/// Note on a payment recorded without one.
pub const DEFAULT_PAYMENT_NOTE: &str = "Payment received to clear credit balance";
