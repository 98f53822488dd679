//! # HTTP Routes
//!
//! ```text
//! routes/
//! ├── mod.rs        ◄─── You are here (router assembly)
//! ├── products.rs   ◄─── Catalog CRUD
//! ├── customers.rs  ◄─── Customer CRUD (balance is read-only here)
//! ├── billing.rs    ◄─── Sales, payments, history
//! └── dashboard.rs  ◄─── Summary aggregates
//! ```
//!
//! Every handler is generic over the [`Store`] so the same router serves
//! SQLite in production and the in-memory store in tests.

pub mod billing;
pub mod customers;
pub mod dashboard;
pub mod products;

use axum::routing::get;
use axum::routing::post;
use axum::Router;

use crate::AppState;
use khata_core::Store;

/// Builds the `/api` router.
pub fn router<S: Store>(state: AppState<S>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/dashboard/summary", get(dashboard::summary::<S>))
        .route(
            "/api/products",
            get(products::list::<S>).post(products::create::<S>),
        )
        .route(
            "/api/products/{id}",
            get(products::get::<S>)
                .put(products::update::<S>)
                .delete(products::delete::<S>),
        )
        .route(
            "/api/customers",
            get(customers::list::<S>).post(customers::create::<S>),
        )
        .route(
            "/api/customers/{id}",
            get(customers::get::<S>).put(customers::update::<S>),
        )
        .route("/api/billing/create", post(billing::create_sale::<S>))
        .route("/api/billing/payment", post(billing::record_payment::<S>))
        .route("/api/billing/history", get(billing::history::<S>))
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}
