//! # Billing Routes
//!
//! ## Request Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  POST /api/billing/create                                               │
//! │       │  Json<SaleRequest>                                              │
//! │       ▼                                                                 │
//! │  BillingEngine::create_sale ──► one unit of work                        │
//! │       │                                                                 │
//! │       ├── Ok(Transaction)       → 201                                   │
//! │       ├── Validation            → 400 (nothing written)                 │
//! │       ├── NotFound              → 404 (nothing written)                 │
//! │       └── Storage               → 500/503 (rolled back)                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use crate::error::ApiError;
use crate::AppState;
use khata_core::validation::validate_history_limit;
use khata_core::{PaymentRequest, SaleRequest, Store, Transaction, TransactionDetails};

/// `POST /api/billing/create` → 201
pub async fn create_sale<S: Store>(
    State(state): State<AppState<S>>,
    body: Result<Json<SaleRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Transaction>), ApiError> {
    let Json(request) = body?;
    let transaction = state.engine.create_sale(request).await?;
    Ok((StatusCode::CREATED, Json(transaction)))
}

/// `POST /api/billing/payment`
pub async fn record_payment<S: Store>(
    State(state): State<AppState<S>>,
    body: Result<Json<PaymentRequest>, JsonRejection>,
) -> Result<Json<Transaction>, ApiError> {
    let Json(request) = body?;
    Ok(Json(state.engine.record_payment(request).await?))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HistoryQuery {
    pub customer_id: Option<i64>,
    pub limit: Option<i64>,
}

/// `GET /api/billing/history?customerId&limit`, newest first.
pub async fn history<S: Store>(
    State(state): State<AppState<S>>,
    query: Result<Query<HistoryQuery>, QueryRejection>,
) -> Result<Json<Vec<TransactionDetails>>, ApiError> {
    let Query(query) = query?;
    let limit = validate_history_limit(query.limit)?;

    Ok(Json(
        state
            .engine
            .store()
            .history(query.customer_id, limit)
            .await?,
    ))
}
