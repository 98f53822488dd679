//! # Dashboard Routes

use axum::extract::State;
use axum::Json;
use chrono::Utc;

use crate::error::ApiError;
use crate::AppState;
use khata_core::{DashboardSummary, Store};

/// `GET /api/dashboard/summary`. Day and month windows are UTC.
pub async fn summary<S: Store>(
    State(state): State<AppState<S>>,
) -> Result<Json<DashboardSummary>, ApiError> {
    Ok(Json(state.engine.store().summary(Utc::now()).await?))
}
