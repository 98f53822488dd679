//! # Customer Routes

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use tracing::info;

use crate::error::ApiError;
use crate::AppState;
use khata_core::validation::{
    validate_customer_patch, validate_new_customer, validate_search_query,
};
use khata_core::{Customer, CustomerFilter, CustomerPatch, NewCustomer, Store};

/// `GET /api/customers?search&hasCredit`
pub async fn list<S: Store>(
    State(state): State<AppState<S>>,
    query: Result<Query<CustomerFilter>, QueryRejection>,
) -> Result<Json<Vec<Customer>>, ApiError> {
    let Query(mut filter) = query?;
    filter.search = match filter.search.as_deref() {
        Some(s) => validate_search_query(s)?,
        None => None,
    };

    Ok(Json(state.engine.store().list_customers(&filter).await?))
}

/// `GET /api/customers/{id}`
pub async fn get<S: Store>(
    State(state): State<AppState<S>>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Customer>, ApiError> {
    let Path(id) = id?;
    state
        .engine
        .store()
        .get_customer(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Customer", id))
}

/// `POST /api/customers` → 201. New customers always start at a zero balance.
pub async fn create<S: Store>(
    State(state): State<AppState<S>>,
    body: Result<Json<NewCustomer>, JsonRejection>,
) -> Result<(StatusCode, Json<Customer>), ApiError> {
    let Json(mut new) = body?;
    new.name = new.name.trim().to_string();
    validate_new_customer(&new)?;

    let customer = state.engine.store().create_customer(new).await?;
    info!(customer_id = customer.id, name = %customer.name, "Customer created");
    Ok((StatusCode::CREATED, Json(customer)))
}

/// `PUT /api/customers/{id}`
pub async fn update<S: Store>(
    State(state): State<AppState<S>>,
    id: Result<Path<i64>, PathRejection>,
    body: Result<Json<CustomerPatch>, JsonRejection>,
) -> Result<Json<Customer>, ApiError> {
    let Path(id) = id?;
    let Json(patch) = body?;
    validate_customer_patch(&patch)?;

    state
        .engine
        .store()
        .update_customer(id, patch)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Customer", id))
}
