//! # Product Routes
//!
//! Catalog management. Stock is only ever moved relatively: a `PUT` carries
//! `stockDelta`, and sales decrement through the billing engine.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use tracing::{debug, info};

use crate::error::ApiError;
use crate::AppState;
use khata_core::validation::{
    validate_category, validate_new_product, validate_product_patch, validate_search_query,
};
use khata_core::{NewProduct, Product, ProductFilter, ProductPatch, Store};

/// `GET /api/products?search&category&lowStock`
pub async fn list<S: Store>(
    State(state): State<AppState<S>>,
    query: Result<Query<ProductFilter>, QueryRejection>,
) -> Result<Json<Vec<Product>>, ApiError> {
    let Query(mut filter) = query?;

    filter.search = match filter.search.as_deref() {
        Some(s) => validate_search_query(s)?,
        None => None,
    };
    filter.category = filter
        .category
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty());
    if let Some(category) = &filter.category {
        validate_category(category)?;
    }

    let products = state.engine.store().list_products(&filter).await?;
    debug!(count = products.len(), ?filter, "Products listed");
    Ok(Json(products))
}

/// `GET /api/products/{id}`
pub async fn get<S: Store>(
    State(state): State<AppState<S>>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Product>, ApiError> {
    let Path(id) = id?;
    state
        .engine
        .store()
        .get_product(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Product", id))
}

/// `POST /api/products` → 201
pub async fn create<S: Store>(
    State(state): State<AppState<S>>,
    body: Result<Json<NewProduct>, JsonRejection>,
) -> Result<(StatusCode, Json<Product>), ApiError> {
    let Json(new) = body?;
    validate_new_product(&new)?;

    let product = state.engine.store().create_product(new).await?;
    info!(product_id = product.id, name = %product.name, "Product created");
    Ok((StatusCode::CREATED, Json(product)))
}

/// `PUT /api/products/{id}`
pub async fn update<S: Store>(
    State(state): State<AppState<S>>,
    id: Result<Path<i64>, PathRejection>,
    body: Result<Json<ProductPatch>, JsonRejection>,
) -> Result<Json<Product>, ApiError> {
    let Path(id) = id?;
    let Json(patch) = body?;
    validate_product_patch(&patch)?;

    let product = state
        .engine
        .store()
        .update_product(id, patch)
        .await?
        .ok_or_else(|| ApiError::not_found("Product", id))?;
    info!(product_id = id, stock = product.stock_quantity, "Product updated");
    Ok(Json(product))
}

/// `DELETE /api/products/{id}` → 204, also when the product never existed.
pub async fn delete<S: Store>(
    State(state): State<AppState<S>>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = id?;
    state.engine.store().delete_product(id).await?;
    info!(product_id = id, "Product deleted");
    Ok(StatusCode::NO_CONTENT)
}
