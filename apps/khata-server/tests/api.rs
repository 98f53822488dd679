//! Router tests: requests go through the full axum stack with `oneshot`.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use khata_billing::MemoryStore;
use khata_db::{Database, DbConfig};
use khata_server::seed::seed_demo;
use khata_server::{router, AppState};

async fn seeded_memory_app() -> Router {
    let state = AppState::new(MemoryStore::new());
    seed_demo(&state.engine).await.unwrap();
    router(state)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

// =============================================================================
// Products
// =============================================================================

#[tokio::test]
async fn product_crud() {
    let app = seeded_memory_app().await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/products",
        Some(json!({ "name": "Maggi Noodles", "category": "Kirana", "price": 1400 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["minStockLevel"], 5);
    assert_eq!(body["unit"], "pcs");
    assert_eq!(body["stockQuantity"], 0);
    let id = body["id"].as_i64().unwrap();

    let (status, body) = send(
        &app,
        "PUT",
        &format!("/api/products/{}", id),
        Some(json!({ "stockDelta": 24, "price": 1500 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["stockQuantity"], 24);
    assert_eq!(body["price"], 1500);

    let (status, _) = send(&app, "DELETE", &format!("/api/products/{}", id), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, "DELETE", &format!("/api/products/{}", id), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(&app, "GET", &format!("/api/products/{}", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn product_filters() {
    let app = seeded_memory_app().await;

    let (_, body) = send(&app, "GET", "/api/products?lowStock=true", None).await;
    let names: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Lux Soap (Set of 4)"]);

    let (_, body) = send(&app, "GET", "/api/products?search=atta", None).await;
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (_, body) = send(&app, "GET", "/api/products?category=Kirana", None).await;
    assert_eq!(body.as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn invalid_input_is_400() {
    let app = seeded_memory_app().await;

    let (status, body) = send(&app, "GET", "/api/products/abc", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, body) = send(
        &app,
        "POST",
        "/api/products",
        Some(json!({ "name": "Free", "category": "Kirana", "price": -1 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "price");

    let (status, _) = send(
        &app,
        "POST",
        "/api/billing/create",
        Some(json!({ "items": "not a list" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// =============================================================================
// Billing
// =============================================================================

#[tokio::test]
async fn credit_sale_then_payment() {
    let app = seeded_memory_app().await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/billing/create",
        Some(json!({
            "customerId": 2,
            "items": [{ "productId": 1, "quantity": 1, "unitPrice": 23500 }],
            "paymentMethod": "credit"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["type"], "sale");
    assert_eq!(body["amount"], 23500);
    assert_eq!(body["notes"], "Credit added: 23500");

    let (_, customer) = send(&app, "GET", "/api/customers/2", None).await;
    assert_eq!(customer["creditBalance"], 23500);

    let (status, body) = send(
        &app,
        "POST",
        "/api/billing/payment",
        Some(json!({ "customerId": 2, "amount": 30000, "paymentMethod": "cash" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["type"], "payment");

    let (_, customer) = send(&app, "GET", "/api/customers/2", None).await;
    assert_eq!(customer["creditBalance"], 0);

    let (_, history) = send(&app, "GET", "/api/billing/history?customerId=2", None).await;
    let history = history.as_array().unwrap();
    assert_eq!(history.len(), 3);
    assert_eq!(history[0]["type"], "payment");
    assert_eq!(history[0]["customer"]["name"], "Priya Patel");
    assert_eq!(history[1]["items"][0]["subtotal"], 23500);
}

#[tokio::test]
async fn billing_errors() {
    let app = seeded_memory_app().await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/billing/create",
        Some(json!({
            "items": [{ "productId": 1, "quantity": 1, "unitPrice": 23500 }],
            "paymentMethod": "credit"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "paymentMethod");

    let (status, body) = send(
        &app,
        "POST",
        "/api/billing/create",
        Some(json!({
            "items": [{ "productId": 404, "quantity": 1, "unitPrice": 100 }],
            "paymentMethod": "cash"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Product not found: 404");

    let (status, _) = send(
        &app,
        "POST",
        "/api/billing/payment",
        Some(json!({ "customerId": 99, "amount": 100, "paymentMethod": "upi" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&app, "GET", "/api/billing/history?limit=501", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "limit");
}

#[tokio::test]
async fn dashboard_summary() {
    let app = seeded_memory_app().await;

    let (status, body) = send(&app, "GET", "/api/dashboard/summary", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalLowStock"], 1);
    assert_eq!(body["totalReceivables"], 28500);
    assert_eq!(body["todaySales"], 30000);
    assert_eq!(body["thisMonthSales"], 30000);
}

// =============================================================================
// SQLite
// =============================================================================

#[tokio::test]
async fn sqlite_walk_in_sale() {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    let state = AppState::new(db);
    seed_demo(&state.engine).await.unwrap();
    let app = router(state);

    let (status, body) = send(
        &app,
        "POST",
        "/api/billing/create",
        Some(json!({
            "customerName": "Amit Kumar",
            "customerPhone": "9876543212",
            "items": [
                { "productId": 5, "quantity": 3, "unitPrice": 11000 },
                { "productId": 2, "quantity": 1, "unitPrice": 2500 }
            ],
            "paymentMethod": "cash",
            "amountPaid": 20000
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["amount"], 35500);
    let customer_id = body["customerId"].as_i64().unwrap();

    let (_, customer) = send(&app, "GET", &format!("/api/customers/{}", customer_id), None).await;
    assert_eq!(customer["name"], "Amit Kumar");
    assert_eq!(customer["creditBalance"], 15500);

    // Stock 2 - 3: oversold, not blocked.
    let (_, soap) = send(&app, "GET", "/api/products/5", None).await;
    assert_eq!(soap["stockQuantity"], -1);

    let (_, with_credit) = send(&app, "GET", "/api/customers?hasCredit=true", None).await;
    assert_eq!(with_credit.as_array().unwrap().len(), 2);
}
