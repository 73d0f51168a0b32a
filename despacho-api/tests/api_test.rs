use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use despacho_api::{app, AppState};
use despacho_order::{InMemoryOrderRepository, OrderManager};
use despacho_store::EventBroadcaster;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn test_app() -> Router {
    let events = EventBroadcaster::new(16);
    let orders = OrderManager::new(Arc::new(InMemoryOrderRepository::new()), Arc::new(events.clone()));
    app(AppState {
        orders: Arc::new(orders),
        events,
    })
}

async fn send(app: &Router, method: &str, uri: &str, actor: Option<(&str, &str)>, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some((id, role)) = actor {
        builder = builder.header("x-actor-id", id).header("x-actor-role", role);
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

async fn create_order(app: &Router, number: &str, method: &str, quantities: &[u32]) -> Value {
    let items: Vec<Value> = quantities
        .iter()
        .enumerate()
        .map(|(n, q)| json!({ "product_code": format!("SKU-{}", n), "description": "Producto", "quantity": q }))
        .collect();
    let (status, body) = send(
        app,
        "POST",
        "/v1/orders",
        None,
        Some(json!({
            "order_number": number,
            "payment_method": method,
            "total_amount": "150.00",
            "items": items,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    body
}

async fn transition(app: &Router, id: &str, actor: (&str, &str), status: &str) -> (StatusCode, Value) {
    send(app, "POST", &format!("/v1/orders/{}/transitions", id), Some(actor), Some(json!({ "status": status }))).await
}

const ADMIN: (&str, &str) = ("root", "admin");
const CARTERA: (&str, &str) = ("ana", "cartera");
const LOGISTICA: (&str, &str) = ("luisa", "logistica");
const EMPAQUE: (&str, &str) = ("pedro", "empaque");

#[tokio::test]
async fn test_health() {
    let app = test_app();
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_mutations_need_an_actor() {
    let app = test_app();
    let order = create_order(&app, "PED-A1", "cash", &[1]).await;
    let id = order["order"]["id"].as_str().unwrap();

    let (status, body) = send(
        &app,
        "POST",
        &format!("/v1/orders/{}/transitions", id),
        None,
        Some(json!({ "status": "logistica" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["kind"], "unauthenticated");

    let (status, _) = transition(&app, id, ("x", "intern"), "logistica").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_credit_order_end_to_end() {
    let app = test_app();
    let order = create_order(&app, "PED-A2", "credit", &[2, 1]).await;
    let id = order["order"]["id"].as_str().unwrap().to_string();
    let first = order["items"][0]["id"].as_str().unwrap().to_string();
    let second = order["items"][1]["id"].as_str().unwrap().to_string();

    let (status, _) = transition(&app, &id, CARTERA, "revision_cartera").await;
    assert_eq!(status, StatusCode::OK);

    // Review still pending
    let (status, body) = transition(&app, &id, LOGISTICA, "logistica").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "validation_required");
    assert_eq!(body["details"]["validation_status"], "pending");

    let (status, body) = send(
        &app,
        "POST",
        &format!("/v1/orders/{}/wallet/decision", id),
        Some(CARTERA),
        Some(json!({ "decision": "approve" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["validation"]["validation_status"], "approved");

    let (status, _) = transition(&app, &id, LOGISTICA, "logistica").await;
    assert_eq!(status, StatusCode::OK);

    // Asking for "listo" from logistics lands in the packaging queue
    let (status, body) = transition(&app, &id, LOGISTICA, "listo").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "pendiente_empaque");
    assert_eq!(body["redirected"], true);

    let (status, _) = transition(&app, &id, EMPAQUE, "empaque").await;
    assert_eq!(status, StatusCode::OK);

    let scan_uri = format!("/v1/orders/{}/packaging/scans", id);
    let (status, _) = send(&app, "POST", &scan_uri, Some(EMPAQUE), Some(json!({ "item_id": first, "delta": 2 }))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = transition(&app, &id, EMPAQUE, "listo").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "packaging_incomplete");
    assert_eq!(body["details"]["unverified"], json!([second.clone()]));

    let (status, body) = send(&app, "POST", &scan_uri, Some(EMPAQUE), Some(json!({ "item_id": second }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_verified"], true);

    let (status, body) = send(&app, "POST", &scan_uri, Some(EMPAQUE), Some(json!({ "item_id": second }))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "over_scan");

    let (status, body) = transition(&app, &id, EMPAQUE, "listo").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "listo");

    let (status, history) = send(&app, "GET", &format!("/v1/orders/{}/transitions", id), None, None).await;
    assert_eq!(status, StatusCode::OK);
    let path: Vec<&str> = history
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["to"].as_str().unwrap())
        .collect();
    assert_eq!(path, vec!["revision_cartera", "logistica", "pendiente_empaque", "empaque", "listo"]);
}

#[tokio::test]
async fn test_rejection_needs_reason_and_closes_order() {
    let app = test_app();
    let order = create_order(&app, "PED-A3", "transfer", &[1]).await;
    let id = order["order"]["id"].as_str().unwrap().to_string();
    transition(&app, &id, CARTERA, "revision_cartera").await;

    let decision_uri = format!("/v1/orders/{}/wallet/decision", id);
    let (status, body) = send(&app, "POST", &decision_uri, Some(CARTERA), Some(json!({ "decision": "reject" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "missing_rejection_reason");

    let (status, body) = send(
        &app,
        "POST",
        &decision_uri,
        Some(CARTERA),
        Some(json!({ "decision": "reject", "notes": "insufficient funds" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "rechazado");

    let (status, body) = transition(&app, &id, ADMIN, "logistica").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "order_closed");

    let (_, history) = send(&app, "GET", &format!("/v1/orders/{}/wallet/history", id), None, None).await;
    assert_eq!(history.as_array().unwrap().len(), 1);
    assert_eq!(history[0]["validation_notes"], "insufficient funds");

    let (_, dashboard) = send(&app, "GET", "/v1/dashboard", None, None).await;
    assert_eq!(dashboard["rejected"], 1);
}

#[tokio::test]
async fn test_role_without_capability_is_forbidden() {
    let app = test_app();
    let order = create_order(&app, "PED-A4", "cash", &[1]).await;
    let id = order["order"]["id"].as_str().unwrap();

    let (status, body) = transition(&app, id, EMPAQUE, "logistica").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["kind"], "not_permitted");
}

#[tokio::test]
async fn test_lookup_and_missing_orders() {
    let app = test_app();
    create_order(&app, "PED-A5", "other", &[3]).await;

    let (status, body) = send(&app, "GET", "/v1/orders/by-number/PED-A5", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["order"]["status"], "pendiente_pago");
    assert_eq!(body["items"][0]["quantity"], 3);

    let missing = uuid::Uuid::new_v4();
    let (status, body) = send(&app, "GET", &format!("/v1/orders/{}", missing), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "not_found");

    let (status, _) = send(
        &app,
        "POST",
        "/v1/orders",
        None,
        Some(json!({ "order_number": "PED-A6", "payment_method": "cash", "total_amount": "1", "items": [] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        "POST",
        "/v1/orders",
        None,
        Some(json!({
            "order_number": "PED-A8",
            "payment_method": "cash",
            "total_amount": "10.005",
            "items": [{ "product_code": "SKU-1", "description": "Producto", "quantity": 1 }],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "invalid_order");
}

#[tokio::test]
async fn test_packaging_endpoints() {
    let app = test_app();
    let order = create_order(&app, "PED-A7", "cash", &[2]).await;
    let id = order["order"]["id"].as_str().unwrap().to_string();
    let item = order["items"][0]["id"].as_str().unwrap().to_string();

    transition(&app, &id, LOGISTICA, "logistica").await;
    transition(&app, &id, LOGISTICA, "pendiente_empaque").await;

    let (status, body) = send(&app, "POST", &format!("/v1/orders/{}/packaging", id), Some(EMPAQUE), None).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["initialized"], true);

    let (status, body) = send(&app, "POST", &format!("/v1/orders/{}/packaging", id), Some(EMPAQUE), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "already_initialized");

    // Scanning waits for the empaque stage
    let scan_uri = format!("/v1/orders/{}/packaging/scans", id);
    let (status, body) = send(&app, "POST", &scan_uri, Some(EMPAQUE), Some(json!({ "item_id": item }))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "wrong_stage");

    transition(&app, &id, EMPAQUE, "empaque").await;
    send(&app, "POST", &scan_uri, Some(EMPAQUE), Some(json!({ "item_id": item }))).await;

    let (status, body) = send(
        &app,
        "POST",
        &format!("/v1/orders/{}/packaging/items/{}/reset", id, item),
        Some(EMPAQUE),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["scanned_count"], 0);

    let (status, body) = send(&app, "GET", &format!("/v1/orders/{}/packaging/mismatches", id), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));

    let stranger = uuid::Uuid::new_v4().to_string();
    let (status, body) = send(&app, "POST", &scan_uri, Some(EMPAQUE), Some(json!({ "item_id": stranger }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "unknown_item");
}
