use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use despacho_core::Actor;
use despacho_order::models::TransitionRecord;
use despacho_order::{Order, OrderItem, OrderLedger, OrderStatus, PaymentMethod};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub order_number: String,
    pub payment_method: PaymentMethod,
    pub total_amount: Decimal,
    pub items: Vec<CreateOrderItem>,
}

#[derive(Debug, Deserialize)]
pub struct CreateOrderItem {
    pub product_code: String,
    pub description: String,
    pub quantity: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OrderResponse {
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub packaging_initialized: bool,
    pub packaging_complete: bool,
}

impl From<OrderLedger> for OrderResponse {
    fn from(ledger: OrderLedger) -> Self {
        Self {
            packaging_initialized: ledger.packaging().is_initialized(),
            packaging_complete: ledger.packaging().is_complete(),
            order: ledger.order,
            items: ledger.items,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TransitionRequest {
    pub status: OrderStatus,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TransitionResponse {
    pub transition: TransitionRecord,
    /// True when the requested status was swapped for another one
    pub redirected: bool,
    pub status: OrderStatus,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /v1/orders
/// Register an order handed over by intake
pub async fn create_order(
    State(state): State<AppState>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), AppError> {
    let order = Order::new(req.order_number, req.payment_method, req.total_amount);
    let items = req
        .items
        .into_iter()
        .map(|i| OrderItem::new(order.id, i.product_code, i.description, i.quantity))
        .collect();

    let ledger = state.orders.register_order(order, items).await?;
    Ok((StatusCode::CREATED, Json(ledger.into())))
}

/// GET /v1/orders/{id}
pub async fn get_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<OrderResponse>, AppError> {
    let ledger = state.orders.get_order(order_id).await?;
    Ok(Json(ledger.into()))
}

/// GET /v1/orders/by-number/{order_number}
pub async fn get_order_by_number(
    State(state): State<AppState>,
    Path(order_number): Path<String>,
) -> Result<Json<OrderResponse>, AppError> {
    let ledger = state.orders.find_by_number(&order_number).await?;
    Ok(Json(ledger.into()))
}

/// POST /v1/orders/{id}/transitions
/// Request a status change. The resulting status may differ from the
/// requested one (logistics asking for "listo" lands in "pendiente_empaque").
pub async fn request_transition(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(order_id): Path<Uuid>,
    Json(req): Json<TransitionRequest>,
) -> Result<Json<TransitionResponse>, AppError> {
    let transition = state
        .orders
        .request_transition(order_id, req.status, &actor)
        .await?;

    Ok(Json(TransitionResponse {
        redirected: transition.was_redirected(),
        status: transition.to,
        transition,
    }))
}

/// GET /v1/orders/{id}/transitions
pub async fn list_transitions(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<Vec<TransitionRecord>>, AppError> {
    Ok(Json(state.orders.transition_history(order_id).await?))
}
