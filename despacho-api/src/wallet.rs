use axum::{
    extract::{Path, State},
    Extension, Json,
};
use despacho_core::Actor;
use despacho_order::models::{TransitionRecord, WalletValidationRecord};
use despacho_order::{OrderStatus, WalletDecision};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct DecisionRequest {
    pub decision: WalletDecision,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DecisionResponse {
    pub validation: WalletValidationRecord,
    pub transition: Option<TransitionRecord>,
    pub status: OrderStatus,
}

/// POST /v1/orders/{id}/wallet/decision
pub async fn record_decision(
    State(state): State<AppState>,
    Extension(reviewer): Extension<Actor>,
    Path(order_id): Path<Uuid>,
    Json(req): Json<DecisionRequest>,
) -> Result<Json<DecisionResponse>, AppError> {
    let outcome = state
        .orders
        .record_decision(order_id, req.decision, req.notes, &reviewer)
        .await?;

    let status = match &outcome.transition {
        Some(transition) => transition.to,
        None => OrderStatus::RevisionCartera,
    };

    Ok(Json(DecisionResponse {
        validation: outcome.validation,
        transition: outcome.transition,
        status,
    }))
}

/// GET /v1/orders/{id}/wallet/history
pub async fn validation_history(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<Vec<WalletValidationRecord>>, AppError> {
    Ok(Json(state.orders.validation_history(order_id).await?))
}
