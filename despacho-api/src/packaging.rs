use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use despacho_core::Actor;
use despacho_order::{ItemVerification, PackagingStatus, QuantityMismatch};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ScanRequest {
    pub item_id: Uuid,
    #[serde(default = "default_delta")]
    pub delta: u32,
}

fn default_delta() -> u32 { 1 }

/// POST /v1/orders/{id}/packaging
pub async fn initialize_packaging(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(order_id): Path<Uuid>,
) -> Result<(StatusCode, Json<PackagingStatus>), AppError> {
    let status = state.orders.initialize_packaging(order_id, &actor).await?;
    Ok((StatusCode::CREATED, Json(status)))
}

/// GET /v1/orders/{id}/packaging
pub async fn packaging_status(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<PackagingStatus>, AppError> {
    Ok(Json(state.orders.packaging_status(order_id).await?))
}

/// POST /v1/orders/{id}/packaging/scans
pub async fn record_scan(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(order_id): Path<Uuid>,
    Json(req): Json<ScanRequest>,
) -> Result<Json<ItemVerification>, AppError> {
    let verification = state
        .orders
        .record_scan(order_id, req.item_id, req.delta, &actor)
        .await?;
    Ok(Json(verification))
}

/// POST /v1/orders/{id}/packaging/items/{item_id}/reset
pub async fn reset_scans(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path((order_id, item_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<ItemVerification>, AppError> {
    Ok(Json(state.orders.reset_scans(order_id, item_id, &actor).await?))
}

/// GET /v1/orders/{id}/packaging/mismatches
/// Debug view: ordered quantity vs. required scans
pub async fn mismatch_report(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<Vec<QuantityMismatch>>, AppError> {
    Ok(Json(state.orders.mismatch_report(order_id).await?))
}
