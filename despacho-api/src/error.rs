use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use despacho_order::{OrderError, PackagingError, TransitionError, WalletError};
use serde_json::{json, Value};

#[derive(Debug)]
pub enum AppError {
    AuthenticationError(String),
    Order(OrderError),
}

impl From<OrderError> for AppError {
    fn from(err: OrderError) -> Self {
        AppError::Order(err)
    }
}

/// HTTP status, machine-readable kind and optional details for a service error
fn classify(err: &OrderError) -> (StatusCode, &'static str, Option<Value>) {
    match err {
        OrderError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found", None),
        OrderError::AlreadyRegistered(_) => (StatusCode::CONFLICT, "already_registered", None),
        OrderError::InvalidOrder(_) => (StatusCode::BAD_REQUEST, "invalid_order", None),
        OrderError::NotPermitted { .. } => (StatusCode::FORBIDDEN, "not_permitted", None),
        OrderError::WrongStage { status, .. } => {
            (StatusCode::CONFLICT, "wrong_stage", Some(json!({ "status": status })))
        }
        OrderError::Transition(e) => classify_transition(e),
        OrderError::Packaging(e) => classify_packaging(e),
        OrderError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "storage", None),
    }
}

fn classify_transition(err: &TransitionError) -> (StatusCode, &'static str, Option<Value>) {
    match err {
        TransitionError::InvalidTransition { from, requested } => (
            StatusCode::CONFLICT,
            "invalid_transition",
            Some(json!({ "from": from, "requested": requested })),
        ),
        TransitionError::ValidationRequired { payment_method, validation_status } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            "validation_required",
            Some(json!({ "payment_method": payment_method, "validation_status": validation_status })),
        ),
        TransitionError::PackagingIncomplete { unverified } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            "packaging_incomplete",
            Some(json!({ "unverified": unverified, "count": unverified.len() })),
        ),
        TransitionError::OrderClosed { status } => {
            (StatusCode::CONFLICT, "order_closed", Some(json!({ "status": status })))
        }
        TransitionError::NotUnderReview { status } => {
            (StatusCode::CONFLICT, "not_under_review", Some(json!({ "status": status })))
        }
        TransitionError::Packaging(e) => classify_packaging(e),
        TransitionError::Wallet(WalletError::MissingRejectionReason) => {
            (StatusCode::BAD_REQUEST, "missing_rejection_reason", None)
        }
    }
}

fn classify_packaging(err: &PackagingError) -> (StatusCode, &'static str, Option<Value>) {
    match err {
        PackagingError::UnknownItem(id) => {
            (StatusCode::BAD_REQUEST, "unknown_item", Some(json!({ "item_id": id })))
        }
        PackagingError::OverScan { item_id, required, scanned, delta } => (
            StatusCode::CONFLICT,
            "over_scan",
            Some(json!({ "item_id": item_id, "required": required, "scanned": scanned, "delta": delta })),
        ),
        PackagingError::AlreadyInitialized(_) => (StatusCode::CONFLICT, "already_initialized", None),
        PackagingError::NotInitialized => (StatusCode::CONFLICT, "not_initialized", None),
        PackagingError::Sealed => (StatusCode::CONFLICT, "packaging_sealed", None),
        PackagingError::InvalidScanDelta => (StatusCode::BAD_REQUEST, "invalid_scan_delta", None),
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, kind, error_message, details) = match self {
            AppError::AuthenticationError(msg) => (StatusCode::UNAUTHORIZED, "unauthenticated", msg, None),
            // Already logged where the write failed
            AppError::Order(err) if !err.is_business_rule() => {
                (StatusCode::INTERNAL_SERVER_ERROR, "storage", "Internal Server Error".to_string(), None)
            }
            AppError::Order(err) => {
                let (status, kind, details) = classify(&err);
                tracing::debug!("Request refused ({}): {}", kind, err);
                (status, kind, err.to_string(), details)
            }
        };

        let mut body = json!({
            "error": error_message,
            "kind": kind,
        });
        if let Some(details) = details {
            body["details"] = details;
        }

        (status, Json(body)).into_response()
    }
}
