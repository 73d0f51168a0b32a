use axum::{extract::State, Json};
use despacho_order::DashboardCounts;

use crate::state::AppState;

/// GET /v1/dashboard
pub async fn get_dashboard(State(state): State<AppState>) -> Json<DashboardCounts> {
    Json(state.orders.dashboard().await)
}
