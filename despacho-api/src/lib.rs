use axum::{
    routing::{get, post},
    Router,
    http::Method,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod auth;
pub mod dashboard;
pub mod error;
pub mod orders;
pub mod packaging;
pub mod state;
pub mod wallet;

pub use state::AppState;

pub fn app(state: AppState) -> Router {
    // CORS Middleware
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::HeaderName::from_static(auth::ACTOR_ID_HEADER),
            axum::http::HeaderName::from_static(auth::ACTOR_ROLE_HEADER),
        ]);

    // Everything that changes an order needs to know who is asking
    let acting = Router::new()
        .route("/v1/orders/{id}/transitions", post(orders::request_transition))
        .route("/v1/orders/{id}/wallet/decision", post(wallet::record_decision))
        .route("/v1/orders/{id}/packaging", post(packaging::initialize_packaging))
        .route("/v1/orders/{id}/packaging/scans", post(packaging::record_scan))
        .route("/v1/orders/{id}/packaging/items/{item_id}/reset", post(packaging::reset_scans))
        .route_layer(axum::middleware::from_fn(auth::actor_middleware));

    let reading = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/v1/orders", post(orders::create_order))
        .route("/v1/orders/{id}", get(orders::get_order))
        .route("/v1/orders/by-number/{order_number}", get(orders::get_order_by_number))
        .route("/v1/orders/{id}/transitions", get(orders::list_transitions))
        .route("/v1/orders/{id}/wallet/history", get(wallet::validation_history))
        .route("/v1/orders/{id}/packaging", get(packaging::packaging_status))
        .route("/v1/orders/{id}/packaging/mismatches", get(packaging::mismatch_report))
        .route("/v1/dashboard", get(dashboard::get_dashboard));

    Router::new()
        .merge(acting)
        .merge(reading)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
