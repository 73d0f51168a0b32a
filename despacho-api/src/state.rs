use std::sync::Arc;
use despacho_order::OrderManager;
use despacho_store::EventBroadcaster;

#[derive(Clone)]
pub struct AppState {
    pub orders: Arc<OrderManager>,
    pub events: EventBroadcaster,
}
