use uuid::Uuid;

/// Fire-and-forget notifications emitted after a committed change.
/// Status values travel as their wire names so consumers don't need the order crate.
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FulfillmentEvent {
    StatusChanged(StatusChangedEvent),
    PackagingQueued(PackagingQueuedEvent),
    OrderReady(OrderReadyEvent),
    OrderRejected(OrderRejectedEvent),
}

impl FulfillmentEvent {
    pub fn order_id(&self) -> Uuid {
        match self {
            FulfillmentEvent::StatusChanged(e) => e.order_id,
            FulfillmentEvent::PackagingQueued(e) => e.order_id,
            FulfillmentEvent::OrderReady(e) => e.order_id,
            FulfillmentEvent::OrderRejected(e) => e.order_id,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            FulfillmentEvent::StatusChanged(_) => "order.status_changed",
            FulfillmentEvent::PackagingQueued(_) => "order.packaging_queued",
            FulfillmentEvent::OrderReady(_) => "order.ready",
            FulfillmentEvent::OrderRejected(_) => "order.rejected",
        }
    }
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq)]
pub struct StatusChangedEvent {
    pub order_id: Uuid,
    pub order_number: String,
    pub from: String,
    pub to: String,
    pub actor_id: String,
    pub timestamp: i64,
}

/// The order was routed to the warehouse scanning queue.
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq)]
pub struct PackagingQueuedEvent {
    pub order_id: Uuid,
    pub order_number: String,
    pub item_count: usize,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq)]
pub struct OrderReadyEvent {
    pub order_id: Uuid,
    pub order_number: String,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq)]
pub struct OrderRejectedEvent {
    pub order_id: Uuid,
    pub order_number: String,
    pub reviewer: String,
    pub reason: String,
    pub timestamp: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_is_tagged_on_the_wire() {
        let event = FulfillmentEvent::OrderReady(OrderReadyEvent {
            order_id: Uuid::new_v4(),
            order_number: "PED-0001".to_string(),
            timestamp: 0,
        });

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "ORDER_READY");
        assert_eq!(value["order_number"], "PED-0001");
        assert_eq!(event.name(), "order.ready");
    }
}
