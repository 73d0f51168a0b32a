use despacho_core::Notifier;
use despacho_shared::FulfillmentEvent;
use tokio::sync::broadcast;
use tracing::{debug, info};

/// Fans fulfillment notifications out to in-process subscribers such as the
/// mail and SMS dispatchers. Sending never blocks and never fails the
/// operation that produced the event.
#[derive(Clone)]
pub struct EventBroadcaster {
    tx: broadcast::Sender<FulfillmentEvent>,
}

impl EventBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<FulfillmentEvent> {
        self.tx.subscribe()
    }
}

impl Notifier for EventBroadcaster {
    fn notify(&self, event: FulfillmentEvent) {
        let name = event.name();
        let order_id = event.order_id();

        match self.tx.send(event) {
            Ok(receivers) => info!("Published {} for order {} to {} subscriber(s)", name, order_id, receivers),
            Err(_) => debug!("No subscribers for {} on order {}", name, order_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use despacho_shared::models::events::OrderReadyEvent;
    use uuid::Uuid;

    fn ready() -> FulfillmentEvent {
        FulfillmentEvent::OrderReady(OrderReadyEvent {
            order_id: Uuid::new_v4(),
            order_number: "PED-77".to_string(),
            timestamp: 0,
        })
    }

    #[tokio::test]
    async fn test_subscribers_receive_events() {
        let broadcaster = EventBroadcaster::new(8);
        let mut rx = broadcaster.subscribe();

        let event = ready();
        broadcaster.notify(event.clone());

        assert_eq!(rx.recv().await.unwrap(), event);
    }

    #[test]
    fn test_notify_without_subscribers_is_fine() {
        let broadcaster = EventBroadcaster::new(8);
        broadcaster.notify(ready());
    }
}
