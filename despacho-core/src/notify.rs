use despacho_shared::FulfillmentEvent;
use std::sync::Mutex;

/// Notification collaborator. Implementations must not block the caller
/// and the engine never inspects the outcome.
pub trait Notifier: Send + Sync {
    fn notify(&self, event: FulfillmentEvent);
}

pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&self, event: FulfillmentEvent) {
        tracing::debug!("Dropping notification {} for order {}", event.name(), event.order_id());
    }
}

/// Keeps every event in memory (tests, local runs)
#[derive(Default)]
pub struct MemoryNotifier {
    events: Mutex<Vec<FulfillmentEvent>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<FulfillmentEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl Notifier for MemoryNotifier {
    fn notify(&self, event: FulfillmentEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use despacho_shared::models::events::OrderReadyEvent;
    use uuid::Uuid;

    #[test]
    fn test_memory_notifier_keeps_order() {
        let notifier = MemoryNotifier::new();
        for n in 0..3 {
            notifier.notify(FulfillmentEvent::OrderReady(OrderReadyEvent {
                order_id: Uuid::new_v4(),
                order_number: format!("PED-{}", n),
                timestamp: n,
            }));
        }

        let numbers: Vec<String> = notifier
            .events()
            .into_iter()
            .map(|e| match e {
                FulfillmentEvent::OrderReady(e) => e.order_number,
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(numbers, vec!["PED-0", "PED-1", "PED-2"]);
    }
}
