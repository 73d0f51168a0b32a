use crate::ledger::OrderLedger;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;
use uuid::Uuid;

pub type RepositoryError = Box<dyn std::error::Error + Send + Sync>;

/// Durable storage for order ledgers
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Every stored ledger, used to warm the engine on startup
    async fn load_orders(&self) -> Result<Vec<OrderLedger>, RepositoryError>;

    /// Write the full ledger. Audit entries already stored must be left as they are.
    async fn save_order(&self, ledger: &OrderLedger) -> Result<(), RepositoryError>;
}

/// In-memory repository for tests and local runs
#[derive(Default)]
pub struct InMemoryOrderRepository {
    ledgers: RwLock<HashMap<Uuid, OrderLedger>>,
    unavailable: AtomicBool,
}

impl InMemoryOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate a storage outage: every write fails until switched back
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn stored(&self, order_id: &Uuid) -> Option<OrderLedger> {
        self.ledgers.read().ok()?.get(order_id).cloned()
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn load_orders(&self) -> Result<Vec<OrderLedger>, RepositoryError> {
        let ledgers = self.ledgers.read().map_err(|_| "order store lock poisoned")?;
        Ok(ledgers.values().cloned().collect())
    }

    async fn save_order(&self, ledger: &OrderLedger) -> Result<(), RepositoryError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err("order store unavailable".into());
        }
        let mut ledgers = self.ledgers.write().map_err(|_| "order store lock poisoned")?;
        ledgers.insert(ledger.id(), ledger.clone());
        Ok(())
    }
}
