use crate::ledger::OrderLedger;
use crate::machine::{DecisionOutcome, OrderFulfillmentStateMachine, TransitionError};
use crate::models::{
    Order, OrderItem, OrderStatus, TransitionRecord, WalletDecision, WalletValidationRecord,
};
use crate::packaging::{PackagingError, PackagingStatus, QuantityMismatch};
use crate::repository::OrderRepository;
use crate::scan::ItemVerification;
use crate::wallet::ReviewPolicy;
use despacho_core::{Actor, Capability, CapabilityTable, Notifier, Role};
use despacho_shared::models::events::{
    OrderReadyEvent, OrderRejectedEvent, PackagingQueuedEvent, StatusChangedEvent,
};
use despacho_shared::FulfillmentEvent;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

/// Decimal places kept for order totals
const MONEY_SCALE: u32 = 2;

/// Runs every order operation under a per-order lock. Each mutation works on
/// a draft of the ledger, persists it, and only then replaces the live copy.
pub struct OrderManager {
    orders: RwLock<HashMap<Uuid, Arc<Mutex<OrderLedger>>>>,
    numbers: RwLock<HashMap<String, Uuid>>,
    machine: OrderFulfillmentStateMachine,
    capabilities: CapabilityTable,
    repository: Arc<dyn OrderRepository>,
    notifier: Arc<dyn Notifier>,
}

/// Aggregate counts for the dashboards
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DashboardCounts {
    pub total: usize,
    pub by_status: BTreeMap<String, usize>,
    pub pending_packaging: usize,
    pub rejected: usize,
}

impl OrderManager {
    pub fn new(repository: Arc<dyn OrderRepository>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            orders: RwLock::new(HashMap::new()),
            numbers: RwLock::new(HashMap::new()),
            machine: OrderFulfillmentStateMachine::default(),
            capabilities: CapabilityTable::standard(),
            repository,
            notifier,
        }
    }

    pub fn with_review_policy(mut self, policy: ReviewPolicy) -> Self {
        self.machine = OrderFulfillmentStateMachine::new(policy);
        self
    }

    pub fn with_capabilities(mut self, capabilities: CapabilityTable) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn machine(&self) -> &OrderFulfillmentStateMachine {
        &self.machine
    }

    /// Load every stored ledger. Returns how many orders were loaded.
    pub async fn hydrate(&self) -> Result<usize, OrderError> {
        let ledgers = self.repository.load_orders().await.map_err(storage)?;
        let mut orders = self.orders.write().await;
        let mut numbers = self.numbers.write().await;

        for ledger in ledgers {
            numbers.insert(ledger.order.order_number.clone(), ledger.id());
            orders.insert(ledger.id(), Arc::new(Mutex::new(ledger)));
        }

        tracing::info!("Loaded {} orders from storage", orders.len());
        Ok(orders.len())
    }

    /// Accept a fully formed order from intake
    pub async fn register_order(&self, order: Order, items: Vec<OrderItem>) -> Result<OrderLedger, OrderError> {
        if order.order_number.trim().is_empty() {
            return Err(OrderError::InvalidOrder("order number is empty".to_string()));
        }
        if items.is_empty() {
            return Err(OrderError::InvalidOrder("order has no items".to_string()));
        }
        if order.total_amount.normalize().scale() > MONEY_SCALE {
            return Err(OrderError::InvalidOrder(format!(
                "total amount {} has more than {} decimal places",
                order.total_amount, MONEY_SCALE
            )));
        }
        if let Some(item) = items.iter().find(|i| i.order_id != order.id) {
            return Err(OrderError::InvalidOrder(format!("item {} belongs to another order", item.id)));
        }
        if let Some(item) = items.iter().find(|i| i.quantity == 0) {
            return Err(OrderError::InvalidOrder(format!("item {} has no quantity", item.id)));
        }

        // Reserve the number; the order map stays unlocked while we write
        {
            let mut numbers = self.numbers.write().await;
            if numbers.contains_key(&order.order_number) {
                return Err(OrderError::AlreadyRegistered(order.order_number.clone()));
            }
            // Every registered or in-flight order has a number entry
            if numbers.values().any(|id| *id == order.id) {
                return Err(OrderError::AlreadyRegistered(order.id.to_string()));
            }
            numbers.insert(order.order_number.clone(), order.id);
        }

        let ledger = OrderLedger::new(order, items);
        if let Err(err) = self.repository.save_order(&ledger).await {
            self.numbers.write().await.remove(&ledger.order.order_number);
            return Err(storage(err));
        }

        self.orders
            .write()
            .await
            .insert(ledger.id(), Arc::new(Mutex::new(ledger.clone())));

        tracing::info!(
            "Registered order {} ({}, {} items)",
            ledger.order.order_number,
            ledger.order.payment_method,
            ledger.items.len()
        );
        Ok(ledger)
    }

    pub async fn get_order(&self, order_id: Uuid) -> Result<OrderLedger, OrderError> {
        let entry = self.entry(order_id).await?;
        let ledger = entry.lock().await;
        Ok(ledger.clone())
    }

    pub async fn find_by_number(&self, order_number: &str) -> Result<OrderLedger, OrderError> {
        let order_id = self
            .numbers
            .read()
            .await
            .get(order_number)
            .copied()
            .ok_or_else(|| OrderError::NotFound(order_number.to_string()))?;
        self.get_order(order_id).await
    }

    /// Ask for a status change on behalf of `actor`
    pub async fn request_transition(
        &self,
        order_id: Uuid,
        requested: OrderStatus,
        actor: &Actor,
    ) -> Result<TransitionRecord, OrderError> {
        let (record, ledger) = self
            .mutate(order_id, |ledger| {
                let capability = required_capability(ledger.order.status, requested);
                self.authorize(actor, capability)?;
                Ok(self.machine.request_transition(ledger, requested, actor)?)
            })
            .await?;

        self.announce_transition(&ledger, &record);
        Ok(record)
    }

    /// Cartera approves or rejects the wallet review
    pub async fn record_decision(
        &self,
        order_id: Uuid,
        decision: WalletDecision,
        notes: Option<String>,
        reviewer: &Actor,
    ) -> Result<DecisionOutcome, OrderError> {
        let (outcome, ledger) = self
            .mutate(order_id, |ledger| {
                self.authorize(reviewer, Capability::ReviewWallet)?;
                Ok(self.machine.record_decision(ledger, decision, notes, reviewer)?)
            })
            .await?;

        tracing::info!(
            "Wallet review for {}: {} by {}",
            ledger.order.order_number,
            outcome.validation.validation_status,
            reviewer.id
        );
        if let Some(transition) = &outcome.transition {
            self.announce_transition(&ledger, transition);
        }
        Ok(outcome)
    }

    /// Set up scan verification for every item. Entering `empaque` does this
    /// implicitly; calling it a second time fails.
    pub async fn initialize_packaging(&self, order_id: Uuid, actor: &Actor) -> Result<PackagingStatus, OrderError> {
        let (status, _) = self
            .mutate(order_id, |ledger| {
                self.authorize(actor, Capability::PackItems)?;
                let current = ledger.order.status;
                if current.is_terminal() {
                    return Err(TransitionError::OrderClosed { status: current }.into());
                }
                if !current.is_packaging_stage() {
                    return Err(OrderError::WrongStage {
                        status: current,
                        operation: "initialize packaging",
                    });
                }

                let id = ledger.id();
                ledger.packaging.initialize(id, &ledger.items)?;
                Ok(ledger.packaging.status(id, &ledger.items))
            })
            .await?;
        Ok(status)
    }

    /// Count `delta` scanned units of one item
    pub async fn record_scan(
        &self,
        order_id: Uuid,
        item_id: Uuid,
        delta: u32,
        actor: &Actor,
    ) -> Result<ItemVerification, OrderError> {
        let (verification, _) = self
            .mutate(order_id, |ledger| {
                self.authorize(actor, Capability::PackItems)?;
                ensure_scanning(ledger, "record scans")?;
                Ok(ledger.packaging.record_scan(&item_id, delta)?.clone())
            })
            .await?;

        tracing::debug!(
            "Scan on order {} item {}: {}/{}",
            order_id,
            item_id,
            verification.scanned_count,
            verification.required_scans
        );
        Ok(verification)
    }

    /// Put one item's count back to zero
    pub async fn reset_scans(&self, order_id: Uuid, item_id: Uuid, actor: &Actor) -> Result<ItemVerification, OrderError> {
        let (verification, _) = self
            .mutate(order_id, |ledger| {
                self.authorize(actor, Capability::PackItems)?;
                ensure_scanning(ledger, "reset scans")?;
                Ok(ledger.packaging.reset_scans(&item_id)?.clone())
            })
            .await?;

        tracing::info!("Scans reset on order {} item {} by {}", order_id, item_id, actor.id);
        Ok(verification)
    }

    pub async fn is_complete(&self, order_id: Uuid) -> Result<bool, OrderError> {
        let entry = self.entry(order_id).await?;
        let ledger = entry.lock().await;
        Ok(ledger.packaging.is_complete())
    }

    pub async fn packaging_status(&self, order_id: Uuid) -> Result<PackagingStatus, OrderError> {
        let entry = self.entry(order_id).await?;
        let ledger = entry.lock().await;
        Ok(ledger.packaging.status(ledger.id(), &ledger.items))
    }

    pub async fn mismatch_report(&self, order_id: Uuid) -> Result<Vec<QuantityMismatch>, OrderError> {
        let entry = self.entry(order_id).await?;
        let ledger = entry.lock().await;
        let report = ledger.packaging.mismatch_report(&ledger.items);
        if !report.is_empty() {
            tracing::warn!(
                "Order {} has {} item(s) whose quantity disagrees with packaging",
                ledger.order.order_number,
                report.len()
            );
        }
        Ok(report)
    }

    pub async fn transition_history(&self, order_id: Uuid) -> Result<Vec<TransitionRecord>, OrderError> {
        let entry = self.entry(order_id).await?;
        let ledger = entry.lock().await;
        Ok(ledger.transitions().entries().to_vec())
    }

    pub async fn validation_history(&self, order_id: Uuid) -> Result<Vec<WalletValidationRecord>, OrderError> {
        let entry = self.entry(order_id).await?;
        let ledger = entry.lock().await;
        Ok(ledger.validations().entries().to_vec())
    }

    pub async fn dashboard(&self) -> DashboardCounts {
        let entries: Vec<Arc<Mutex<OrderLedger>>> = self.orders.read().await.values().cloned().collect();

        let mut by_status: BTreeMap<String, usize> = OrderStatus::ALL
            .iter()
            .map(|s| (s.as_str().to_string(), 0))
            .collect();
        for entry in &entries {
            let status = entry.lock().await.order.status;
            *by_status.entry(status.as_str().to_string()).or_default() += 1;
        }

        DashboardCounts {
            total: entries.len(),
            pending_packaging: by_status[OrderStatus::PendienteEmpaque.as_str()],
            rejected: by_status[OrderStatus::Rechazado.as_str()],
            by_status,
        }
    }

    async fn entry(&self, order_id: Uuid) -> Result<Arc<Mutex<OrderLedger>>, OrderError> {
        self.orders
            .read()
            .await
            .get(&order_id)
            .cloned()
            .ok_or_else(|| OrderError::NotFound(order_id.to_string()))
    }

    /// Lock the order, apply `f` to a draft, persist, swap in. Nothing is
    /// visible unless both the operation and the write succeed.
    async fn mutate<T, F>(&self, order_id: Uuid, f: F) -> Result<(T, OrderLedger), OrderError>
    where
        F: FnOnce(&mut OrderLedger) -> Result<T, OrderError>,
    {
        let entry = self.entry(order_id).await?;
        let mut live = entry.lock().await;

        let mut draft = live.clone();
        let output = f(&mut draft)?;
        self.repository.save_order(&draft).await.map_err(storage)?;

        *live = draft;
        Ok((output, live.clone()))
    }

    fn authorize(&self, actor: &Actor, capability: Capability) -> Result<(), OrderError> {
        if self.capabilities.allows(actor.role, capability) {
            Ok(())
        } else {
            Err(OrderError::NotPermitted {
                role: actor.role,
                capability,
            })
        }
    }

    fn announce_transition(&self, ledger: &OrderLedger, record: &TransitionRecord) {
        let order = &ledger.order;
        let timestamp = record.created_at.timestamp();

        self.notifier.notify(FulfillmentEvent::StatusChanged(StatusChangedEvent {
            order_id: order.id,
            order_number: order.order_number.clone(),
            from: record.from.to_string(),
            to: record.to.to_string(),
            actor_id: record.actor_id.clone(),
            timestamp,
        }));

        match record.to {
            OrderStatus::PendienteEmpaque if record.from == OrderStatus::Logistica => {
                self.notifier.notify(FulfillmentEvent::PackagingQueued(PackagingQueuedEvent {
                    order_id: order.id,
                    order_number: order.order_number.clone(),
                    item_count: ledger.items.len(),
                    timestamp,
                }));
            }
            OrderStatus::Listo => {
                self.notifier.notify(FulfillmentEvent::OrderReady(OrderReadyEvent {
                    order_id: order.id,
                    order_number: order.order_number.clone(),
                    timestamp,
                }));
            }
            OrderStatus::Rechazado => {
                self.notifier.notify(FulfillmentEvent::OrderRejected(OrderRejectedEvent {
                    order_id: order.id,
                    order_number: order.order_number.clone(),
                    reviewer: record.actor_id.clone(),
                    reason: order.validation_notes.clone().unwrap_or_default(),
                    timestamp,
                }));
            }
            _ => {}
        }
    }
}

/// Which capability a status request needs, given where the order is now
fn required_capability(from: OrderStatus, requested: OrderStatus) -> Capability {
    match (from, requested) {
        (_, OrderStatus::Cancelado) => Capability::Cancel,
        (_, OrderStatus::RevisionCartera) => Capability::AdvancePayment,
        (_, OrderStatus::Rechazado) => Capability::ReviewWallet,
        (OrderStatus::Empaque, OrderStatus::Listo) | (OrderStatus::Empaque, OrderStatus::PendienteEmpaque) => {
            Capability::PackItems
        }
        (_, OrderStatus::Empaque) => Capability::PackItems,
        (_, OrderStatus::Reparto) | (_, OrderStatus::Entregado) => Capability::Dispatch,
        _ => Capability::RouteLogistics,
    }
}

fn ensure_scanning(ledger: &OrderLedger, operation: &'static str) -> Result<(), OrderError> {
    let status = ledger.order.status;
    if status == OrderStatus::Empaque {
        return Ok(());
    }
    if ledger.packaging.is_sealed() {
        return Err(PackagingError::Sealed.into());
    }
    if status.is_terminal() {
        return Err(TransitionError::OrderClosed { status }.into());
    }
    Err(OrderError::WrongStage { status, operation })
}

fn storage(err: Box<dyn std::error::Error + Send + Sync>) -> OrderError {
    tracing::error!("Order storage failed: {}", err);
    OrderError::Storage(err.to_string())
}

#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("Order not found: {0}")]
    NotFound(String),

    #[error("Order already registered: {0}")]
    AlreadyRegistered(String),

    #[error("Invalid order: {0}")]
    InvalidOrder(String),

    #[error("Role {role} lacks capability {capability}")]
    NotPermitted { role: Role, capability: Capability },

    #[error("Cannot {operation} while order is {status}")]
    WrongStage {
        status: OrderStatus,
        operation: &'static str,
    },

    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error(transparent)]
    Packaging(#[from] PackagingError),

    #[error("Storage failure: {0}")]
    Storage(String),
}

impl OrderError {
    /// Business-rule failures are the caller's to fix; storage failures are infrastructure
    pub fn is_business_rule(&self) -> bool {
        !matches!(self, OrderError::Storage(_))
    }
}
