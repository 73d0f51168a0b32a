use crate::audit::AuditLog;
use crate::models::{Order, OrderItem, TransitionRecord, WalletValidationRecord};
use crate::packaging::PackagingSession;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Everything the engine knows about one order. Mutated only under that
/// order's lock.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderLedger {
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub(crate) packaging: PackagingSession,
    transitions: AuditLog<TransitionRecord>,
    validations: AuditLog<WalletValidationRecord>,
}

impl OrderLedger {
    pub fn new(order: Order, items: Vec<OrderItem>) -> Self {
        Self {
            order,
            items,
            packaging: PackagingSession::new(),
            transitions: AuditLog::new(),
            validations: AuditLog::new(),
        }
    }

    /// Reassemble a ledger loaded from storage. Verifications are put back
    /// in item order whatever order storage returned them in.
    pub fn restore(
        order: Order,
        items: Vec<OrderItem>,
        mut packaging: PackagingSession,
        transitions: Vec<TransitionRecord>,
        validations: Vec<WalletValidationRecord>,
    ) -> Self {
        packaging.align_to(&items);
        Self {
            order,
            items,
            packaging,
            transitions: AuditLog::from_entries(transitions),
            validations: AuditLog::from_entries(validations),
        }
    }

    pub fn id(&self) -> Uuid {
        self.order.id
    }

    pub fn packaging(&self) -> &PackagingSession {
        &self.packaging
    }

    pub fn transitions(&self) -> &AuditLog<TransitionRecord> {
        &self.transitions
    }

    pub fn validations(&self) -> &AuditLog<WalletValidationRecord> {
        &self.validations
    }

    pub(crate) fn append_transition(&mut self, record: TransitionRecord) {
        self.transitions.append(record);
    }

    pub(crate) fn append_validation(&mut self, record: WalletValidationRecord) {
        self.validations.append(record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PaymentMethod;
    use crate::scan::ItemVerification;
    use rust_decimal::Decimal;

    #[test]
    fn test_restore_keeps_item_order() {
        let order = Order::new("PED-R1", PaymentMethod::Cash, Decimal::new(1_000, 2));
        let items: Vec<OrderItem> = (0..4)
            .map(|n| OrderItem::new(order.id, format!("SKU-{}", n), "Producto", n + 1))
            .collect();

        let mut shuffled: Vec<ItemVerification> = items.iter().map(ItemVerification::for_item).collect();
        shuffled.reverse();
        shuffled.swap(0, 2);

        let packaging = PackagingSession::restore(Some(shuffled), false, None);
        let ledger = OrderLedger::restore(order, items.clone(), packaging, vec![], vec![]);

        let expected: Vec<_> = items.iter().map(|i| i.id).collect();
        let restored: Vec<_> = ledger.packaging().verifications().iter().map(|v| v.order_item_id).collect();
        assert_eq!(restored, expected);
        assert_eq!(ledger.packaging().unverified_items(&ledger.items), expected);
    }
}
