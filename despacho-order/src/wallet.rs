use crate::models::{Order, PaymentMethod, ValidationStatus, WalletDecision, WalletValidationRecord};
use chrono::Utc;
use despacho_core::Actor;
use std::collections::HashSet;

/// Payment methods that must clear cartera before logistics.
/// Fixed at construction; there is no way to change it afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewPolicy {
    review_required: HashSet<PaymentMethod>,
}

impl ReviewPolicy {
    pub fn new(methods: impl IntoIterator<Item = PaymentMethod>) -> Self {
        Self {
            review_required: methods.into_iter().collect(),
        }
    }

    /// Credit and transfer go through review, cash and other don't
    pub fn standard() -> Self {
        Self::new([PaymentMethod::Credit, PaymentMethod::Transfer])
    }

    pub fn requires_review(&self, method: PaymentMethod) -> bool {
        self.review_required.contains(&method)
    }
}

impl Default for ReviewPolicy {
    fn default() -> Self {
        Self::standard()
    }
}

/// Decides whether an order needs cartera approval and records decisions
#[derive(Debug, Clone, Default)]
pub struct WalletValidationGate {
    policy: ReviewPolicy,
}

impl WalletValidationGate {
    pub fn new(policy: ReviewPolicy) -> Self {
        Self { policy }
    }

    pub fn requires_review(&self, method: PaymentMethod) -> bool {
        self.policy.requires_review(method)
    }

    /// True while the order may not move past revision_cartera
    pub fn blocks(&self, order: &Order) -> bool {
        self.requires_review(order.payment_method) && order.validation_status != ValidationStatus::Approved
    }

    /// Apply a decision to the order's validation fields and produce the
    /// history record. Moving a rejected order to `rechazado` is left to the
    /// state machine so the transition lands in the audit log.
    pub fn decide(
        &self,
        order: &mut Order,
        decision: WalletDecision,
        notes: Option<String>,
        reviewer: &Actor,
    ) -> Result<WalletValidationRecord, WalletError> {
        let notes = notes
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());

        let validation_status = match decision {
            WalletDecision::Approve => ValidationStatus::Approved,
            WalletDecision::Reject => {
                if notes.is_none() {
                    return Err(WalletError::MissingRejectionReason);
                }
                ValidationStatus::Rejected
            }
        };

        order.validation_status = validation_status;
        order.validation_notes = notes.clone();
        order.updated_at = Utc::now();

        Ok(WalletValidationRecord {
            order_id: order.id,
            validated_by: reviewer.id.clone(),
            validation_status,
            validation_notes: notes,
            created_at: order.updated_at,
        })
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WalletError {
    #[error("A rejection needs a reason")]
    MissingRejectionReason,
}

#[cfg(test)]
mod tests {
    use super::*;
    use despacho_core::Role;
    use rust_decimal::Decimal;

    fn reviewer() -> Actor {
        Actor::new("ana.cartera", Role::Cartera)
    }

    #[test]
    fn test_standard_policy() {
        let gate = WalletValidationGate::default();

        assert!(gate.requires_review(PaymentMethod::Credit));
        assert!(gate.requires_review(PaymentMethod::Transfer));
        assert!(!gate.requires_review(PaymentMethod::Cash));
        assert!(!gate.requires_review(PaymentMethod::Other));
    }

    #[test]
    fn test_requires_review_is_stable() {
        let gate = WalletValidationGate::default();
        for method in [PaymentMethod::Cash, PaymentMethod::Transfer, PaymentMethod::Credit, PaymentMethod::Other] {
            assert_eq!(gate.requires_review(method), gate.requires_review(method));
        }
    }

    #[test]
    fn test_injected_policy() {
        let gate = WalletValidationGate::new(ReviewPolicy::new([PaymentMethod::Cash]));
        assert!(gate.requires_review(PaymentMethod::Cash));
        assert!(!gate.requires_review(PaymentMethod::Credit));
    }

    #[test]
    fn test_reject_without_reason_changes_nothing() {
        let gate = WalletValidationGate::default();
        let mut order = Order::new("PED-1", PaymentMethod::Credit, Decimal::ONE);
        order.validation_status = ValidationStatus::Pending;

        for notes in [None, Some("   ".to_string())] {
            let result = gate.decide(&mut order, WalletDecision::Reject, notes, &reviewer());
            assert_eq!(result, Err(WalletError::MissingRejectionReason));
        }
        assert_eq!(order.validation_status, ValidationStatus::Pending);
    }

    #[test]
    fn test_approve_unblocks() {
        let gate = WalletValidationGate::default();
        let mut order = Order::new("PED-2", PaymentMethod::Transfer, Decimal::ONE);
        order.validation_status = ValidationStatus::Pending;
        assert!(gate.blocks(&order));

        let record = gate
            .decide(&mut order, WalletDecision::Approve, None, &reviewer())
            .unwrap();

        assert!(!gate.blocks(&order));
        assert_eq!(record.validation_status, ValidationStatus::Approved);
        assert_eq!(record.validated_by, "ana.cartera");
    }
}
