use crate::ledger::OrderLedger;
use crate::models::{
    OrderStatus, PaymentMethod, TransitionRecord, ValidationStatus, WalletDecision, WalletValidationRecord,
};
use crate::packaging::PackagingError;
use crate::wallet::{ReviewPolicy, WalletError, WalletValidationGate};
use chrono::Utc;
use despacho_core::Actor;
use uuid::Uuid;

use OrderStatus::*;

/// Legal status moves and the guards around them. Knows nothing about
/// roles; callers check capabilities before getting here.
#[derive(Debug, Clone, Default)]
pub struct OrderFulfillmentStateMachine {
    gate: WalletValidationGate,
}

/// Result of a wallet decision
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionOutcome {
    pub validation: WalletValidationRecord,
    /// Present when the decision closed the order
    pub transition: Option<TransitionRecord>,
}

impl OrderFulfillmentStateMachine {
    pub fn new(policy: ReviewPolicy) -> Self {
        Self {
            gate: WalletValidationGate::new(policy),
        }
    }

    pub fn gate(&self) -> &WalletValidationGate {
        &self.gate
    }

    /// Targets reachable from `from` through a transition request.
    /// `rechazado` is only reached through a wallet decision.
    pub fn allowed_targets(from: OrderStatus) -> &'static [OrderStatus] {
        match from {
            PendientePago => &[RevisionCartera, Logistica, Cancelado],
            RevisionCartera => &[Logistica, Cancelado],
            Logistica => &[PendienteEmpaque, Cancelado],
            PendienteEmpaque => &[Empaque, Cancelado],
            Empaque => &[Listo, PendienteEmpaque, Cancelado],
            Listo => &[Reparto, Cancelado],
            Reparto => &[Entregado, Cancelado],
            Entregado | Rechazado | Cancelado => &[],
        }
    }

    /// Nothing goes from logistics straight to ready: a "listo" request is
    /// queued for packaging instead.
    pub fn resolve_target(from: OrderStatus, requested: OrderStatus) -> OrderStatus {
        match (from, requested) {
            (Logistica, Listo) => PendienteEmpaque,
            _ => requested,
        }
    }

    /// Check every guard, then commit the status change and its audit record.
    /// On error the ledger is untouched.
    pub fn request_transition(
        &self,
        ledger: &mut OrderLedger,
        requested: OrderStatus,
        actor: &Actor,
    ) -> Result<TransitionRecord, TransitionError> {
        let from = ledger.order.status;
        if from.is_terminal() {
            return Err(TransitionError::OrderClosed { status: from });
        }

        let target = Self::resolve_target(from, requested);
        if !Self::allowed_targets(from).contains(&target) {
            return Err(TransitionError::InvalidTransition { from, requested });
        }

        if target.is_past_review() && self.gate.blocks(&ledger.order) {
            return Err(TransitionError::ValidationRequired {
                payment_method: ledger.order.payment_method,
                validation_status: ledger.order.validation_status,
            });
        }

        if from == Empaque && target == Listo && !ledger.packaging.is_complete() {
            return Err(TransitionError::PackagingIncomplete {
                unverified: ledger.packaging.unverified_items(&ledger.items),
            });
        }

        if target == Empaque && !ledger.packaging.is_initialized() {
            let order_id = ledger.order.id;
            ledger.packaging.initialize(order_id, &ledger.items)?;
        }
        if !target.is_packaging_stage() {
            ledger.packaging.seal();
        }
        if target == RevisionCartera
            && self.gate.requires_review(ledger.order.payment_method)
            && ledger.order.validation_status == ValidationStatus::None
        {
            ledger.order.validation_status = ValidationStatus::Pending;
        }

        Ok(self.commit(ledger, target, requested, actor))
    }

    /// Approve or reject the cartera review. A rejection closes the order.
    pub fn record_decision(
        &self,
        ledger: &mut OrderLedger,
        decision: WalletDecision,
        notes: Option<String>,
        reviewer: &Actor,
    ) -> Result<DecisionOutcome, TransitionError> {
        let status = ledger.order.status;
        if status.is_terminal() {
            return Err(TransitionError::OrderClosed { status });
        }
        if status != RevisionCartera {
            return Err(TransitionError::NotUnderReview { status });
        }

        let validation = self.gate.decide(&mut ledger.order, decision, notes, reviewer)?;
        ledger.append_validation(validation.clone());

        let transition = match decision {
            WalletDecision::Approve => None,
            WalletDecision::Reject => {
                ledger.packaging.seal();
                Some(self.commit(ledger, Rechazado, Rechazado, reviewer))
            }
        };

        Ok(DecisionOutcome { validation, transition })
    }

    fn commit(
        &self,
        ledger: &mut OrderLedger,
        target: OrderStatus,
        requested: OrderStatus,
        actor: &Actor,
    ) -> TransitionRecord {
        let from = ledger.order.status;
        ledger.order.update_status(target);

        let record = TransitionRecord {
            order_id: ledger.order.id,
            from,
            to: target,
            requested,
            actor_id: actor.id.clone(),
            actor_role: actor.role.to_string(),
            created_at: Utc::now(),
        };
        ledger.append_transition(record.clone());

        tracing::info!(
            "Order {} moved {} -> {} by {} ({})",
            ledger.order.order_number,
            from,
            target,
            actor.id,
            actor.role
        );
        record
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TransitionError {
    #[error("Invalid state transition from {from} to {requested}")]
    InvalidTransition {
        from: OrderStatus,
        requested: OrderStatus,
    },

    #[error("Wallet validation required: payment method {payment_method}, validation {validation_status}")]
    ValidationRequired {
        payment_method: PaymentMethod,
        validation_status: ValidationStatus,
    },

    #[error("Packaging incomplete: {} item(s) unverified", .unverified.len())]
    PackagingIncomplete { unverified: Vec<Uuid> },

    #[error("Order is closed ({status})")]
    OrderClosed { status: OrderStatus },

    #[error("Order is not under wallet review ({status})")]
    NotUnderReview { status: OrderStatus },

    #[error(transparent)]
    Packaging(#[from] PackagingError),

    #[error(transparent)]
    Wallet(#[from] WalletError),
}
