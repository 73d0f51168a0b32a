use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::fmt;
use std::str::FromStr;

/// Order status in the fulfillment lifecycle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    PendientePago,
    RevisionCartera,
    Logistica,
    PendienteEmpaque,
    Empaque,
    Listo,
    Reparto,
    Entregado,
    Rechazado,
    Cancelado,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 10] = [
        OrderStatus::PendientePago,
        OrderStatus::RevisionCartera,
        OrderStatus::Logistica,
        OrderStatus::PendienteEmpaque,
        OrderStatus::Empaque,
        OrderStatus::Listo,
        OrderStatus::Reparto,
        OrderStatus::Entregado,
        OrderStatus::Rechazado,
        OrderStatus::Cancelado,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::PendientePago => "pendiente_pago",
            OrderStatus::RevisionCartera => "revision_cartera",
            OrderStatus::Logistica => "logistica",
            OrderStatus::PendienteEmpaque => "pendiente_empaque",
            OrderStatus::Empaque => "empaque",
            OrderStatus::Listo => "listo",
            OrderStatus::Reparto => "reparto",
            OrderStatus::Entregado => "entregado",
            OrderStatus::Rechazado => "rechazado",
            OrderStatus::Cancelado => "cancelado",
        }
    }

    /// Terminal states accept no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Entregado | OrderStatus::Rechazado | OrderStatus::Cancelado)
    }

    /// Statuses that require a settled wallet review
    pub fn is_past_review(&self) -> bool {
        matches!(
            self,
            OrderStatus::Logistica
                | OrderStatus::PendienteEmpaque
                | OrderStatus::Empaque
                | OrderStatus::Listo
                | OrderStatus::Reparto
                | OrderStatus::Entregado
        )
    }

    pub fn is_packaging_stage(&self) -> bool {
        matches!(self, OrderStatus::PendienteEmpaque | OrderStatus::Empaque)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .iter()
            .find(|status| status.as_str() == s)
            .copied()
            .ok_or_else(|| ParseError::Status(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Transfer,
    Credit,
    Other,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Transfer => "transfer",
            PaymentMethod::Credit => "credit",
            PaymentMethod::Other => "other",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cash" => Ok(PaymentMethod::Cash),
            "transfer" => Ok(PaymentMethod::Transfer),
            "credit" => Ok(PaymentMethod::Credit),
            "other" => Ok(PaymentMethod::Other),
            other => Err(ParseError::PaymentMethod(other.to_string())),
        }
    }
}

/// Outcome of the accounts (cartera) review
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    None,
    Pending,
    Approved,
    Rejected,
}

impl ValidationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationStatus::None => "none",
            ValidationStatus::Pending => "pending",
            ValidationStatus::Approved => "approved",
            ValidationStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for ValidationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ValidationStatus {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(ValidationStatus::None),
            "pending" => Ok(ValidationStatus::Pending),
            "approved" => Ok(ValidationStatus::Approved),
            "rejected" => Ok(ValidationStatus::Rejected),
            other => Err(ParseError::ValidationStatus(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WalletDecision {
    Approve,
    Reject,
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ParseError {
    #[error("Unknown order status: {0}")]
    Status(String),

    #[error("Unknown payment method: {0}")]
    PaymentMethod(String),

    #[error("Unknown validation status: {0}")]
    ValidationStatus(String),
}

/// A customer order as handed over by intake
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    pub id: Uuid,
    pub order_number: String,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub total_amount: Decimal,
    pub validation_status: ValidationStatus,
    pub validation_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn new(order_number: impl Into<String>, payment_method: PaymentMethod, total_amount: Decimal) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            order_number: order_number.into(),
            status: OrderStatus::PendientePago,
            payment_method,
            total_amount,
            validation_status: ValidationStatus::None,
            validation_notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Update order status
    pub fn update_status(&mut self, new_status: OrderStatus) {
        self.status = new_status;
        self.updated_at = Utc::now();
    }
}

/// A product line within an order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_code: String,
    pub description: String,
    pub quantity: u32,
}

impl OrderItem {
    pub fn new(
        order_id: Uuid,
        product_code: impl Into<String>,
        description: impl Into<String>,
        quantity: u32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            order_id,
            product_code: product_code.into(),
            description: description.into(),
            quantity,
        }
    }
}

/// One committed status change
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransitionRecord {
    pub order_id: Uuid,
    pub from: OrderStatus,
    pub to: OrderStatus,
    /// What the caller asked for; differs from `to` when the request was redirected
    pub requested: OrderStatus,
    pub actor_id: String,
    pub actor_role: String,
    pub created_at: DateTime<Utc>,
}

impl TransitionRecord {
    pub fn was_redirected(&self) -> bool {
        self.requested != self.to
    }
}

/// A cartera review decision. Never mutated once written.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WalletValidationRecord {
    pub order_id: Uuid,
    pub validated_by: String,
    pub validation_status: ValidationStatus,
    pub validation_notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_wire_names_round_trip() {
        for status in OrderStatus::ALL {
            assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), status);
            let json = serde_json::to_value(status).unwrap();
            assert_eq!(json, serde_json::json!(status.as_str()));
        }
    }

    #[test]
    fn test_unknown_status_is_rejected() {
        let result = "en_bodega".parse::<OrderStatus>();
        assert_eq!(result, Err(ParseError::Status("en_bodega".to_string())));
    }

    #[test]
    fn test_terminal_states() {
        let terminal: Vec<OrderStatus> = OrderStatus::ALL
            .into_iter()
            .filter(|s| s.is_terminal())
            .collect();
        assert_eq!(
            terminal,
            vec![OrderStatus::Entregado, OrderStatus::Rechazado, OrderStatus::Cancelado]
        );
    }

    #[test]
    fn test_new_order_defaults() {
        let order = Order::new("PED-100", PaymentMethod::Credit, Decimal::new(125_000, 2));
        assert_eq!(order.status, OrderStatus::PendientePago);
        assert_eq!(order.validation_status, ValidationStatus::None);
        assert_eq!(order.total_amount.to_string(), "1250.00");
    }
}
