pub mod models;
pub mod audit;
pub mod scan;
pub mod packaging;
pub mod wallet;
pub mod ledger;
pub mod machine;
pub mod repository;
pub mod manager;

pub use models::{Order, OrderItem, OrderStatus, PaymentMethod, ValidationStatus, WalletDecision};
pub use audit::AuditLog;
pub use scan::{ItemVerification, ScanVerificationTracker};
pub use packaging::{PackagingError, PackagingSession, PackagingStatus, QuantityMismatch};
pub use wallet::{ReviewPolicy, WalletError, WalletValidationGate};
pub use ledger::OrderLedger;
pub use machine::{OrderFulfillmentStateMachine, TransitionError, DecisionOutcome};
pub use repository::{InMemoryOrderRepository, OrderRepository};
pub use manager::{DashboardCounts, OrderError, OrderManager};
