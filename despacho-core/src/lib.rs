pub mod identity;
pub mod notify;

pub use identity::{Actor, Capability, CapabilityTable, Role};
pub use notify::{MemoryNotifier, NoopNotifier, Notifier};

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Unknown role: {0}")]
    UnknownRole(String),
}
