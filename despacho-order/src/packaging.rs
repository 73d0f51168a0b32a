use crate::models::OrderItem;
use crate::scan::{ItemVerification, ScanVerificationTracker};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Warehouse packaging for one order: set up once, fed scan events,
/// sealed when the order leaves the packaging stage.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PackagingSession {
    tracker: Option<ScanVerificationTracker>,
    sealed: bool,
    started_at: Option<DateTime<Utc>>,
}

/// An item whose ordered quantity no longer matches what packaging expects
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuantityMismatch {
    pub order_item_id: Uuid,
    pub product_code: String,
    pub ordered_quantity: u32,
    /// `None` when the item was never set up for scanning
    pub required_scans: Option<u32>,
}

/// Snapshot served to the warehouse screens
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PackagingStatus {
    pub order_id: Uuid,
    pub initialized: bool,
    pub sealed: bool,
    pub complete: bool,
    pub items: Vec<ItemVerification>,
    pub unverified: Vec<Uuid>,
}

impl PackagingSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a session from persisted verifications
    pub fn restore(
        verifications: Option<Vec<ItemVerification>>,
        sealed: bool,
        started_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            tracker: verifications.map(ScanVerificationTracker::from_verifications),
            sealed,
            started_at,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.tracker.is_some()
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    /// One verification per item, required = ordered quantity.
    /// Runs once per order; a second call would wipe in-progress counts.
    pub fn initialize(&mut self, order_id: Uuid, items: &[OrderItem]) -> Result<(), PackagingError> {
        if self.tracker.is_some() {
            return Err(PackagingError::AlreadyInitialized(order_id));
        }

        self.tracker = Some(ScanVerificationTracker::for_items(items));
        self.started_at = Some(Utc::now());
        Ok(())
    }

    pub fn record_scan(&mut self, item_id: &Uuid, delta: u32) -> Result<&ItemVerification, PackagingError> {
        self.open_tracker()?.record(item_id, delta)
    }

    pub fn reset_scans(&mut self, item_id: &Uuid) -> Result<&ItemVerification, PackagingError> {
        self.open_tracker()?.reset(item_id)
    }

    /// False until initialized
    pub fn is_complete(&self) -> bool {
        self.tracker.as_ref().is_some_and(|t| t.all_verified())
    }

    /// Item ids still short of their required scans. Every item counts as
    /// unverified while the session has not been set up.
    pub fn unverified_items(&self, items: &[OrderItem]) -> Vec<Uuid> {
        match &self.tracker {
            Some(tracker) => tracker.unverified(),
            None => items.iter().map(|i| i.id).collect(),
        }
    }

    pub fn verifications(&self) -> &[ItemVerification] {
        self.tracker.as_ref().map(|t| t.verifications()).unwrap_or(&[])
    }

    /// Items whose current ordered quantity disagrees with `required_scans`.
    /// Reports only; nothing is corrected.
    pub fn mismatch_report(&self, items: &[OrderItem]) -> Vec<QuantityMismatch> {
        let Some(tracker) = &self.tracker else {
            return Vec::new();
        };

        items
            .iter()
            .filter_map(|item| {
                let required = tracker.get(&item.id).map(|v| v.required_scans);
                if required == Some(item.quantity) {
                    return None;
                }
                Some(QuantityMismatch {
                    order_item_id: item.id,
                    product_code: item.product_code.clone(),
                    ordered_quantity: item.quantity,
                    required_scans: required,
                })
            })
            .collect()
    }

    pub(crate) fn align_to(&mut self, items: &[OrderItem]) {
        if let Some(tracker) = &mut self.tracker {
            tracker.align_to(items);
        }
    }

    /// Freeze the verifications once the order leaves packaging
    pub fn seal(&mut self) {
        if self.tracker.is_some() {
            self.sealed = true;
        }
    }

    pub fn status(&self, order_id: Uuid, items: &[OrderItem]) -> PackagingStatus {
        PackagingStatus {
            order_id,
            initialized: self.is_initialized(),
            sealed: self.sealed,
            complete: self.is_complete(),
            items: self.verifications().to_vec(),
            unverified: self.unverified_items(items),
        }
    }

    fn open_tracker(&mut self) -> Result<&mut ScanVerificationTracker, PackagingError> {
        if self.sealed {
            return Err(PackagingError::Sealed);
        }
        self.tracker.as_mut().ok_or(PackagingError::NotInitialized)
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PackagingError {
    #[error("Packaging already initialized for order {0}")]
    AlreadyInitialized(Uuid),

    #[error("Packaging has not been initialized")]
    NotInitialized,

    #[error("Packaging is sealed; the order has left the packaging stage")]
    Sealed,

    #[error("Item {0} does not belong to this order")]
    UnknownItem(Uuid),

    #[error("Over-scan on item {item_id}: {scanned}/{required} scanned, refused +{delta}")]
    OverScan {
        item_id: Uuid,
        required: u32,
        scanned: u32,
        delta: u32,
    },

    #[error("Scan delta must be at least 1")]
    InvalidScanDelta,
}
