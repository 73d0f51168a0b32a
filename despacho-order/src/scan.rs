use crate::models::OrderItem;
use crate::packaging::PackagingError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Scan progress for a single order item
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ItemVerification {
    pub order_item_id: Uuid,
    pub required_scans: u32,
    pub scanned_count: u32,
    pub is_verified: bool,
    pub last_scanned_at: Option<DateTime<Utc>>,
}

impl ItemVerification {
    pub fn for_item(item: &OrderItem) -> Self {
        Self {
            order_item_id: item.id,
            required_scans: item.quantity,
            scanned_count: 0,
            is_verified: item.quantity == 0,
            last_scanned_at: None,
        }
    }

    pub fn remaining(&self) -> u32 {
        self.required_scans.saturating_sub(self.scanned_count)
    }

    /// Count `delta` more units. An increment past `required_scans` is refused
    /// and leaves the count untouched.
    pub fn apply_scan(&mut self, delta: u32) -> Result<(), PackagingError> {
        if delta == 0 {
            return Err(PackagingError::InvalidScanDelta);
        }

        let next = self
            .scanned_count
            .checked_add(delta)
            .filter(|next| *next <= self.required_scans)
            .ok_or(PackagingError::OverScan {
                item_id: self.order_item_id,
                required: self.required_scans,
                scanned: self.scanned_count,
                delta,
            })?;

        self.scanned_count = next;
        self.is_verified = self.scanned_count == self.required_scans;
        self.last_scanned_at = Some(Utc::now());
        Ok(())
    }

    pub fn reset(&mut self) {
        self.scanned_count = 0;
        self.is_verified = self.required_scans == 0;
        self.last_scanned_at = None;
    }
}

/// Verification records for every item of one order
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ScanVerificationTracker {
    verifications: Vec<ItemVerification>,
}

impl ScanVerificationTracker {
    pub fn for_items(items: &[OrderItem]) -> Self {
        Self {
            verifications: items.iter().map(ItemVerification::for_item).collect(),
        }
    }

    pub fn from_verifications(verifications: Vec<ItemVerification>) -> Self {
        Self { verifications }
    }

    pub fn verifications(&self) -> &[ItemVerification] {
        &self.verifications
    }

    pub fn get(&self, item_id: &Uuid) -> Option<&ItemVerification> {
        self.verifications.iter().find(|v| v.order_item_id == *item_id)
    }

    pub fn record(&mut self, item_id: &Uuid, delta: u32) -> Result<&ItemVerification, PackagingError> {
        let verification = self.get_mut(item_id)?;
        verification.apply_scan(delta)?;
        Ok(verification)
    }

    pub fn reset(&mut self, item_id: &Uuid) -> Result<&ItemVerification, PackagingError> {
        let verification = self.get_mut(item_id)?;
        verification.reset();
        Ok(verification)
    }

    /// Reorder verifications to follow `items`; unknown ones go last
    pub fn align_to(&mut self, items: &[OrderItem]) {
        let position = |id: &Uuid| items.iter().position(|i| i.id == *id).unwrap_or(items.len());
        self.verifications.sort_by_key(|v| position(&v.order_item_id));
    }

    pub fn all_verified(&self) -> bool {
        self.verifications.iter().all(|v| v.is_verified)
    }

    pub fn unverified(&self) -> Vec<Uuid> {
        self.verifications
            .iter()
            .filter(|v| !v.is_verified)
            .map(|v| v.order_item_id)
            .collect()
    }

    fn get_mut(&mut self, item_id: &Uuid) -> Result<&mut ItemVerification, PackagingError> {
        self.verifications
            .iter_mut()
            .find(|v| v.order_item_id == *item_id)
            .ok_or(PackagingError::UnknownItem(*item_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(quantity: u32) -> OrderItem {
        OrderItem::new(Uuid::new_v4(), "SKU-1", "Caja de tornillos", quantity)
    }

    #[test]
    fn test_scans_until_verified() {
        let mut verification = ItemVerification::for_item(&item(3));

        verification.apply_scan(1).unwrap();
        verification.apply_scan(1).unwrap();
        assert!(!verification.is_verified);
        assert_eq!(verification.remaining(), 1);

        verification.apply_scan(1).unwrap();
        assert!(verification.is_verified);
        assert!(verification.last_scanned_at.is_some());
    }

    #[test]
    fn test_over_scan_is_rejected_not_clamped() {
        let mut verification = ItemVerification::for_item(&item(5));
        verification.apply_scan(5).unwrap();

        let result = verification.apply_scan(1);
        assert!(matches!(
            result,
            Err(PackagingError::OverScan { required: 5, scanned: 5, delta: 1, .. })
        ));
        assert_eq!(verification.scanned_count, 5);
        assert!(verification.is_verified);
    }

    #[test]
    fn test_large_delta_that_overflows_is_an_over_scan() {
        let mut verification = ItemVerification::for_item(&item(2));
        verification.apply_scan(1).unwrap();

        assert!(verification.apply_scan(u32::MAX).is_err());
        assert_eq!(verification.scanned_count, 1);
    }

    #[test]
    fn test_zero_delta() {
        let mut verification = ItemVerification::for_item(&item(2));
        assert_eq!(verification.apply_scan(0), Err(PackagingError::InvalidScanDelta));
    }

    #[test]
    fn test_tracker_unknown_item() {
        let mut tracker = ScanVerificationTracker::for_items(&[item(1)]);
        let stranger = Uuid::new_v4();

        assert_eq!(tracker.record(&stranger, 1).unwrap_err(), PackagingError::UnknownItem(stranger));
    }

    #[test]
    fn test_tracker_reset_and_unverified() {
        let first = item(1);
        let second = item(2);
        let mut tracker = ScanVerificationTracker::for_items(&[first.clone(), second.clone()]);

        tracker.record(&first.id, 1).unwrap();
        assert_eq!(tracker.unverified(), vec![second.id]);

        tracker.reset(&first.id).unwrap();
        assert_eq!(tracker.unverified(), vec![first.id, second.id]);
        assert_eq!(tracker.get(&first.id).unwrap().scanned_count, 0);
        assert!(!tracker.all_verified());
    }
}
