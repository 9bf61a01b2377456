//! Coupon Records

use atelier::Discount;
use jiff::Timestamp;

use crate::uuids::TypedUuid;

use super::errors::CouponsServiceError;

/// Coupon UUID
pub type CouponUuid = TypedUuid<CouponRecord>;

/// Coupon Record
#[derive(Debug, Clone)]
pub struct CouponRecord {
    pub uuid: CouponUuid,
    pub code: String,
    pub description: String,
    pub discount: Discount,
    pub minimum_order_amount: u64,
    pub usage_limit: Option<u32>,
    pub used_count: u32,
    pub valid_from: Timestamp,
    pub valid_to: Timestamp,
    pub is_active: bool,
    pub created_at: Timestamp,
}

impl CouponRecord {
    /// Whether the coupon can be redeemed at all right now.
    ///
    /// The window is inclusive on both ends.
    #[must_use]
    pub fn is_valid(&self, now: Timestamp) -> bool {
        self.is_active
            && self.valid_from <= now
            && now <= self.valid_to
            && self.usage_limit.is_none_or(|limit| self.used_count < limit)
    }

    /// Evaluate this coupon against an order subtotal.
    ///
    /// Pure: redemption counting happens only when an order actually commits.
    ///
    /// # Errors
    ///
    /// [`CouponsServiceError::Invalid`] when the coupon is inactive, outside
    /// its window, or used up; [`CouponsServiceError::BelowMinimum`] when the
    /// subtotal does not reach the coupon's minimum order amount.
    pub fn evaluate(&self, subtotal: u64, now: Timestamp) -> Result<u64, CouponsServiceError> {
        if !self.is_valid(now) {
            return Err(CouponsServiceError::Invalid);
        }

        if subtotal < self.minimum_order_amount {
            return Err(CouponsServiceError::BelowMinimum {
                minimum: self.minimum_order_amount,
            });
        }

        Ok(self.discount.amount_off(subtotal))
    }
}
