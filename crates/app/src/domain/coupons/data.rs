//! Coupon Data

use atelier::Discount;
use jiff::Timestamp;

use super::records::CouponUuid;

/// New Coupon Data
#[derive(Debug, Clone, PartialEq)]
pub struct NewCoupon {
    pub uuid: CouponUuid,
    pub code: String,
    pub description: String,
    pub discount: Discount,
    pub minimum_order_amount: u64,
    pub usage_limit: Option<u32>,
    pub valid_from: Timestamp,
    pub valid_to: Timestamp,
    pub is_active: bool,
}

/// The outcome of evaluating a coupon against a cart subtotal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CouponDiscount {
    pub coupon: CouponUuid,
    pub code: String,
    pub description: String,
    pub amount: u64,
}
