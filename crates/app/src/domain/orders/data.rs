//! Checkout Data

use atelier::Totals;

use crate::domain::{
    coupons::{data::CouponDiscount, errors::CouponsServiceError},
    customers::records::AddressUuid,
};

use super::records::OrderRecord;

/// Checkout Request Data
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutRequest {
    pub billing_address: AddressUuid,
    pub shipping_address: AddressUuid,
    pub coupon_code: Option<String>,
}

/// A side-effect-free checkout quote.
///
/// A failed coupon does not fail the quote; it is reported through
/// `coupon_warning` with the discount omitted, mirroring commit behaviour.
#[derive(Debug)]
pub struct CheckoutQuote {
    pub totals: Totals,
    pub coupon: Option<CouponDiscount>,
    pub coupon_warning: Option<CouponsServiceError>,
}

/// The result of a committed checkout.
///
/// `coupon_warning` carries the reason a supplied coupon code was skipped;
/// callers are expected to show it to the customer.
#[derive(Debug)]
pub struct CheckoutReceipt {
    pub order: OrderRecord,
    pub coupon_warning: Option<CouponsServiceError>,
}
