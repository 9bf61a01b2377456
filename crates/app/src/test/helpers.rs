//! Test Helpers

use atelier::Discount;
use jiff::{Timestamp, ToSpan};

use crate::domain::{
    coupons::{data::NewCoupon, records::CouponUuid},
    customers::{
        data::NewAddress,
        records::{AddressKind, AddressUuid},
    },
};

pub(crate) fn new_address(kind: AddressKind) -> NewAddress {
    NewAddress {
        uuid: AddressUuid::new(),
        kind,
        first_name: "Alex".to_string(),
        last_name: "Doe".to_string(),
        company: String::new(),
        address_line_1: "1 High Street".to_string(),
        address_line_2: String::new(),
        city: "Springfield".to_string(),
        state: "IL".to_string(),
        postal_code: "62701".to_string(),
        country: "USA".to_string(),
        phone: "555-0100".to_string(),
        is_default: false,
    }
}

/// An active percentage coupon valid around now, with no order minimum.
pub(crate) fn percentage_coupon(code: &str, percent: u16, cap: Option<u64>) -> NewCoupon {
    let now = Timestamp::now();

    NewCoupon {
        uuid: CouponUuid::new(),
        code: code.to_string(),
        description: format!("{percent}% off"),
        discount: Discount::PercentageOff { percent, cap },
        minimum_order_amount: 0,
        usage_limit: None,
        valid_from: now.saturating_sub(1.hours()).expect("1 hour subtraction does not overflow"),
        valid_to: now.saturating_add(24.hours()).expect("24 hour addition does not overflow"),
        is_active: true,
    }
}

/// An active fixed-amount coupon valid around now, with no order minimum.
pub(crate) fn fixed_coupon(code: &str, amount: u64) -> NewCoupon {
    let now = Timestamp::now();

    NewCoupon {
        uuid: CouponUuid::new(),
        code: code.to_string(),
        description: "amount off".to_string(),
        discount: Discount::FixedAmountOff { amount },
        minimum_order_amount: 0,
        usage_limit: None,
        valid_from: now.saturating_sub(1.hours()).expect("1 hour subtraction does not overflow"),
        valid_to: now.saturating_add(24.hours()).expect("24 hour addition does not overflow"),
        is_active: true,
    }
}
