//! Discount definitions and application.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Rejected discount definitions.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DiscountError {
    /// Percentage must be between 1 and 100 inclusive.
    #[error("percentage must be between 1 and 100")]
    PercentOutOfRange,

    /// Fixed amounts must be non-zero.
    #[error("amount must be greater than zero")]
    ZeroAmount,
}

/// A discount as configured on a coupon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Discount {
    /// A percentage off the order subtotal, optionally capped at a fixed
    /// maximum amount.
    PercentageOff {
        /// Whole percent in `1..=100`.
        percent: u16,
        /// Ceiling on the computed amount, in minor units.
        cap: Option<u64>,
    },
    /// A fixed amount off, in minor units.
    FixedAmountOff {
        /// Amount off, in minor units.
        amount: u64,
    },
}

impl Discount {
    /// A validated percentage discount.
    ///
    /// # Errors
    ///
    /// Returns [`DiscountError::PercentOutOfRange`] unless `percent` is in
    /// `1..=100`.
    pub fn percentage(percent: u16, cap: Option<u64>) -> Result<Self, DiscountError> {
        if percent == 0 || percent > 100 {
            return Err(DiscountError::PercentOutOfRange);
        }

        Ok(Self::PercentageOff { percent, cap })
    }

    /// A validated fixed-amount discount.
    ///
    /// # Errors
    ///
    /// Returns [`DiscountError::ZeroAmount`] when `amount` is zero.
    pub fn fixed(amount: u64) -> Result<Self, DiscountError> {
        if amount == 0 {
            return Err(DiscountError::ZeroAmount);
        }

        Ok(Self::FixedAmountOff { amount })
    }

    #[must_use]
    pub const fn kind_as_str(&self) -> &'static str {
        match self {
            Self::PercentageOff { .. } => "percentage",
            Self::FixedAmountOff { .. } => "fixed",
        }
    }

    /// The amount this discount takes off a given subtotal, floored at the
    /// minor unit.
    ///
    /// Percentage discounts respect their cap. Fixed discounts are returned
    /// as configured; clamping against the order total is the pricing
    /// engine's job (see [`crate::PricingPolicy::quote`]).
    #[must_use]
    pub fn amount_off(&self, subtotal: u64) -> u64 {
        match *self {
            Self::PercentageOff { percent, cap } => {
                let raw = u128::from(subtotal) * u128::from(percent) / 100;
                // percent <= 100, so raw <= subtotal and the conversion holds.
                let raw = u64::try_from(raw).unwrap_or(subtotal);

                cap.map_or(raw, |cap| raw.min(cap))
            }
            Self::FixedAmountOff { amount } => amount,
        }
    }
}
