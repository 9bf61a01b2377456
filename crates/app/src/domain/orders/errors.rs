//! Checkout errors.

use std::fmt;

use sqlx::{
    Error,
    error::{DatabaseError, ErrorKind},
};
use thiserror::Error;

use crate::domain::{catalog::records::VariantUuid, coupons::errors::CouponsServiceError};

/// Which of the two checkout addresses failed to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressRole {
    Billing,
    Shipping,
}

impl fmt::Display for AddressRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Billing => f.write_str("billing"),
            Self::Shipping => f.write_str("shipping"),
        }
    }
}

/// PostgreSQL codes for lost races: serialization_failure and
/// deadlock_detected.
const RETRYABLE_SQLSTATE: [&str; 2] = ["40001", "40P01"];

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("cart is empty")]
    EmptyCart,

    #[error("{role} address is missing or not owned by the customer")]
    InvalidAddress { role: AddressRole },

    #[error("only {available} of variant {variant} in stock ({requested} requested)")]
    OutOfStock {
        variant: VariantUuid,
        requested: u32,
        available: u32,
    },

    #[error("coupon rejected")]
    Coupon(#[from] CouponsServiceError),

    #[error("order not found")]
    NotFound,

    #[error("a concurrent checkout touched the same stock or coupon; retry")]
    ConcurrentModification,

    #[error("invalid data")]
    InvalidData,

    #[error("storage error")]
    Sql(#[source] Error),
}

impl From<Error> for CheckoutError {
    fn from(error: Error) -> Self {
        if matches!(error, Error::RowNotFound) {
            return Self::NotFound;
        }

        if let Some(db) = error.as_database_error() {
            if db
                .code()
                .is_some_and(|code| RETRYABLE_SQLSTATE.contains(&code.as_ref()))
            {
                return Self::ConcurrentModification;
            }

            if db.kind() == ErrorKind::CheckViolation {
                return Self::InvalidData;
            }
        }

        Self::Sql(error)
    }
}
