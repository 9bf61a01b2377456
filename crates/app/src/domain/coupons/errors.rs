//! Coupons service errors.

use sqlx::{
    Error,
    error::{DatabaseError, ErrorKind},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CouponsServiceError {
    #[error("no such coupon code")]
    NotFound,

    #[error("coupon is not currently redeemable")]
    Invalid,

    #[error("order subtotal is below the coupon minimum of {minimum}")]
    BelowMinimum { minimum: u64 },

    #[error("coupon already exists")]
    AlreadyExists,

    #[error("related resource not found")]
    InvalidReference,

    #[error("missing required data")]
    MissingRequiredData,

    #[error("invalid data")]
    InvalidData,

    #[error("storage error")]
    Sql(#[source] Error),
}

impl From<Error> for CouponsServiceError {
    fn from(error: Error) -> Self {
        if matches!(error, Error::RowNotFound) {
            return Self::NotFound;
        }

        match error.as_database_error().map(DatabaseError::kind) {
            Some(ErrorKind::UniqueViolation) => Self::AlreadyExists,
            Some(ErrorKind::ForeignKeyViolation) => Self::InvalidReference,
            Some(ErrorKind::NotNullViolation) => Self::MissingRequiredData,
            Some(ErrorKind::CheckViolation) => Self::InvalidData,
            _ => Self::Sql(error),
        }
    }
}

impl From<atelier::DiscountError> for CouponsServiceError {
    fn from(_: atelier::DiscountError) -> Self {
        Self::InvalidData
    }
}
