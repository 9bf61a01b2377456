//! Carts service errors.

use sqlx::{
    Error,
    error::{DatabaseError, ErrorKind},
};
use thiserror::Error;

use crate::domain::catalog::records::VariantUuid;

#[derive(Debug, Error)]
pub enum CartsServiceError {
    #[error("cart or line not found")]
    NotFound,

    #[error("variant is not available")]
    VariantUnavailable,

    #[error("only {available} of variant {variant} in stock ({requested} requested)")]
    OutOfStock {
        variant: VariantUuid,
        requested: u32,
        available: u32,
    },

    #[error("cannot hold {requested} of variant {variant}; only {available} in stock")]
    ExceedsStock {
        variant: VariantUuid,
        requested: u32,
        available: u32,
    },

    #[error("line already exists")]
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

impl From<Error> for CartsServiceError {
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
