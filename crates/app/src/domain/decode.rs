//! Row decode and bind helpers for minor-unit amounts and quantities.

use sqlx::{Row, postgres::PgRow};

pub(crate) fn try_get_amount(row: &PgRow, col: &str) -> Result<u64, sqlx::Error> {
    let amount_i64: i64 = row.try_get(col)?;

    u64::try_from(amount_i64).map_err(|e| sqlx::Error::ColumnDecode {
        index: col.to_string(),
        source: Box::new(e),
    })
}

pub(crate) fn try_get_optional_amount(row: &PgRow, col: &str) -> Result<Option<u64>, sqlx::Error> {
    let amount_i64: Option<i64> = row.try_get(col)?;

    amount_i64
        .map(|v| {
            u64::try_from(v).map_err(|e| sqlx::Error::ColumnDecode {
                index: col.to_string(),
                source: Box::new(e),
            })
        })
        .transpose()
}

pub(crate) fn try_get_quantity(row: &PgRow, col: &str) -> Result<u32, sqlx::Error> {
    let quantity_i32: i32 = row.try_get(col)?;

    u32::try_from(quantity_i32).map_err(|e| sqlx::Error::ColumnDecode {
        index: col.to_string(),
        source: Box::new(e),
    })
}

pub(crate) fn try_get_optional_quantity(
    row: &PgRow,
    col: &str,
) -> Result<Option<u32>, sqlx::Error> {
    let quantity_i32: Option<i32> = row.try_get(col)?;

    quantity_i32
        .map(|v| {
            u32::try_from(v).map_err(|e| sqlx::Error::ColumnDecode {
                index: col.to_string(),
                source: Box::new(e),
            })
        })
        .transpose()
}

pub(crate) fn amount_to_db(value: u64, column: &'static str) -> Result<i64, sqlx::Error> {
    i64::try_from(value).map_err(|e| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(e),
    })
}

pub(crate) fn optional_amount_to_db(
    value: Option<u64>,
    column: &'static str,
) -> Result<Option<i64>, sqlx::Error> {
    value.map(|v| amount_to_db(v, column)).transpose()
}

pub(crate) fn quantity_to_db(value: u32, column: &'static str) -> Result<i32, sqlx::Error> {
    i32::try_from(value).map_err(|e| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(e),
    })
}

pub(crate) fn optional_quantity_to_db(
    value: Option<u32>,
    column: &'static str,
) -> Result<Option<i32>, sqlx::Error> {
    value.map(|v| quantity_to_db(v, column)).transpose()
}
