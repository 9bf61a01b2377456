//! Coupons Repository

use atelier::Discount;
use jiff_sqlx::Timestamp as SqlxTimestamp;
use sqlx::{FromRow, Postgres, Row, Transaction, postgres::PgRow, query, query_as};

use crate::domain::decode::{
    amount_to_db, optional_amount_to_db, optional_quantity_to_db, try_get_amount,
    try_get_optional_amount, try_get_optional_quantity, try_get_quantity,
};

use super::{
    data::NewCoupon,
    records::{CouponRecord, CouponUuid},
};

const CREATE_COUPON_SQL: &str = include_str!("sql/create_coupon.sql");
const GET_COUPON_BY_CODE_SQL: &str = include_str!("sql/get_coupon_by_code.sql");
const LOCK_COUPON_BY_CODE_SQL: &str = include_str!("sql/lock_coupon_by_code.sql");
const INCREMENT_COUPON_USAGE_SQL: &str = include_str!("sql/increment_coupon_usage.sql");

#[derive(Debug, Clone, Default)]
pub(crate) struct PgCouponsRepository;

impl PgCouponsRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    pub(crate) async fn create_coupon(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        coupon: NewCoupon,
    ) -> Result<CouponRecord, sqlx::Error> {
        let (percent, amount, cap) = match coupon.discount {
            Discount::PercentageOff { percent, cap } => (
                Some(i32::from(percent)),
                None,
                optional_amount_to_db(cap, "maximum_discount_amount")?,
            ),
            Discount::FixedAmountOff { amount } => {
                (None, Some(amount_to_db(amount, "discount_amount")?), None)
            }
        };

        query_as::<Postgres, CouponRecord>(CREATE_COUPON_SQL)
            .bind(coupon.uuid.into_uuid())
            .bind(coupon.code)
            .bind(coupon.description)
            .bind(coupon.discount.kind_as_str())
            .bind(percent)
            .bind(amount)
            .bind(cap)
            .bind(amount_to_db(
                coupon.minimum_order_amount,
                "minimum_order_amount",
            )?)
            .bind(optional_quantity_to_db(coupon.usage_limit, "usage_limit")?)
            .bind(SqlxTimestamp::from(coupon.valid_from))
            .bind(SqlxTimestamp::from(coupon.valid_to))
            .bind(coupon.is_active)
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn find_by_code(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        code: &str,
    ) -> Result<Option<CouponRecord>, sqlx::Error> {
        query_as::<Postgres, CouponRecord>(GET_COUPON_BY_CODE_SQL)
            .bind(code)
            .fetch_optional(&mut **tx)
            .await
    }

    /// Fetch a coupon by code and hold its row lock until the transaction
    /// ends, so concurrent commits cannot both pass the usage check.
    pub(crate) async fn lock_by_code(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        code: &str,
    ) -> Result<Option<CouponRecord>, sqlx::Error> {
        query_as::<Postgres, CouponRecord>(LOCK_COUPON_BY_CODE_SQL)
            .bind(code)
            .fetch_optional(&mut **tx)
            .await
    }

    /// Count one redemption, guarded against overshooting the usage limit.
    pub(crate) async fn increment_usage(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        coupon: CouponUuid,
    ) -> Result<u64, sqlx::Error> {
        let rows_affected = query(INCREMENT_COUPON_USAGE_SQL)
            .bind(coupon.into_uuid())
            .execute(&mut **tx)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }
}

impl<'r> FromRow<'r, PgRow> for CouponRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        let kind: String = row.try_get("discount_kind")?;

        let discount = match kind.as_str() {
            "percentage" => {
                let percent_i32: i32 = row.try_get("discount_percent")?;

                let percent =
                    u16::try_from(percent_i32).map_err(|e| sqlx::Error::ColumnDecode {
                        index: "discount_percent".to_string(),
                        source: Box::new(e),
                    })?;

                Discount::PercentageOff {
                    percent,
                    cap: try_get_optional_amount(row, "maximum_discount_amount")?,
                }
            }
            "fixed" => Discount::FixedAmountOff {
                amount: try_get_amount(row, "discount_amount")?,
            },
            other => {
                return Err(sqlx::Error::ColumnDecode {
                    index: "discount_kind".to_string(),
                    source: format!("unknown discount kind {other:?}").into(),
                });
            }
        };

        Ok(Self {
            uuid: CouponUuid::from_uuid(row.try_get("uuid")?),
            code: row.try_get("code")?,
            description: row.try_get("description")?,
            discount,
            minimum_order_amount: try_get_amount(row, "minimum_order_amount")?,
            usage_limit: try_get_optional_quantity(row, "usage_limit")?,
            used_count: try_get_quantity(row, "used_count")?,
            valid_from: row.try_get::<SqlxTimestamp, _>("valid_from")?.to_jiff(),
            valid_to: row.try_get::<SqlxTimestamp, _>("valid_to")?.to_jiff(),
            is_active: row.try_get("is_active")?,
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
        })
    }
}
