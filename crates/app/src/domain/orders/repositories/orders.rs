//! Orders Repository

use atelier::Totals;
use jiff_sqlx::Timestamp as SqlxTimestamp;
use sqlx::{
    FromRow, Postgres, Row, Transaction,
    postgres::PgRow,
    query_as,
    types::{Json, Uuid},
};

use crate::domain::{
    coupons::records::CouponUuid,
    customers::records::CustomerUuid,
    decode::{amount_to_db, try_get_amount},
    orders::records::{AddressSnapshot, OrderRecord, OrderStatus, OrderUuid, PaymentStatus},
};

const CREATE_ORDER_SQL: &str = include_str!("../sql/create_order.sql");
const GET_ORDER_BY_NUMBER_SQL: &str = include_str!("../sql/get_order_by_number.sql");

/// Everything the insert needs; totals arrive already balanced from the
/// pricing engine.
#[derive(Debug)]
pub(crate) struct NewOrderRow {
    pub uuid: OrderUuid,
    pub order_number: String,
    pub customer: CustomerUuid,
    pub billing_address: AddressSnapshot,
    pub shipping_address: AddressSnapshot,
    pub totals: Totals,
    pub coupon: Option<CouponUuid>,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct PgOrdersRepository;

impl PgOrdersRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    pub(crate) async fn create_order(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        order: NewOrderRow,
    ) -> Result<OrderRecord, sqlx::Error> {
        query_as::<Postgres, OrderRecord>(CREATE_ORDER_SQL)
            .bind(order.uuid.into_uuid())
            .bind(order.order_number)
            .bind(order.customer.into_uuid())
            .bind(Json(order.billing_address))
            .bind(Json(order.shipping_address))
            .bind(amount_to_db(order.totals.subtotal, "subtotal")?)
            .bind(amount_to_db(order.totals.tax_amount, "tax_amount")?)
            .bind(amount_to_db(order.totals.shipping_cost, "shipping_cost")?)
            .bind(amount_to_db(order.totals.discount_amount, "discount_amount")?)
            .bind(amount_to_db(order.totals.total_amount, "total_amount")?)
            .bind(order.coupon.map(CouponUuid::into_uuid))
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn get_order_by_number(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        customer: CustomerUuid,
        order_number: &str,
    ) -> Result<Option<OrderRecord>, sqlx::Error> {
        query_as::<Postgres, OrderRecord>(GET_ORDER_BY_NUMBER_SQL)
            .bind(order_number)
            .bind(customer.into_uuid())
            .fetch_optional(&mut **tx)
            .await
    }
}

impl<'r> FromRow<'r, PgRow> for OrderRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        let status: String = row.try_get("status")?;
        let payment_status: String = row.try_get("payment_status")?;

        let billing_address: Json<AddressSnapshot> = row.try_get("billing_address")?;
        let shipping_address: Json<AddressSnapshot> = row.try_get("shipping_address")?;

        let totals = Totals {
            subtotal: try_get_amount(row, "subtotal")?,
            tax_amount: try_get_amount(row, "tax_amount")?,
            shipping_cost: try_get_amount(row, "shipping_cost")?,
            discount_amount: try_get_amount(row, "discount_amount")?,
            total_amount: try_get_amount(row, "total_amount")?,
        };

        Ok(Self {
            uuid: OrderUuid::from_uuid(row.try_get("uuid")?),
            order_number: row.try_get("order_number")?,
            customer_uuid: CustomerUuid::from_uuid(row.try_get("customer_uuid")?),
            status: OrderStatus::from_db(&status)?,
            payment_status: PaymentStatus::from_db(&payment_status)?,
            billing_address: billing_address.0,
            shipping_address: shipping_address.0,
            totals,
            coupon_uuid: row
                .try_get::<Option<Uuid>, _>("coupon_uuid")?
                .map(CouponUuid::from_uuid),
            tracking_number: row.try_get("tracking_number")?,
            shipped_at: row
                .try_get::<Option<SqlxTimestamp>, _>("shipped_at")?
                .map(SqlxTimestamp::to_jiff),
            delivered_at: row
                .try_get::<Option<SqlxTimestamp>, _>("delivered_at")?
                .map(SqlxTimestamp::to_jiff),
            items: Vec::new(),
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
            updated_at: row.try_get::<SqlxTimestamp, _>("updated_at")?.to_jiff(),
        })
    }
}
