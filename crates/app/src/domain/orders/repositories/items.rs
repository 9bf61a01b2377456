//! Order Items Repository

use jiff_sqlx::Timestamp as SqlxTimestamp;
use sqlx::{FromRow, Postgres, Row, Transaction, postgres::PgRow, query_as};

use crate::domain::{
    catalog::records::VariantUuid,
    decode::{amount_to_db, quantity_to_db, try_get_amount, try_get_quantity},
    orders::records::{OrderItemRecord, OrderItemUuid, OrderUuid},
};

use super::stock::CommitLine;

const CREATE_ORDER_ITEM_SQL: &str = include_str!("../sql/create_order_item.sql");
const GET_ORDER_ITEMS_SQL: &str = include_str!("../sql/get_order_items.sql");

#[derive(Debug, Clone, Default)]
pub(crate) struct PgOrderItemsRepository;

impl PgOrderItemsRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    /// Snapshot one locked cart line onto an order.
    pub(crate) async fn create_item(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        order: OrderUuid,
        line: &CommitLine,
    ) -> Result<OrderItemRecord, sqlx::Error> {
        query_as::<Postgres, OrderItemRecord>(CREATE_ORDER_ITEM_SQL)
            .bind(OrderItemUuid::new().into_uuid())
            .bind(order.into_uuid())
            .bind(line.variant_uuid.into_uuid())
            .bind(&line.product_name)
            .bind(&line.product_sku)
            .bind(&line.color)
            .bind(&line.size)
            .bind(quantity_to_db(line.quantity, "quantity")?)
            .bind(amount_to_db(line.unit_price, "unit_price")?)
            .bind(amount_to_db(line.line_total(), "total_price")?)
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn get_order_items(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        order: OrderUuid,
    ) -> Result<Vec<OrderItemRecord>, sqlx::Error> {
        query_as::<Postgres, OrderItemRecord>(GET_ORDER_ITEMS_SQL)
            .bind(order.into_uuid())
            .fetch_all(&mut **tx)
            .await
    }
}

impl<'r> FromRow<'r, PgRow> for OrderItemRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            uuid: OrderItemUuid::from_uuid(row.try_get("uuid")?),
            order_uuid: OrderUuid::from_uuid(row.try_get("order_uuid")?),
            variant_uuid: VariantUuid::from_uuid(row.try_get("variant_uuid")?),
            product_name: row.try_get("product_name")?,
            product_sku: row.try_get("product_sku")?,
            color_name: row.try_get("color_name")?,
            size_name: row.try_get("size_name")?,
            quantity: try_get_quantity(row, "quantity")?,
            unit_price: try_get_amount(row, "unit_price")?,
            total_price: try_get_amount(row, "total_price")?,
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
        })
    }
}
