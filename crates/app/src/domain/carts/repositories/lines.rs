//! Cart Lines Repository

use jiff_sqlx::Timestamp as SqlxTimestamp;
use sqlx::{FromRow, Postgres, Row, Transaction, postgres::PgRow, query, query_as};
use uuid::Uuid;

use crate::domain::{
    carts::records::{CartLineRecord, CartLineUuid, CartUuid},
    catalog::records::VariantUuid,
    decode::{quantity_to_db, try_get_amount, try_get_quantity},
};

const GET_CART_LINES_SQL: &str = include_str!("../sql/get_cart_lines.sql");
const GET_LINE_DETAIL_SQL: &str = include_str!("../sql/get_line_detail.sql");
const FIND_LINE_BY_VARIANT_SQL: &str = include_str!("../sql/find_line_by_variant.sql");
const FIND_LINE_SQL: &str = include_str!("../sql/find_line.sql");
const CREATE_CART_LINE_SQL: &str = include_str!("../sql/create_cart_line.sql");
const MERGE_LINE_QUANTITY_SQL: &str = include_str!("../sql/merge_line_quantity.sql");
const SET_LINE_QUANTITY_SQL: &str = include_str!("../sql/set_line_quantity.sql");
const DELETE_CART_LINE_SQL: &str = include_str!("../sql/delete_cart_line.sql");
const CLEAR_CART_LINES_SQL: &str = include_str!("../sql/clear_cart_lines.sql");

#[derive(Debug, Clone, Default)]
pub(crate) struct PgCartLinesRepository;

impl PgCartLinesRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    pub(crate) async fn get_cart_lines(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        cart: CartUuid,
    ) -> Result<Vec<CartLineRecord>, sqlx::Error> {
        query_as::<Postgres, CartLineRecord>(GET_CART_LINES_SQL)
            .bind(cart.into_uuid())
            .fetch_all(&mut **tx)
            .await
    }

    pub(crate) async fn get_line_detail(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        line: CartLineUuid,
    ) -> Result<CartLineRecord, sqlx::Error> {
        query_as::<Postgres, CartLineRecord>(GET_LINE_DETAIL_SQL)
            .bind(line.into_uuid())
            .fetch_one(&mut **tx)
            .await
    }

    /// The line holding the given variant, if the cart already has one.
    pub(crate) async fn find_line_by_variant(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        cart: CartUuid,
        variant: VariantUuid,
    ) -> Result<Option<(CartLineUuid, u32)>, sqlx::Error> {
        let row: Option<(Uuid, i32)> = query_as(FIND_LINE_BY_VARIANT_SQL)
            .bind(cart.into_uuid())
            .bind(variant.into_uuid())
            .fetch_optional(&mut **tx)
            .await?;

        row.map(|(uuid, quantity)| {
            let quantity = u32::try_from(quantity).map_err(|e| sqlx::Error::ColumnDecode {
                index: "quantity".to_string(),
                source: Box::new(e),
            })?;

            Ok((CartLineUuid::from_uuid(uuid), quantity))
        })
        .transpose()
    }

    /// The variant and quantity of a line, scoped to its cart.
    pub(crate) async fn find_line(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        cart: CartUuid,
        line: CartLineUuid,
    ) -> Result<Option<(VariantUuid, u32)>, sqlx::Error> {
        let row: Option<(Uuid, i32)> = query_as(FIND_LINE_SQL)
            .bind(line.into_uuid())
            .bind(cart.into_uuid())
            .fetch_optional(&mut **tx)
            .await?;

        row.map(|(uuid, quantity)| {
            let quantity = u32::try_from(quantity).map_err(|e| sqlx::Error::ColumnDecode {
                index: "quantity".to_string(),
                source: Box::new(e),
            })?;

            Ok((VariantUuid::from_uuid(uuid), quantity))
        })
        .transpose()
    }

    pub(crate) async fn create_line(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        line: CartLineUuid,
        cart: CartUuid,
        variant: VariantUuid,
        quantity: u32,
    ) -> Result<(), sqlx::Error> {
        query(CREATE_CART_LINE_SQL)
            .bind(line.into_uuid())
            .bind(cart.into_uuid())
            .bind(variant.into_uuid())
            .bind(quantity_to_db(quantity, "quantity")?)
            .execute(&mut **tx)
            .await?;

        Ok(())
    }

    pub(crate) async fn merge_line_quantity(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        line: CartLineUuid,
        additional: u32,
    ) -> Result<(), sqlx::Error> {
        query(MERGE_LINE_QUANTITY_SQL)
            .bind(line.into_uuid())
            .bind(quantity_to_db(additional, "quantity")?)
            .execute(&mut **tx)
            .await?;

        Ok(())
    }

    pub(crate) async fn set_line_quantity(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        line: CartLineUuid,
        quantity: u32,
    ) -> Result<(), sqlx::Error> {
        query(SET_LINE_QUANTITY_SQL)
            .bind(line.into_uuid())
            .bind(quantity_to_db(quantity, "quantity")?)
            .execute(&mut **tx)
            .await?;

        Ok(())
    }

    pub(crate) async fn delete_line(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        cart: CartUuid,
        line: CartLineUuid,
    ) -> Result<u64, sqlx::Error> {
        let rows_affected = query(DELETE_CART_LINE_SQL)
            .bind(line.into_uuid())
            .bind(cart.into_uuid())
            .execute(&mut **tx)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }

    pub(crate) async fn clear_lines(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        cart: CartUuid,
    ) -> Result<u64, sqlx::Error> {
        let rows_affected = query(CLEAR_CART_LINES_SQL)
            .bind(cart.into_uuid())
            .execute(&mut **tx)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }
}

impl<'r> FromRow<'r, PgRow> for CartLineRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            uuid: CartLineUuid::from_uuid(row.try_get("uuid")?),
            cart_uuid: CartUuid::from_uuid(row.try_get("cart_uuid")?),
            variant_uuid: VariantUuid::from_uuid(row.try_get("variant_uuid")?),
            product_name: row.try_get("product_name")?,
            sku: row.try_get("sku")?,
            color: row.try_get("color")?,
            size: row.try_get("size")?,
            quantity: try_get_quantity(row, "quantity")?,
            unit_price: try_get_amount(row, "unit_price")?,
            line_total: try_get_amount(row, "line_total")?,
            added_at: row.try_get::<SqlxTimestamp, _>("added_at")?.to_jiff(),
            updated_at: row.try_get::<SqlxTimestamp, _>("updated_at")?.to_jiff(),
        })
    }
}
