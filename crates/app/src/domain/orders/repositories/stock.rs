//! Stock verification for the commit pipeline.

use sqlx::{FromRow, Postgres, Row, Transaction, postgres::PgRow, query, query_as};

use crate::domain::{
    catalog::records::VariantUuid,
    decode::{quantity_to_db, try_get_amount, try_get_quantity},
};

const LOCK_CART_LINES_SQL: &str = include_str!("../sql/lock_cart_lines.sql");
const DECREMENT_STOCK_SQL: &str = include_str!("../sql/decrement_stock.sql");

/// One cart line as seen under lock at commit time, joined with everything
/// the order item snapshot needs.
#[derive(Debug, Clone)]
pub(crate) struct CommitLine {
    pub variant_uuid: VariantUuid,
    pub product_name: String,
    pub product_sku: String,
    pub color: String,
    pub size: String,
    pub quantity: u32,
    pub unit_price: u64,
    pub stock_quantity: u32,
}

impl CommitLine {
    pub(crate) fn line_total(&self) -> u64 {
        self.unit_price * u64::from(self.quantity)
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct PgStockRepository;

impl PgStockRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    /// Load a cart's lines and lock the backing variant rows until the
    /// transaction ends.
    ///
    /// Rows are locked in `uuid` order; every commit takes the same order,
    /// which keeps concurrent commits from deadlocking on overlapping carts.
    pub(crate) async fn lock_cart_lines(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        cart: crate::domain::carts::records::CartUuid,
    ) -> Result<Vec<CommitLine>, sqlx::Error> {
        query_as::<Postgres, CommitLine>(LOCK_CART_LINES_SQL)
            .bind(cart.into_uuid())
            .fetch_all(&mut **tx)
            .await
    }

    /// Take committed quantity out of stock, guarded so the level can never
    /// go below zero.
    pub(crate) async fn decrement(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        variant: VariantUuid,
        quantity: u32,
    ) -> Result<u64, sqlx::Error> {
        let rows_affected = query(DECREMENT_STOCK_SQL)
            .bind(variant.into_uuid())
            .bind(quantity_to_db(quantity, "stock_quantity")?)
            .execute(&mut **tx)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }
}

impl<'r> FromRow<'r, PgRow> for CommitLine {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            variant_uuid: VariantUuid::from_uuid(row.try_get("variant_uuid")?),
            product_name: row.try_get("product_name")?,
            product_sku: row.try_get("product_sku")?,
            color: row.try_get("color")?,
            size: row.try_get("size")?,
            quantity: try_get_quantity(row, "quantity")?,
            unit_price: try_get_amount(row, "unit_price")?,
            stock_quantity: try_get_quantity(row, "stock_quantity")?,
        })
    }
}
