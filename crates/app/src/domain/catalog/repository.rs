//! Catalog Repository

use jiff_sqlx::Timestamp as SqlxTimestamp;
use sqlx::{FromRow, Postgres, Row, Transaction, postgres::PgRow, query, query_as};

use crate::domain::decode::{
    amount_to_db, optional_amount_to_db, quantity_to_db, try_get_amount, try_get_optional_amount,
    try_get_quantity,
};

use super::{
    data::{NewProduct, NewVariant},
    records::{ProductRecord, ProductUuid, VariantDetail, VariantRecord, VariantUuid},
};

const CREATE_PRODUCT_SQL: &str = include_str!("sql/create_product.sql");
const CREATE_VARIANT_SQL: &str = include_str!("sql/create_variant.sql");
const GET_VARIANT_DETAIL_SQL: &str = include_str!("sql/get_variant_detail.sql");
const RESTOCK_VARIANT_SQL: &str = include_str!("sql/restock_variant.sql");

#[derive(Debug, Clone, Default)]
pub(crate) struct PgCatalogRepository;

impl PgCatalogRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    pub(crate) async fn create_product(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        product: NewProduct,
    ) -> Result<ProductRecord, sqlx::Error> {
        query_as::<Postgres, ProductRecord>(CREATE_PRODUCT_SQL)
            .bind(product.uuid.into_uuid())
            .bind(product.name)
            .bind(product.sku)
            .bind(amount_to_db(product.base_price, "base_price")?)
            .bind(optional_amount_to_db(
                product.discount_price,
                "discount_price",
            )?)
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn create_variant(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        variant: NewVariant,
    ) -> Result<VariantRecord, sqlx::Error> {
        query_as::<Postgres, VariantRecord>(CREATE_VARIANT_SQL)
            .bind(variant.uuid.into_uuid())
            .bind(variant.product_uuid.into_uuid())
            .bind(variant.color)
            .bind(variant.size)
            .bind(variant.sku)
            .bind(quantity_to_db(variant.stock_quantity, "stock_quantity")?)
            .bind(variant.price_adjustment)
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn get_variant_detail(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        variant: VariantUuid,
    ) -> Result<Option<VariantDetail>, sqlx::Error> {
        query_as::<Postgres, VariantDetail>(GET_VARIANT_DETAIL_SQL)
            .bind(variant.into_uuid())
            .fetch_optional(&mut **tx)
            .await
    }

    pub(crate) async fn restock(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        variant: VariantUuid,
        quantity: u32,
    ) -> Result<u64, sqlx::Error> {
        let rows_affected = query(RESTOCK_VARIANT_SQL)
            .bind(variant.into_uuid())
            .bind(quantity_to_db(quantity, "stock_quantity")?)
            .execute(&mut **tx)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }
}

impl<'r> FromRow<'r, PgRow> for ProductRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            uuid: ProductUuid::from_uuid(row.try_get("uuid")?),
            name: row.try_get("name")?,
            sku: row.try_get("sku")?,
            base_price: try_get_amount(row, "base_price")?,
            discount_price: try_get_optional_amount(row, "discount_price")?,
            is_active: row.try_get("is_active")?,
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
            updated_at: row.try_get::<SqlxTimestamp, _>("updated_at")?.to_jiff(),
        })
    }
}

impl<'r> FromRow<'r, PgRow> for VariantRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            uuid: VariantUuid::from_uuid(row.try_get("uuid")?),
            product_uuid: ProductUuid::from_uuid(row.try_get("product_uuid")?),
            color: row.try_get("color")?,
            size: row.try_get("size")?,
            sku: row.try_get("sku")?,
            stock_quantity: try_get_quantity(row, "stock_quantity")?,
            price_adjustment: row.try_get("price_adjustment")?,
            is_active: row.try_get("is_active")?,
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
        })
    }
}

impl<'r> FromRow<'r, PgRow> for VariantDetail {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            uuid: VariantUuid::from_uuid(row.try_get("uuid")?),
            product_uuid: ProductUuid::from_uuid(row.try_get("product_uuid")?),
            product_name: row.try_get("product_name")?,
            sku: row.try_get("sku")?,
            color: row.try_get("color")?,
            size: row.try_get("size")?,
            final_price: try_get_amount(row, "final_price")?,
            stock_quantity: try_get_quantity(row, "stock_quantity")?,
            is_active: row.try_get("is_active")?,
        })
    }
}
