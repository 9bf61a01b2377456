//! Carts Repository

use jiff_sqlx::Timestamp as SqlxTimestamp;
use sqlx::{FromRow, Postgres, Row, Transaction, postgres::PgRow, query_as, query_scalar};
use uuid::Uuid;

use crate::domain::{
    carts::records::{CartRecord, CartUuid},
    customers::records::CustomerUuid,
    decode::try_get_amount,
};

const GET_OR_CREATE_CART_SQL: &str = include_str!("../sql/get_or_create_cart.sql");
const GET_CART_SQL: &str = include_str!("../sql/get_cart.sql");
const LOCK_CART_SQL: &str = include_str!("../sql/lock_cart.sql");

#[derive(Debug, Clone, Default)]
pub(crate) struct PgCartsRepository;

impl PgCartsRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    /// Fetch the customer's cart row, creating it on first use.
    ///
    /// The conflict update takes a row lock either way, which serialises
    /// mutations of the same cart for the rest of the transaction.
    pub(crate) async fn get_or_create_cart(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        customer: CustomerUuid,
    ) -> Result<CartUuid, sqlx::Error> {
        let uuid: Uuid = query_scalar(GET_OR_CREATE_CART_SQL)
            .bind(CartUuid::new().into_uuid())
            .bind(customer.into_uuid())
            .fetch_one(&mut **tx)
            .await?;

        Ok(CartUuid::from_uuid(uuid))
    }

    pub(crate) async fn get_cart(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        customer: CustomerUuid,
    ) -> Result<Option<CartRecord>, sqlx::Error> {
        query_as::<Postgres, CartRecord>(GET_CART_SQL)
            .bind(customer.into_uuid())
            .fetch_optional(&mut **tx)
            .await
    }

    /// Lock the customer's cart row for the duration of the transaction.
    pub(crate) async fn lock_cart(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        customer: CustomerUuid,
    ) -> Result<Option<CartUuid>, sqlx::Error> {
        let uuid: Option<Uuid> = query_scalar(LOCK_CART_SQL)
            .bind(customer.into_uuid())
            .fetch_optional(&mut **tx)
            .await?;

        Ok(uuid.map(CartUuid::from_uuid))
    }
}

impl<'r> FromRow<'r, PgRow> for CartRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        let total_items_i64: i64 = row.try_get("total_items")?;

        let total_items = u32::try_from(total_items_i64).map_err(|e| sqlx::Error::ColumnDecode {
            index: "total_items".to_string(),
            source: Box::new(e),
        })?;

        Ok(Self {
            uuid: CartUuid::from_uuid(row.try_get("uuid")?),
            customer_uuid: CustomerUuid::from_uuid(row.try_get("customer_uuid")?),
            total_items,
            subtotal: try_get_amount(row, "subtotal")?,
            lines: Vec::new(),
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
            updated_at: row.try_get::<SqlxTimestamp, _>("updated_at")?.to_jiff(),
        })
    }
}
