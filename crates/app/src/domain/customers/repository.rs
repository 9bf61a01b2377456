//! Customers Repository

use jiff_sqlx::Timestamp as SqlxTimestamp;
use sqlx::{FromRow, Postgres, Row, Transaction, postgres::PgRow, query_as};

use super::{
    data::{NewAddress, NewCustomer},
    records::{AddressKind, AddressRecord, AddressUuid, CustomerRecord, CustomerUuid},
};

const CREATE_CUSTOMER_SQL: &str = include_str!("sql/create_customer.sql");
const CREATE_ADDRESS_SQL: &str = include_str!("sql/create_address.sql");
const LIST_ADDRESSES_SQL: &str = include_str!("sql/list_addresses.sql");
const GET_ADDRESS_SQL: &str = include_str!("sql/get_address.sql");

#[derive(Debug, Clone, Default)]
pub(crate) struct PgCustomersRepository;

impl PgCustomersRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    pub(crate) async fn create_customer(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        customer: NewCustomer,
    ) -> Result<CustomerRecord, sqlx::Error> {
        query_as::<Postgres, CustomerRecord>(CREATE_CUSTOMER_SQL)
            .bind(customer.uuid.into_uuid())
            .bind(customer.email)
            .bind(customer.first_name)
            .bind(customer.last_name)
            .bind(customer.phone)
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn create_address(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        customer: CustomerUuid,
        address: NewAddress,
    ) -> Result<AddressRecord, sqlx::Error> {
        query_as::<Postgres, AddressRecord>(CREATE_ADDRESS_SQL)
            .bind(address.uuid.into_uuid())
            .bind(customer.into_uuid())
            .bind(address.kind.as_str())
            .bind(address.first_name)
            .bind(address.last_name)
            .bind(address.company)
            .bind(address.address_line_1)
            .bind(address.address_line_2)
            .bind(address.city)
            .bind(address.state)
            .bind(address.postal_code)
            .bind(address.country)
            .bind(address.phone)
            .bind(address.is_default)
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn list_addresses(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        customer: CustomerUuid,
    ) -> Result<Vec<AddressRecord>, sqlx::Error> {
        query_as::<Postgres, AddressRecord>(LIST_ADDRESSES_SQL)
            .bind(customer.into_uuid())
            .fetch_all(&mut **tx)
            .await
    }

    pub(crate) async fn get_address(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        customer: CustomerUuid,
        address: AddressUuid,
    ) -> Result<Option<AddressRecord>, sqlx::Error> {
        query_as::<Postgres, AddressRecord>(GET_ADDRESS_SQL)
            .bind(address.into_uuid())
            .bind(customer.into_uuid())
            .fetch_optional(&mut **tx)
            .await
    }
}

impl<'r> FromRow<'r, PgRow> for CustomerRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            uuid: CustomerUuid::from_uuid(row.try_get("uuid")?),
            email: row.try_get("email")?,
            first_name: row.try_get("first_name")?,
            last_name: row.try_get("last_name")?,
            phone: row.try_get("phone")?,
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
            updated_at: row.try_get::<SqlxTimestamp, _>("updated_at")?.to_jiff(),
        })
    }
}

impl<'r> FromRow<'r, PgRow> for AddressRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        let kind: String = row.try_get("kind")?;

        Ok(Self {
            uuid: AddressUuid::from_uuid(row.try_get("uuid")?),
            customer_uuid: CustomerUuid::from_uuid(row.try_get("customer_uuid")?),
            kind: AddressKind::from_db(&kind)?,
            first_name: row.try_get("first_name")?,
            last_name: row.try_get("last_name")?,
            company: row.try_get("company")?,
            address_line_1: row.try_get("address_line_1")?,
            address_line_2: row.try_get("address_line_2")?,
            city: row.try_get("city")?,
            state: row.try_get("state")?,
            postal_code: row.try_get("postal_code")?,
            country: row.try_get("country")?,
            phone: row.try_get("phone")?,
            is_default: row.try_get("is_default")?,
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
        })
    }
}
