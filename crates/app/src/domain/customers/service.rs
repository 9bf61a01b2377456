//! Customers service.

use async_trait::async_trait;
use mockall::automock;

use crate::database::Db;

use super::{
    data::{NewAddress, NewCustomer},
    errors::CustomersServiceError,
    records::{AddressRecord, AddressUuid, CustomerRecord, CustomerUuid},
    repository::PgCustomersRepository,
};

#[derive(Debug, Clone)]
pub struct PgCustomersService {
    db: Db,
    repository: PgCustomersRepository,
}

impl PgCustomersService {
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self {
            db,
            repository: PgCustomersRepository::new(),
        }
    }
}

#[async_trait]
impl CustomersService for PgCustomersService {
    async fn create_customer(
        &self,
        customer: NewCustomer,
    ) -> Result<CustomerRecord, CustomersServiceError> {
        let mut tx = self.db.begin().await?;

        let created = self.repository.create_customer(&mut tx, customer).await?;

        tx.commit().await?;

        Ok(created)
    }

    async fn create_address(
        &self,
        customer: CustomerUuid,
        address: NewAddress,
    ) -> Result<AddressRecord, CustomersServiceError> {
        let mut tx = self.db.begin().await?;

        let created = self
            .repository
            .create_address(&mut tx, customer, address)
            .await?;

        tx.commit().await?;

        Ok(created)
    }

    async fn list_addresses(
        &self,
        customer: CustomerUuid,
    ) -> Result<Vec<AddressRecord>, CustomersServiceError> {
        let mut tx = self.db.begin().await?;

        let addresses = self.repository.list_addresses(&mut tx, customer).await?;

        tx.commit().await?;

        Ok(addresses)
    }

    async fn get_address(
        &self,
        customer: CustomerUuid,
        address: AddressUuid,
    ) -> Result<AddressRecord, CustomersServiceError> {
        let mut tx = self.db.begin().await?;

        let address = self
            .repository
            .get_address(&mut tx, customer, address)
            .await?
            .ok_or(CustomersServiceError::NotFound)?;

        tx.commit().await?;

        Ok(address)
    }
}

#[automock]
#[async_trait]
pub trait CustomersService: Send + Sync {
    /// Creates a new customer.
    async fn create_customer(
        &self,
        customer: NewCustomer,
    ) -> Result<CustomerRecord, CustomersServiceError>;

    /// Creates a new address owned by the given customer.
    async fn create_address(
        &self,
        customer: CustomerUuid,
        address: NewAddress,
    ) -> Result<AddressRecord, CustomersServiceError>;

    /// All addresses on file for the given customer.
    async fn list_addresses(
        &self,
        customer: CustomerUuid,
    ) -> Result<Vec<AddressRecord>, CustomersServiceError>;

    /// A single address, scoped to its owning customer.
    async fn get_address(
        &self,
        customer: CustomerUuid,
        address: AddressUuid,
    ) -> Result<AddressRecord, CustomersServiceError>;
}
