//! Catalog service.

use async_trait::async_trait;
use mockall::automock;

use crate::database::Db;

use super::{
    data::{NewProduct, NewVariant},
    errors::CatalogServiceError,
    records::{ProductRecord, VariantDetail, VariantRecord, VariantUuid},
    repository::PgCatalogRepository,
};

#[derive(Debug, Clone)]
pub struct PgCatalogService {
    db: Db,
    repository: PgCatalogRepository,
}

impl PgCatalogService {
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self {
            db,
            repository: PgCatalogRepository::new(),
        }
    }
}

#[async_trait]
impl CatalogService for PgCatalogService {
    async fn create_product(
        &self,
        product: NewProduct,
    ) -> Result<ProductRecord, CatalogServiceError> {
        let mut tx = self.db.begin().await?;

        let created = self.repository.create_product(&mut tx, product).await?;

        tx.commit().await?;

        Ok(created)
    }

    async fn create_variant(
        &self,
        variant: NewVariant,
    ) -> Result<VariantRecord, CatalogServiceError> {
        let mut tx = self.db.begin().await?;

        let created = self.repository.create_variant(&mut tx, variant).await?;

        tx.commit().await?;

        Ok(created)
    }

    async fn get_variant(&self, variant: VariantUuid) -> Result<VariantDetail, CatalogServiceError> {
        let mut tx = self.db.begin().await?;

        let detail = self
            .repository
            .get_variant_detail(&mut tx, variant)
            .await?
            .ok_or(CatalogServiceError::NotFound)?;

        tx.commit().await?;

        Ok(detail)
    }

    async fn restock(
        &self,
        variant: VariantUuid,
        quantity: u32,
    ) -> Result<(), CatalogServiceError> {
        let mut tx = self.db.begin().await?;

        let rows_affected = self.repository.restock(&mut tx, variant, quantity).await?;

        if rows_affected == 0 {
            return Err(CatalogServiceError::NotFound);
        }

        tx.commit().await?;

        Ok(())
    }
}

#[automock]
#[async_trait]
pub trait CatalogService: Send + Sync {
    /// Creates a new product.
    async fn create_product(
        &self,
        product: NewProduct,
    ) -> Result<ProductRecord, CatalogServiceError>;

    /// Creates a new variant of an existing product.
    async fn create_variant(
        &self,
        variant: NewVariant,
    ) -> Result<VariantRecord, CatalogServiceError>;

    /// Retrieve a variant joined with its product pricing fields.
    async fn get_variant(&self, variant: VariantUuid) -> Result<VariantDetail, CatalogServiceError>;

    /// Add stock received from a supplier to a variant.
    async fn restock(&self, variant: VariantUuid, quantity: u32)
    -> Result<(), CatalogServiceError>;
}
