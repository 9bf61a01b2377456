//! Carts service.

use async_trait::async_trait;
use mockall::automock;

use crate::{
    database::Db,
    domain::{
        carts::{
            errors::CartsServiceError,
            records::{CartLineRecord, CartLineUuid, CartRecord},
            repositories::{PgCartLinesRepository, PgCartsRepository},
        },
        catalog::{records::VariantUuid, repository::PgCatalogRepository},
        customers::records::CustomerUuid,
    },
};

#[derive(Debug, Clone)]
pub struct PgCartsService {
    db: Db,
    carts: PgCartsRepository,
    lines: PgCartLinesRepository,
    catalog: PgCatalogRepository,
}

impl PgCartsService {
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self {
            db,
            carts: PgCartsRepository::new(),
            lines: PgCartLinesRepository::new(),
            catalog: PgCatalogRepository::new(),
        }
    }
}

#[async_trait]
impl CartsService for PgCartsService {
    async fn get_cart(&self, customer: CustomerUuid) -> Result<CartRecord, CartsServiceError> {
        let mut tx = self.db.begin().await?;

        let mut cart = self
            .carts
            .get_cart(&mut tx, customer)
            .await?
            .ok_or(CartsServiceError::NotFound)?;

        let lines = self.lines.get_cart_lines(&mut tx, cart.uuid).await?;

        tx.commit().await?;

        cart.lines = lines;

        Ok(cart)
    }

    async fn add_line(
        &self,
        customer: CustomerUuid,
        variant: VariantUuid,
        quantity: u32,
    ) -> Result<CartLineRecord, CartsServiceError> {
        if quantity == 0 {
            return Err(CartsServiceError::InvalidData);
        }

        let mut tx = self.db.begin().await?;

        let detail = self
            .catalog
            .get_variant_detail(&mut tx, variant)
            .await?
            .filter(|detail| detail.is_active)
            .ok_or(CartsServiceError::VariantUnavailable)?;

        if quantity > detail.stock_quantity {
            return Err(CartsServiceError::OutOfStock {
                variant,
                requested: quantity,
                available: detail.stock_quantity,
            });
        }

        let cart = self.carts.get_or_create_cart(&mut tx, customer).await?;

        let line = match self.lines.find_line_by_variant(&mut tx, cart, variant).await? {
            Some((line, existing)) => {
                let merged = existing + quantity;

                if merged > detail.stock_quantity {
                    return Err(CartsServiceError::ExceedsStock {
                        variant,
                        requested: merged,
                        available: detail.stock_quantity,
                    });
                }

                self.lines
                    .merge_line_quantity(&mut tx, line, quantity)
                    .await?;

                line
            }
            None => {
                let line = CartLineUuid::new();

                self.lines
                    .create_line(&mut tx, line, cart, variant, quantity)
                    .await?;

                line
            }
        };

        let record = self.lines.get_line_detail(&mut tx, line).await?;

        tx.commit().await?;

        Ok(record)
    }

    async fn set_line_quantity(
        &self,
        customer: CustomerUuid,
        line: CartLineUuid,
        quantity: u32,
    ) -> Result<(), CartsServiceError> {
        let mut tx = self.db.begin().await?;

        let Some(cart) = self.carts.lock_cart(&mut tx, customer).await? else {
            // A zero quantity asks for removal, which is a no-op success on a
            // missing cart.
            if quantity == 0 {
                return Ok(());
            }

            return Err(CartsServiceError::NotFound);
        };

        let found = self.lines.find_line(&mut tx, cart, line).await?;

        if quantity == 0 {
            if found.is_some() {
                self.lines.delete_line(&mut tx, cart, line).await?;
                tx.commit().await?;
            }

            return Ok(());
        }

        let Some((variant, _)) = found else {
            return Err(CartsServiceError::NotFound);
        };

        let detail = self
            .catalog
            .get_variant_detail(&mut tx, variant)
            .await?
            .ok_or(CartsServiceError::VariantUnavailable)?;

        if quantity > detail.stock_quantity {
            return Err(CartsServiceError::OutOfStock {
                variant,
                requested: quantity,
                available: detail.stock_quantity,
            });
        }

        self.lines.set_line_quantity(&mut tx, line, quantity).await?;

        tx.commit().await?;

        Ok(())
    }

    async fn remove_line(
        &self,
        customer: CustomerUuid,
        line: CartLineUuid,
    ) -> Result<(), CartsServiceError> {
        let mut tx = self.db.begin().await?;

        let Some(cart) = self.carts.lock_cart(&mut tx, customer).await? else {
            return Ok(());
        };

        // Removal succeeds whether or not the line still exists.
        self.lines.delete_line(&mut tx, cart, line).await?;

        tx.commit().await?;

        Ok(())
    }
}

#[automock]
#[async_trait]
pub trait CartsService: Send + Sync {
    /// Retrieve the customer's cart with its lines and computed totals.
    async fn get_cart(&self, customer: CustomerUuid) -> Result<CartRecord, CartsServiceError>;

    /// Add a variant to the customer's cart, merging with an existing line
    /// for the same variant.
    ///
    /// The customer's cart is created on first use.
    async fn add_line(
        &self,
        customer: CustomerUuid,
        variant: VariantUuid,
        quantity: u32,
    ) -> Result<CartLineRecord, CartsServiceError>;

    /// Change a line's quantity. Zero removes the line and succeeds even if
    /// it is already gone.
    async fn set_line_quantity(
        &self,
        customer: CustomerUuid,
        line: CartLineUuid,
        quantity: u32,
    ) -> Result<(), CartsServiceError>;

    /// Remove a line unconditionally; removing an absent line is a success.
    async fn remove_line(
        &self,
        customer: CustomerUuid,
        line: CartLineUuid,
    ) -> Result<(), CartsServiceError>;
}
