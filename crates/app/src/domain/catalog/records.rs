//! Catalog Records

use jiff::Timestamp;

use crate::uuids::TypedUuid;

/// Product UUID
pub type ProductUuid = TypedUuid<ProductRecord>;

/// Product Record
#[derive(Debug, Clone)]
pub struct ProductRecord {
    pub uuid: ProductUuid,
    pub name: String,
    pub sku: String,
    pub base_price: u64,
    pub discount_price: Option<u64>,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl ProductRecord {
    /// The price customers currently pay, before variant adjustments.
    #[must_use]
    pub fn current_price(&self) -> u64 {
        self.discount_price.unwrap_or(self.base_price)
    }
}

/// Variant UUID
pub type VariantUuid = TypedUuid<VariantRecord>;

/// Variant Record
#[derive(Debug, Clone)]
pub struct VariantRecord {
    pub uuid: VariantUuid,
    pub product_uuid: ProductUuid,
    pub color: String,
    pub size: String,
    pub sku: String,
    pub stock_quantity: u32,
    pub price_adjustment: i64,
    pub is_active: bool,
    pub created_at: Timestamp,
}

/// A variant joined with the product fields checkout and cart flows need.
///
/// `final_price` is the product's current price plus the variant adjustment,
/// computed at read time.
#[derive(Debug, Clone)]
pub struct VariantDetail {
    pub uuid: VariantUuid,
    pub product_uuid: ProductUuid,
    pub product_name: String,
    pub sku: String,
    pub color: String,
    pub size: String,
    pub final_price: u64,
    pub stock_quantity: u32,
    pub is_active: bool,
}
