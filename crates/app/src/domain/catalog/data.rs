//! Catalog Data

use super::records::{ProductUuid, VariantUuid};

/// New Product Data
#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    pub uuid: ProductUuid,
    pub name: String,
    pub sku: String,
    pub base_price: u64,
    pub discount_price: Option<u64>,
}

/// New Variant Data
#[derive(Debug, Clone, PartialEq)]
pub struct NewVariant {
    pub uuid: VariantUuid,
    pub product_uuid: ProductUuid,
    pub color: String,
    pub size: String,
    pub sku: String,
    pub stock_quantity: u32,
    pub price_adjustment: i64,
}
