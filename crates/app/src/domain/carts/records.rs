//! Cart Records

use jiff::Timestamp;

use crate::{
    domain::catalog::records::VariantUuid, domain::customers::records::CustomerUuid,
    uuids::TypedUuid,
};

/// Cart UUID
pub type CartUuid = TypedUuid<CartRecord>;

/// Cart Record
///
/// `total_items` and `subtotal` are aggregates over the current lines,
/// recomputed on every read.
#[derive(Debug, Clone)]
pub struct CartRecord {
    pub uuid: CartUuid,
    pub customer_uuid: CustomerUuid,
    pub total_items: u32,
    pub subtotal: u64,
    pub lines: Vec<CartLineRecord>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Cart Line UUID
pub type CartLineUuid = TypedUuid<CartLineRecord>;

/// Cart Line Record
///
/// `unit_price` and `line_total` are derived from the variant's current
/// price at read time, never stored.
#[derive(Debug, Clone)]
pub struct CartLineRecord {
    pub uuid: CartLineUuid,
    pub cart_uuid: CartUuid,
    pub variant_uuid: VariantUuid,
    pub product_name: String,
    pub sku: String,
    pub color: String,
    pub size: String,
    pub quantity: u32,
    pub unit_price: u64,
    pub line_total: u64,
    pub added_at: Timestamp,
    pub updated_at: Timestamp,
}
