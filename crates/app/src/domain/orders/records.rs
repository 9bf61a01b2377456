//! Order Records

use atelier::Totals;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use crate::{
    domain::{
        catalog::records::VariantUuid,
        coupons::records::CouponUuid,
        customers::records::{AddressRecord, CustomerUuid},
    },
    uuids::TypedUuid,
};

/// Order UUID
pub type OrderUuid = TypedUuid<OrderRecord>;

/// Fulfilment status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    Refunded,
}

impl OrderStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
            Self::Refunded => "refunded",
        }
    }

    pub(crate) fn from_db(value: &str) -> Result<Self, sqlx::Error> {
        match value {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "processing" => Ok(Self::Processing),
            "shipped" => Ok(Self::Shipped),
            "delivered" => Ok(Self::Delivered),
            "cancelled" => Ok(Self::Cancelled),
            "refunded" => Ok(Self::Refunded),
            other => Err(sqlx::Error::ColumnDecode {
                index: "status".to_string(),
                source: format!("unknown order status {other:?}").into(),
            }),
        }
    }
}

/// Payment status of an order. No gateway is wired up; the field tracks
/// whatever the back office records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
    Refunded,
}

impl PaymentStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Failed => "failed",
            Self::Refunded => "refunded",
        }
    }

    pub(crate) fn from_db(value: &str) -> Result<Self, sqlx::Error> {
        match value {
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            "failed" => Ok(Self::Failed),
            "refunded" => Ok(Self::Refunded),
            other => Err(sqlx::Error::ColumnDecode {
                index: "payment_status".to_string(),
                source: format!("unknown payment status {other:?}").into(),
            }),
        }
    }
}

/// Value copy of an address taken when an order commits.
///
/// Stored on the order itself so later edits to the live address never
/// rewrite history. Carries exactly the fields order documents render;
/// phone and company stay on the live address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressSnapshot {
    pub first_name: String,
    pub last_name: String,
    pub address_line_1: String,
    pub address_line_2: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
}

impl From<&AddressRecord> for AddressSnapshot {
    fn from(address: &AddressRecord) -> Self {
        Self {
            first_name: address.first_name.clone(),
            last_name: address.last_name.clone(),
            address_line_1: address.address_line_1.clone(),
            address_line_2: address.address_line_2.clone(),
            city: address.city.clone(),
            state: address.state.clone(),
            postal_code: address.postal_code.clone(),
            country: address.country.clone(),
        }
    }
}

/// Order Record
///
/// Immutable after creation apart from status and tracking fields.
#[derive(Debug, Clone)]
pub struct OrderRecord {
    pub uuid: OrderUuid,
    pub order_number: String,
    pub customer_uuid: CustomerUuid,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub billing_address: AddressSnapshot,
    pub shipping_address: AddressSnapshot,
    pub totals: Totals,
    pub coupon_uuid: Option<CouponUuid>,
    pub tracking_number: String,
    pub shipped_at: Option<Timestamp>,
    pub delivered_at: Option<Timestamp>,
    pub items: Vec<OrderItemRecord>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Order Item UUID
pub type OrderItemUuid = TypedUuid<OrderItemRecord>;

/// Order Item Record
///
/// A value snapshot of one cart line at commit time. The variant reference
/// is informational; the descriptive fields are copies and survive catalog
/// edits.
#[derive(Debug, Clone)]
pub struct OrderItemRecord {
    pub uuid: OrderItemUuid,
    pub order_uuid: OrderUuid,
    pub variant_uuid: VariantUuid,
    pub product_name: String,
    pub product_sku: String,
    pub color_name: String,
    pub size_name: String,
    pub quantity: u32,
    pub unit_price: u64,
    pub total_price: u64,
    pub created_at: Timestamp,
}
