//! Customer Records

use jiff::Timestamp;

use crate::uuids::TypedUuid;

/// Customer UUID
pub type CustomerUuid = TypedUuid<CustomerRecord>;

/// Customer Record
#[derive(Debug, Clone)]
pub struct CustomerRecord {
    pub uuid: CustomerUuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Address UUID
pub type AddressUuid = TypedUuid<AddressRecord>;

/// Whether an address is used for billing or shipping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressKind {
    Billing,
    Shipping,
}

impl AddressKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Billing => "billing",
            Self::Shipping => "shipping",
        }
    }

    pub(crate) fn from_db(value: &str) -> Result<Self, sqlx::Error> {
        match value {
            "billing" => Ok(Self::Billing),
            "shipping" => Ok(Self::Shipping),
            other => Err(sqlx::Error::ColumnDecode {
                index: "kind".to_string(),
                source: format!("unknown address kind {other:?}").into(),
            }),
        }
    }
}

/// Address Record
#[derive(Debug, Clone)]
pub struct AddressRecord {
    pub uuid: AddressUuid,
    pub customer_uuid: CustomerUuid,
    pub kind: AddressKind,
    pub first_name: String,
    pub last_name: String,
    pub company: String,
    pub address_line_1: String,
    pub address_line_2: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
    pub phone: String,
    pub is_default: bool,
    pub created_at: Timestamp,
}
