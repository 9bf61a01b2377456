//! Customer Data

use super::records::{AddressKind, AddressUuid, CustomerUuid};

/// New Customer Data
#[derive(Debug, Clone, PartialEq)]
pub struct NewCustomer {
    pub uuid: CustomerUuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
}

/// New Address Data
#[derive(Debug, Clone, PartialEq)]
pub struct NewAddress {
    pub uuid: AddressUuid,
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
}
