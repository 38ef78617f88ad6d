//! User Data

use crate::domain::users::records::{AddressUuid, UserUuid};

/// New User Data
#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    pub uuid: UserUuid,
    pub username: String,
}

/// New Address Data
#[derive(Debug, Clone, PartialEq)]
pub struct NewAddress {
    pub uuid: AddressUuid,
    pub line1: String,
    pub city: String,
    pub postcode: String,
    pub country: String,

    /// Make this the user's default address, replacing any previous default.
    pub is_default: bool,
}
