//! User Records

use jiff::Timestamp;

use crate::uuids::TypedUuid;

/// User UUID
pub type UserUuid = TypedUuid<UserRecord>;

/// User Record
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub uuid: UserUuid,
    pub username: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Address UUID
pub type AddressUuid = TypedUuid<AddressRecord>;

/// Address Record
#[derive(Debug, Clone)]
pub struct AddressRecord {
    pub uuid: AddressUuid,
    pub user_uuid: UserUuid,
    pub line1: String,
    pub city: String,
    pub postcode: String,
    pub country: String,
    pub is_default: bool,
    pub created_at: Timestamp,
}
