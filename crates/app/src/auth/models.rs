//! Auth data models.

use jiff::Timestamp;

use crate::{domain::users::records::UserUuid, uuids::TypedUuid};

/// API token UUID
pub type ApiTokenUuid = TypedUuid<ApiTokenMetadata>;

/// API token data used during bearer authentication.
#[derive(Debug, Clone)]
pub(crate) struct ActiveApiToken {
    pub uuid: ApiTokenUuid,

    /// User the token authenticates as.
    pub user_uuid: UserUuid,
}

/// API token metadata persisted in storage.
#[derive(Debug, Clone)]
pub struct ApiTokenMetadata {
    pub uuid: ApiTokenUuid,
    pub user_uuid: UserUuid,
    pub created_at: Timestamp,
    pub last_used_at: Option<Timestamp>,
    pub revoked_at: Option<Timestamp>,
}

/// API token issuance result with one-time raw token.
#[derive(Debug, Clone)]
pub struct IssuedApiToken {
    pub token: String,
    pub metadata: ApiTokenMetadata,
}
