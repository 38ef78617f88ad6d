//! Depot helper extensions.

use std::any::Any;

use salvo::prelude::{Depot, StatusError};
use storefront_app::domain::users::records::UserUuid;

const USER_UUID_KEY: &str = "user_uuid";
const AUTH_REJECTION_KEY: &str = "auth_rejection";

/// Helpers for mapping depot extraction failures to HTTP errors.
pub(crate) trait DepotExt {
    fn obtain_or_500<T: Any + Send + Sync>(&self) -> Result<&T, StatusError>;

    fn insert_user_uuid(&mut self, user: UserUuid);

    /// The authenticated caller, if the request carried a valid token.
    fn user_uuid(&self) -> Option<UserUuid>;

    /// Record why the request's credentials were refused; the 401 is sent
    /// once the request has been counted by the rate limiter.
    fn insert_auth_rejection(&mut self, brief: &'static str);

    fn auth_rejection(&self) -> Option<&'static str>;

    fn user_uuid_or_401(&self) -> Result<UserUuid, StatusError>;
}

impl DepotExt for Depot {
    fn obtain_or_500<T: Any + Send + Sync>(&self) -> Result<&T, StatusError> {
        self.obtain::<T>()
            .map_err(|_ignored| StatusError::internal_server_error())
    }

    fn insert_user_uuid(&mut self, user: UserUuid) {
        self.insert(USER_UUID_KEY, user);
    }

    fn user_uuid(&self) -> Option<UserUuid> {
        self.get::<UserUuid>(USER_UUID_KEY).ok().copied()
    }

    fn insert_auth_rejection(&mut self, brief: &'static str) {
        self.insert(AUTH_REJECTION_KEY, brief);
    }

    fn auth_rejection(&self) -> Option<&'static str> {
        self.get::<&'static str>(AUTH_REJECTION_KEY).ok().copied()
    }

    fn user_uuid_or_401(&self) -> Result<UserUuid, StatusError> {
        if let Some(brief) = self.auth_rejection() {
            return Err(StatusError::unauthorized().brief(brief));
        }

        self.user_uuid()
            .ok_or_else(|| StatusError::unauthorized().brief("Authentication required"))
    }
}
