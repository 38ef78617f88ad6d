//! Users service.

use async_trait::async_trait;
use mockall::automock;

use crate::{
    database::Db,
    domain::users::{
        data::{NewAddress, NewUser},
        errors::UsersServiceError,
        records::{AddressRecord, UserRecord, UserUuid},
        repository::PgUsersRepository,
    },
};

#[derive(Debug, Clone)]
pub struct PgUsersService {
    db: Db,
    repository: PgUsersRepository,
}

impl PgUsersService {
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self {
            db,
            repository: PgUsersRepository::new(),
        }
    }
}

#[async_trait]
impl UsersService for PgUsersService {
    async fn create_user(&self, user: NewUser) -> Result<UserRecord, UsersServiceError> {
        if user.username.trim().is_empty() {
            return Err(UsersServiceError::InvalidData);
        }

        let mut tx = self.db.begin().await?;

        let created = self.repository.create_user(&mut tx, user).await?;

        tx.commit().await?;

        Ok(created)
    }

    async fn add_address(
        &self,
        user: UserUuid,
        address: NewAddress,
    ) -> Result<AddressRecord, UsersServiceError> {
        let mut tx = self.db.begin().await?;

        let created = self
            .repository
            .create_address(&mut tx, user, address)
            .await?;

        tx.commit().await?;

        Ok(created)
    }

    async fn default_address(
        &self,
        user: UserUuid,
    ) -> Result<Option<AddressRecord>, UsersServiceError> {
        let mut tx = self.db.begin().await?;

        let address = self.repository.get_default_address(&mut tx, user).await?;

        tx.commit().await?;

        Ok(address)
    }
}

#[automock]
#[async_trait]
pub trait UsersService: Send + Sync {
    /// Register a new user.
    async fn create_user(&self, user: NewUser) -> Result<UserRecord, UsersServiceError>;

    /// Add an address, optionally making it the user's default.
    async fn add_address(
        &self,
        user: UserUuid,
        address: NewAddress,
    ) -> Result<AddressRecord, UsersServiceError>;

    /// The user's default shipping address, if one is on file.
    async fn default_address(
        &self,
        user: UserUuid,
    ) -> Result<Option<AddressRecord>, UsersServiceError>;
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use crate::{
        domain::users::records::AddressUuid,
        test::{TestContext, helpers::new_address},
    };

    use super::*;

    #[tokio::test]
    async fn create_user_returns_user() -> TestResult {
        let ctx = TestContext::new().await;
        let uuid = UserUuid::new();

        let user = ctx
            .users
            .create_user(NewUser {
                uuid,
                username: "ada".to_string(),
            })
            .await?;

        assert_eq!(user.uuid, uuid);
        assert_eq!(user.username, "ada");

        Ok(())
    }

    #[tokio::test]
    async fn duplicate_username_returns_already_exists() -> TestResult {
        let ctx = TestContext::new().await;

        ctx.users
            .create_user(NewUser {
                uuid: UserUuid::new(),
                username: "grace".to_string(),
            })
            .await?;

        let result = ctx
            .users
            .create_user(NewUser {
                uuid: UserUuid::new(),
                username: "grace".to_string(),
            })
            .await;

        assert!(
            matches!(result, Err(UsersServiceError::AlreadyExists)),
            "expected AlreadyExists, got {result:?}"
        );

        Ok(())
    }

    #[tokio::test]
    async fn blank_username_is_rejected() {
        let ctx = TestContext::new().await;

        let result = ctx
            .users
            .create_user(NewUser {
                uuid: UserUuid::new(),
                username: "   ".to_string(),
            })
            .await;

        assert!(
            matches!(result, Err(UsersServiceError::InvalidData)),
            "expected InvalidData, got {result:?}"
        );
    }

    #[tokio::test]
    async fn default_address_is_none_until_one_is_added() -> TestResult {
        let ctx = TestContext::new().await;
        let user = ctx.create_user("linus").await;

        assert!(ctx.users.default_address(user).await?.is_none());

        let address = ctx.users.add_address(user, new_address(true)).await?;
        let default = ctx.users.default_address(user).await?;

        assert_eq!(default.map(|a| a.uuid), Some(address.uuid));

        Ok(())
    }

    #[tokio::test]
    async fn new_default_address_replaces_previous_default() -> TestResult {
        let ctx = TestContext::new().await;
        let user = ctx.create_user("barbara").await;

        ctx.users.add_address(user, new_address(true)).await?;

        let second_uuid = AddressUuid::new();

        ctx.users
            .add_address(
                user,
                NewAddress {
                    uuid: second_uuid,
                    ..new_address(true)
                },
            )
            .await?;

        let default = ctx.users.default_address(user).await?;

        assert_eq!(default.map(|a| a.uuid), Some(second_uuid));

        Ok(())
    }

    #[tokio::test]
    async fn non_default_address_does_not_become_default() -> TestResult {
        let ctx = TestContext::new().await;
        let user = ctx.create_user("ken").await;

        ctx.users.add_address(user, new_address(false)).await?;

        assert!(ctx.users.default_address(user).await?.is_none());

        Ok(())
    }
}
