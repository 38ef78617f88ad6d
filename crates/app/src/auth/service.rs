//! Auth service.

use async_trait::async_trait;
use mockall::automock;
use tracing::debug;

use crate::{
    auth::{
        ApiTokenUuid, AuthServiceError, IssuedApiToken, format_api_token,
        generate_api_token_secret, hash_api_token, parse_api_token, repository::PgAuthRepository,
    },
    database::Db,
    domain::users::records::UserUuid,
};

#[derive(Debug, Clone)]
pub struct PgAuthService {
    db: Db,
    repository: PgAuthRepository,
}

impl PgAuthService {
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self {
            db,
            repository: PgAuthRepository::new(),
        }
    }

    /// Issue a new API token for the given user.
    ///
    /// The raw token is only ever returned here; storage keeps its hash.
    ///
    /// # Errors
    ///
    /// Returns an error if the user does not exist or the insert fails.
    pub async fn issue_api_token(&self, user: UserUuid) -> Result<IssuedApiToken, AuthServiceError> {
        let secret = generate_api_token_secret();
        let token = format_api_token(&secret);
        let token_hash = hash_api_token(&secret);

        let mut tx = self.db.begin().await?;

        let metadata = self
            .repository
            .create_api_token(&mut tx, ApiTokenUuid::new(), user, &token_hash)
            .await?;

        tx.commit().await?;

        Ok(IssuedApiToken { token, metadata })
    }

    /// Revoke a token by UUID. Returns `true` if the token was active.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn revoke_api_token(&self, token: ApiTokenUuid) -> Result<bool, AuthServiceError> {
        let mut tx = self.db.begin().await?;

        let revoked = self.repository.revoke_api_token(&mut tx, token).await?;

        tx.commit().await?;

        Ok(revoked.is_some())
    }
}

#[async_trait]
impl AuthService for PgAuthService {
    async fn authenticate_bearer(&self, bearer_token: &str) -> Result<UserUuid, AuthServiceError> {
        let secret = parse_api_token(bearer_token).map_err(|error| {
            debug!(%error, "rejected malformed bearer token");
            AuthServiceError::NotFound
        })?;

        let mut tx = self.db.begin().await?;

        let token = self
            .repository
            .find_active_api_token(&mut tx, &hash_api_token(&secret))
            .await?
            .ok_or(AuthServiceError::NotFound)?;

        // Best-effort metadata update; auth success should not depend on this write.
        let _touch_result = self.repository.touch_api_token(&mut tx, token.uuid).await;

        tx.commit().await?;

        Ok(token.user_uuid)
    }
}

#[automock]
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Resolve a bearer token to the user it was issued to.
    async fn authenticate_bearer(&self, bearer_token: &str) -> Result<UserUuid, AuthServiceError>;
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use crate::test::TestContext;

    use super::*;

    #[tokio::test]
    async fn issued_token_authenticates_as_its_user() -> TestResult {
        let ctx = TestContext::new().await;
        let user = ctx.create_user("ada").await;

        let issued = ctx.auth.issue_api_token(user).await?;

        assert!(issued.token.starts_with("sf_"), "unexpected token format");
        assert_eq!(issued.metadata.user_uuid, user);

        let authenticated = ctx.auth.authenticate_bearer(&issued.token).await?;

        assert_eq!(authenticated, user);

        Ok(())
    }

    #[tokio::test]
    async fn unknown_token_is_rejected() {
        let ctx = TestContext::new().await;

        let token = format_api_token(&generate_api_token_secret());

        let result = ctx.auth.authenticate_bearer(&token).await;

        assert!(
            matches!(result, Err(AuthServiceError::NotFound)),
            "expected NotFound, got {result:?}"
        );
    }

    #[tokio::test]
    async fn malformed_token_is_rejected() {
        let ctx = TestContext::new().await;

        let result = ctx.auth.authenticate_bearer("not-a-token").await;

        assert!(
            matches!(result, Err(AuthServiceError::NotFound)),
            "expected NotFound, got {result:?}"
        );
    }

    #[tokio::test]
    async fn revoked_token_is_rejected() -> TestResult {
        let ctx = TestContext::new().await;
        let user = ctx.create_user("ada").await;

        let issued = ctx.auth.issue_api_token(user).await?;

        assert!(ctx.auth.revoke_api_token(issued.metadata.uuid).await?);
        assert!(
            !ctx.auth.revoke_api_token(issued.metadata.uuid).await?,
            "second revoke should be a no-op"
        );

        let result = ctx.auth.authenticate_bearer(&issued.token).await;

        assert!(
            matches!(result, Err(AuthServiceError::NotFound)),
            "expected NotFound, got {result:?}"
        );

        Ok(())
    }

    #[tokio::test]
    async fn issuing_for_unknown_user_returns_invalid_reference() {
        let ctx = TestContext::new().await;

        let result = ctx.auth.issue_api_token(UserUuid::new()).await;

        assert!(
            matches!(result, Err(AuthServiceError::InvalidReference)),
            "expected InvalidReference, got {result:?}"
        );
    }
}
