//! Token administration service
//!
//! Validates operator intent and delegates to the remote token API.
//! Every operation is one fresh round trip; nothing is cached.

use std::sync::Arc;

use tracing::{debug, info};

use crate::application::ApplicationResult;
use crate::domain::{validate_token_id, AuthStatus, NewToken, TokenRecord, TokenUpdate};
use crate::infrastructure::traits::TokenApi;

/// Token administration service.
pub struct TokenService {
    api: Arc<dyn TokenApi>,
}

impl TokenService {
    /// Create a new token service.
    pub fn new(api: Arc<dyn TokenApi>) -> Self {
        Self { api }
    }

    /// Issue a new token.
    pub async fn create(&self, token: NewToken) -> ApplicationResult<TokenRecord> {
        token.validate()?;
        info!(token_id = %token.token_id, owner = %token.owner, "creating token");
        Ok(self.api.create(&token).await?)
    }

    /// Apply a partial update and return the token's state afterwards.
    ///
    /// Fails with `DomainError::NoUpdates` without touching the network when
    /// the update carries no fields.
    pub async fn update(&self, update: TokenUpdate) -> ApplicationResult<TokenRecord> {
        update.validate()?;
        info!(token_id = %update.token_id, fields = ?update.fields(), "updating token");
        Ok(self.api.update(&update).await?)
    }

    pub async fn get(&self, token_id: &str) -> ApplicationResult<TokenRecord> {
        validate_token_id(token_id)?;
        debug!(token_id, "fetching token");
        Ok(self.api.get(token_id).await?)
    }

    pub async fn list(&self) -> ApplicationResult<Vec<TokenRecord>> {
        debug!("listing tokens");
        Ok(self.api.list().await?)
    }

    /// Revoke a token. `None` when the service acknowledged without a body.
    pub async fn revoke(&self, token_id: &str) -> ApplicationResult<Option<TokenRecord>> {
        validate_token_id(token_id)?;
        info!(token_id, "revoking token");
        Ok(self.api.revoke(token_id).await?)
    }

    pub async fn check_auth(&self) -> ApplicationResult<AuthStatus> {
        debug!("checking admin credential");
        Ok(self.api.check_auth().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ApplicationError;
    use crate::domain::DomainError;
    use crate::infrastructure::traits::MockTokenApi;
    use crate::infrastructure::InfraError;

    fn record(token_id: &str, owner: &str) -> TokenRecord {
        TokenRecord {
            token_id: token_id.to_string(),
            owner: owner.to_string(),
            is_admin: false,
            expires_at: None,
            created_at: None,
            updated_at: None,
            revoked_at: None,
        }
    }

    #[tokio::test]
    async fn given_empty_update_when_updating_then_no_remote_call() {
        let mut api = MockTokenApi::new();
        api.expect_update().never();
        let service = TokenService::new(Arc::new(api));

        let err = service.update(TokenUpdate::new("t1")).await.unwrap_err();

        assert!(matches!(
            err,
            ApplicationError::Domain(DomainError::NoUpdates)
        ));
    }

    #[tokio::test]
    async fn given_owner_update_when_updating_then_single_call_with_payload() {
        let mut api = MockTokenApi::new();
        api.expect_update()
            .withf(|update| {
                update.token_id == "t1" && update.owner.as_deref() == Some("alice")
            })
            .times(1)
            .returning(|update| Ok(record(&update.token_id, "alice")));
        let service = TokenService::new(Arc::new(api));

        let result = service
            .update(TokenUpdate::new("t1").with_owner("alice"))
            .await
            .unwrap();

        assert_eq!(result.owner, "alice");
    }

    #[tokio::test]
    async fn given_remote_auth_failure_when_updating_then_error_propagates_unchanged() {
        let mut api = MockTokenApi::new();
        api.expect_update().times(1).returning(|_| {
            Err(InfraError::Authentication {
                status: 401,
                message: "expired".into(),
            })
        });
        let service = TokenService::new(Arc::new(api));

        let err = service
            .update(TokenUpdate::new("t1").with_admin(true))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ApplicationError::Infra(InfraError::Authentication { status: 401, .. })
        ));
    }

    #[tokio::test]
    async fn given_plaintext_secret_when_creating_then_rejected_locally() {
        let mut api = MockTokenApi::new();
        api.expect_create().never();
        let service = TokenService::new(Arc::new(api));

        let err = service
            .create(NewToken {
                token_id: "t1".into(),
                owner: "alice".into(),
                is_admin: false,
                secret_phc: "hunter2".into(),
                expires_at: None,
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ApplicationError::Domain(DomainError::InvalidField { .. })
        ));
    }

    #[tokio::test]
    async fn given_blank_token_id_when_revoking_then_rejected_locally() {
        let mut api = MockTokenApi::new();
        api.expect_revoke().never();
        let service = TokenService::new(Arc::new(api));

        let err = service.revoke("").await.unwrap_err();

        assert!(matches!(
            err,
            ApplicationError::Domain(DomainError::EmptyTokenId)
        ));
    }

    #[tokio::test]
    async fn given_token_id_when_getting_then_returns_remote_record() {
        let mut api = MockTokenApi::new();
        api.expect_get()
            .withf(|token_id| token_id == "t9")
            .times(1)
            .returning(|token_id| Ok(record(token_id, "carol")));
        let service = TokenService::new(Arc::new(api));

        let result = service.get("t9").await.unwrap();

        assert_eq!(result.token_id, "t9");
        assert_eq!(result.owner, "carol");
    }
}
