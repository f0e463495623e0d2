//! Storage contract for issued artifacts.
//!
//! Artifacts are keyed by the *signature* of the presented value, never by the
//! value itself. Lookups of absent keys return `OAuthError::NotFound`; every
//! other failure is reported as `OAuthError::ServerError`.

use async_trait::async_trait;
use super::error::Result;
use super::request::Requester;

/// Storage of authorization-code sessions.
#[async_trait]
pub trait AuthorizeCodeStorage: Send + Sync + 'static {
    async fn create_authorize_code_session(&self, signature: &str, requester: &Requester) -> Result<()>;

    async fn get_authorize_code_session(&self, signature: &str) -> Result<Requester>;

    async fn delete_authorize_code_session(&self, signature: &str) -> Result<()>;
}

/// Storage of access-token sessions.
#[async_trait]
pub trait AccessTokenStorage: Send + Sync + 'static {
    async fn create_access_token_session(&self, signature: &str, requester: &Requester) -> Result<()>;

    async fn get_access_token_session(&self, signature: &str) -> Result<Requester>;

    async fn delete_access_token_session(&self, signature: &str) -> Result<()>;
}

/// Storage of refresh-token sessions.
#[async_trait]
pub trait RefreshTokenStorage: Send + Sync + 'static {
    async fn create_refresh_token_session(&self, signature: &str, requester: &Requester) -> Result<()>;

    async fn get_refresh_token_session(&self, signature: &str) -> Result<Requester>;

    async fn delete_refresh_token_session(&self, signature: &str) -> Result<()>;
}

/// Storage used by the implicit grant.
#[async_trait]
pub trait ImplicitGrantStorage: Send + Sync + 'static {
    /// Persists an access token issued directly from the authorize endpoint.
    /// The token must afterwards be visible to access-token lookups.
    async fn create_implicit_access_token_session(&self, signature: &str, requester: &Requester) -> Result<()>;
}

/// Storage of OpenID Connect sessions, keyed by authorization-code signature,
/// so the token endpoint can issue the ID token when the code is exchanged.
#[async_trait]
pub trait OpenIdConnectRequestStorage: Send + Sync + 'static {
    async fn create_open_id_connect_session(&self, code_signature: &str, requester: &Requester) -> Result<()>;

    async fn get_open_id_connect_session(&self, code_signature: &str) -> Result<Requester>;

    async fn delete_open_id_connect_session(&self, code_signature: &str) -> Result<()>;
}

/// Refresh-token grant storage.
#[async_trait]
pub trait RefreshTokenGrantStorage: RefreshTokenStorage + AccessTokenStorage {
    /// Rotates a refresh token: the session stored under
    /// `original_refresh_signature` is removed and new access and refresh
    /// sessions are created from `requester`.
    async fn persist_refresh_token_grant_session(
        &self,
        original_refresh_signature: &str,
        access_signature: &str,
        refresh_signature: &str,
        requester: &Requester,
    ) -> Result<()>;
}

/// Authorization-code grant storage.
#[async_trait]
pub trait AuthorizeCodeGrantStorage: AuthorizeCodeStorage + AccessTokenStorage + RefreshTokenStorage {
    /// Exchanges a code: the code session is removed, an access session is
    /// created and, when `refresh_signature` is set, a refresh session too.
    async fn persist_authorize_code_grant_session(
        &self,
        code_signature: &str,
        access_signature: &str,
        refresh_signature: Option<&str>,
        requester: &Requester,
    ) -> Result<()>;
}

/// Resource owner password credentials check.
#[async_trait]
pub trait ResourceOwnerAuthenticator: Send + Sync + 'static {
    /// `Ok(())` on success, `NotFound` for unknown users or wrong passwords,
    /// anything else for infrastructure failures.
    async fn authenticate(&self, username: &str, password: &str) -> Result<()>;
}

/// Removal of issued tokens by signature.
#[async_trait]
pub trait TokenRevocationStorage: Send + Sync + 'static {
    async fn revoke_access_token_session(&self, signature: &str) -> Result<()>;

    async fn revoke_refresh_token_session(&self, signature: &str) -> Result<()>;
}

#[async_trait]
impl<T: AccessTokenStorage + RefreshTokenStorage> TokenRevocationStorage for T {
    async fn revoke_access_token_session(&self, signature: &str) -> Result<()> {
        self.delete_access_token_session(signature).await
    }

    async fn revoke_refresh_token_session(&self, signature: &str) -> Result<()> {
        self.delete_refresh_token_session(signature).await
    }
}
