use std::sync::Arc;
use async_trait::async_trait;
use tracing::{info, instrument};
use crate::oauth_core::error::{OAuthError, Result};
use crate::oauth_core::introspector::TokenIntrospector;
use crate::oauth_core::session::TokenKind;
use crate::policy::{PolicyEngine, PolicyRequest};
use super::{Firewall, FirewallContext};

/// Warden answering from the local token store and policy engine.
#[derive(Clone)]
pub struct LocalWarden {
    introspector: Arc<dyn TokenIntrospector>,
    engine: Arc<dyn PolicyEngine>,
    issuer: String,
}

impl LocalWarden {
    pub fn new(introspector: Arc<dyn TokenIntrospector>, engine: Arc<dyn PolicyEngine>, issuer: impl Into<String>) -> Self {
        Self { introspector, engine, issuer: issuer.into() }
    }

    async fn decide(&self, request: &PolicyRequest) -> Result<()> {
        if self.engine.is_allowed(request).await? {
            Ok(())
        } else {
            Err(OAuthError::RequestForbidden)
        }
    }
}

#[async_trait]
impl Firewall for LocalWarden {
    #[instrument(skip(self, token), level = "debug")]
    async fn token_valid(&self, token: &str, scopes: &[&str]) -> Result<FirewallContext> {
        let requester = match self.introspector.introspect_token(token, scopes).await {
            Ok(requester) => requester,
            Err(e @ (OAuthError::ServerError(_) | OAuthError::InvalidToken(_))) => return Err(e),
            Err(e) => return Err(OAuthError::InvalidToken(e.description())),
        };

        Ok(FirewallContext {
            subject: requester.session.subject.clone(),
            granted_scopes: requester.granted_scopes.as_slice().to_vec(),
            issuer: self.issuer.clone(),
            audience: requester.client.id.clone(),
            issued_at: requester.requested_at,
            expires_at: requester.session.expires_at(TokenKind::AccessToken),
        })
    }

    #[instrument(skip(self, token, request), level = "debug", fields(resource = %request.resource, action = %request.action))]
    async fn token_allowed(&self, token: &str, request: &PolicyRequest, scopes: &[&str]) -> Result<FirewallContext> {
        let context = self.token_valid(token, scopes).await?;

        let mut request = request.clone();
        request.subject = context.subject.clone();
        request
            .context
            .entry("subject".to_string())
            .or_insert_with(|| context.subject.clone().into());

        self.decide(&request).await?;
        info!(subject = %context.subject, "access granted");
        Ok(context)
    }

    #[instrument(skip(self, request), level = "debug", fields(resource = %request.resource, action = %request.action))]
    async fn is_allowed(&self, request: &PolicyRequest) -> Result<()> {
        self.decide(request).await
    }
}
