//! Entry point of the engine: builds requests from decoded parameters and runs
//! them through the grant handler chain.

use std::sync::Arc;
use tracing::{debug, instrument, warn};
use crate::client::ClientManager;
use super::arguments::Arguments;
use super::error::{OAuthError, Result};
use super::handler::{outcome, AuthorizeEndpointHandler, HandlerOutcome, TokenEndpointHandler};
use super::introspector::TokenIntrospector;
use super::request::{AccessParams, AccessRequest, AuthorizeParams, AuthorizeRequest, Requester};
use super::response::{AccessResponse, AuthorizeResponse};
use super::revocation::TokenRevoker;
use super::session::Session;

#[derive(Clone)]
pub struct OAuth2Provider {
    clients: Arc<dyn ClientManager>,
    authorize_handlers: Vec<Arc<dyn AuthorizeEndpointHandler>>,
    token_handlers: Vec<Arc<dyn TokenEndpointHandler>>,
    introspector: Arc<dyn TokenIntrospector>,
    revoker: TokenRevoker,
    min_parameter_entropy: usize,
}

impl OAuth2Provider {
    pub fn new(
        clients: Arc<dyn ClientManager>,
        introspector: Arc<dyn TokenIntrospector>,
        revoker: TokenRevoker,
        min_parameter_entropy: usize,
    ) -> Self {
        Self {
            clients,
            authorize_handlers: Vec::new(),
            token_handlers: Vec::new(),
            introspector,
            revoker,
            min_parameter_entropy,
        }
    }

    /// Appends a handler; handlers are tried in insertion order.
    pub fn with_authorize_handler(mut self, handler: Arc<dyn AuthorizeEndpointHandler>) -> Self {
        self.authorize_handlers.push(handler);
        self
    }

    pub fn with_token_handler(mut self, handler: Arc<dyn TokenEndpointHandler>) -> Self {
        self.token_handlers.push(handler);
        self
    }

    pub fn clients(&self) -> &Arc<dyn ClientManager> {
        &self.clients
    }

    pub fn introspector(&self) -> Arc<dyn TokenIntrospector> {
        self.introspector.clone()
    }

    /// Validates authorize-endpoint parameters: the client must exist, the
    /// redirect URI must be registered and `state` must be long enough.
    #[instrument(skip(self, params), level = "debug", fields(client_id = %params.client_id))]
    pub async fn new_authorize_request(&self, params: AuthorizeParams) -> Result<AuthorizeRequest> {
        let client = match self.clients.get_client(&params.client_id).await {
            Ok(client) => client,
            Err(OAuthError::NotFound) => return Err(OAuthError::InvalidClient),
            Err(e) => return Err(e),
        };

        let redirect_uri = if params.redirect_uri.is_empty() {
            match client.redirect_uris.as_slice() {
                [only] => only.clone(),
                _ => return Err(OAuthError::InvalidRequest("The redirect_uri parameter is required".into())),
            }
        } else if client.redirect_uris.iter().any(|uri| *uri == params.redirect_uri) {
            params.redirect_uri.clone()
        } else {
            return Err(OAuthError::InvalidRequest("The redirect_uri is not registered for this client".into()));
        };

        let response_types = Arguments::from_space_delimited(&params.response_type);
        if response_types.is_empty() {
            return Err(OAuthError::InvalidRequest("The response_type parameter is required".into()));
        }
        if params.state.chars().count() < self.min_parameter_entropy {
            return Err(OAuthError::InsufficientEntropy);
        }

        let mut requester = Requester::new(client);
        requester.requested_scopes = Arguments::from_space_delimited(&params.scope);
        requester.form = params.form;
        if !params.redirect_uri.is_empty() {
            requester.form.insert("redirect_uri".into(), params.redirect_uri);
        }
        Ok(AuthorizeRequest::new(requester, response_types, redirect_uri, params.state))
    }

    /// Runs the authorize chain. Scopes must have been granted on `ar` before.
    #[instrument(skip(self, ar, session), level = "debug", fields(client_id = %ar.client.id))]
    pub async fn new_authorize_response(&self, ar: &mut AuthorizeRequest, session: Session) -> Result<AuthorizeResponse> {
        ar.session = session;
        let mut resp = AuthorizeResponse::new(ar.redirect_uri.clone());

        let mut handled = false;
        for handler in &self.authorize_handlers {
            if outcome(handler.handle_authorize_endpoint_request(ar, &mut resp).await)? == HandlerOutcome::Handled {
                handled = true;
                break;
            }
        }

        if !handled || !ar.did_handle_all_response_types() {
            warn!(response_types = %ar.response_types, "no handler for response types");
            return Err(OAuthError::UnsupportedResponseType);
        }
        Ok(resp)
    }

    /// Authenticates the client and runs the token chain's validation phase.
    #[instrument(skip(self, params, session), level = "debug", fields(client_id = %params.client_id, grant_type = %params.grant_type))]
    pub async fn new_access_request(&self, params: AccessParams, session: Session) -> Result<AccessRequest> {
        if params.client_id.is_empty() {
            return Err(OAuthError::InvalidRequest("Client credentials are missing".into()));
        }
        let client = match self.clients.authenticate(&params.client_id, &params.client_secret).await {
            Ok(client) => client,
            Err(OAuthError::NotFound) | Err(OAuthError::InvalidClient) => return Err(OAuthError::InvalidClient),
            Err(e) => return Err(e),
        };

        let grant_types = Arguments::from_space_delimited(&params.grant_type);
        if grant_types.is_empty() {
            return Err(OAuthError::InvalidRequest("The grant_type parameter is required".into()));
        }

        let mut requester = Requester::new(client);
        requester.requested_scopes = Arguments::from_space_delimited(&params.scope);
        requester.form = params.form;
        requester.session = session;
        let mut request = AccessRequest::new(requester, grant_types);

        let mut handled = false;
        for handler in &self.token_handlers {
            if outcome(handler.handle_token_endpoint_request(&mut request).await)? == HandlerOutcome::Handled {
                handled = true;
                break;
            }
        }
        if !handled {
            return Err(OAuthError::UnsupportedGrantType);
        }
        Ok(request)
    }

    /// Runs the token chain's issuance phase.
    #[instrument(skip(self, request), level = "debug", fields(client_id = %request.client.id))]
    pub async fn new_access_response(&self, request: &mut AccessRequest) -> Result<AccessResponse> {
        let mut response = AccessResponse::new();
        for handler in &self.token_handlers {
            if outcome(handler.populate_token_endpoint_response(request, &mut response).await)? == HandlerOutcome::Handled {
                debug!("access response populated");
                return Ok(response);
            }
        }
        Err(OAuthError::UnsupportedGrantType)
    }

    /// Resolves an access token, checking that all `scopes` were granted.
    pub async fn introspect_token(&self, token: &str, scopes: &[&str]) -> Result<Requester> {
        self.introspector.introspect_token(token, scopes).await
    }

    /// Authenticates the client and revokes a token issued to it.
    #[instrument(skip(self, client_secret, token), level = "debug")]
    pub async fn revoke_token(&self, client_id: &str, client_secret: &str, token: &str) -> Result<()> {
        match self.clients.authenticate(client_id, client_secret).await {
            Ok(_) => {}
            Err(OAuthError::NotFound) | Err(OAuthError::InvalidClient) => return Err(OAuthError::InvalidClient),
            Err(e) => return Err(e),
        }
        self.revoker.revoke(client_id, token).await
    }
}
