//! Protocol-agnostic request shapes.
//!
//! `AuthorizeParams` and `AccessParams` are what a transport hands to the
//! provider once it has decoded the wire format. The provider turns them into
//! `AuthorizeRequest` and `AccessRequest`, which the grant handlers mutate.

use std::collections::HashMap;
use std::ops::{Deref, DerefMut};
use chrono::{DateTime, Utc};
use uuid::Uuid;
use super::arguments::Arguments;
use super::session::Session;
use super::types::Client;

/// Everything persisted per issued artifact.
#[derive(Debug, Clone, PartialEq)]
pub struct Requester {
    /// Unique id of the original request, kept across rotations.
    pub id: String,
    pub requested_at: DateTime<Utc>,
    pub client: Client,
    pub requested_scopes: Arguments,
    pub granted_scopes: Arguments,
    /// Raw form parameters of the request.
    pub form: HashMap<String, String>,
    pub session: Session,
}

impl Requester {
    pub fn new(client: Client) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            requested_at: Utc::now(),
            client,
            requested_scopes: Arguments::new(),
            granted_scopes: Arguments::new(),
            form: HashMap::new(),
            session: Session::default(),
        }
    }

    pub fn grant_scope(&mut self, scope: impl Into<String>) {
        self.granted_scopes.push(scope);
    }

    /// Form value or the empty string.
    pub fn form_value(&self, key: &str) -> &str {
        self.form.get(key).map(String::as_str).unwrap_or("")
    }

    /// Takes over scopes, session and request id from a stored requester, as
    /// done when a code or refresh token is exchanged.
    pub fn merge(&mut self, stored: &Requester) {
        self.id = stored.id.clone();
        self.requested_scopes = stored.requested_scopes.clone();
        for scope in &stored.granted_scopes {
            self.granted_scopes.push(scope.clone());
        }
        self.session = stored.session.clone();
    }
}

/// Authorize-endpoint request, mutated while handlers process it.
#[derive(Debug, Clone)]
pub struct AuthorizeRequest {
    pub requester: Requester,
    pub response_types: Arguments,
    pub redirect_uri: String,
    pub state: String,
    handled_response_types: Arguments,
}

impl AuthorizeRequest {
    pub fn new(requester: Requester, response_types: Arguments, redirect_uri: impl Into<String>, state: impl Into<String>) -> Self {
        Self {
            requester,
            response_types,
            redirect_uri: redirect_uri.into(),
            state: state.into(),
            handled_response_types: Arguments::new(),
        }
    }

    pub fn set_response_type_handled(&mut self, response_type: &str) {
        self.handled_response_types.push(response_type);
    }

    pub fn handled_response_types(&self) -> &Arguments {
        &self.handled_response_types
    }

    pub fn did_handle_all_response_types(&self) -> bool {
        self.response_types.iter().all(|rt| self.handled_response_types.has(&[rt.as_str()]))
    }

    /// Grants every requested scope, as a consent screen would after approval.
    pub fn grant_requested_scopes(&mut self) {
        let requested = self.requester.requested_scopes.clone();
        for scope in requested.iter() {
            self.requester.grant_scope(scope.clone());
        }
    }
}

impl Deref for AuthorizeRequest {
    type Target = Requester;

    fn deref(&self) -> &Requester {
        &self.requester
    }
}

impl DerefMut for AuthorizeRequest {
    fn deref_mut(&mut self) -> &mut Requester {
        &mut self.requester
    }
}

/// Token-endpoint request, mutated while handlers process it.
#[derive(Debug, Clone)]
pub struct AccessRequest {
    pub requester: Requester,
    pub grant_types: Arguments,
    handled_grant_types: Arguments,
}

impl AccessRequest {
    pub fn new(requester: Requester, grant_types: Arguments) -> Self {
        Self { requester, grant_types, handled_grant_types: Arguments::new() }
    }

    pub fn set_grant_type_handled(&mut self, grant_type: &str) {
        self.handled_grant_types.push(grant_type);
    }

    pub fn handled_grant_types(&self) -> &Arguments {
        &self.handled_grant_types
    }
}

impl Deref for AccessRequest {
    type Target = Requester;

    fn deref(&self) -> &Requester {
        &self.requester
    }
}

impl DerefMut for AccessRequest {
    fn deref_mut(&mut self) -> &mut Requester {
        &mut self.requester
    }
}

/// Decoded authorize-endpoint parameters.
#[derive(Debug, Clone, Default)]
pub struct AuthorizeParams {
    pub client_id: String,
    /// Space delimited, e.g. `id_token token`.
    pub response_type: String,
    /// Empty if the client did not send one.
    pub redirect_uri: String,
    /// Space delimited scopes.
    pub scope: String,
    pub state: String,
    /// Remaining parameters such as `nonce` or `max_age`.
    pub form: HashMap<String, String>,
}

impl AuthorizeParams {
    pub fn new(client_id: impl Into<String>, response_type: impl Into<String>) -> Self {
        Self { client_id: client_id.into(), response_type: response_type.into(), ..Default::default() }
    }

    pub fn redirect_uri(mut self, redirect_uri: impl Into<String>) -> Self {
        self.redirect_uri = redirect_uri.into();
        self
    }

    pub fn scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    pub fn state(mut self, state: impl Into<String>) -> Self {
        self.state = state.into();
        self
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.form.insert(key.into(), value.into());
        self
    }
}

/// Decoded token-endpoint parameters, including the client credentials.
#[derive(Debug, Clone, Default)]
pub struct AccessParams {
    pub client_id: String,
    pub client_secret: String,
    pub grant_type: String,
    /// Space delimited scopes.
    pub scope: String,
    /// Remaining parameters such as `code`, `refresh_token`, `username`.
    pub form: HashMap<String, String>,
}

impl AccessParams {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>, grant_type: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            grant_type: grant_type.into(),
            ..Default::default()
        }
    }

    pub fn scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.form.insert(key.into(), value.into());
        self
    }
}
