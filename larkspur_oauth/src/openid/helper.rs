use std::sync::Arc;
use crate::oauth_core::crypto::left_half_hash;
use crate::oauth_core::error::Result;
use crate::oauth_core::request::{AuthorizeRequest, Requester};
use crate::oauth_core::response::AuthorizeResponse;
use super::strategy_jwt::IdTokenStrategy;

/// Issues ID tokens into authorize and token responses.
#[derive(Clone)]
pub struct IdTokenHandleHelper {
    strategy: Arc<dyn IdTokenStrategy>,
}

impl IdTokenHandleHelper {
    pub fn new(strategy: Arc<dyn IdTokenStrategy>) -> Self {
        Self { strategy }
    }

    pub fn generate_id_token(&self, requester: &mut Requester) -> Result<String> {
        self.strategy.generate_id_token(requester)
    }

    /// Adds `id_token` to the fragment of an authorize response.
    pub fn issue_implicit_id_token(&self, ar: &mut AuthorizeRequest, resp: &mut AuthorizeResponse) -> Result<()> {
        let token = self.generate_id_token(&mut ar.requester)?;
        resp.add_fragment("id_token", token);
        Ok(())
    }

    /// `at_hash` / `c_hash` of an issued artifact.
    pub fn token_hash(&self, value: &str) -> String {
        left_half_hash(self.strategy.algorithm(), value.as_bytes())
    }
}
