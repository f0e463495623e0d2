use std::sync::Arc;
use async_trait::async_trait;
use tracing::debug;
use crate::oauth_core::error::Result;
use super::manager::PolicyManager;
use super::matcher::RegexpMatcher;
use super::{Policy, PolicyRequest};

#[async_trait]
pub trait PolicyEngine: Send + Sync + 'static {
    async fn is_allowed(&self, request: &PolicyRequest) -> Result<bool>;
}

/// Evaluates the policies of a `PolicyManager`. Deny by default; a matching
/// deny policy overrides any number of matching allow policies.
#[derive(Clone)]
pub struct MatchingPolicyEngine {
    manager: Arc<dyn PolicyManager>,
    matcher: Arc<RegexpMatcher>,
}

impl MatchingPolicyEngine {
    pub fn new(manager: Arc<dyn PolicyManager>, matcher: Arc<RegexpMatcher>) -> Self {
        Self { manager, matcher }
    }

    pub fn decide(&self, policies: &[Policy], request: &PolicyRequest) -> Result<bool> {
        let mut allowed = false;
        for policy in policies {
            if !self.matcher.matches(&policy.actions, &request.action)? {
                continue;
            }
            if !self.matcher.matches(&policy.resources, &request.resource)? {
                continue;
            }
            let fulfilled = policy
                .conditions
                .iter()
                .all(|(key, condition)| condition.fulfills(request.context.get(key), request));
            if !fulfilled {
                continue;
            }
            if !policy.allows() {
                debug!(policy = %policy.id, "request denied by policy");
                return Ok(false);
            }
            allowed = true;
        }
        Ok(allowed)
    }
}

#[async_trait]
impl PolicyEngine for MatchingPolicyEngine {
    async fn is_allowed(&self, request: &PolicyRequest) -> Result<bool> {
        let policies = self.manager.find_policies_for_subject(&request.subject).await?;
        self.decide(&policies, request)
    }
}
