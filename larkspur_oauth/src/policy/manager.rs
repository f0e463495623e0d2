use std::collections::HashMap;
use std::sync::Arc;
use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;
use crate::oauth_core::error::{OAuthError, Result};
use super::matcher::RegexpMatcher;
use super::Policy;

/// Policy storage.
#[async_trait]
pub trait PolicyManager: Send + Sync + 'static {
    /// Stores a policy, assigning an id when it has none. Returns the id.
    async fn create(&self, policy: Policy) -> Result<String>;

    async fn get(&self, id: &str) -> Result<Policy>;

    async fn delete(&self, id: &str) -> Result<()>;

    /// Policies with a subject pattern matching `subject`.
    async fn find_policies_for_subject(&self, subject: &str) -> Result<Vec<Policy>>;
}

#[derive(Clone)]
pub struct MemoryPolicyManager {
    policies: Arc<RwLock<HashMap<String, Policy>>>,
    matcher: Arc<RegexpMatcher>,
}

impl MemoryPolicyManager {
    pub fn new(matcher: Arc<RegexpMatcher>) -> Self {
        Self { policies: Arc::new(RwLock::new(HashMap::new())), matcher }
    }
}

impl Default for MemoryPolicyManager {
    fn default() -> Self {
        Self::new(Arc::new(RegexpMatcher::new()))
    }
}

#[async_trait]
impl PolicyManager for MemoryPolicyManager {
    async fn create(&self, mut policy: Policy) -> Result<String> {
        if policy.id.is_empty() {
            policy.id = Uuid::new_v4().to_string();
        }
        let mut policies = self.policies.write().await;
        if policies.contains_key(&policy.id) {
            return Err(OAuthError::InvalidRequest(format!("A policy with id {} already exists", policy.id)));
        }
        let id = policy.id.clone();
        policies.insert(id.clone(), policy);
        Ok(id)
    }

    async fn get(&self, id: &str) -> Result<Policy> {
        self.policies.read().await.get(id).cloned().ok_or(OAuthError::NotFound)
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.policies.write().await.remove(id);
        Ok(())
    }

    async fn find_policies_for_subject(&self, subject: &str) -> Result<Vec<Policy>> {
        let policies = self.policies.read().await;
        let mut found = Vec::new();
        for policy in policies.values() {
            if self.matcher.matches(&policy.subjects, subject)? {
                found.push(policy.clone());
            }
        }
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::Effect;

    #[tokio::test]
    async fn crud_and_subject_lookup() {
        let manager = MemoryPolicyManager::default();
        let id = manager.create(Policy::new("", Effect::Allow).subject("<peter|max>")).await.unwrap();
        manager.create(Policy::new("admins", Effect::Allow).subject("admin")).await.unwrap();
        assert!(manager.create(Policy::new("admins", Effect::Deny)).await.is_err());

        assert_eq!(manager.find_policies_for_subject("max").await.unwrap().len(), 1);
        assert_eq!(manager.find_policies_for_subject("admin").await.unwrap()[0].id, "admins");
        assert!(manager.find_policies_for_subject("eve").await.unwrap().is_empty());

        manager.delete(&id).await.unwrap();
        assert_eq!(manager.get(&id).await, Err(OAuthError::NotFound));
    }
}
