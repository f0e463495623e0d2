//! Access-control policies and their evaluation.
//!
//! A policy names subjects, resources and actions as patterns, which may embed
//! regular expressions between `<` and `>` (`rn:clients:<.*>`). A request is
//! allowed when at least one allow policy matches it and no deny policy does.

use std::collections::HashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub mod matcher;
pub mod manager;
pub mod engine;

pub use matcher::RegexpMatcher;
pub use manager::{MemoryPolicyManager, PolicyManager};
pub use engine::{MatchingPolicyEngine, PolicyEngine};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Effect {
    Allow,
    Deny,
}

/// Constraint on one key of the request context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Condition {
    /// The context value equals the request subject.
    EqualsSubject,
    /// The context value equals `equals`.
    StringEqual { equals: String },
}

impl Condition {
    pub fn fulfills(&self, value: Option<&Value>, request: &PolicyRequest) -> bool {
        let Some(Value::String(value)) = value else {
            return false;
        };
        match self {
            Condition::EqualsSubject => !request.subject.is_empty() && *value == request.subject,
            Condition::StringEqual { equals } => value == equals,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub subjects: Vec<String>,
    pub effect: Effect,
    pub resources: Vec<String>,
    pub actions: Vec<String>,
    /// Context key to condition.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub conditions: HashMap<String, Condition>,
}

impl Policy {
    pub fn new(id: impl Into<String>, effect: Effect) -> Self {
        Self {
            id: id.into(),
            description: String::new(),
            subjects: Vec::new(),
            effect,
            resources: Vec::new(),
            actions: Vec::new(),
            conditions: HashMap::new(),
        }
    }

    pub fn subject(mut self, pattern: impl Into<String>) -> Self {
        self.subjects.push(pattern.into());
        self
    }

    pub fn resource(mut self, pattern: impl Into<String>) -> Self {
        self.resources.push(pattern.into());
        self
    }

    pub fn action(mut self, pattern: impl Into<String>) -> Self {
        self.actions.push(pattern.into());
        self
    }

    pub fn condition(mut self, key: impl Into<String>, condition: Condition) -> Self {
        self.conditions.insert(key.into(), condition);
        self
    }

    pub fn allows(&self) -> bool {
        self.effect == Effect::Allow
    }
}

/// Access request: may `subject` perform `action` on `resource`?
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolicyRequest {
    pub resource: String,
    pub action: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub context: HashMap<String, Value>,
}

impl PolicyRequest {
    pub fn new(resource: impl Into<String>, action: impl Into<String>) -> Self {
        Self { resource: resource.into(), action: action.into(), ..Default::default() }
    }

    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    pub fn context(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }
}
