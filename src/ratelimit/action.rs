//! Controller actions and the policies declared on them.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use super::policy::Policy;
use crate::config::ActionLimitConfig;

/// Identifies the controller action a request is routed to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActionIdentity {
    pub controller: String,
    pub action: String,
}

impl ActionIdentity {
    pub fn new(controller: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            controller: controller.into(),
            action: action.into(),
        }
    }
}

impl fmt::Display for ActionIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.controller, self.action)
    }
}

/// Source of the rate limit policies declared on actions.
///
/// Policies must come back in declaration order.
pub trait PolicySource: Send + Sync {
    fn policies_for(&self, action: &ActionIdentity) -> Vec<Policy>;
}

/// Policies registered up front, keyed by action.
#[derive(Debug, Default)]
pub struct StaticPolicySource {
    declared: RwLock<HashMap<ActionIdentity, Vec<Policy>>>,
}

impl StaticPolicySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a source from the `action_limits` configuration section.
    pub fn from_config(limits: &[ActionLimitConfig]) -> Self {
        let source = Self::new();
        for entry in limits {
            source.declare(
                ActionIdentity::new(&entry.controller, &entry.action),
                entry.limits.clone(),
            );
        }
        source
    }

    /// Append policies to an action's declarations.
    pub fn declare(&self, action: ActionIdentity, policies: Vec<Policy>) {
        self.declared.write().entry(action).or_default().extend(policies);
    }
}

impl PolicySource for StaticPolicySource {
    fn policies_for(&self, action: &ActionIdentity) -> Vec<Policy> {
        self.declared.read().get(action).cloned().unwrap_or_default()
    }
}
