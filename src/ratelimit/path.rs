//! Path-based rate limits for actions that declare none of their own.
//!
//! Patterns match on segment boundaries: `/api` covers `/api` and `/api/users`
//! but not `/apis`. A `*` segment matches exactly one path segment. Limits are
//! checked in configuration order and the first match wins.

use parking_lot::RwLock;
use tracing::{info, trace};

use super::policy::Policy;
use super::request::Request;
use crate::config::PathLimitConfig;

/// A policy found by path, together with the pattern that matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPolicy {
    pub pattern: String,
    pub policy: Policy,
}

/// Looks up a policy for a request by its path.
pub trait PathPolicyProvider: Send + Sync {
    fn get(&self, request: &Request) -> Option<PathPolicy>;
}

/// Path limits read from configuration.
#[derive(Debug, Default)]
pub struct PathLimitProcessor {
    limits: RwLock<Vec<PathLimitConfig>>,
}

impl PathLimitProcessor {
    pub fn new(limits: Vec<PathLimitConfig>) -> Self {
        Self {
            limits: RwLock::new(limits),
        }
    }

    /// Replace the configured path limits.
    pub fn set_limits(&self, limits: Vec<PathLimitConfig>) {
        info!(count = limits.len(), "Reloading path rate limits");
        *self.limits.write() = limits;
    }

    pub fn limits(&self) -> Vec<PathLimitConfig> {
        self.limits.read().clone()
    }
}

impl PathPolicyProvider for PathLimitProcessor {
    fn get(&self, request: &Request) -> Option<PathPolicy> {
        let limits = self.limits.read();
        let matched = limits.iter().find(|limit| {
            limit.methods.applies_to(request.method()) && path_matches(&limit.path, request.path())
        })?;

        trace!(
            path = %request.path(),
            pattern = %matched.path,
            "Matched path rate limit"
        );

        Some(PathPolicy {
            pattern: matched.path.clone(),
            policy: matched.policy(),
        })
    }
}

/// Whether `path` falls under `pattern`.
pub fn path_matches(pattern: &str, path: &str) -> bool {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    let mut path_segments = path.split('/').filter(|s| !s.is_empty());

    for expected in pattern.split('/').filter(|s| !s.is_empty()) {
        match path_segments.next() {
            Some(_) if expected == "*" => {}
            Some(actual) if actual == expected => {}
            _ => return false,
        }
    }
    true
}
