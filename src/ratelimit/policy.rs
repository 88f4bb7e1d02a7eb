//! Rate limit policies and their method applicability.

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{RateLimitError, Result};

/// Longest accepted window, 100 years in seconds.
pub const MAX_PERIOD_SECS: u64 = 100 * 365 * 24 * 60 * 60;

/// The set of HTTP methods a policy applies to.
///
/// An empty set (or one containing `*`) is a wildcard and matches any method.
/// Methods are stored upper-cased in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct MethodSet(Vec<String>);

impl MethodSet {
    /// A wildcard set that matches every method.
    pub fn any() -> Self {
        Self(Vec::new())
    }

    /// Build a set from method names, normalizing case and dropping duplicates.
    pub fn new<I, S>(methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set: Vec<String> = Vec::new();
        for method in methods {
            let method = method.as_ref().trim().to_ascii_uppercase();
            if !method.is_empty() && !set.contains(&method) {
                set.push(method);
            }
        }
        Self(set)
    }

    /// Whether this set matches every method.
    pub fn is_wildcard(&self) -> bool {
        self.0.is_empty() || self.0.iter().any(|m| m == "*")
    }

    /// Whether `method` is named explicitly in this set.
    pub fn contains(&self, method: &str) -> bool {
        self.0.iter().any(|m| m.eq_ignore_ascii_case(method))
    }

    /// Whether a request with `method` is covered, explicitly or by wildcard.
    pub fn applies_to(&self, method: &str) -> bool {
        self.is_wildcard() || self.contains(method)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// The methods joined with `.`, as used in counter keys.
    pub fn key_fragment(&self) -> String {
        self.0.join(".")
    }
}

impl<'de> Deserialize<'de> for MethodSet {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            One(String),
            Many(Vec<String>),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::One(method) => MethodSet::new([method]),
            Raw::Many(methods) => MethodSet::new(methods),
        })
    }
}

/// A declared limit/period rule for an action or path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Policy {
    /// Maximum calls allowed within one window
    pub limit: u64,
    /// Window length in seconds
    pub period: u64,
    /// Methods this policy applies to; empty matches any method
    #[serde(default)]
    pub methods: MethodSet,
}

impl Policy {
    /// Create a policy that applies to every method.
    pub fn new(limit: u64, period: u64) -> Self {
        Self {
            limit,
            period,
            methods: MethodSet::any(),
        }
    }

    /// Restrict this policy to the given methods.
    pub fn with_methods<I, S>(mut self, methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.methods = MethodSet::new(methods);
        self
    }

    /// Reject policies that would mean "unlimited" or "always denied".
    ///
    /// `owner` names the action or path the policy was declared on.
    pub fn validate(&self, owner: &str) -> Result<()> {
        if self.limit == 0 {
            return Err(RateLimitError::MalformedPolicy {
                key: owner.to_string(),
                reason: "limit must be a positive integer".to_string(),
            });
        }
        if self.period == 0 {
            return Err(RateLimitError::MalformedPolicy {
                key: owner.to_string(),
                reason: "period must be a positive number of seconds".to_string(),
            });
        }
        if self.period > MAX_PERIOD_SECS {
            return Err(RateLimitError::MalformedPolicy {
                key: owner.to_string(),
                reason: format!("period must not exceed {} seconds", MAX_PERIOD_SECS),
            });
        }
        Ok(())
    }
}
