//! The view of an inbound request that rate limiting needs.

use std::collections::HashMap;

use super::limiter::Decision;

/// Attribute name under which the decision for a metered request is stored.
pub const RATE_LIMIT_INFO: &str = "rate_limit_info";

/// Whether a request came from the client or was dispatched internally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestKind {
    #[default]
    Main,
    /// Internal sub-request; never metered
    Sub,
}

/// An inbound request as seen by the rate limiter.
#[derive(Debug, Clone, Default)]
pub struct Request {
    method: String,
    path: String,
    kind: RequestKind,
    attributes: HashMap<&'static str, Decision>,
}

impl Request {
    pub fn new(method: impl AsRef<str>, path: impl Into<String>) -> Self {
        Self {
            method: method.as_ref().to_ascii_uppercase(),
            path: path.into(),
            kind: RequestKind::Main,
            attributes: HashMap::new(),
        }
    }

    /// Mark this request as an internal sub-request.
    pub fn sub_request(mut self) -> Self {
        self.kind = RequestKind::Sub;
        self
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn kind(&self) -> RequestKind {
        self.kind
    }

    /// Store a decision under `name` for later response stages.
    pub fn attach(&mut self, name: &'static str, decision: Decision) {
        self.attributes.insert(name, decision);
    }

    pub fn attribute(&self, name: &str) -> Option<&Decision> {
        self.attributes.get(name)
    }

    /// The decision recorded by the last metered evaluation, if any.
    pub fn rate_limit_info(&self) -> Option<&Decision> {
        self.attribute(RATE_LIMIT_INFO)
    }
}
