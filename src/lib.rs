//! Action Ratelimit - per-action request rate limiting
//!
//! This crate decides whether a request routed to a controller action may
//! proceed. Policies are declared per action (one per method set) or matched
//! by request path, and calls are counted per key in fixed windows held by a
//! pluggable counter store.

pub mod config;
pub mod error;
pub mod ratelimit;
