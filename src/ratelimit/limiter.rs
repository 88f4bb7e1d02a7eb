//! Rate limit orchestration for a single request.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, error, trace, warn};

use super::action::{ActionIdentity, PolicySource, StaticPolicySource};
use super::counter::WindowState;
use super::events::{ObserverRegistry, RateLimitEvent, RateLimitObserver};
use super::key::RateLimitKey;
use super::path::{PathLimitProcessor, PathPolicy, PathPolicyProvider};
use super::policy::Policy;
use super::request::{Request, RequestKind, RATE_LIMIT_INFO};
use super::selector::select_policy;
use super::store::CounterStore;
use crate::config::RateLimitingConfig;
use crate::error::{RateLimitError, Result, StoreError};

/// What the caller should do when the counter store cannot be reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreFailurePolicy {
    /// Let the request through and log a warning
    FailOpen,
    /// Refuse the request by returning the store error
    FailClosed,
}

/// Outcome of a rate limit check for one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub allowed: bool,
    /// Configured limit; `None` when the request is unmetered
    pub limit: Option<u64>,
    /// Calls left in the current window; `None` when unmetered
    pub remaining: Option<u64>,
    /// End of the current window; `None` when unmetered
    pub reset_at: Option<DateTime<Utc>>,
    /// Calls recorded in the current window, this one included
    pub calls: u64,
}

impl Decision {
    /// Decision for a request no policy applies to.
    pub fn unmetered() -> Self {
        Self {
            allowed: true,
            limit: None,
            remaining: None,
            reset_at: None,
            calls: 0,
        }
    }

    pub fn is_metered(&self) -> bool {
        self.limit.is_some()
    }

    pub fn is_throttled(&self) -> bool {
        !self.allowed
    }
}

/// Result of running an action behind the limiter.
#[derive(Debug)]
pub enum Guarded<T> {
    /// The action ran
    Allowed(T),
    /// The limit was exceeded and the action was not invoked
    Throttled(Decision),
    /// The store failed and the action ran anyway under `FailOpen`
    FailedOpen(T),
}

/// Decides whether requests may reach their action.
pub struct RateLimiter {
    policies: Arc<dyn PolicySource>,
    paths: Arc<dyn PathPolicyProvider>,
    path_limits: Option<Arc<PathLimitProcessor>>,
    store: Arc<dyn CounterStore>,
    observers: ObserverRegistry,
    on_store_failure: StoreFailurePolicy,
    enabled: bool,
}

impl RateLimiter {
    pub fn new(
        policies: Arc<dyn PolicySource>,
        paths: Arc<dyn PathPolicyProvider>,
        store: Arc<dyn CounterStore>,
        on_store_failure: StoreFailurePolicy,
    ) -> Self {
        Self {
            policies,
            paths,
            path_limits: None,
            store,
            observers: ObserverRegistry::new(),
            on_store_failure,
            enabled: true,
        }
    }

    /// Build a limiter from the `rate_limiting` configuration section.
    pub fn from_config(config: &RateLimitingConfig, store: Arc<dyn CounterStore>) -> Self {
        let policies = Arc::new(StaticPolicySource::from_config(&config.action_limits));
        let path_limits = Arc::new(PathLimitProcessor::new(config.path_limits.clone()));

        let mut limiter = Self::new(policies, path_limits.clone(), store, config.on_store_failure)
            .with_enabled(config.enabled);
        limiter.path_limits = Some(path_limits);
        limiter
    }

    /// Turn metering on or off. A disabled limiter lets every request through.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn subscribe(&self, observer: Arc<dyn RateLimitObserver>) {
        self.observers.subscribe(observer);
    }

    /// The configured path limits, for reloading them in place. Only set on
    /// limiters built with [`RateLimiter::from_config`].
    pub fn path_limits(&self) -> Option<&Arc<PathLimitProcessor>> {
        self.path_limits.as_ref()
    }

    pub fn store(&self) -> &Arc<dyn CounterStore> {
        &self.store
    }

    pub fn on_store_failure(&self) -> StoreFailurePolicy {
        self.on_store_failure
    }

    /// Check `request` against the policy for `action` and count the call.
    ///
    /// Metered decisions are attached to the request under
    /// [`RATE_LIMIT_INFO`] and reported to observers, whether allowed or not.
    pub async fn evaluate(&self, request: &mut Request, action: &ActionIdentity) -> Result<Decision> {
        if !self.enabled || request.kind() == RequestKind::Sub {
            trace!(action = %action, "Rate limiting skipped");
            return Ok(Decision::unmetered());
        }

        let Some((key, policy)) = self.resolve(request, action)? else {
            trace!(action = %action, method = %request.method(), "No rate limit applies");
            return Ok(Decision::unmetered());
        };
        let key = key.to_string_key();

        trace!(
            key = %key,
            limit = policy.limit,
            period = policy.period,
            "Checking rate limit"
        );

        let counter = match self.store.hit(&key, policy.period).await {
            Ok(counter) => counter,
            Err(source) => return Err(store_failure(key, source)),
        };

        let allowed = counter.state(policy.limit) != WindowState::Exhausted;
        let decision = Decision {
            allowed,
            limit: Some(policy.limit),
            remaining: Some(counter.remaining(policy.limit)),
            reset_at: counter.reset_at(),
            calls: counter.calls,
        };

        if !allowed {
            debug!(
                key = %key,
                calls = counter.calls,
                limit = policy.limit,
                "Rate limit exceeded"
            );
        }

        request.attach(RATE_LIMIT_INFO, decision.clone());
        self.observers.emit(&RateLimitEvent {
            key,
            policy,
            decision: decision.clone(),
        });

        Ok(decision)
    }

    /// Evaluate and run `invoke` only if the request may proceed.
    ///
    /// Store failures follow the configured [`StoreFailurePolicy`]; every other
    /// error is returned.
    pub async fn guard<F, Fut, T>(
        &self,
        request: &mut Request,
        action: &ActionIdentity,
        invoke: F,
    ) -> Result<Guarded<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        match self.evaluate(request, action).await {
            Ok(decision) if decision.allowed => Ok(Guarded::Allowed(invoke().await)),
            Ok(decision) => Ok(Guarded::Throttled(decision)),
            Err(err @ RateLimitError::Store { .. }) => match self.on_store_failure {
                StoreFailurePolicy::FailOpen => {
                    warn!(action = %action, error = %err, "Counter store failed, allowing request");
                    Ok(Guarded::FailedOpen(invoke().await))
                }
                StoreFailurePolicy::FailClosed => {
                    error!(action = %action, error = %err, "Counter store failed, refusing request");
                    Err(err)
                }
            },
            Err(err) => Err(err),
        }
    }

    /// Find the policy for this request and the key it is counted under.
    fn resolve(&self, request: &Request, action: &ActionIdentity) -> Result<Option<(RateLimitKey, Policy)>> {
        let declared = self.policies.policies_for(action);

        let (key, policy) = if declared.is_empty() {
            match self.paths.get(request) {
                Some(PathPolicy { pattern, policy }) => {
                    (RateLimitKey::for_path(&policy.methods, &pattern), policy)
                }
                None => return Ok(None),
            }
        } else {
            match select_policy(request.method(), &declared) {
                Some(policy) => (RateLimitKey::for_action(&policy.methods, action), policy.clone()),
                None => {
                    debug!(
                        action = %action,
                        method = %request.method(),
                        "No declared rate limit matches the request method"
                    );
                    return Ok(None);
                }
            }
        };

        policy.validate(&key.to_string_key())?;
        Ok(Some((key, policy)))
    }
}

fn store_failure(key: String, source: StoreError) -> RateLimitError {
    error!(key = %key, error = %source, "Counter store failure");
    RateLimitError::Store { key, source }
}
