//! Rate limiting logic and state management.

mod action;
mod clock;
mod counter;
mod events;
mod key;
mod limiter;
mod path;
mod policy;
mod request;
mod selector;
mod store;

pub use action::{ActionIdentity, PolicySource, StaticPolicySource};
pub use clock::{Clock, ManualClock, SystemClock};
pub use counter::{Counter, WindowState};
pub use events::{ChannelObserver, ObserverRegistry, RateLimitEvent, RateLimitObserver};
pub use key::RateLimitKey;
pub use limiter::{Decision, Guarded, RateLimiter, StoreFailurePolicy};
pub use path::{path_matches, PathLimitProcessor, PathPolicy, PathPolicyProvider};
pub use policy::{MethodSet, Policy, MAX_PERIOD_SECS};
pub use request::{Request, RequestKind, RATE_LIMIT_INFO};
pub use selector::select_policy;
pub use store::{CounterStore, InMemoryCounterStore};
