//! Counter state for a single rate limited key.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Where a counter's current window stands relative to its limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowState {
    /// No calls recorded in this window yet
    Fresh,
    /// Calls recorded, still within the limit
    Active,
    /// More calls than the limit allows
    Exhausted,
}

/// Call count for one key within its current window.
///
/// The window covers `[period_set_at, period_set_at + period_seconds)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counter {
    pub key: String,
    pub calls: u64,
    pub period_set_at: DateTime<Utc>,
    pub period_seconds: u64,
}

impl Counter {
    /// Start a fresh window at `now`.
    pub fn fresh(key: impl Into<String>, period_seconds: u64, now: DateTime<Utc>) -> Self {
        Self {
            key: key.into(),
            calls: 0,
            period_set_at: now,
            period_seconds,
        }
    }

    /// When the current window ends, or `None` if that lies beyond the
    /// representable time range.
    pub fn reset_at(&self) -> Option<DateTime<Utc>> {
        let secs = i64::try_from(self.period_seconds).ok()?;
        let period = Duration::try_seconds(secs)?;
        self.period_set_at.checked_add_signed(period)
    }

    /// Whether the window has run out at `now`. A window whose end cannot be
    /// represented never runs out.
    pub fn has_elapsed(&self, now: DateTime<Utc>) -> bool {
        self.reset_at().is_some_and(|reset_at| now >= reset_at)
    }

    /// Calls left before `limit` is reached.
    pub fn remaining(&self, limit: u64) -> u64 {
        limit.saturating_sub(self.calls)
    }

    pub fn state(&self, limit: u64) -> WindowState {
        match self.calls {
            0 => WindowState::Fresh,
            calls if calls <= limit => WindowState::Active,
            _ => WindowState::Exhausted,
        }
    }
}
