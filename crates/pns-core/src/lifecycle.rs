//! Lifecycle policy: pure functions from timestamps and durations to status.

use serde::{Deserialize, Serialize};

/// Default nominal lifetime of a record: 365 days.
pub const DEFAULT_EXPIRY_SECS: u64 = 31_536_000;

/// Default grace window after nominal expiry: 30 days.
pub const DEFAULT_GRACE_SECS: u64 = 2_592_000;

/// Expiry and grace durations in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Durations {
    pub expiry: u64,
    pub grace: u64,
}

impl Default for Durations {
    fn default() -> Self {
        Self {
            expiry: DEFAULT_EXPIRY_SECS,
            grace: DEFAULT_GRACE_SECS,
        }
    }
}

/// Where a record sits in its lifecycle at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleStatus {
    /// Before nominal expiry
    Active,
    /// Past nominal expiry, inside the grace window; renewable by the owner
    PastExpiry,
    /// Past expiry and grace; claimable by anyone
    PastGrace,
}

impl LifecycleStatus {
    /// Has nominal expiry been reached (grace entered or passed)?
    pub fn in_grace_or_later(self) -> bool {
        self != LifecycleStatus::Active
    }

    pub fn fully_expired(self) -> bool {
        self == LifecycleStatus::PastGrace
    }

    pub fn is_renewable(self) -> bool {
        self == LifecycleStatus::PastExpiry
    }

    /// Create and claim may only overwrite a record in this state.
    pub fn is_claimable(self) -> bool {
        self == LifecycleStatus::PastGrace
    }
}

/// Absolute timestamp at which a record created at `created_at` expires.
pub fn expires_at(created_at: u64, durations: Durations) -> u64 {
    created_at.saturating_add(durations.expiry)
}

/// Absolute timestamp at which the grace window closes.
pub fn grace_ends_at(created_at: u64, durations: Durations) -> u64 {
    expires_at(created_at, durations).saturating_add(durations.grace)
}

/// Evaluate the status of a record at `now`.
pub fn status(created_at: u64, now: u64, durations: Durations) -> LifecycleStatus {
    if now < expires_at(created_at, durations) {
        LifecycleStatus::Active
    } else if now < grace_ends_at(created_at, durations) {
        LifecycleStatus::PastExpiry
    } else {
        LifecycleStatus::PastGrace
    }
}
