//! Administrator-controlled configuration and the access-control seam.

use crate::lifecycle::Durations;
use crate::types::{Address, Record};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Privileged configuration actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminAction {
    SetExpiryTime,
    SetGracePeriod,
}

/// Decides who may perform privileged actions.
#[cfg_attr(test, mockall::automock)]
pub trait AccessControl: Send + Sync {
    fn is_authorized(&self, caller: &Address, action: AdminAction) -> bool;
}

/// Access control backed by a fixed set of administrator addresses.
///
/// Every admin may perform every [`AdminAction`].
#[derive(Debug, Clone, Default)]
pub struct AdminList {
    admins: HashSet<Address>,
}

impl AdminList {
    pub fn new(admins: impl IntoIterator<Item = Address>) -> Self {
        Self {
            admins: admins.into_iter().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.admins.is_empty()
    }
}

impl AccessControl for AdminList {
    fn is_authorized(&self, caller: &Address, _action: AdminAction) -> bool {
        self.admins.contains(caller)
    }
}

/// How a record obtains the durations its status is evaluated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DurationBinding {
    /// Always use the current configuration. Changes apply retroactively
    /// to every existing record on its next read.
    Live,
    /// Copy the configuration into the record on create, renew and claim.
    #[default]
    Snapshot,
}

/// Rules applied when an expired record is claimed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ClaimPolicy {
    /// Require (and consume) a fresh verification proof for the hash.
    #[serde(default)]
    pub require_verification: bool,
}

/// Process-wide registry configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConfigurationAuthority {
    durations: Durations,
    #[serde(default)]
    binding: DurationBinding,
    #[serde(default)]
    claim_policy: ClaimPolicy,
}

impl ConfigurationAuthority {
    pub fn new(durations: Durations, binding: DurationBinding, claim_policy: ClaimPolicy) -> Self {
        Self {
            durations,
            binding,
            claim_policy,
        }
    }

    pub fn durations(&self) -> Durations {
        self.durations
    }

    pub fn binding(&self) -> DurationBinding {
        self.binding
    }

    pub fn claim_policy(&self) -> ClaimPolicy {
        self.claim_policy
    }

    pub fn set_expiry_time(&mut self, secs: u64) {
        self.durations.expiry = secs;
    }

    pub fn set_grace_period(&mut self, secs: u64) {
        self.durations.grace = secs;
    }

    /// Durations to store on a record being written, if any.
    pub fn durations_to_pin(&self) -> Option<Durations> {
        match self.binding {
            DurationBinding::Live => None,
            DurationBinding::Snapshot => Some(self.durations),
        }
    }

    /// Durations that govern `record` right now.
    pub fn effective_durations(&self, record: &Record) -> Durations {
        match self.binding {
            DurationBinding::Live => self.durations,
            DurationBinding::Snapshot => record.durations.unwrap_or(self.durations),
        }
    }
}
