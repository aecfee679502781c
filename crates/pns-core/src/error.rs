//! Registry error types.

use crate::types::PhoneHash;
use thiserror::Error;

/// Precondition failures surfaced by registry operations.
///
/// Every variant is synchronous and non-retryable: the caller has to change
/// something in the world (wait, verify, get authorized) before trying again.
/// Display strings are stable and meant to be matched by external tooling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("phone number has not been verified")]
    NotVerified,

    #[error("phone record is still active")]
    AlreadyActive,

    #[error("only a phone record currently in grace period can be renewed")]
    NotInGracePeriod,

    #[error("only an expired phone record can be claimed")]
    NotExpired,

    #[error("phone record not found: {0}")]
    NotFound(PhoneHash),

    #[error("caller is not authorized to perform this action")]
    Unauthorized,

    #[error("signature does not match the caller")]
    InvalidSignature,

    #[error("caller is not the owner of this phone record")]
    NotOwner,

    #[error("phone record has expired")]
    RecordExpired,

    #[error("resolver label already linked: {0}")]
    DuplicateLabel(String),
}

impl RegistryError {
    /// Stable machine-readable code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            RegistryError::NotVerified => "NOT_VERIFIED",
            RegistryError::AlreadyActive => "ALREADY_ACTIVE",
            RegistryError::NotInGracePeriod => "NOT_IN_GRACE_PERIOD",
            RegistryError::NotExpired => "NOT_EXPIRED",
            RegistryError::NotFound(_) => "NOT_FOUND",
            RegistryError::Unauthorized => "UNAUTHORIZED",
            RegistryError::InvalidSignature => "INVALID_SIGNATURE",
            RegistryError::NotOwner => "NOT_OWNER",
            RegistryError::RecordExpired => "RECORD_EXPIRED",
            RegistryError::DuplicateLabel(_) => "DUPLICATE_LABEL",
        }
    }
}

/// Result type alias for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;
