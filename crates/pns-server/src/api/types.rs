//! API request and response types.

use pns_core::{Address, DurationBinding, PhoneHash, RegistryEvent, ResolverEntry};
use serde::{Deserialize, Serialize};

/// Request to record an OTP verification.
#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    /// keccak256(phone_hash ‖ uint256(otp)), hex encoded
    pub message_hash: String,

    /// `personal_sign` signature over the message hash, hex encoded
    pub signature: String,

    /// Verification outcome to store
    #[serde(default = "default_status")]
    pub status: bool,
}

fn default_status() -> bool {
    true
}

/// Request to create a record for a verified phone hash.
///
/// The owner is the calling identity.
#[derive(Debug, Deserialize)]
pub struct CreateRecordRequest {
    pub label: String,
}

/// Request to claim an expired record.
#[derive(Debug, Deserialize)]
pub struct ClaimRequest {
    pub new_owner: Address,
    pub resolver: Address,
    pub label: String,
}

/// Request to link another resolver address.
#[derive(Debug, Deserialize)]
pub struct LinkResolverRequest {
    pub address: Address,
    pub label: String,
}

/// Request to change a configured duration.
#[derive(Debug, Deserialize)]
pub struct DurationRequest {
    /// New duration in seconds
    pub duration_secs: u64,
}

/// Response after a successful mutation.
#[derive(Debug, Serialize)]
pub struct ActionResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_hash: Option<PhoneHash>,
    pub status: String,
    pub message: String,
}

impl ActionResponse {
    pub fn for_phone(phone_hash: PhoneHash, status: &str, message: &str) -> Self {
        Self {
            phone_hash: Some(phone_hash),
            status: status.to_string(),
            message: message.to_string(),
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub record_count: usize,
    pub now: u64,
}

/// Resolver entries of a record.
#[derive(Debug, Serialize)]
pub struct ResolversResponse {
    pub phone_hash: PhoneHash,
    pub resolvers: Vec<ResolverEntry>,
    pub total: usize,
}

/// Current registry configuration.
#[derive(Debug, Serialize)]
pub struct ConfigResponse {
    pub expiry_duration_secs: u64,
    pub grace_duration_secs: u64,
    pub duration_binding: DurationBinding,
    pub claim_requires_verification: bool,
}

/// Recent registry events, oldest first.
#[derive(Debug, Serialize)]
pub struct EventsResponse {
    pub events: Vec<RegistryEvent>,
    pub total: usize,
}
