//! Verification gate: OTP proofs that unlock record creation.

use crate::error::{RegistryError, RegistryResult};
use crate::types::{Address, PhoneHash};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Checks that `signature` over `message_hash` was produced by `expected_signer`.
#[cfg_attr(test, mockall::automock)]
pub trait SignatureVerifier: Send + Sync {
    fn verify_signature(
        &self,
        message_hash: &[u8; 32],
        signature: &[u8],
        expected_signer: &Address,
    ) -> bool;
}

/// Proof that `signer` answered the OTP sent to the phone behind `phone_hash`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationProof {
    pub phone_hash: PhoneHash,
    pub signer: Address,
    #[serde(with = "hex::serde")]
    pub message_hash: [u8; 32],
    pub verified: bool,
    pub verified_at: u64,

    /// Set once a record creation has used this proof
    #[serde(default)]
    pub consumed: bool,
}

impl VerificationProof {
    /// A proof can unlock exactly one record write.
    pub fn is_usable(&self) -> bool {
        self.verified && !self.consumed
    }
}

/// Holds the latest verification proof per phone hash.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VerificationGate {
    proofs: HashMap<PhoneHash, VerificationProof>,
}

impl VerificationGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a verification outcome after checking the caller signed it.
    ///
    /// A later call for the same hash overwrites the earlier proof, which
    /// also makes a consumed proof usable again with a fresh OTP.
    #[allow(clippy::too_many_arguments)]
    pub fn set_verification_status(
        &mut self,
        verifier: &dyn SignatureVerifier,
        caller: &Address,
        phone_hash: PhoneHash,
        message_hash: [u8; 32],
        status: bool,
        signature: &[u8],
        now: u64,
    ) -> RegistryResult<()> {
        if !verifier.verify_signature(&message_hash, signature, caller) {
            warn!(%phone_hash, %caller, "Verification signature rejected");
            return Err(RegistryError::InvalidSignature);
        }

        self.proofs.insert(
            phone_hash,
            VerificationProof {
                phone_hash,
                signer: *caller,
                message_hash,
                verified: status,
                verified_at: now,
                consumed: false,
            },
        );

        debug!(%phone_hash, %caller, status, "Verification proof stored");
        Ok(())
    }

    pub fn is_verified(&self, phone_hash: &PhoneHash) -> bool {
        self.proofs
            .get(phone_hash)
            .map(VerificationProof::is_usable)
            .unwrap_or(false)
    }

    /// Like [`Self::is_verified`], but only for a proof signed by `signer`.
    pub fn is_verified_by(&self, phone_hash: &PhoneHash, signer: &Address) -> bool {
        self.proofs
            .get(phone_hash)
            .is_some_and(|proof| proof.is_usable() && proof.signer == *signer)
    }

    pub fn proof(&self, phone_hash: &PhoneHash) -> Option<&VerificationProof> {
        self.proofs.get(phone_hash)
    }

    /// Mark the proof for `phone_hash` as used. The proof is kept for audit.
    pub fn consume(&mut self, phone_hash: &PhoneHash) {
        if let Some(proof) = self.proofs.get_mut(phone_hash) {
            proof.consumed = true;
        }
    }

    pub fn len(&self) -> usize {
        self.proofs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.proofs.is_empty()
    }
}
