//! Ethereum-compatible hashing and signature recovery.
//!
//! Clients verify a phone by signing `keccak256(phone_hash ‖ uint256(otp))`
//! with `personal_sign` (EIP-191). The gate recovers the signer from that
//! signature and compares it with the caller.

use crate::types::{Address, PhoneHash};
use crate::verification::SignatureVerifier;
use alloy::primitives::{keccak256, Signature};
use tracing::debug;

/// Keccak-256 of the raw phone number string.
pub fn hash_phone_number(raw: &str) -> PhoneHash {
    PhoneHash(keccak256(raw.as_bytes()))
}

/// Message a client signs to prove it received `otp`.
///
/// Matches solidity's `keccak256(abi.encodePacked(bytes32, uint256))`. The
/// OTP is a `u64` here and is widened to a big-endian uint256, so codes above
/// `u64::MAX` cannot be expressed. Real OTPs are six to eight digits.
pub fn otp_message_hash(phone_hash: &PhoneHash, otp: u64) -> [u8; 32] {
    let mut packed = [0u8; 64];
    packed[..32].copy_from_slice(phone_hash.as_bytes());
    packed[56..].copy_from_slice(&otp.to_be_bytes());
    keccak256(packed).0
}

impl From<alloy::primitives::Address> for Address {
    fn from(address: alloy::primitives::Address) -> Self {
        Address(address)
    }
}

/// Verifies 65-byte `personal_sign` signatures.
#[derive(Debug, Clone, Copy, Default)]
pub struct EthSignatureVerifier;

impl SignatureVerifier for EthSignatureVerifier {
    fn verify_signature(
        &self,
        message_hash: &[u8; 32],
        signature: &[u8],
        expected_signer: &Address,
    ) -> bool {
        let signature = match Signature::from_raw(signature) {
            Ok(signature) => signature,
            Err(e) => {
                debug!("Malformed signature: {}", e);
                return false;
            }
        };

        match signature.recover_address_from_msg(message_hash) {
            Ok(recovered) => Address::from(recovered) == *expected_signer,
            Err(e) => {
                debug!("Signature recovery failed: {}", e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::U256;
    use alloy::signers::{local::PrivateKeySigner, SignerSync};

    // Well-known development key (hardhat account #0)
    const DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const DEV_ADDRESS: &str = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";

    fn dev_signer() -> PrivateKeySigner {
        DEV_KEY.parse().unwrap()
    }

    #[test]
    fn test_hash_phone_number_is_deterministic() {
        let a = hash_phone_number("07084462591");
        let b = hash_phone_number("07084462591");
        let c = hash_phone_number("07084462592");

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_otp_message_hash_depends_on_otp() {
        let phone = hash_phone_number("07084462591");
        assert_ne!(otp_message_hash(&phone, 123456), otp_message_hash(&phone, 123457));
    }

    #[test]
    fn test_otp_message_hash_uses_packed_encoding() {
        let phone = PhoneHash::from([0u8; 32]);
        let mut packed = [0u8; 64];
        packed[63] = 1;

        assert_eq!(otp_message_hash(&phone, 1), keccak256(packed).0);
    }

    #[test]
    fn test_otp_is_encoded_as_uint256() {
        let phone = hash_phone_number("07084462591");
        let otp = U256::from(987_654u64);

        let mut packed = Vec::with_capacity(64);
        packed.extend_from_slice(phone.as_bytes());
        packed.extend_from_slice(&otp.to_be_bytes::<32>());

        assert_eq!(otp_message_hash(&phone, 987_654), keccak256(&packed).0);
    }

    #[test]
    fn test_dev_signer_address() {
        assert_eq!(Address::from(dev_signer().address()).to_string(), DEV_ADDRESS);
    }

    #[test]
    fn test_verifies_personal_sign_signature() {
        let signer = dev_signer();
        let message = otp_message_hash(&hash_phone_number("07084462591"), 123456);
        let signature = signer.sign_message_sync(&message).unwrap();

        let expected: Address = DEV_ADDRESS.parse().unwrap();
        assert!(EthSignatureVerifier.verify_signature(&message, &signature.as_bytes(), &expected));
    }

    #[test]
    fn test_rejects_other_signer() {
        let signer = dev_signer();
        let message = otp_message_hash(&hash_phone_number("07084462591"), 123456);
        let signature = signer.sign_message_sync(&message).unwrap();

        let someone_else = Address::from([0x11; 20]);
        assert!(!EthSignatureVerifier.verify_signature(
            &message,
            &signature.as_bytes(),
            &someone_else
        ));
    }

    #[test]
    fn test_rejects_signature_over_different_message() {
        let signer = dev_signer();
        let phone = hash_phone_number("07084462591");
        let signature = signer
            .sign_message_sync(&otp_message_hash(&phone, 111111))
            .unwrap();

        let expected: Address = DEV_ADDRESS.parse().unwrap();
        assert!(!EthSignatureVerifier.verify_signature(
            &otp_message_hash(&phone, 222222),
            &signature.as_bytes(),
            &expected
        ));
    }

    #[test]
    fn test_rejects_malformed_signature() {
        let expected: Address = DEV_ADDRESS.parse().unwrap();
        assert!(!EthSignatureVerifier.verify_signature(&[0u8; 32], &[1, 2, 3], &expected));
    }
}
