//! Encrypted and plain snapshot files for the registry state.

use crate::error::ApiError;
use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Key, Nonce,
};
use pns_core::RegistryState;
use rand::RngCore;
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Domain separator mixed into the key derivation.
const KEY_DERIVATION_PATH: &str = "pns-server/registry-snapshot";

/// Nonce size for AES-GCM (96 bits = 12 bytes).
const NONCE_SIZE: usize = 12;

/// Derive a 32-byte key: SHA256(secret || key_derivation_path).
fn derive_key(secret: &SecretString) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(secret.expose_secret().as_bytes());
    hasher.update(KEY_DERIVATION_PATH.as_bytes());

    let mut key = [0u8; 32];
    key.copy_from_slice(&hasher.finalize());
    key
}

/// Encrypt with a fresh random nonce. Output: [12 bytes nonce][ciphertext with tag]
pub(crate) fn encrypt_with_key(plaintext: &[u8], key: &[u8; 32]) -> Result<Vec<u8>, ApiError> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    rand::thread_rng().fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher.encrypt(nonce, plaintext)?;

    let mut data = nonce_bytes.to_vec();
    data.extend(ciphertext);
    Ok(data)
}

pub(crate) fn decrypt_with_key(data: &[u8], key: &[u8; 32]) -> Result<Vec<u8>, ApiError> {
    if data.len() < NONCE_SIZE {
        return Err(ApiError::Encryption("Data too short".into()));
    }

    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
    let nonce = Nonce::from_slice(&data[..NONCE_SIZE]);

    cipher.decrypt(nonce, &data[NONCE_SIZE..]).map_err(|_| {
        ApiError::Encryption(
            "Failed to decrypt registry snapshot. Was the encryption secret changed?".to_string(),
        )
    })
}

/// Write atomically using temp file + rename.
async fn write_atomic(path: &Path, data: &[u8]) -> Result<(), ApiError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }

    let temp_path = path.with_extension("tmp");
    fs::write(&temp_path, data).await?;
    fs::rename(&temp_path, path).await?;
    Ok(())
}

/// AES-256-GCM encrypted snapshot file.
pub struct EncryptedStore {
    storage_path: PathBuf,
    key: [u8; 32],
}

impl EncryptedStore {
    pub fn new(storage_path: PathBuf, secret: &SecretString) -> Self {
        Self {
            storage_path,
            key: derive_key(secret),
        }
    }

    /// Save the registry state to the encrypted snapshot.
    pub async fn save(&self, state: &RegistryState) -> Result<(), ApiError> {
        let plaintext = serde_json::to_vec(state)?;
        let data = encrypt_with_key(&plaintext, &self.key)?;

        write_atomic(&self.storage_path, &data).await?;

        debug!(
            "Saved encrypted registry ({} bytes) to {:?}",
            data.len(),
            self.storage_path
        );
        Ok(())
    }

    /// Load the registry state. Returns `None` if no snapshot exists yet.
    pub async fn load(&self) -> Result<Option<RegistryState>, ApiError> {
        if !self.storage_path.exists() {
            info!(
                "Registry snapshot not found at {:?}, starting with empty registry",
                self.storage_path
            );
            return Ok(None);
        }

        let data = fs::read(&self.storage_path).await?;
        if data.len() < NONCE_SIZE {
            return Err(ApiError::Encryption(format!(
                "Registry snapshot at {:?} is truncated ({} bytes)",
                self.storage_path,
                data.len()
            )));
        }

        let plaintext = decrypt_with_key(&data, &self.key)?;
        let state: RegistryState = serde_json::from_slice(&plaintext)?;

        info!(
            "Loaded encrypted registry with {} records from {:?}",
            state.store.len(),
            self.storage_path
        );
        Ok(Some(state))
    }
}

/// Unencrypted JSON snapshot file.
pub struct PlainStore {
    storage_path: PathBuf,
}

impl PlainStore {
    pub fn new(storage_path: PathBuf) -> Self {
        Self { storage_path }
    }

    pub async fn save(&self, state: &RegistryState) -> Result<(), ApiError> {
        let data = serde_json::to_vec_pretty(state)?;
        write_atomic(&self.storage_path, &data).await?;

        debug!("Saved registry ({} bytes) to {:?}", data.len(), self.storage_path);
        Ok(())
    }

    pub async fn load(&self) -> Result<Option<RegistryState>, ApiError> {
        if !self.storage_path.exists() {
            info!(
                "Registry snapshot not found at {:?}, starting with empty registry",
                self.storage_path
            );
            return Ok(None);
        }

        let data = fs::read(&self.storage_path).await?;
        let state: RegistryState = serde_json::from_slice(&data)?;

        info!(
            "Loaded registry with {} records from {:?}",
            state.store.len(),
            self.storage_path
        );
        Ok(Some(state))
    }
}
