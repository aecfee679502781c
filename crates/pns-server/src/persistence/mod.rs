//! Snapshot persistence for the registry.

mod encrypted;

pub use encrypted::{EncryptedStore, PlainStore};

use crate::config::StorageConfig;
use crate::error::ApiError;
use pns_core::RegistryState;
use secrecy::SecretString;
use tracing::{debug, info, warn};

/// Storage backend for registry snapshots.
pub enum Store {
    /// AES-256-GCM encrypted snapshot file
    Encrypted(EncryptedStore),
    /// Plain JSON snapshot file
    Plain(PlainStore),
    /// In-memory only (no persistence)
    Memory,
}

impl Store {
    /// Pick a backend from configuration.
    pub fn from_config(config: &StorageConfig) -> Self {
        if !config.persist {
            info!("Persistence disabled, using in-memory storage");
            return Store::Memory;
        }

        match &config.encryption_secret {
            Some(secret) if !secret.is_empty() => {
                info!("Using encrypted snapshot storage at {:?}", config.path);
                Store::Encrypted(EncryptedStore::new(
                    config.path.clone(),
                    &SecretString::new(secret.clone()),
                ))
            }
            _ => {
                warn!(
                    "No encryption secret configured, registry snapshot at {:?} is stored in plain text",
                    config.path
                );
                Store::Plain(PlainStore::new(config.path.clone()))
            }
        }
    }

    /// Force memory store.
    pub fn memory() -> Self {
        Store::Memory
    }

    /// Whether saves reach disk.
    pub fn is_persistent(&self) -> bool {
        !matches!(self, Store::Memory)
    }

    /// Save the registry state.
    pub async fn save(&self, state: &RegistryState) -> Result<(), ApiError> {
        match self {
            Store::Encrypted(s) => s.save(state).await,
            Store::Plain(s) => s.save(state).await,
            Store::Memory => {
                debug!("Memory store: save is a no-op");
                Ok(())
            }
        }
    }

    /// Load the registry state, `None` if nothing has been saved.
    pub async fn load(&self) -> Result<Option<RegistryState>, ApiError> {
        match self {
            Store::Encrypted(s) => s.load().await,
            Store::Plain(s) => s.load().await,
            Store::Memory => Ok(None),
        }
    }
}
