//! Registry store: records and their resolver entries. No policy lives here.

use crate::types::{Address, PhoneHash, Record, ResolverEntry};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Phone records and resolver entries, keyed by phone hash.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistryStore {
    records: HashMap<PhoneHash, Record>,
    #[serde(default)]
    resolvers: HashMap<PhoneHash, Vec<ResolverEntry>>,
}

impl RegistryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, phone_hash: &PhoneHash) -> Option<&Record> {
        self.records.get(phone_hash)
    }

    pub fn get_mut(&mut self, phone_hash: &PhoneHash) -> Option<&mut Record> {
        self.records.get_mut(phone_hash)
    }

    pub fn contains(&self, phone_hash: &PhoneHash) -> bool {
        self.records.contains_key(phone_hash)
    }

    /// Replace the record stored under its phone hash.
    pub fn put(&mut self, record: Record) {
        self.records.insert(record.phone_hash, record);
    }

    /// Append a resolver entry and return its slot.
    pub fn append_resolver_entry(
        &mut self,
        phone_hash: PhoneHash,
        address: Address,
        label: impl Into<String>,
    ) -> u32 {
        let entries = self.resolvers.entry(phone_hash).or_default();
        let slot = entries.len() as u32;
        entries.push(ResolverEntry {
            slot,
            address,
            label: label.into(),
        });
        slot
    }

    pub fn clear_resolver_entries(&mut self, phone_hash: &PhoneHash) {
        self.resolvers.remove(phone_hash);
    }

    pub fn resolver_entries(&self, phone_hash: &PhoneHash) -> &[ResolverEntry] {
        self.resolvers
            .get(phone_hash)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
