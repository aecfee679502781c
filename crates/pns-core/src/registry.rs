//! Registry operations: the state machine over verification, lifecycle and storage.
//!
//! Per phone hash a record moves through
//! `Unregistered -> Active -> PastExpiry -> PastGrace -> Active (new owner) -> ...`.
//! Every operation checks all of its preconditions before writing anything,
//! so a failed call never leaves a partial mutation behind. Events are
//! emitted only after the write has been applied.

use crate::authority::{AccessControl, AdminAction, AdminList, ConfigurationAuthority};
use crate::clock::{Clock, SystemClock};
use crate::error::{RegistryError, RegistryResult};
use crate::eth::EthSignatureVerifier;
use crate::events::{EventSink, RegistryEvent, TracingEventSink};
use crate::lifecycle::{self, LifecycleStatus};
use crate::store::RegistryStore;
use crate::types::{Address, PhoneHash, Record, RecordView, ResolverEntry};
use crate::verification::{SignatureVerifier, VerificationGate};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Everything the registry persists.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistryState {
    #[serde(default)]
    pub authority: ConfigurationAuthority,
    #[serde(default)]
    pub store: RegistryStore,
    #[serde(default)]
    pub verifications: VerificationGate,
}

/// The phone number registry.
///
/// Mutations take `&mut self`; share it behind a lock to serialize callers.
pub struct Registry {
    state: RegistryState,
    clock: Arc<dyn Clock>,
    verifier: Arc<dyn SignatureVerifier>,
    access: Arc<dyn AccessControl>,
    events: Arc<dyn EventSink>,
}

/// Assembles a [`Registry`] from its collaborators.
pub struct RegistryBuilder {
    state: RegistryState,
    clock: Arc<dyn Clock>,
    verifier: Arc<dyn SignatureVerifier>,
    access: Arc<dyn AccessControl>,
    events: Arc<dyn EventSink>,
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self {
            state: RegistryState::default(),
            clock: Arc::new(SystemClock),
            verifier: Arc::new(EthSignatureVerifier),
            access: Arc::new(AdminList::default()),
            events: Arc::new(TracingEventSink),
        }
    }
}

impl RegistryBuilder {
    /// Start from previously persisted state.
    pub fn state(mut self, state: RegistryState) -> Self {
        self.state = state;
        self
    }

    /// Replace the configuration held in the state.
    pub fn authority(mut self, authority: ConfigurationAuthority) -> Self {
        self.state.authority = authority;
        self
    }

    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn verifier(mut self, verifier: impl SignatureVerifier + 'static) -> Self {
        self.verifier = Arc::new(verifier);
        self
    }

    pub fn access_control(mut self, access: impl AccessControl + 'static) -> Self {
        self.access = Arc::new(access);
        self
    }

    pub fn event_sink(mut self, events: impl EventSink + 'static) -> Self {
        self.events = Arc::new(events);
        self
    }

    pub fn build(self) -> Registry {
        Registry {
            state: self.state,
            clock: self.clock,
            verifier: self.verifier,
            access: self.access,
            events: self.events,
        }
    }
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    pub fn state(&self) -> &RegistryState {
        &self.state
    }

    /// Swap in a previously captured state, e.g. after a failed snapshot write.
    pub fn replace_state(&mut self, state: RegistryState) {
        self.state = state;
    }

    pub fn authority(&self) -> &ConfigurationAuthority {
        &self.state.authority
    }

    pub fn record_count(&self) -> usize {
        self.state.store.len()
    }

    pub fn now(&self) -> u64 {
        self.clock.now()
    }

    fn emit(&self, event: RegistryEvent) {
        self.events.emit(&event);
    }

    fn status_of(&self, record: &Record, now: u64) -> LifecycleStatus {
        let durations = self.state.authority.effective_durations(record);
        lifecycle::status(record.created_at, now, durations)
    }

    fn require_record(&self, phone_hash: &PhoneHash) -> RegistryResult<&Record> {
        self.state
            .store
            .get(phone_hash)
            .ok_or(RegistryError::NotFound(*phone_hash))
    }

    /// Write a fresh record and reseed its resolver entries with one entry.
    fn install_record(
        &mut self,
        phone_hash: PhoneHash,
        owner: Address,
        resolver: Address,
        label: &str,
        now: u64,
    ) {
        let durations = self.state.authority.durations_to_pin();
        let store = &mut self.state.store;

        store.clear_resolver_entries(&phone_hash);
        store.put(Record {
            phone_hash,
            owner,
            label: label.to_string(),
            created_at: now,
            durations,
        });
        store.append_resolver_entry(phone_hash, resolver, label);
    }

    // ---- Verification ----

    /// Store the outcome of an OTP verification signed by `caller`.
    #[instrument(skip(self, signature))]
    pub fn set_verification_status(
        &mut self,
        caller: &Address,
        phone_hash: PhoneHash,
        message_hash: [u8; 32],
        status: bool,
        signature: &[u8],
    ) -> RegistryResult<()> {
        let now = self.clock.now();
        self.state.verifications.set_verification_status(
            self.verifier.as_ref(),
            caller,
            phone_hash,
            message_hash,
            status,
            signature,
            now,
        )?;

        info!(%phone_hash, %caller, status, "Phone verification recorded");
        self.emit(RegistryEvent::PhoneVerified { phone_hash });
        Ok(())
    }

    pub fn is_verified(&self, phone_hash: &PhoneHash) -> bool {
        self.state.verifications.is_verified(phone_hash)
    }

    // ---- Record lifecycle ----

    /// Create a record for a verified phone hash.
    ///
    /// Allowed when the hash was never registered or its previous record is
    /// past grace. The verification proof must have been signed by `owner`
    /// and is consumed.
    #[instrument(skip(self))]
    pub fn create_record(
        &mut self,
        phone_hash: PhoneHash,
        owner: Address,
        label: &str,
    ) -> RegistryResult<()> {
        let now = self.clock.now();

        if let Some(existing) = self.state.store.get(&phone_hash) {
            if !self.status_of(existing, now).is_claimable() {
                warn!(%phone_hash, "Create rejected, record still active");
                return Err(RegistryError::AlreadyActive);
            }
        }

        if !self.state.verifications.is_verified_by(&phone_hash, &owner) {
            warn!(%phone_hash, %owner, "Create rejected, phone not verified by owner");
            return Err(RegistryError::NotVerified);
        }

        self.install_record(phone_hash, owner, owner, label, now);
        self.state.verifications.consume(&phone_hash);

        info!(%phone_hash, %owner, label, "Phone record created");
        self.emit(RegistryEvent::PhoneRecordCreated {
            phone_hash,
            owner,
            label: label.to_string(),
        });
        Ok(())
    }

    /// Restart the lifetime of a record that is inside its grace window.
    #[instrument(skip(self))]
    pub fn renew(&mut self, caller: &Address, phone_hash: PhoneHash) -> RegistryResult<()> {
        let now = self.clock.now();
        let record = self.require_record(&phone_hash)?;

        if record.owner != *caller {
            warn!(%phone_hash, %caller, "Renew rejected, caller is not the owner");
            return Err(RegistryError::NotOwner);
        }

        let status = self.status_of(record, now);
        if !status.is_renewable() {
            warn!(%phone_hash, ?status, "Renew rejected, record not in grace period");
            return Err(RegistryError::NotInGracePeriod);
        }

        let durations = self.state.authority.durations_to_pin();
        if let Some(record) = self.state.store.get_mut(&phone_hash) {
            record.created_at = now;
            record.durations = durations;
        }

        info!(%phone_hash, renewed_at = now, "Phone record renewed");
        self.emit(RegistryEvent::PhoneRecordRenewed { phone_hash });
        Ok(())
    }

    /// Hand a fully expired record to a new owner.
    ///
    /// All previous resolver entries are dropped and replaced by a single
    /// entry for `new_resolver`.
    #[instrument(skip(self))]
    pub fn claim_expired_phone_record(
        &mut self,
        phone_hash: PhoneHash,
        new_owner: Address,
        new_resolver: Address,
        new_label: &str,
    ) -> RegistryResult<()> {
        let now = self.clock.now();
        let record = self.require_record(&phone_hash)?;

        let status = self.status_of(record, now);
        if !status.is_claimable() {
            warn!(%phone_hash, ?status, "Claim rejected, record not expired");
            return Err(RegistryError::NotExpired);
        }

        let require_verification = self.state.authority.claim_policy().require_verification;
        if require_verification
            && !self
                .state
                .verifications
                .is_verified_by(&phone_hash, &new_owner)
        {
            warn!(%phone_hash, "Claim rejected, phone not verified");
            return Err(RegistryError::NotVerified);
        }

        self.install_record(phone_hash, new_owner, new_resolver, new_label, now);
        if require_verification {
            self.state.verifications.consume(&phone_hash);
        }

        info!(%phone_hash, %new_owner, label = new_label, "Expired phone record claimed");
        self.emit(RegistryEvent::PhoneRecordCreated {
            phone_hash,
            owner: new_owner,
            label: new_label.to_string(),
        });
        Ok(())
    }

    /// Add a resolver entry to a record the caller owns.
    #[instrument(skip(self))]
    pub fn link_phone_to_wallet(
        &mut self,
        caller: &Address,
        phone_hash: PhoneHash,
        address: Address,
        label: &str,
    ) -> RegistryResult<()> {
        let now = self.clock.now();
        let record = self.require_record(&phone_hash)?;

        if record.owner != *caller {
            warn!(%phone_hash, %caller, "Link rejected, caller is not the owner");
            return Err(RegistryError::NotOwner);
        }

        if self.status_of(record, now).fully_expired() {
            warn!(%phone_hash, "Link rejected, record expired");
            return Err(RegistryError::RecordExpired);
        }

        if self
            .state
            .store
            .resolver_entries(&phone_hash)
            .iter()
            .any(|entry| entry.label == label)
        {
            return Err(RegistryError::DuplicateLabel(label.to_string()));
        }

        let slot = self
            .state
            .store
            .append_resolver_entry(phone_hash, address, label);

        info!(%phone_hash, %address, label, slot, "Resolver linked");
        self.emit(RegistryEvent::ResolverLinked {
            phone_hash,
            address,
            label: label.to_string(),
        });
        Ok(())
    }

    // ---- Configuration ----

    #[instrument(skip(self))]
    pub fn set_expiry_time(&mut self, caller: &Address, new_duration: u64) -> RegistryResult<()> {
        if !self.access.is_authorized(caller, AdminAction::SetExpiryTime) {
            warn!(%caller, "Unauthorized expiry time update");
            return Err(RegistryError::Unauthorized);
        }

        self.state.authority.set_expiry_time(new_duration);

        info!(new_duration, "Expiry time updated");
        self.emit(RegistryEvent::ExpiryTimeUpdated { new_duration });
        Ok(())
    }

    #[instrument(skip(self))]
    pub fn set_grace_period(&mut self, caller: &Address, new_duration: u64) -> RegistryResult<()> {
        if !self.access.is_authorized(caller, AdminAction::SetGracePeriod) {
            warn!(%caller, "Unauthorized grace period update");
            return Err(RegistryError::Unauthorized);
        }

        self.state.authority.set_grace_period(new_duration);

        info!(new_duration, "Grace period updated");
        self.emit(RegistryEvent::GracePeriodUpdated { new_duration });
        Ok(())
    }

    // ---- Reads ----

    /// Current view of a record. Lifecycle flags are evaluated now.
    pub fn get_record(&self, phone_hash: &PhoneHash) -> RegistryResult<RecordView> {
        let now = self.clock.now();
        let record = self.require_record(phone_hash)?;
        let durations = self.state.authority.effective_durations(record);
        let status = lifecycle::status(record.created_at, now, durations);

        Ok(RecordView {
            phone_hash: record.phone_hash,
            owner: record.owner,
            label: record.label.clone(),
            created_at: record.created_at,
            exists: true,
            status,
            in_grace: status.in_grace_or_later(),
            expired: status.fully_expired(),
            expires_at: lifecycle::expires_at(record.created_at, durations),
            grace_ends_at: lifecycle::grace_ends_at(record.created_at, durations),
        })
    }

    pub fn record_exists(&self, phone_hash: &PhoneHash) -> bool {
        self.state.store.contains(phone_hash)
    }

    /// Absolute unix time at which the record's nominal lifetime ends.
    pub fn get_expiry_time(&self, phone_hash: &PhoneHash) -> RegistryResult<u64> {
        let record = self.require_record(phone_hash)?;
        let durations = self.state.authority.effective_durations(record);
        Ok(lifecycle::expires_at(record.created_at, durations))
    }

    pub fn get_resolver_details(&self, phone_hash: &PhoneHash) -> Vec<ResolverEntry> {
        self.state.store.resolver_entries(phone_hash).to_vec()
    }
}
