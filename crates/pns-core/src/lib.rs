//! Phone number naming registry.
//!
//! Binds a hashed phone number to an owner, a label and a list of resolver
//! entries, under a time-based lifecycle:
//! - Records can only be created for phone numbers verified by OTP signature
//! - After expiry the owner has a grace period in which to renew
//! - Past grace, anyone may claim the record, wiping its previous resolvers

pub mod authority;
pub mod clock;
pub mod error;
pub mod eth;
pub mod events;
pub mod lifecycle;
pub mod registry;
pub mod store;
pub mod types;
pub mod verification;

pub use authority::{
    AccessControl, AdminAction, AdminList, ClaimPolicy, ConfigurationAuthority, DurationBinding,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{RegistryError, RegistryResult};
pub use eth::{hash_phone_number, otp_message_hash, EthSignatureVerifier};
pub use events::{
    DeferredEventSink, EventSink, FanoutEventSink, MemoryEventSink, RegistryEvent,
    TracingEventSink,
};
pub use lifecycle::{Durations, LifecycleStatus};
pub use registry::{Registry, RegistryBuilder, RegistryState};
pub use store::RegistryStore;
pub use types::{Address, ParseIdError, PhoneHash, Record, RecordView, ResolverEntry};
pub use verification::{SignatureVerifier, VerificationGate, VerificationProof};
