//! Observable registry events and sinks that receive them.

use crate::types::{Address, PhoneHash};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tracing::info;

/// An event emitted after a registry mutation commits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum RegistryEvent {
    PhoneVerified {
        phone_hash: PhoneHash,
    },
    PhoneRecordCreated {
        phone_hash: PhoneHash,
        owner: Address,
        label: String,
    },
    PhoneRecordRenewed {
        phone_hash: PhoneHash,
    },
    ExpiryTimeUpdated {
        new_duration: u64,
    },
    GracePeriodUpdated {
        new_duration: u64,
    },
    ResolverLinked {
        phone_hash: PhoneHash,
        address: Address,
        label: String,
    },
}

impl RegistryEvent {
    pub fn name(&self) -> &'static str {
        match self {
            RegistryEvent::PhoneVerified { .. } => "PhoneVerified",
            RegistryEvent::PhoneRecordCreated { .. } => "PhoneRecordCreated",
            RegistryEvent::PhoneRecordRenewed { .. } => "PhoneRecordRenewed",
            RegistryEvent::ExpiryTimeUpdated { .. } => "ExpiryTimeUpdated",
            RegistryEvent::GracePeriodUpdated { .. } => "GracePeriodUpdated",
            RegistryEvent::ResolverLinked { .. } => "ResolverLinked",
        }
    }
}

/// Receives committed events.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &RegistryEvent);
}

/// Writes every event to the `tracing` log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn emit(&self, event: &RegistryEvent) {
        match serde_json::to_string(event) {
            Ok(payload) => info!(event = event.name(), %payload, "Registry event"),
            Err(_) => info!(event = event.name(), "Registry event"),
        }
    }
}

/// Keeps the most recent events in memory.
///
/// Clones share the same journal, so a handle can be kept for reading while
/// another is boxed into the registry.
#[derive(Debug, Clone)]
pub struct MemoryEventSink {
    events: Arc<Mutex<VecDeque<RegistryEvent>>>,
    capacity: usize,
}

impl MemoryEventSink {
    pub fn new(capacity: usize) -> Self {
        Self {
            events: Arc::new(Mutex::new(VecDeque::with_capacity(capacity.min(1024)))),
            capacity: capacity.max(1),
        }
    }

    /// Snapshot of the journal, oldest first.
    pub fn events(&self) -> Vec<RegistryEvent> {
        let events = self.events.lock().unwrap_or_else(|e| e.into_inner());
        events.iter().cloned().collect()
    }

    /// Remove and return everything in the journal.
    pub fn drain(&self) -> Vec<RegistryEvent> {
        let mut events = self.events.lock().unwrap_or_else(|e| e.into_inner());
        events.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryEventSink {
    fn default() -> Self {
        Self::new(1_000)
    }
}

impl EventSink for MemoryEventSink {
    fn emit(&self, event: &RegistryEvent) {
        let mut events = self.events.lock().unwrap_or_else(|e| e.into_inner());
        if events.len() == self.capacity {
            events.pop_front();
        }
        events.push_back(event.clone());
    }
}

/// Fans an event out to several sinks in order.
pub struct FanoutEventSink {
    sinks: Vec<Box<dyn EventSink>>,
}

impl FanoutEventSink {
    pub fn new(sinks: Vec<Box<dyn EventSink>>) -> Self {
        Self { sinks }
    }
}

impl EventSink for FanoutEventSink {
    fn emit(&self, event: &RegistryEvent) {
        for sink in &self.sinks {
            sink.emit(event);
        }
    }
}

/// Holds events back until the change that produced them is known to stand.
///
/// The owner of the registry calls [`DeferredEventSink::publish`] once the
/// mutation is durable, or [`DeferredEventSink::discard`] if it was undone.
/// Clones share the same pending queue.
#[derive(Clone)]
pub struct DeferredEventSink {
    pending: Arc<Mutex<Vec<RegistryEvent>>>,
    downstream: Arc<dyn EventSink>,
}

impl DeferredEventSink {
    pub fn new(downstream: impl EventSink + 'static) -> Self {
        Self {
            pending: Arc::new(Mutex::new(Vec::new())),
            downstream: Arc::new(downstream),
        }
    }

    /// Forward every held event downstream, oldest first.
    pub fn publish(&self) -> usize {
        let events = self.take();
        for event in &events {
            self.downstream.emit(event);
        }
        events.len()
    }

    /// Drop every held event.
    pub fn discard(&self) -> usize {
        self.take().len()
    }

    pub fn pending(&self) -> usize {
        self.pending.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    fn take(&self) -> Vec<RegistryEvent> {
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        std::mem::take(&mut *pending)
    }
}

impl EventSink for DeferredEventSink {
    fn emit(&self, event: &RegistryEvent) {
        self.pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event.clone());
    }
}
