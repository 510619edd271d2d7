//! Arena of active connections.
//!
//! Every accepted connection lives here, keyed by a fresh [`ConnectionHandle`],
//! until a terminal response is written for it. Insert and remove are the only
//! structural mutations; a connection promoted to the log stream is removed
//! from the arena and owned by the [`LogSink`](crate::sse::LogSink) instead.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::ids::ConnectionHandle;
use crate::server::Connection;

/// Lifecycle state of a registry entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    /// Waiting for a request
    Open,
    /// A handler has been invoked and its response has not been written yet
    Awaiting,
}

struct Entry {
    connection: Box<dyn Connection>,
    state: EntryState,
}

/// Mapping from handle to connection state record.
#[derive(Default)]
pub struct Registry {
    entries: HashMap<ConnectionHandle, Entry>,
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a newly accepted connection under a fresh handle.
    pub fn insert(&mut self, connection: Box<dyn Connection>) -> ConnectionHandle {
        let handle = ConnectionHandle::new();
        self.entries.insert(
            handle,
            Entry {
                connection,
                state: EntryState::Open,
            },
        );
        handle
    }

    /// Evict an entry, handing its connection back to the caller.
    pub fn remove(&mut self, handle: ConnectionHandle) -> Option<Box<dyn Connection>> {
        self.entries.remove(&handle).map(|e| e.connection)
    }

    #[must_use]
    pub fn contains(&self, handle: ConnectionHandle) -> bool {
        self.entries.contains_key(&handle)
    }

    #[must_use]
    pub fn state(&self, handle: ConnectionHandle) -> Option<EntryState> {
        self.entries.get(&handle).map(|e| e.state)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Handles of open entries whose connection has a complete request buffered.
    #[must_use]
    pub fn ready_handles(&self) -> Vec<ConnectionHandle> {
        self.entries
            .iter()
            .filter(|(_, e)| e.state == EntryState::Open && e.connection.data_available())
            .map(|(h, _)| *h)
            .collect()
    }

    /// Take the next request from an open entry and mark it as awaiting a response.
    ///
    /// Returns `None` if the entry is gone, already awaiting, or has no data.
    pub fn take_request(&mut self, handle: ConnectionHandle) -> Option<Vec<u8>> {
        let entry = self.entries.get_mut(&handle)?;
        if entry.state != EntryState::Open || !entry.connection.data_available() {
            return None;
        }
        entry.state = EntryState::Awaiting;
        Some(entry.connection.take_request())
    }

    /// Evict open entries whose transport was lost before any request arrived.
    ///
    /// Awaiting entries are left alone: their pending response evicts them.
    pub fn reap_lost(&mut self) -> Vec<ConnectionHandle> {
        let lost: Vec<ConnectionHandle> = self
            .entries
            .iter()
            .filter(|(_, e)| {
                e.state == EntryState::Open
                    && e.connection.is_lost()
                    && !e.connection.data_available()
            })
            .map(|(h, _)| *h)
            .collect();
        for handle in &lost {
            self.entries.remove(handle);
        }
        lost
    }

    /// Remove every entry, returning the connections for shutdown.
    pub fn drain(&mut self) -> Vec<(ConnectionHandle, Box<dyn Connection>)> {
        self.entries
            .drain()
            .map(|(h, e)| (h, e.connection))
            .collect()
    }
}

/// Process-wide registry shared between the control loop and pending responses.
#[derive(Clone, Default)]
pub struct SharedRegistry(Arc<Mutex<Registry>>);

impl SharedRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock the registry.
    ///
    /// Every mutation is a single insert or remove, so a poisoned lock still
    /// guards consistent data and is recovered.
    pub fn lock(&self) -> MutexGuard<'_, Registry> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
