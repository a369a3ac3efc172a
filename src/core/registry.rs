use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::core::connection::{ConnectionId, ConnectionRecord, Identity, SharedWriter};
use crate::error::{Result, RustyChatError};

// Manages the set of live connections and their identities
pub struct Registry<W> {
    connections: HashMap<ConnectionId, ConnectionRecord<W>>,
}

impl<W> Default for Registry<W> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W> Registry<W> {
    pub fn new() -> Self {
        Self {
            connections: HashMap::new(),
        }
    }

    // Register a freshly upgraded connection
    pub fn register(&mut self, writer: &SharedWriter<W>) -> ConnectionId {
        let record = ConnectionRecord::new(writer);
        let id = record.id;
        self.connections.insert(id, record);
        id
    }

    // Remove a connection, returning its last known state
    pub fn unregister(&mut self, id: &ConnectionId) -> Option<ConnectionRecord<W>> {
        self.connections.remove(id)
    }

    /// Give an unidentified connection its display name.
    ///
    /// A connection is named exactly once; later attempts fail.
    pub fn assign_name(&mut self, id: &ConnectionId, name: &str) -> Result<()> {
        let record = self
            .connections
            .get_mut(id)
            .ok_or_else(|| RustyChatError::SessionNotFound(id.to_string()))?;

        if let Identity::Named(existing) = &record.identity {
            return Err(RustyChatError::NameAlreadyAssigned(existing.clone()));
        }

        record.identity = Identity::Named(name.to_string());
        Ok(())
    }

    pub fn get(&self, id: &ConnectionId) -> Option<&ConnectionRecord<W>> {
        self.connections.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConnectionRecord<W>> {
        self.connections.values()
    }

    // Every named connection matching `name`; names are not unique
    pub fn find_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a ConnectionRecord<W>> {
        self.connections.values().filter(move |record| record.is_named(name))
    }

    // Get current clients count
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }
}

// Thread-safe registry wrapper. The lock is held across network writes
// during broadcast and private delivery.
pub type SharedRegistry<W> = Arc<Mutex<Registry<W>>>;

// Create a new thread-safe registry
pub fn create_registry<W>() -> SharedRegistry<W> {
    Arc::new(Mutex::new(Registry::new()))
}
