//! Local directories: who is attached to this process, and which local
//! connections belong to which groups.
//!
//! These indices answer only "who is local". Fleet-wide membership lives in
//! the distributor and is authoritative; everything here is lost on restart
//! and can be re-derived from it.

use parking_lot::Mutex;
use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};
use switchboard_core::Connection;

/// A connection shared between the transport and the router.
pub type SharedConnection = Arc<dyn Connection>;

/// Connection id → connection, for connections attached to this process.
#[derive(Default)]
pub struct ConnectionDirectory {
    connections: Mutex<HashMap<String, SharedConnection>>,
}

impl ConnectionDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Index a connection, returning any previous entry with the same id.
    pub fn add(&self, connection: SharedConnection) -> Option<SharedConnection> {
        let id = connection.id().to_owned();
        self.connections.lock().insert(id, connection)
    }

    /// Drop a connection from the index.
    pub fn remove(&self, id: &str) -> Option<SharedConnection> {
        self.connections.lock().remove(id)
    }

    /// Look up a local connection.
    pub fn get(&self, id: &str) -> Option<SharedConnection> {
        self.connections.lock().get(id).cloned()
    }

    /// Whether a connection is attached here.
    pub fn contains(&self, id: &str) -> bool {
        self.connections.lock().contains_key(id)
    }

    /// Number of attached connections.
    pub fn len(&self) -> usize {
        self.connections.lock().len()
    }

    /// Whether nothing is attached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Default)]
struct GroupIndex {
    /// group id → connection id → connection
    members: HashMap<String, HashMap<String, SharedConnection>>,
    /// connection id → group ids
    memberships: HashMap<String, HashSet<String>>,
}

impl GroupIndex {
    fn remove(&mut self, connection_id: &str, group_id: &str) -> bool {
        let removed = match self.members.get_mut(group_id) {
            Some(members) => {
                let removed = members.remove(connection_id).is_some();
                if members.is_empty() {
                    self.members.remove(group_id);
                }
                removed
            }
            None => false,
        };
        if let Some(groups) = self.memberships.get_mut(connection_id) {
            groups.remove(group_id);
            if groups.is_empty() {
                self.memberships.remove(connection_id);
            }
        }
        removed
    }
}

/// Group id → local members, with the reverse index kept in step.
///
/// Both indices live behind one lock, so every mutation updates them together.
#[derive(Default)]
pub struct GroupDirectory {
    index: Mutex<GroupIndex>,
}

impl GroupDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a local connection to a group. Returns `false` if it was already a member.
    pub fn add(&self, connection: &SharedConnection, group_id: &str) -> bool {
        let connection_id = connection.id().to_owned();
        let mut index = self.index.lock();
        index
            .memberships
            .entry(connection_id.clone())
            .or_default()
            .insert(group_id.to_owned());
        index
            .members
            .entry(group_id.to_owned())
            .or_default()
            .insert(connection_id, Arc::clone(connection))
            .is_none()
    }

    /// Remove a connection from a group. Returns whether it was a member.
    pub fn remove(&self, connection_id: &str, group_id: &str) -> bool {
        self.index.lock().remove(connection_id, group_id)
    }

    /// Remove a connection from every group it joined locally.
    ///
    /// Returns the groups it left.
    pub fn remove_connection_everywhere(&self, connection_id: &str) -> Vec<String> {
        let mut index = self.index.lock();
        let groups: Vec<String> = index
            .memberships
            .get(connection_id)
            .map(|groups| groups.iter().cloned().collect())
            .unwrap_or_default();
        for group_id in &groups {
            index.remove(connection_id, group_id);
        }
        groups
    }

    /// Local members of a group. Empty when no member is attached here.
    pub fn members(&self, group_id: &str) -> Vec<SharedConnection> {
        self.index
            .lock()
            .members
            .get(group_id)
            .map(|members| members.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Whether a connection is a local member of a group.
    pub fn is_member(&self, connection_id: &str, group_id: &str) -> bool {
        self.index
            .lock()
            .members
            .get(group_id)
            .is_some_and(|members| members.contains_key(connection_id))
    }

    /// Groups a connection joined locally, sorted.
    pub fn groups_of(&self, connection_id: &str) -> Vec<String> {
        let mut groups: Vec<String> = self
            .index
            .lock()
            .memberships
            .get(connection_id)
            .map(|groups| groups.iter().cloned().collect())
            .unwrap_or_default();
        groups.sort();
        groups
    }
}
