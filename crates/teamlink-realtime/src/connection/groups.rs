//! Group membership registry: named groups of connections.

use std::collections::HashSet;

use dashmap::DashMap;

use teamlink_core::types::ConnectionId;

/// Registry of group memberships with a per-connection reverse index.
#[derive(Debug, Default)]
pub struct GroupRegistry {
    /// Group name → member connections.
    members: DashMap<String, HashSet<ConnectionId>>,
    /// Connection ID → joined group names.
    joined: DashMap<ConnectionId, HashSet<String>>,
}

impl GroupRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a connection to a group. Returns `false` if already a member.
    pub fn join(&self, group: &str, conn_id: &ConnectionId) -> bool {
        let added = self
            .members
            .entry(group.to_string())
            .or_default()
            .insert(conn_id.clone());
        self.joined
            .entry(conn_id.clone())
            .or_default()
            .insert(group.to_string());
        added
    }

    /// Removes a connection from a group. Returns `false` if not a member.
    pub fn leave(&self, group: &str, conn_id: &ConnectionId) -> bool {
        let removed = self.drop_member(group, conn_id);
        if let Some(mut groups) = self.joined.get_mut(conn_id) {
            groups.remove(group);
        }
        self.joined.remove_if(conn_id, |_, g| g.is_empty());
        removed
    }

    /// Removes a connection from every group it joined.
    pub fn leave_all(&self, conn_id: &ConnectionId) -> Vec<String> {
        let groups: Vec<String> = self
            .joined
            .remove(conn_id)
            .map(|(_, groups)| groups.into_iter().collect())
            .unwrap_or_default();
        for group in &groups {
            self.drop_member(group, conn_id);
        }
        groups
    }

    fn drop_member(&self, group: &str, conn_id: &ConnectionId) -> bool {
        let removed = match self.members.get_mut(group) {
            Some(mut set) => set.remove(conn_id),
            None => false,
        };
        self.members.remove_if(group, |_, set| set.is_empty());
        removed
    }

    /// Member connections of a group (snapshot).
    pub fn members(&self, group: &str) -> Vec<ConnectionId> {
        self.members
            .get(group)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Groups a connection has joined.
    pub fn groups_of(&self, conn_id: &ConnectionId) -> Vec<String> {
        let mut groups: Vec<String> = self
            .joined
            .get(conn_id)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default();
        groups.sort();
        groups
    }

    /// Number of groups a connection has joined.
    pub fn group_count(&self, conn_id: &ConnectionId) -> usize {
        self.joined.get(conn_id).map_or(0, |set| set.len())
    }

    /// Number of non-empty groups.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether no group has members.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}
