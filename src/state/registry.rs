//! Connection registry
//!
//! Two indexes kept consistent with each other:
//! - connection id -> bound document, display name, handle
//! - document id -> ids of the connections bound to it
//!
//! A document entry exists only while at least one connection is bound to it.
//! Removing the last connection tears the session down, including its comments.

use super::comments::CommentLog;
use crate::error::{CollabError, CollabResult};
use crate::types::{ConnectionId, DocumentId, RegistryStats};
use crate::ws::Connection;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone)]
struct ConnectionState {
    document_id: DocumentId,
    display_name: Option<String>,
    /// Position in the global join order, set together with the name
    joined_at: Option<u64>,
    handle: Connection,
}

/// What a connection was bound to when it was removed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unbound {
    pub document_id: DocumentId,
    pub name: Option<String>,
    /// True if this was the last connection on the document
    pub session_closed: bool,
}

#[derive(Debug)]
pub struct Registry {
    connections: DashMap<ConnectionId, ConnectionState>,
    documents: DashMap<DocumentId, HashSet<ConnectionId>>,
    comments: Arc<CommentLog>,
    join_seq: AtomicU64,
}

impl Registry {
    pub fn new(comments: Arc<CommentLog>) -> Self {
        Self {
            connections: DashMap::new(),
            documents: DashMap::new(),
            comments,
            join_seq: AtomicU64::new(0),
        }
    }

    /// Register a connection against a document before its name is known.
    /// The session is created on first bind. Binding again to the same
    /// document leaves the existing binding and name untouched.
    pub fn bind(&self, connection: &Connection, document_id: &str) {
        let already_bound = self
            .connections
            .get(connection.id())
            .is_some_and(|state| state.document_id == document_id);
        if already_bound {
            tracing::debug!(
                "Connection {} is already bound to {}",
                connection.id(),
                document_id
            );
            return;
        }

        let previous = self.connections.insert(
            connection.id().clone(),
            ConnectionState {
                document_id: document_id.to_string(),
                display_name: None,
                joined_at: None,
                handle: connection.clone(),
            },
        );
        if let Some(previous) = previous {
            tracing::warn!(
                "Connection {} rebound from {} to {}",
                connection.id(),
                previous.document_id,
                document_id
            );
            self.detach(connection.id(), &previous.document_id);
        }

        self.documents
            .entry(document_id.to_string())
            .or_default()
            .insert(connection.id().clone());
    }

    /// Record the display name for a bound connection
    pub fn set_name(&self, connection_id: &str, name: &str) -> CollabResult<()> {
        if name.trim().is_empty() {
            return Err(CollabError::InvalidName);
        }

        let mut state = self
            .connections
            .get_mut(connection_id)
            .ok_or_else(|| CollabError::UnknownConnection(connection_id.to_string()))?;
        state.display_name = Some(name.to_string());
        state.joined_at = Some(self.join_seq.fetch_add(1, Ordering::Relaxed));
        Ok(())
    }

    /// Remove a connection from both indexes. Returns `None` if the
    /// connection was never bound (or was already removed).
    pub fn unbind(&self, connection_id: &str) -> Option<Unbound> {
        let (_, state) = self.connections.remove(connection_id)?;
        let session_closed = self.detach(connection_id, &state.document_id);

        Some(Unbound {
            document_id: state.document_id,
            name: state.display_name,
            session_closed,
        })
    }

    /// Drop a connection id from a document's set, tearing the session down if
    /// it was the last one. The entry lock is held across the emptiness check,
    /// so a concurrent bind either lands before (keeping the session) or
    /// recreates it afterwards.
    fn detach(&self, connection_id: &str, document_id: &str) -> bool {
        match self.documents.entry(document_id.to_string()) {
            Entry::Occupied(mut entry) => {
                entry.get_mut().remove(connection_id);
                if entry.get().is_empty() {
                    entry.remove();
                    self.comments.clear(document_id);
                    tracing::info!(
                        "All sessions closed for document {}. It is now inactive.",
                        document_id
                    );
                    true
                } else {
                    false
                }
            }
            Entry::Vacant(_) => false,
        }
    }

    /// Distinct, non-empty display names bound to a document, in join order
    pub fn collaborators(&self, document_id: &str) -> Vec<String> {
        let ids = self.member_ids(document_id);

        let mut named: Vec<(u64, String)> = ids
            .iter()
            .filter_map(|id| {
                let state = self.connections.get(id)?;
                match (&state.display_name, state.joined_at) {
                    (Some(name), Some(seq)) if !name.is_empty() => Some((seq, name.clone())),
                    _ => None,
                }
            })
            .collect();
        named.sort_by_key(|(seq, _)| *seq);

        let mut seen = HashSet::new();
        named
            .into_iter()
            .filter_map(|(_, name)| seen.insert(name.clone()).then_some(name))
            .collect()
    }

    /// Snapshot of the connections bound to a document
    pub fn connections_of(&self, document_id: &str) -> Vec<Connection> {
        self.member_ids(document_id)
            .iter()
            .filter_map(|id| self.connections.get(id).map(|s| s.handle.clone()))
            .collect()
    }

    pub fn document_of(&self, connection_id: &str) -> Option<DocumentId> {
        self.connections
            .get(connection_id)
            .map(|s| s.document_id.clone())
    }

    pub fn name_of(&self, connection_id: &str) -> Option<String> {
        self.connections
            .get(connection_id)
            .and_then(|s| s.display_name.clone())
    }

    pub fn is_active(&self, document_id: &str) -> bool {
        self.documents.contains_key(document_id)
    }

    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            documents: self.documents.len(),
            connections: self.connections.len(),
        }
    }

    // Copy the id set out so no document shard lock is held while the
    // connection map is read.
    fn member_ids(&self, document_id: &str) -> Vec<ConnectionId> {
        self.documents
            .get(document_id)
            .map(|ids| ids.iter().cloned().collect())
            .unwrap_or_default()
    }
}
