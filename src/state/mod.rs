mod comments;
mod documents;
mod registry;

pub use comments::CommentLog;
pub use documents::Documents;
pub use registry::{Registry, Unbound};

use crate::store::{DocumentStore, MemoryStore};
use crate::ws::connection::DEFAULT_OUTBOUND_CAPACITY;
use std::sync::Arc;

/// Shared application state, created once at startup and handed to every
/// connection task
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<Registry>,
    pub comments: Arc<CommentLog>,
    pub documents: Documents,
    /// Outbound queue size for new connections
    pub outbound_capacity: usize,
}

impl AppState {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        let comments = Arc::new(CommentLog::new());
        Self {
            registry: Arc::new(Registry::new(comments.clone())),
            comments,
            documents: Documents::new(store),
            outbound_capacity: DEFAULT_OUTBOUND_CAPACITY,
        }
    }

    pub fn with_outbound_capacity(mut self, capacity: usize) -> Self {
        self.outbound_capacity = capacity.max(1);
        self
    }

    /// State backed by an in-memory store
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::in_memory()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Comment;
    use crate::ws::Connection;

    #[tokio::test]
    async fn test_registry_and_comment_log_share_teardown() {
        let state = AppState::in_memory();
        let (conn, _rx) = Connection::new(4);

        state.registry.bind(&conn, "doc");
        state.comments.append("doc", Comment::now("alice", "hi"));
        state.registry.unbind(conn.id());

        assert!(state.comments.snapshot("doc").is_empty());
    }

    #[test]
    fn test_outbound_capacity_has_floor() {
        let state = AppState::in_memory().with_outbound_capacity(0);
        assert_eq!(state.outbound_capacity, 1);
        assert_eq!(AppState::default().outbound_capacity, DEFAULT_OUTBOUND_CAPACITY);
    }
}
