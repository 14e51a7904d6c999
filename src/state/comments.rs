use crate::types::{Comment, DocumentId};
use dashmap::DashMap;

/// Per-document, append-only comment log kept in memory
#[derive(Debug, Default)]
pub struct CommentLog {
    comments: DashMap<DocumentId, Vec<Comment>>,
}

impl CommentLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a comment to the end of a document's log
    pub fn append(&self, document_id: &str, comment: Comment) {
        self.comments
            .entry(document_id.to_string())
            .or_default()
            .push(comment);
    }

    /// Comments in insertion order, empty if the document has none
    pub fn snapshot(&self, document_id: &str) -> Vec<Comment> {
        self.comments
            .get(document_id)
            .map(|c| c.value().clone())
            .unwrap_or_default()
    }

    /// Drop a document's log. Only called when its session is torn down.
    pub(crate) fn clear(&self, document_id: &str) {
        if let Some((_, removed)) = self.comments.remove(document_id) {
            tracing::debug!(
                "Cleared {} comments for inactive document {}",
                removed.len(),
                document_id
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_keeps_insertion_order() {
        let log = CommentLog::new();
        log.append("doc", Comment::now("alice", "first"));
        log.append("doc", Comment::now("bob", "second"));

        let texts: Vec<_> = log.snapshot("doc").into_iter().map(|c| c.text).collect();
        assert_eq!(texts, vec!["first", "second"]);
    }

    #[test]
    fn test_snapshot_of_unknown_document_is_empty() {
        let log = CommentLog::new();
        assert!(log.snapshot("missing").is_empty());
    }

    #[test]
    fn test_clear_only_affects_one_document() {
        let log = CommentLog::new();
        log.append("a", Comment::now("alice", "one"));
        log.append("b", Comment::now("bob", "two"));

        log.clear("a");
        assert!(log.snapshot("a").is_empty());
        assert_eq!(log.snapshot("b").len(), 1);
    }
}
