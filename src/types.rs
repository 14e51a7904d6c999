use serde::{Deserialize, Serialize};

/// Opaque ID types for type safety
pub type DocumentId = String;
pub type ConnectionId = String;

/// Latest persisted content of a document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentContent {
    pub id: DocumentId,
    pub content: String,
}

impl DocumentContent {
    pub fn empty(id: impl Into<DocumentId>) -> Self {
        Self {
            id: id.into(),
            content: String::new(),
        }
    }
}

/// A comment left on a document. Serialized with the wire field names
/// `user`, `comment` and `timestamp`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Comment {
    #[serde(rename = "user")]
    pub author: String,
    #[serde(rename = "comment")]
    pub text: String,
    /// Unix epoch milliseconds
    pub timestamp: i64,
}

impl Comment {
    /// Create a comment stamped with the current time
    pub fn now(author: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            author: author.into(),
            text: text.into(),
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }
}

/// Point-in-time counts of live sessions
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RegistryStats {
    pub documents: usize,
    pub connections: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comment_wire_names() {
        let comment = Comment {
            author: "alice".to_string(),
            text: "nice".to_string(),
            timestamp: 42,
        };
        let json = serde_json::to_value(&comment).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"user": "alice", "comment": "nice", "timestamp": 42})
        );
    }
}
