use super::*;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// In-process store, lost on restart
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, document_id: &str) -> StoreResult<Option<String>> {
        Ok(self.documents.read().await.get(document_id).cloned())
    }

    async fn put(&self, document_id: &str, content: &str) -> StoreResult<()> {
        self.documents
            .write()
            .await
            .insert(document_id.to_string(), content.to_string());
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_then_get() {
        let store = MemoryStore::new();
        assert_eq!(store.get("doc").await.unwrap(), None);

        store.put("doc", "hello").await.unwrap();
        store.put("doc", "hello world").await.unwrap();
        assert_eq!(store.get("doc").await.unwrap(), Some("hello world".to_string()));
    }
}
