use crate::store::{DocumentStore, StoreResult};
use crate::types::DocumentContent;
use std::sync::Arc;

/// Thin access layer over the external document store.
///
/// No registry lock is held while the store is awaited. Writes are
/// unconditional: concurrent edits race and the last write wins.
#[derive(Clone)]
pub struct Documents {
    store: Arc<dyn DocumentStore>,
}

impl Documents {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Existing content, or a freshly persisted empty document
    pub async fn fetch_or_create(&self, document_id: &str) -> StoreResult<DocumentContent> {
        if let Some(content) = self.store.get(document_id).await? {
            return Ok(DocumentContent {
                id: document_id.to_string(),
                content,
            });
        }

        tracing::info!("Document {} not found, creating new.", document_id);
        let doc = DocumentContent::empty(document_id);
        self.store.put(&doc.id, &doc.content).await?;
        Ok(doc)
    }

    /// Overwrite the whole document
    pub async fn replace(&self, document_id: &str, content: &str) -> StoreResult<()> {
        self.store.put(document_id, content).await
    }

    pub fn store_name(&self) -> &str {
        self.store.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn test_fetch_or_create_persists_empty_document_once() {
        let store = Arc::new(MemoryStore::new());
        let documents = Documents::new(store.clone());

        let doc = documents.fetch_or_create("doc").await.unwrap();
        assert_eq!(doc, DocumentContent::empty("doc"));
        assert_eq!(store.get("doc").await.unwrap(), Some(String::new()));

        documents.replace("doc", "text").await.unwrap();
        let doc = documents.fetch_or_create("doc").await.unwrap();
        assert_eq!(doc.content, "text");
    }
}
