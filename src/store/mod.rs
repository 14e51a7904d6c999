mod file;
mod memory;

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;

pub use crate::error::StoreError;
pub use file::FileStore;
pub use memory::MemoryStore;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Key-value document store: document id -> latest content
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch the stored content, `None` if the document was never written
    async fn get(&self, document_id: &str) -> StoreResult<Option<String>>;

    /// Replace the stored content
    async fn put(&self, document_id: &str, content: &str) -> StoreResult<()>;

    /// Short name used in logs
    fn name(&self) -> &str;
}

/// Build the store selected by configuration: files under `data_dir` if set,
/// otherwise in memory.
pub async fn open(data_dir: Option<PathBuf>) -> StoreResult<Arc<dyn DocumentStore>> {
    match data_dir {
        Some(dir) => {
            let store = FileStore::open(dir).await?;
            Ok(Arc::new(store))
        }
        None => {
            tracing::warn!("No data directory configured, documents are kept in memory only");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}
