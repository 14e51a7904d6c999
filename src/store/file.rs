//! One file per document under a data directory
//!
//! Document ids are opaque client-supplied strings, so file names are the
//! hex encoding of the id. Writes go to a temporary file that is renamed
//! over the target, so readers see either the old or the new content.

use super::*;
use std::sync::atomic::{AtomicU64, Ordering};

const EXTENSION: &str = "doc";

#[derive(Debug)]
pub struct FileStore {
    root: PathBuf,
    tmp_seq: AtomicU64,
}

impl FileStore {
    /// Open (and create if needed) a store rooted at `root`
    pub async fn open(root: impl Into<PathBuf>) -> StoreResult<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        tracing::info!("File store opened at {}", root.display());
        Ok(Self {
            root,
            tmp_seq: AtomicU64::new(0),
        })
    }

    fn path_for(&self, document_id: &str) -> PathBuf {
        self.root
            .join(format!("{}.{}", hex::encode(document_id), EXTENSION))
    }
}

#[async_trait]
impl DocumentStore for FileStore {
    async fn get(&self, document_id: &str) -> StoreResult<Option<String>> {
        match tokio::fs::read(self.path_for(document_id)).await {
            Ok(bytes) => String::from_utf8(bytes)
                .map(Some)
                .map_err(|_| StoreError::Corrupt(document_id.to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn put(&self, document_id: &str, content: &str) -> StoreResult<()> {
        let target = self.path_for(document_id);
        let seq = self.tmp_seq.fetch_add(1, Ordering::Relaxed);
        let tmp = target.with_extension(format!("{}.tmp{}", EXTENSION, seq));

        tokio::fs::write(&tmp, content.as_bytes()).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &target).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "file"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_round_trip_and_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();

        assert_eq!(store.get("doc1").await.unwrap(), None);
        store.put("doc1", "first").await.unwrap();
        store.put("doc1", "second").await.unwrap();
        assert_eq!(store.get("doc1").await.unwrap(), Some("second".to_string()));
    }

    #[tokio::test]
    async fn test_ids_with_path_characters_stay_inside_root() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();

        store.put("../escape", "x").await.unwrap();
        store.put("a b%2F", "y").await.unwrap();

        let mut entries = tokio::fs::read_dir(dir.path()).await.unwrap();
        let mut count = 0;
        while let Some(entry) = entries.next_entry().await.unwrap() {
            assert_eq!(entry.path().parent(), Some(dir.path()));
            count += 1;
        }
        assert_eq!(count, 2);
        assert_eq!(store.get("../escape").await.unwrap(), Some("x".to_string()));
    }

    #[tokio::test]
    async fn test_content_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = FileStore::open(dir.path()).await.unwrap();
            store.put("doc", "persisted").await.unwrap();
        }
        let store = FileStore::open(dir.path()).await.unwrap();
        assert_eq!(store.get("doc").await.unwrap(), Some("persisted".to_string()));
    }

    #[tokio::test]
    async fn test_open_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a/b");
        let store = FileStore::open(&nested).await.unwrap();
        assert!(nested.is_dir());

        store.put("doc", "x").await.unwrap();
        assert_eq!(store.get("doc").await.unwrap(), Some("x".to_string()));
    }
}
