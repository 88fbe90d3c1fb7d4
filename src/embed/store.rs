use std::collections::BTreeMap;
#[cfg(test)]
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use super::{EmbedResult, EmbeddingCache};

#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemoryEmbeddingCache {
    entries: HashMap<String, Vec<f32>>,
}

#[cfg(test)]
impl MemoryEmbeddingCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
impl EmbeddingCache for MemoryEmbeddingCache {
    fn get_cached_embedding(&self, document_id: &str) -> Option<Vec<f32>> {
        self.entries.get(document_id).cloned()
    }

    fn put_cached_embedding(&mut self, document_id: &str, vector: Vec<f32>) -> EmbedResult<()> {
        self.entries.insert(document_id.to_owned(), vector);
        Ok(())
    }
}

/// Embeddings kept in memory and mirrored to a single JSON file on every put or batch.
#[derive(Debug)]
pub struct JsonEmbeddingStore {
    path: PathBuf,
    entries: BTreeMap<String, Vec<f32>>,
}

impl JsonEmbeddingStore {
    pub fn open(path: impl Into<PathBuf>) -> EmbedResult<Self> {
        let path = path.into();
        let entries = if path.exists() {
            let raw = fs::read_to_string(&path)?;
            serde_json::from_str(&raw)?
        } else {
            BTreeMap::new()
        };

        tracing::debug!(path = %path.display(), cached = entries.len(), "opened embedding store");
        Ok(Self { path, entries })
    }

    pub fn cached_count(&self) -> usize {
        self.entries.len()
    }

    fn flush(&self) -> EmbedResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let staging = self.path.with_extension("json.tmp");
        fs::write(&staging, serde_json::to_vec(&self.entries)?)?;
        fs::rename(&staging, &self.path)?;
        Ok(())
    }
}

impl EmbeddingCache for JsonEmbeddingStore {
    fn get_cached_embedding(&self, document_id: &str) -> Option<Vec<f32>> {
        self.entries.get(document_id).cloned()
    }

    fn put_cached_embedding(&mut self, document_id: &str, vector: Vec<f32>) -> EmbedResult<()> {
        self.entries.insert(document_id.to_owned(), vector);
        self.flush()
    }

    fn put_cached_embeddings(&mut self, entries: Vec<(String, Vec<f32>)>) -> EmbedResult<()> {
        if entries.is_empty() {
            return Ok(());
        }
        self.entries.extend(entries);
        self.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache").join("embeddings.json");

        let mut store = JsonEmbeddingStore::open(&path).unwrap();
        assert_eq!(store.get_cached_embedding("a.md"), None);
        store.put_cached_embedding("a.md", vec![0.25, -1.0]).unwrap();
        store.put_cached_embedding("b.md", vec![1.0, 0.0]).unwrap();

        let reopened = JsonEmbeddingStore::open(&path).unwrap();
        assert_eq!(reopened.cached_count(), 2);
        assert_eq!(reopened.get_cached_embedding("a.md"), Some(vec![0.25, -1.0]));
    }

    #[test]
    fn batch_put_writes_every_entry_in_one_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("embeddings.json");

        let mut store = JsonEmbeddingStore::open(&path).unwrap();
        store.put_cached_embeddings(Vec::new()).unwrap();
        assert!(!path.exists());

        let batch = (0..50)
            .map(|index| (format!("note-{index}.md"), vec![index as f32, 1.0]))
            .collect();
        store.put_cached_embeddings(batch).unwrap();
        assert!(!path.with_extension("json.tmp").exists());

        let reopened = JsonEmbeddingStore::open(&path).unwrap();
        assert_eq!(reopened.cached_count(), 50);
        assert_eq!(
            reopened.get_cached_embedding("note-49.md"),
            Some(vec![49.0, 1.0])
        );
    }

    #[test]
    fn default_batch_put_falls_back_to_single_puts() {
        let mut cache = MemoryEmbeddingCache::new();
        cache
            .put_cached_embeddings(vec![
                ("a.md".to_owned(), vec![1.0]),
                ("a.md".to_owned(), vec![3.0]),
            ])
            .unwrap();
        assert_eq!(cache.get_cached_embedding("a.md"), Some(vec![3.0]));
    }

    #[test]
    fn corrupt_store_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("embeddings.json");
        fs::write(&path, "{ not json").unwrap();

        assert!(JsonEmbeddingStore::open(&path).is_err());
    }

    #[test]
    fn memory_cache_overwrites_entries() {
        let mut cache = MemoryEmbeddingCache::new();
        cache.put_cached_embedding("a.md", vec![1.0]).unwrap();
        cache.put_cached_embedding("a.md", vec![2.0]).unwrap();
        assert_eq!(cache.get_cached_embedding("a.md"), Some(vec![2.0]));
    }
}
