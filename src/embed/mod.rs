//! Embedding collaborators: the local vector cache, the remote compute/store
//! service, and the sequential generation worker that connects them.

mod client;
mod generate;
mod store;

use thiserror::Error;

pub use client::HttpEmbeddingService;
pub use generate::{GenerationEvent, GenerationRequest, spawn_generation};
pub use store::JsonEmbeddingStore;
#[cfg(test)]
pub use store::MemoryEmbeddingCache;

#[derive(Debug, Error)]
pub enum EmbedError {
    #[error("embedding service returned {status}: {body}")]
    RemoteService { status: u16, body: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("unexpected response: {0}")]
    Decode(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type EmbedResult<T> = Result<T, EmbedError>;

/// Persistence for document embeddings, keyed by document id.
pub trait EmbeddingCache {
    fn get_cached_embedding(&self, document_id: &str) -> Option<Vec<f32>>;

    fn put_cached_embedding(&mut self, document_id: &str, vector: Vec<f32>) -> EmbedResult<()>;

    /// Stores several vectors at once. Persistent caches write once per batch.
    fn put_cached_embeddings(&mut self, entries: Vec<(String, Vec<f32>)>) -> EmbedResult<()> {
        for (document_id, vector) in entries {
            self.put_cached_embedding(&document_id, vector)?;
        }
        Ok(())
    }
}

/// Remote embedding computation, with optional remote persistence of results.
pub trait EmbeddingService: Send + Sync {
    fn compute_embedding(&self, text: &str) -> EmbedResult<Vec<f32>>;

    /// Whether [`EmbeddingService::persist_embedding`] does anything.
    fn persists_remotely(&self) -> bool {
        false
    }

    fn persist_embedding(&self, _document_id: &str, _vector: &[f32]) -> EmbedResult<()> {
        Ok(())
    }
}
