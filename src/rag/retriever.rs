use std::sync::Arc;

use crate::errors::ApiError;
use crate::llm::types::FileChunk;

use super::embedder::EmbeddingBackend;
use super::store::EmbeddingStore;

/// Query → top-K stored chunks, by cosine distance.
///
/// No query expansion, no reranking, no deduplication across chunks of one
/// file: if several of a file's chunks land in the top K they are all
/// returned independently.
#[derive(Clone)]
pub struct Retriever {
    store: Arc<dyn EmbeddingStore>,
    backend: Arc<dyn EmbeddingBackend>,
}

impl Retriever {
    pub fn new(store: Arc<dyn EmbeddingStore>, backend: Arc<dyn EmbeddingBackend>) -> Self {
        Self { store, backend }
    }

    pub async fn retrieve(
        &self,
        model: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<FileChunk>, ApiError> {
        let vectors = self.backend.embed(model, &[query.to_string()]).await?;
        let query_vector = vectors.first().ok_or_else(|| {
            ApiError::EmbeddingBackend("Embed response carries no embeddings".to_string())
        })?;

        let rows = self
            .store
            .nearest_by_distance(query_vector, model, limit)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| FileChunk {
                filename: row.filename,
                content: row.content,
            })
            .collect())
    }
}
