//! EmbeddingStore trait — abstract interface over the vector-capable
//! datastore.
//!
//! One row per (filename, chunk index). `filename` is a back-reference to a
//! blob held by the file collaborator, not an ownership relation; deleting a
//! file's rows is the caller's job. The primary implementation is
//! `SqliteEmbeddingStore` in the `sqlite` module.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::ApiError;

/// A stored chunk embedding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddingRecord {
    pub id: i64,
    pub filename: String,
    #[serde(rename = "chunkIndex")]
    pub chunk_index: i64,
    pub content: String,
    pub model: String,
    pub vector: Vec<f32>,
}

/// Row data for insertion, before an id is assigned.
#[derive(Debug, Clone)]
pub struct NewEmbedding {
    pub filename: String,
    pub chunk_index: i64,
    pub content: String,
    pub model: String,
    pub vector: Vec<f32>,
}

#[derive(Debug, Clone, Default)]
pub struct EmbeddingFilter {
    pub id: Option<i64>,
    pub filename: Option<String>,
}

impl EmbeddingFilter {
    pub fn by_filename(filename: &str) -> Self {
        EmbeddingFilter {
            id: None,
            filename: Some(filename.to_string()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.id.is_none() && self.filename.is_none()
    }
}

#[async_trait]
pub trait EmbeddingStore: Send + Sync {
    /// Inserts one row and returns it with its assigned id. Never
    /// deduplicates; callers check existence first.
    async fn create(&self, row: NewEmbedding) -> Result<EmbeddingRecord, ApiError>;

    /// First row matching the filter, or none. The usual call is an
    /// existence check by filename before (re)computing a file's embeddings.
    async fn get(&self, filter: &EmbeddingFilter) -> Result<Option<EmbeddingRecord>, ApiError>;

    /// Every row for a file, in chunk order.
    async fn for_filename(&self, filename: &str) -> Result<Vec<EmbeddingRecord>, ApiError>;

    /// Removes matching rows; reports whether anything was removed.
    async fn delete(&self, filter: &EmbeddingFilter) -> Result<bool, ApiError>;

    /// Up to `limit` rows nearest to `query` by cosine distance, restricted
    /// to rows embedded with `model`, nearest first. Ties break by row id.
    async fn nearest_by_distance(
        &self,
        query: &[f32],
        model: &str,
        limit: usize,
    ) -> Result<Vec<EmbeddingRecord>, ApiError>;
}
