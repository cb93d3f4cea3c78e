//! SQLite-backed embedding store.
//!
//! Vectors are stored as little-endian f32 BLOBs; nearest-neighbor lookup is
//! brute-force cosine distance over the rows matching the model filter.

use std::path::PathBuf;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};

use super::store::{EmbeddingFilter, EmbeddingRecord, EmbeddingStore, NewEmbedding};
use crate::config::AppPaths;
use crate::errors::ApiError;
use crate::vector_math::cosine_distance;

pub struct SqliteEmbeddingStore {
    pool: SqlitePool,
}

impl SqliteEmbeddingStore {
    pub async fn new(paths: &AppPaths) -> Result<Self, ApiError> {
        Self::with_path(paths.db_path.clone()).await
    }

    pub async fn with_path(db_path: PathBuf) -> Result<Self, ApiError> {
        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(ApiError::internal)?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), ApiError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS embedding_vector (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                filename TEXT NOT NULL,
                chunk_index INTEGER NOT NULL,
                content TEXT NOT NULL,
                model TEXT NOT NULL,
                embedding BLOB NOT NULL
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_embedding_filename ON embedding_vector(filename)",
        )
        .execute(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_embedding_model ON embedding_vector(model)")
            .execute(&self.pool)
            .await
            .map_err(ApiError::internal)?;

        Ok(())
    }

    fn serialize_vector(vector: &[f32]) -> Vec<u8> {
        vector.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    fn deserialize_vector(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect()
    }

    fn row_to_record(row: &sqlx::sqlite::SqliteRow) -> EmbeddingRecord {
        let bytes: Vec<u8> = row.get("embedding");
        EmbeddingRecord {
            id: row.get("id"),
            filename: row.get("filename"),
            chunk_index: row.get("chunk_index"),
            content: row.get("content"),
            model: row.get("model"),
            vector: Self::deserialize_vector(&bytes),
        }
    }
}

#[async_trait]
impl EmbeddingStore for SqliteEmbeddingStore {
    async fn create(&self, row: NewEmbedding) -> Result<EmbeddingRecord, ApiError> {
        let blob = Self::serialize_vector(&row.vector);

        let result = sqlx::query(
            "INSERT INTO embedding_vector (filename, chunk_index, content, model, embedding)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&row.filename)
        .bind(row.chunk_index)
        .bind(&row.content)
        .bind(&row.model)
        .bind(&blob)
        .execute(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        Ok(EmbeddingRecord {
            id: result.last_insert_rowid(),
            filename: row.filename,
            chunk_index: row.chunk_index,
            content: row.content,
            model: row.model,
            vector: row.vector,
        })
    }

    async fn get(&self, filter: &EmbeddingFilter) -> Result<Option<EmbeddingRecord>, ApiError> {
        if filter.is_empty() {
            return Err(ApiError::BadRequest(
                "Embedding filter must set id or filename".to_string(),
            ));
        }

        let row = sqlx::query(
            "SELECT id, filename, chunk_index, content, model, embedding
             FROM embedding_vector
             WHERE (?1 IS NULL OR id = ?1) AND (?2 IS NULL OR filename = ?2)
             ORDER BY id
             LIMIT 1",
        )
        .bind(filter.id)
        .bind(filter.filename.as_deref())
        .fetch_optional(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        Ok(row.as_ref().map(Self::row_to_record))
    }

    async fn for_filename(&self, filename: &str) -> Result<Vec<EmbeddingRecord>, ApiError> {
        let rows = sqlx::query(
            "SELECT id, filename, chunk_index, content, model, embedding
             FROM embedding_vector
             WHERE filename = ?1
             ORDER BY chunk_index, id",
        )
        .bind(filename)
        .fetch_all(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        Ok(rows.iter().map(Self::row_to_record).collect())
    }

    async fn delete(&self, filter: &EmbeddingFilter) -> Result<bool, ApiError> {
        if filter.is_empty() {
            return Err(ApiError::BadRequest(
                "Embedding filter must set id or filename".to_string(),
            ));
        }

        let result = sqlx::query(
            "DELETE FROM embedding_vector
             WHERE (?1 IS NULL OR id = ?1) AND (?2 IS NULL OR filename = ?2)",
        )
        .bind(filter.id)
        .bind(filter.filename.as_deref())
        .execute(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        Ok(result.rows_affected() > 0)
    }

    async fn nearest_by_distance(
        &self,
        query: &[f32],
        model: &str,
        limit: usize,
    ) -> Result<Vec<EmbeddingRecord>, ApiError> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let rows = sqlx::query(
            "SELECT id, filename, chunk_index, content, model, embedding
             FROM embedding_vector
             WHERE model = ?1
             ORDER BY id",
        )
        .bind(model)
        .fetch_all(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        let mut scored: Vec<(f32, EmbeddingRecord)> = rows
            .iter()
            .map(|row| {
                let record = Self::row_to_record(row);
                (cosine_distance(query, &record.vector), record)
            })
            .collect();

        // Stable sort over id-ordered rows keeps ties deterministic.
        scored.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(limit);

        Ok(scored.into_iter().map(|(_, record)| record).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_store() -> (tempfile::TempDir, SqliteEmbeddingStore) {
        let tmp = tempfile::tempdir().unwrap();
        let store = SqliteEmbeddingStore::with_path(tmp.path().join("embeddings.db"))
            .await
            .unwrap();
        (tmp, store)
    }

    fn make_row(filename: &str, chunk_index: i64, content: &str, vector: Vec<f32>) -> NewEmbedding {
        NewEmbedding {
            filename: filename.to_string(),
            chunk_index,
            content: content.to_string(),
            model: "mxbai-embed-large".to_string(),
            vector,
        }
    }

    #[tokio::test]
    async fn create_get_roundtrip() {
        let (_tmp, store) = test_store().await;

        let created = store
            .create(make_row("notes.txt", 0, "the cat sat", vec![0.25, -1.5, 3.0]))
            .await
            .unwrap();
        assert!(created.id > 0);

        let fetched = store
            .get(&EmbeddingFilter::by_filename("notes.txt"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fetched.content, "the cat sat");
        assert_eq!(fetched.vector, vec![0.25, -1.5, 3.0]);
        assert_eq!(fetched.model, "mxbai-embed-large");
        assert_eq!(fetched, created);

        assert!(store
            .get(&EmbeddingFilter::by_filename("other.txt"))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn get_by_id() {
        let (_tmp, store) = test_store().await;

        let created = store
            .create(make_row("a.txt", 0, "alpha", vec![1.0]))
            .await
            .unwrap();

        let filter = EmbeddingFilter {
            id: Some(created.id),
            filename: None,
        };
        let fetched = store.get(&filter).await.unwrap().unwrap();
        assert_eq!(fetched.content, "alpha");
    }

    #[tokio::test]
    async fn empty_filter_is_rejected() {
        let (_tmp, store) = test_store().await;

        assert!(matches!(
            store.get(&EmbeddingFilter::default()).await,
            Err(ApiError::BadRequest(_))
        ));
        assert!(matches!(
            store.delete(&EmbeddingFilter::default()).await,
            Err(ApiError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn nearest_orders_by_distance_and_filters_by_model() {
        let (_tmp, store) = test_store().await;

        store
            .create(make_row("a.txt", 0, "far", vec![0.0, 1.0]))
            .await
            .unwrap();
        store
            .create(make_row("b.txt", 0, "near", vec![1.0, 0.0]))
            .await
            .unwrap();
        store
            .create(make_row("c.txt", 0, "middle", vec![0.7, 0.7]))
            .await
            .unwrap();
        store
            .create(NewEmbedding {
                model: "other-model".to_string(),
                ..make_row("d.txt", 0, "identical but wrong model", vec![1.0, 0.0])
            })
            .await
            .unwrap();

        let query = vec![1.0, 0.0];
        let results = store
            .nearest_by_distance(&query, "mxbai-embed-large", 2)
            .await
            .unwrap();

        let contents: Vec<&str> = results.iter().map(|r| r.content.as_str()).collect();
        assert_eq!(contents, vec!["near", "middle"]);
        assert!(results.iter().all(|r| r.model == "mxbai-embed-large"));

        let all = store
            .nearest_by_distance(&query, "mxbai-embed-large", 10)
            .await
            .unwrap();
        assert_eq!(all.len(), 3);
        let distances: Vec<f32> = all
            .iter()
            .map(|r| cosine_distance(&query, &r.vector))
            .collect();
        assert!(distances.windows(2).all(|pair| pair[0] <= pair[1]));
    }

    #[tokio::test]
    async fn nearest_with_zero_limit_is_empty() {
        let (_tmp, store) = test_store().await;

        store
            .create(make_row("a.txt", 0, "row", vec![1.0]))
            .await
            .unwrap();
        let results = store
            .nearest_by_distance(&[1.0], "mxbai-embed-large", 0)
            .await
            .unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn ties_break_by_insertion_order() {
        let (_tmp, store) = test_store().await;

        store
            .create(make_row("first.txt", 0, "first", vec![1.0, 0.0]))
            .await
            .unwrap();
        store
            .create(make_row("second.txt", 0, "second", vec![1.0, 0.0]))
            .await
            .unwrap();

        let results = store
            .nearest_by_distance(&[1.0, 0.0], "mxbai-embed-large", 2)
            .await
            .unwrap();
        let files: Vec<&str> = results.iter().map(|r| r.filename.as_str()).collect();
        assert_eq!(files, vec!["first.txt", "second.txt"]);
    }

    #[tokio::test]
    async fn delete_reports_whether_rows_went_away() {
        let (_tmp, store) = test_store().await;

        store
            .create(make_row("a.txt", 0, "one", vec![1.0]))
            .await
            .unwrap();
        store
            .create(make_row("a.txt", 1, "two", vec![2.0]))
            .await
            .unwrap();

        assert!(store
            .delete(&EmbeddingFilter::by_filename("a.txt"))
            .await
            .unwrap());
        assert!(!store
            .delete(&EmbeddingFilter::by_filename("a.txt"))
            .await
            .unwrap());
        assert!(store.for_filename("a.txt").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn for_filename_returns_chunk_order() {
        let (_tmp, store) = test_store().await;

        store
            .create(make_row("doc.txt", 1, "second chunk", vec![2.0]))
            .await
            .unwrap();
        store
            .create(make_row("doc.txt", 0, "first chunk", vec![1.0]))
            .await
            .unwrap();

        let rows = store.for_filename("doc.txt").await.unwrap();
        let indices: Vec<i64> = rows.iter().map(|r| r.chunk_index).collect();
        assert_eq!(indices, vec![0, 1]);
    }
}
