//! Sequential per-chunk embedding of one file.
//!
//! Each chunk is a separate backend round trip followed by one row insert,
//! so a progress event can be emitted after every chunk. Concurrent calls
//! for the same filename are not coordinated; callers rely on the existence
//! check in [`existing_for`] running first.

use serde_json::{json, Value};
use tokio::sync::mpsc;

use crate::errors::ApiError;

use super::embedder::EmbeddingBackend;
use super::store::{EmbeddingFilter, EmbeddingRecord, EmbeddingStore, NewEmbedding};

/// Rows already stored for `filename`, if any. The idempotence check of the
/// embedding endpoint: when this returns `Some`, no backend call is made.
pub async fn existing_for(
    store: &dyn EmbeddingStore,
    filename: &str,
) -> Result<Option<Vec<EmbeddingRecord>>, ApiError> {
    let filter = EmbeddingFilter::by_filename(filename);
    if store.get(&filter).await?.is_none() {
        return Ok(None);
    }
    Ok(Some(store.for_filename(filename).await?))
}

/// Embeds `chunks` one at a time, inserting each row before reporting
/// `{progress: {current, total}, done: false}` on `progress`. Inserts are
/// single statements, so a mid-file failure leaves the completed chunks
/// intact and corrupts nothing.
pub async fn embed_chunks(
    store: &dyn EmbeddingStore,
    backend: &dyn EmbeddingBackend,
    model: &str,
    filename: &str,
    chunks: Vec<String>,
    progress: &mpsc::Sender<Value>,
) -> Result<Vec<EmbeddingRecord>, ApiError> {
    let total = chunks.len();
    let mut records = Vec::with_capacity(total);

    for (index, chunk) in chunks.into_iter().enumerate() {
        let vectors = backend
            .embed(model, &[chunk.clone()])
            .await
            .map_err(|err| match err {
                ApiError::EmbeddingBackend(msg) => {
                    ApiError::EmbeddingBackend(format!("Embedding {filename} failed: {msg}"))
                }
                ApiError::BackendUnavailable(msg) => {
                    ApiError::BackendUnavailable(format!("Embedding {filename} failed: {msg}"))
                }
                other => other,
            })?;
        let vector = vectors.into_iter().next().ok_or_else(|| {
            ApiError::EmbeddingBackend(format!(
                "Embedding {filename} failed: backend returned no vector"
            ))
        })?;

        let record = store
            .create(NewEmbedding {
                filename: filename.to_string(),
                chunk_index: index as i64,
                content: chunk,
                model: model.to_string(),
                vector,
            })
            .await?;
        records.push(record);

        let event = json!({
            "progress": {"current": index + 1, "total": total},
            "done": false,
        });
        if progress.send(event).await.is_err() {
            // Progress is best-effort; the remaining chunks still get stored.
            tracing::debug!("progress receiver dropped while embedding {filename}");
        }
    }

    Ok(records)
}

/// The terminal payload of the embedding protocol, also returned whole when
/// the file was already embedded.
pub fn completion_payload(records: &[EmbeddingRecord]) -> Value {
    json!({
        "embedding": records,
        "progress": {"current": records.len(), "total": records.len()},
        "done": true,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;

    use super::*;
    use crate::rag::sqlite::SqliteEmbeddingStore;

    struct CountingBackend {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl EmbeddingBackend for CountingBackend {
        async fn embed(&self, _model: &str, inputs: &[String]) -> Result<Vec<Vec<f32>>, ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(inputs.iter().map(|_| vec![1.0, 2.0]).collect())
        }
    }

    async fn test_store() -> (tempfile::TempDir, Arc<SqliteEmbeddingStore>) {
        let tmp = tempfile::tempdir().unwrap();
        let store = Arc::new(
            SqliteEmbeddingStore::with_path(tmp.path().join("embeddings.db"))
                .await
                .unwrap(),
        );
        (tmp, store)
    }

    #[tokio::test]
    async fn embeds_chunk_by_chunk_with_progress() {
        let (_tmp, store) = test_store().await;
        let backend = CountingBackend {
            calls: AtomicUsize::new(0),
        };
        let (tx, mut rx) = mpsc::channel(16);

        let chunks = vec!["first".to_string(), "second".to_string(), "third".to_string()];
        let records = embed_chunks(
            store.as_ref(),
            &backend,
            "mxbai-embed-large",
            "doc.txt",
            chunks,
            &tx,
        )
        .await
        .unwrap();
        drop(tx);

        assert_eq!(records.len(), 3);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 3);
        assert_eq!(
            records.iter().map(|r| r.chunk_index).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        assert_eq!(events.len(), 3);
        assert_eq!(events[0]["progress"]["current"], 1);
        assert_eq!(events[2]["progress"]["total"], 3);
        assert!(events.iter().all(|e| e["done"] == false));
    }

    #[tokio::test]
    async fn second_request_reuses_stored_rows_without_backend_calls() {
        let (_tmp, store) = test_store().await;
        let backend = CountingBackend {
            calls: AtomicUsize::new(0),
        };
        let (tx, _rx) = mpsc::channel(16);

        assert!(existing_for(store.as_ref(), "doc.txt").await.unwrap().is_none());

        let created = embed_chunks(
            store.as_ref(),
            &backend,
            "mxbai-embed-large",
            "doc.txt",
            vec!["only chunk".to_string()],
            &tx,
        )
        .await
        .unwrap();
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);

        let existing = existing_for(store.as_ref(), "doc.txt")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(existing, created);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn completion_payload_carries_records_and_done() {
        let (_tmp, store) = test_store().await;
        let backend = CountingBackend {
            calls: AtomicUsize::new(0),
        };
        let (tx, _rx) = mpsc::channel(16);

        let records = embed_chunks(
            store.as_ref(),
            &backend,
            "mxbai-embed-large",
            "doc.txt",
            vec!["alpha".to_string(), "beta".to_string()],
            &tx,
        )
        .await
        .unwrap();

        let payload = completion_payload(&records);
        assert_eq!(payload["done"], true);
        assert_eq!(payload["progress"]["current"], 2);
        assert_eq!(payload["embedding"].as_array().unwrap().len(), 2);
        assert_eq!(payload["embedding"][0]["content"], "alpha");
    }
}
