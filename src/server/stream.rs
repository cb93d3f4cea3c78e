//! Newline-delimited JSON responses.
//!
//! Bridges an `mpsc` receiver of serializable items into a streaming axum
//! body: one JSON object per line, flushed as produced, with bare-newline
//! keepalive frames on an independent timer while the producer is quiet.
//! Clients split on newlines and skip empty lines.

use std::convert::Infallible;
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::http::header;
use axum::response::Response;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant};

use crate::errors::ApiError;

const KEEPALIVE_PERIOD: Duration = Duration::from_secs(15);

/// Channel capacity of 1: the producer awaits the consumer's progress, so a
/// slow client throttles backend consumption instead of buffering.
pub const LINE_CHANNEL_CAPACITY: usize = 1;

pub fn ndjson_response<T: Serialize + Send + 'static>(
    rx: mpsc::Receiver<T>,
) -> Result<Response, ApiError> {
    let start = Instant::now() + KEEPALIVE_PERIOD;
    let stream = futures_util::stream::unfold(
        (rx, interval_at(start, KEEPALIVE_PERIOD)),
        |(mut rx, mut keepalive)| async move {
            tokio::select! {
                item = rx.recv() => match item {
                    Some(item) => {
                        let mut line = serde_json::to_vec(&item).unwrap_or_default();
                        line.push(b'\n');
                        Some((Ok::<_, Infallible>(Bytes::from(line)), (rx, keepalive)))
                    }
                    None => None,
                },
                _ = keepalive.tick() => {
                    Some((Ok(Bytes::from_static(b"\n")), (rx, keepalive)))
                }
            }
        },
    );

    Response::builder()
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache, no-transform")
        .header(header::CONNECTION, "keep-alive")
        .header("X-Accel-Buffering", "no")
        .body(Body::from_stream(stream))
        .map_err(ApiError::internal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;
    use serde_json::json;

    #[tokio::test]
    async fn items_become_one_json_line_each() {
        let (tx, rx) = mpsc::channel(4);
        tx.send(json!({"content": "a", "done": false})).await.unwrap();
        tx.send(json!({"content": "", "done": true})).await.unwrap();
        drop(tx);

        let response = ndjson_response(rx).unwrap();
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/event-stream"
        );

        let mut body = response.into_body().into_data_stream();
        let mut text = String::new();
        while let Some(frame) = body.next().await {
            text.push_str(&String::from_utf8_lossy(&frame.unwrap()));
        }

        let lines: Vec<&str> = text.lines().filter(|l| !l.is_empty()).collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], r#"{"content":"a","done":false}"#);
        assert_eq!(lines[1], r#"{"content":"","done":true}"#);
    }
}
