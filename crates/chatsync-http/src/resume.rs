//! Attaches to a generation that is still running on the server.

use crate::ClientState;
use crate::stream::{EventMapper, Mapped, ensure_success, map_sse};
use chatsync_proto::error::Error;
use chatsync_proto::{ResumedStream, StreamHandle};
use eventsource_stream::Eventsource;
use futures::StreamExt;
use reqwest::StatusCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// How long a resume check waits for the first chunk before handing the
/// stream over as is.
const RESUME_PEEK_TIMEOUT: Duration = Duration::from_secs(2);

pub async fn check(
    state: Arc<ClientState>,
    conversation_id: &str,
) -> Result<Option<ResumedStream>, Error> {
    let url = state
        .config
        .endpoint(&format!("/api/chat/{conversation_id}/stream"));

    let resp = state
        .authorized(state.client.get(&url))
        .header(reqwest::header::ACCEPT, "text/event-stream")
        .send()
        .await
        .map_err(|e| Error::Http(Box::new(e)))?;

    if matches!(resp.status(), StatusCode::NO_CONTENT | StatusCode::NOT_FOUND) {
        tracing::debug!(conversation_id, "no active stream to resume");
        return Ok(None);
    }
    let resp = ensure_success(resp).await?;

    // Peek for a leading snapshot. Stop at the snapshot itself, at the first
    // real event, or when nothing arrives before the deadline.
    let mut sse = Box::pin(resp.bytes_stream().eventsource());
    let mut mapper = EventMapper::new();
    let mut snapshot = None;
    let mut first = None;
    let deadline = Instant::now() + RESUME_PEEK_TIMEOUT;
    loop {
        let event = match tokio::time::timeout_at(deadline, sse.next()).await {
            Ok(Some(event)) => event.map_err(|e| Error::Sse(e.to_string()))?,
            Ok(None) => {
                tracing::debug!(conversation_id, "resumable stream ended before any event");
                return Ok(None);
            }
            Err(_) => break,
        };
        match mapper.map_data(&event.data)? {
            Mapped::Snapshot(message) => {
                snapshot = Some(message);
                break;
            }
            Mapped::Event(stream_event) => {
                first = Some(stream_event);
                break;
            }
            Mapped::Skip => {}
        }
    }

    tracing::info!(
        conversation_id,
        has_snapshot = snapshot.is_some(),
        "attached to in-flight stream"
    );

    let first_is_terminal = first.as_ref().is_some_and(|e| e.is_terminal());
    let head = futures::stream::iter(first.map(Ok));
    let stream = if first_is_terminal {
        head.boxed()
    } else {
        head.chain(map_sse(sse, mapper)).boxed()
    };

    Ok(Some(ResumedStream {
        snapshot,
        handle: StreamHandle::new(conversation_id, stream),
    }))
}
