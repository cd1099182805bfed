//! Opens the chat SSE stream and maps UI message chunks to the chatsync
//! `StreamEvent` type.

use crate::ClientState;
use crate::types::{ChatRequestBody, ErrorBody, UiChunk};
use chatsync_proto::error::Error;
use chatsync_proto::{FilePart, Message, StreamEvent};
use eventsource_stream::Event;
use futures::{Stream, StreamExt};
use reqwest::StatusCode;
use std::sync::Arc;

pub fn open(
    state: Arc<ClientState>,
    body: ChatRequestBody,
) -> impl Stream<Item = Result<StreamEvent, Error>> + Send {
    async_stream::try_stream! {
        let url = state.config.endpoint("/api/chat");
        tracing::debug!(conversation_id = %body.id, %url, "opening chat stream");

        let resp = state
            .authorized(state.client.post(&url))
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Http(Box::new(e)))?;
        let resp = ensure_success(resp).await?;

        let events = map_sse(eventsource_stream::Eventsource::eventsource(resp.bytes_stream()), EventMapper::new());
        futures::pin_mut!(events);
        while let Some(event) = events.next().await {
            yield event?;
        }
    }
}

/// Turn a non-2xx response into an [`Error`]. 401 is classified on its own.
pub(crate) async fn ensure_success(resp: reqwest::Response) -> Result<reqwest::Response, Error> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    if status == StatusCode::UNAUTHORIZED {
        return Err(Error::AuthRequired);
    }

    let body_text = resp.text().await.unwrap_or_default();
    let body: ErrorBody = serde_json::from_str(&body_text).unwrap_or_default();
    let message = body
        .message
        .or(body.cause)
        .or(body.error)
        .unwrap_or(body_text);
    Err(Error::Api {
        status: status.as_u16(),
        code: body.code,
        message,
    })
}

/// Map a raw SSE stream through `mapper`, dropping chunks that carry no event.
pub(crate) fn map_sse<S, E>(
    sse: S,
    mut mapper: EventMapper,
) -> impl Stream<Item = Result<StreamEvent, Error>> + Send
where
    S: Stream<Item = Result<Event, E>> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    async_stream::try_stream! {
        futures::pin_mut!(sse);
        while let Some(event) = sse.next().await {
            match event {
                Ok(event) => {
                    match mapper.map_data(&event.data)? {
                        Mapped::Event(stream_event) => yield stream_event,
                        Mapped::Snapshot(message) => {
                            tracing::debug!(message_id = %message.id, "ignoring mid-stream snapshot");
                        }
                        Mapped::Skip => {}
                    }
                }
                Err(e) => {
                    Err(Error::Sse(e.to_string()))?;
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Event mapper (stateful: remembers whether a terminal event was seen)
// ---------------------------------------------------------------------------

#[derive(Debug, PartialEq)]
pub(crate) enum Mapped {
    Event(StreamEvent),
    Snapshot(Message),
    Skip,
}

pub(crate) struct EventMapper {
    terminated: bool,
}

impl EventMapper {
    pub(crate) fn new() -> Self {
        Self { terminated: false }
    }

    pub(crate) fn map_data(&mut self, data: &str) -> Result<Mapped, Error> {
        let data = data.trim();
        if data.is_empty() {
            return Ok(Mapped::Skip);
        }
        if data == "[DONE]" {
            return Ok(self.terminal(StreamEvent::Done));
        }

        let chunk: UiChunk = serde_json::from_str(data)?;
        let mapped = match chunk {
            UiChunk::TextDelta { delta } => Mapped::Event(StreamEvent::TextDelta(delta)),
            UiChunk::File {
                url,
                media_type,
                filename,
            } => Mapped::Event(StreamEvent::FilePart(FilePart {
                url,
                name: filename,
                media_type,
            })),
            UiChunk::DataUsage { data } => Mapped::Event(StreamEvent::Usage(data)),
            UiChunk::DataSnapshot { data } => Mapped::Snapshot(data),
            UiChunk::Error { error_text } => self.terminal(StreamEvent::Error(error_text)),
            UiChunk::Finish => self.terminal(StreamEvent::Done),
            UiChunk::Other => Mapped::Skip,
        };
        Ok(mapped)
    }

    // Only the first terminal event counts; `finish` is usually followed by
    // a literal `[DONE]`.
    fn terminal(&mut self, event: StreamEvent) -> Mapped {
        if self.terminated {
            return Mapped::Skip;
        }
        self.terminated = true;
        Mapped::Event(event)
    }
}
