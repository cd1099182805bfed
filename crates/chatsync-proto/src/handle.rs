use crate::error::Error;
use crate::stream::StreamEvent;
use futures::Stream;
use futures::StreamExt;
use futures::stream::{AbortHandle, Abortable};
use std::pin::Pin;

type EventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent, Error>> + Send>>;

/// A live, non-restartable response stream for one conversation.
///
/// Pull events with [`next()`](StreamHandle::next). Once [`stop()`] has been
/// called (on the handle or any [`StopHandle`] cloned from it) the handle
/// yields `None` and never produces another event.
///
/// [`stop()`]: StreamHandle::stop
pub struct StreamHandle {
    conversation_id: String,
    inner: Abortable<EventStream>,
    abort: AbortHandle,
}

impl StreamHandle {
    pub fn new(
        conversation_id: impl Into<String>,
        stream: impl Stream<Item = Result<StreamEvent, Error>> + Send + 'static,
    ) -> Self {
        let (abort, registration) = AbortHandle::new_pair();
        let stream: EventStream = Box::pin(stream);
        Self {
            conversation_id: conversation_id.into(),
            inner: Abortable::new(stream, registration),
            abort,
        }
    }

    /// The conversation this stream belongs to.
    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    /// Get the next event, or `None` when the stream ended or was stopped.
    pub async fn next(&mut self) -> Option<Result<StreamEvent, Error>> {
        if self.abort.is_aborted() {
            return None;
        }
        self.inner.next().await
    }

    pub fn stop(&self) {
        self.abort.abort();
    }

    pub fn is_stopped(&self) -> bool {
        self.abort.is_aborted()
    }

    /// A cloneable handle that can stop this stream from another task.
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            abort: self.abort.clone(),
        }
    }
}

impl std::fmt::Debug for StreamHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamHandle")
            .field("conversation_id", &self.conversation_id)
            .field("stopped", &self.is_stopped())
            .finish()
    }
}

/// Stops a [`StreamHandle`] without owning it.
#[derive(Debug, Clone)]
pub struct StopHandle {
    abort: AbortHandle,
}

impl StopHandle {
    pub fn stop(&self) {
        self.abort.abort();
    }

    pub fn is_stopped(&self) -> bool {
        self.abort.is_aborted()
    }
}
