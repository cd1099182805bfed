use crate::error::Error;
use crate::handle::StreamHandle;
use crate::message::{FilePart, Message, Part};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// ---------------------------------------------------------------------------
// Outbound turn request
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Private,
    Public,
}

impl std::str::FromStr for Visibility {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "private" => Ok(Visibility::Private),
            "public" => Ok(Visibility::Public),
            other => Err(Error::Other(format!("unknown visibility: {other}"))),
        }
    }
}

/// Why a turn is being sent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Trigger {
    #[default]
    SubmitMessage,
    RegenerateMessage,
}

/// Everything the backend needs to run one turn.
#[derive(Debug, Clone)]
pub struct TurnRequest {
    pub conversation_id: String,
    /// The newest user message. The backend owns the rest of the history.
    pub message: Message,
    pub model_id: String,
    pub visibility: Visibility,
    pub trigger: Trigger,
}

/// A stream the backend was already producing when we asked.
#[derive(Debug)]
pub struct ResumedStream {
    /// The server's view of the partial assistant message, if it sent one.
    pub snapshot: Option<Message>,
    /// Delivers only the events produced after the attach point.
    pub handle: StreamHandle,
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

/// A concrete, type-erased chat backend.
///
/// Wraps a [`ChatTransportBackend`] so the engine never needs generic
/// parameters and tests can swap in a scripted backend.
#[derive(Clone)]
pub struct ChatTransport {
    inner: Arc<dyn ChatTransportBackend>,
}

impl ChatTransport {
    pub fn new(backend: impl ChatTransportBackend + 'static) -> Self {
        Self {
            inner: Arc::new(backend),
        }
    }

    /// Open a response stream for a new turn. The request is issued lazily,
    /// when the handle is first polled.
    pub fn send(&self, request: TurnRequest) -> StreamHandle {
        self.inner.send(request)
    }

    /// Ask whether a generation is still in flight for `conversation_id`
    /// and attach to it if so. Never mutates server state.
    pub async fn check_resumable(
        &self,
        conversation_id: &str,
    ) -> Result<Option<ResumedStream>, Error> {
        self.inner.check_resumable(conversation_id).await
    }
}

/// Trait that backend crates implement.
#[async_trait]
pub trait ChatTransportBackend: Send + Sync {
    fn send(&self, request: TurnRequest) -> StreamHandle;

    async fn check_resumable(&self, conversation_id: &str)
    -> Result<Option<ResumedStream>, Error>;
}

// ---------------------------------------------------------------------------
// Attachments
// ---------------------------------------------------------------------------

/// A file that has been uploaded and can be referenced from a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub url: String,
    pub name: String,
    pub content_type: String,
}

impl Attachment {
    pub fn to_part(&self) -> Part {
        Part::File(FilePart {
            url: self.url.clone(),
            name: Some(self.name.clone()),
            media_type: self.content_type.clone(),
        })
    }
}

/// A local file waiting to be uploaded.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[async_trait]
pub trait Uploader: Send + Sync {
    async fn upload(&self, file: UploadFile) -> Result<Attachment, Error>;
}
