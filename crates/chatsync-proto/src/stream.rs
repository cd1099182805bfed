use crate::message::FilePart;
use serde::{Deserialize, Serialize};

/// One incremental unit of a backend response.
///
/// A well-formed stream ends with exactly one [`Done`](StreamEvent::Done) or
/// [`Error`](StreamEvent::Error).
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// A chunk of assistant text.
    TextDelta(String),

    /// A file produced by the assistant.
    FilePart(FilePart),

    /// Consumption metadata for the current turn.
    Usage(Usage),

    /// The backend reported a failure mid-stream.
    Error(String),

    /// Generation finished and the backend persisted the assistant message.
    Done,
}

impl StreamEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Done | StreamEvent::Error(_))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Usage {
    #[serde(default)]
    pub input_tokens: u32,
    #[serde(default)]
    pub output_tokens: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cached_input_tokens: Option<u32>,
}
