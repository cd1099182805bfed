//! Wire types for the chat backend's HTTP API.
//!
//! These are the raw JSON shapes sent to / received from the server. They are
//! intentionally separate from the chatsync-proto public types.

use chatsync_proto::{Message, Trigger, Usage, Visibility};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequestBody {
    pub id: String,
    pub message: Message,
    pub selected_chat_model: String,
    pub selected_visibility_type: Visibility,
    pub trigger: Trigger,
}

// ---------------------------------------------------------------------------
// UI message stream chunks
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum UiChunk {
    #[serde(rename = "text-delta")]
    TextDelta { delta: String },

    #[serde(rename = "file")]
    File {
        url: String,
        #[serde(rename = "mediaType")]
        media_type: String,
        #[serde(default)]
        filename: Option<String>,
    },

    #[serde(rename = "data-usage")]
    DataUsage { data: Usage },

    /// The server's partial assistant message, sent first on a resumed stream.
    #[serde(rename = "data-snapshot")]
    DataSnapshot { data: Message },

    #[serde(rename = "error")]
    Error {
        #[serde(rename = "errorText")]
        error_text: String,
    },

    #[serde(rename = "finish")]
    Finish,

    // start, text-start, text-end, start-step, finish-step, and anything
    // added to the protocol later.
    #[serde(other)]
    Other,
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub cause: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub url: String,
    pub pathname: String,
    pub content_type: String,
}

/// The server-rendered view of a conversation at load time.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerSnapshot {
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default)]
    pub last_context: Option<Usage>,
}
