use std::sync::Arc;

use chatsync_proto::Message;

use crate::error::{Error, Result};
use crate::store::CacheStorage;

const MESSAGES_KEY_PREFIX: &str = "chat-messages:";
const DRAFT_KEY: &str = "composer-draft";

/// Per-conversation overlay of the last known message sequence.
///
/// Never authoritative. Every failure is logged and swallowed: a broken cache
/// must not interrupt the chat.
#[derive(Clone)]
pub struct MessageCache {
    storage: Arc<dyn CacheStorage>,
}

impl MessageCache {
    pub fn new(storage: impl CacheStorage + 'static) -> Self {
        Self {
            storage: Arc::new(storage),
        }
    }

    pub fn from_shared(storage: Arc<dyn CacheStorage>) -> Self {
        Self { storage }
    }

    pub fn key_for(conversation_id: &str) -> String {
        format!("{MESSAGES_KEY_PREFIX}{conversation_id}")
    }

    pub fn read(&self, conversation_id: &str) -> Option<Vec<Message>> {
        match self.try_read(conversation_id) {
            Ok(messages) => messages,
            Err(err) => {
                tracing::warn!(conversation_id, error = %err, "failed to read cached messages");
                None
            }
        }
    }

    /// Overwrite the cached sequence. Empty sequences are ignored so a
    /// transient clear can never wipe a populated entry. Returns whether a
    /// write happened.
    pub fn write(&self, conversation_id: &str, messages: &[Message]) -> bool {
        if messages.is_empty() {
            tracing::debug!(conversation_id, "skipping cache write of empty sequence");
            return false;
        }
        match self.try_write(conversation_id, messages) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(conversation_id, error = %err, "failed to write cached messages");
                false
            }
        }
    }

    pub fn read_draft(&self) -> Option<String> {
        let raw = match self.storage.get(DRAFT_KEY) {
            Ok(raw) => raw?,
            Err(err) => {
                tracing::warn!(error = %err, "failed to read composer draft");
                return None;
            }
        };
        serde_json::from_str(&raw)
            .inspect_err(|err| tracing::warn!(error = %err, "discarding unreadable composer draft"))
            .ok()
    }

    pub fn write_draft(&self, text: &str) {
        let result = serde_json::to_string(text)
            .map_err(Error::from)
            .and_then(|raw| self.storage.set(DRAFT_KEY, &raw));
        if let Err(err) = result {
            tracing::warn!(error = %err, "failed to write composer draft");
        }
    }

    fn try_read(&self, conversation_id: &str) -> Result<Option<Vec<Message>>> {
        let Some(raw) = self.storage.get(&Self::key_for(conversation_id))? else {
            return Ok(None);
        };
        Ok(Some(serde_json::from_str(&raw)?))
    }

    fn try_write(&self, conversation_id: &str, messages: &[Message]) -> Result<()> {
        let raw = serde_json::to_string(messages)?;
        self.storage.set(&Self::key_for(conversation_id), &raw)
    }
}
