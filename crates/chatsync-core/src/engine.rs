//! Reconciliation of server snapshot, local cache and live stream into the
//! single message sequence the view renders.

use chatsync_cache::MessageCache;
use chatsync_proto::{Message, Role, StreamEvent, Usage};

use crate::notice::{Notice, Notifier};
use crate::phase::{Input, Phase, Status};
use crate::usage::UsageTracker;

/// Which source seeded the sequence during hydration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HydrationSource {
    Cache,
    Server,
}

/// What [`Reconciler::apply`] did with an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applied {
    /// Content was folded into the turn's assistant message.
    Folded,
    /// The usage tracker was updated; the sequence is untouched.
    Usage,
    /// The turn completed.
    Finished,
    /// The backend reported an error. Partial output is kept.
    Failed(String),
    /// The event was not valid in the current phase or came from another
    /// conversation's stream.
    Ignored,
}

// ---------------------------------------------------------------------------
// Reconciler
// ---------------------------------------------------------------------------

/// Owns the authoritative in-memory message sequence of the mounted
/// conversation. Every mutation is followed by a synchronous cache write, so
/// the cache is never ahead of memory.
pub struct Reconciler {
    conversation_id: String,
    messages: Vec<Message>,
    phase: Phase,
    usage: UsageTracker,
    /// Id of the assistant message the current turn folds into.
    active_assistant: Option<String>,
    cache: MessageCache,
    notifier: Notifier,
    revalidate_key: String,
}

impl Reconciler {
    pub fn new(cache: MessageCache, notifier: Notifier, revalidate_key: impl Into<String>) -> Self {
        Self {
            conversation_id: String::new(),
            messages: Vec::new(),
            phase: Phase::Hydrating,
            usage: UsageTracker::default(),
            active_assistant: None,
            cache,
            notifier,
            revalidate_key: revalidate_key.into(),
        }
    }

    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn status(&self) -> Status {
        self.phase.status()
    }

    pub fn usage(&self) -> Option<&Usage> {
        self.usage.latest()
    }

    // -- mount --

    /// Forget the current view and start hydrating `conversation_id`.
    pub fn remount(&mut self, conversation_id: impl Into<String>) {
        let conversation_id = conversation_id.into();
        if !self.conversation_id.is_empty() && self.conversation_id != conversation_id {
            tracing::debug!(
                from = %self.conversation_id,
                to = %conversation_id,
                "switching conversation"
            );
        }
        self.conversation_id = conversation_id;
        self.messages.clear();
        self.active_assistant = None;
        self.transition(Input::Remount);
    }

    /// Seed the sequence from the longer of cache and server snapshot and go
    /// live.
    pub fn hydrate(&mut self, snapshot: Vec<Message>, usage: Option<Usage>) -> HydrationSource {
        if !self.transition(Input::Hydrated) {
            return HydrationSource::Server;
        }
        let source = self.seed(snapshot, usage);
        self.persist();
        source
    }

    /// Like [`hydrate`](Self::hydrate), but a stream is still running on the
    /// server. `partial` is the server's view of the in-flight assistant
    /// message, if it sent one.
    pub fn hydrate_resuming(
        &mut self,
        snapshot: Vec<Message>,
        usage: Option<Usage>,
        partial: Option<Message>,
    ) -> HydrationSource {
        if !self.transition(Input::HydratedResuming) {
            return HydrationSource::Server;
        }
        let source = self.seed(snapshot, usage);

        self.active_assistant = match partial {
            Some(partial) => {
                let id = partial.id.clone();
                match self.messages.iter_mut().find(|m| m.id == partial.id) {
                    Some(existing) => *existing = partial,
                    None => self.messages.push(partial),
                }
                Some(id)
            }
            None => self
                .messages
                .last()
                .filter(|m| m.role == Role::Assistant)
                .map(|m| m.id.clone()),
        };

        self.persist();
        source
    }

    // Cache wins ties: it may hold turns the snapshot has not caught up to.
    fn seed(&mut self, snapshot: Vec<Message>, usage: Option<Usage>) -> HydrationSource {
        self.usage.reset(usage);

        let (messages, source) = match self.cache.read(&self.conversation_id) {
            Some(cached) if cached.len() >= snapshot.len() => (cached, HydrationSource::Cache),
            _ => (snapshot, HydrationSource::Server),
        };
        tracing::debug!(
            conversation_id = %self.conversation_id,
            ?source,
            messages = messages.len(),
            "hydrated conversation"
        );
        self.messages = messages;
        source
    }

    // -- turns --

    /// Optimistically append the user's message and wait for the stream.
    pub fn begin_submit(&mut self, message: Message) -> bool {
        if !self.transition(Input::Submit) {
            return false;
        }
        self.messages.push(message);
        self.active_assistant = None;
        self.persist();
        true
    }

    /// Drop everything after the last user message and return it so it can
    /// be sent again. Leaves the sequence untouched when there is no user
    /// message.
    pub fn begin_regenerate(&mut self) -> Option<Message> {
        let last_user = self.messages.iter().rposition(|m| m.role == Role::User)?;
        if !self.transition(Input::Submit) {
            return None;
        }
        self.messages.truncate(last_user + 1);
        self.active_assistant = None;
        self.persist();
        self.messages.last().cloned()
    }

    /// Fold one event from the stream belonging to `source_conversation`.
    pub fn apply(&mut self, source_conversation: &str, event: StreamEvent) -> Applied {
        if source_conversation != self.conversation_id {
            tracing::warn!(
                mounted = %self.conversation_id,
                source = source_conversation,
                "dropping event from detached stream"
            );
            return Applied::Ignored;
        }

        let input = match &event {
            StreamEvent::TextDelta(_) | StreamEvent::FilePart(_) => Input::Content,
            StreamEvent::Usage(_) => Input::Usage,
            StreamEvent::Done => Input::Done,
            StreamEvent::Error(_) => Input::Failed,
        };
        if !self.transition(input) {
            return Applied::Ignored;
        }

        match event {
            StreamEvent::TextDelta(delta) => {
                self.assistant_mut().push_text(&delta);
                self.persist();
                Applied::Folded
            }
            StreamEvent::FilePart(file) => {
                self.assistant_mut().push_file(file);
                self.persist();
                Applied::Folded
            }
            StreamEvent::Usage(usage) => {
                self.usage.record(usage);
                Applied::Usage
            }
            StreamEvent::Done => {
                self.active_assistant = None;
                self.persist();
                self.notifier.revalidate(&self.revalidate_key);
                Applied::Finished
            }
            StreamEvent::Error(message) => {
                self.active_assistant = None;
                Applied::Failed(message)
            }
        }
    }

    /// The transport failed outside the event stream.
    pub fn fail(&mut self) -> bool {
        self.active_assistant = None;
        self.transition(Input::Failed)
    }

    /// Stop applying events. The sequence stays exactly as accumulated.
    pub fn cancel(&mut self) -> bool {
        self.active_assistant = None;
        self.transition(Input::Cancel)
    }

    // -- local edits --

    pub fn append(&mut self, message: Message) -> bool {
        self.edit_with(|messages| {
            messages.push(message);
            true
        })
    }

    /// Replace the parts of message `id`.
    pub fn edit(&mut self, id: &str, parts: Vec<chatsync_proto::Part>) -> bool {
        self.edit_with(|messages| match messages.iter_mut().find(|m| m.id == id) {
            Some(message) => {
                message.parts = parts;
                true
            }
            None => false,
        })
    }

    pub fn delete(&mut self, id: &str) -> bool {
        self.edit_with(|messages| {
            let before = messages.len();
            messages.retain(|m| m.id != id);
            messages.len() != before
        })
    }

    pub fn replace_all(&mut self, messages: Vec<Message>) -> bool {
        self.edit_with(|current| {
            *current = messages;
            true
        })
    }

    fn edit_with(&mut self, f: impl FnOnce(&mut Vec<Message>) -> bool) -> bool {
        if !self.transition(Input::LocalEdit) {
            return false;
        }
        let changed = f(&mut self.messages);
        if changed {
            self.persist();
        }
        changed
    }

    // -- internals --

    /// The message the current turn folds into, created on first content.
    fn assistant_mut(&mut self) -> &mut Message {
        let index = self
            .active_assistant
            .as_deref()
            .and_then(|id| self.messages.iter().rposition(|m| m.id == id));

        let index = match index {
            Some(index) => index,
            None => {
                let message = Message::new(Role::Assistant, Vec::new());
                self.active_assistant = Some(message.id.clone());
                self.messages.push(message);
                self.messages.len() - 1
            }
        };
        &mut self.messages[index]
    }

    fn transition(&mut self, input: Input) -> bool {
        let Some(next) = self.phase.next(input) else {
            tracing::warn!(
                conversation_id = %self.conversation_id,
                phase = ?self.phase,
                ?input,
                "ignoring input not allowed in this phase"
            );
            return false;
        };

        let before = self.phase.status();
        self.phase = next;
        if next.status() != before {
            self.notifier.send(Notice::StatusChanged(next.status()));
        }
        true
    }

    fn persist(&self) {
        self.cache.write(&self.conversation_id, &self.messages);
    }
}
