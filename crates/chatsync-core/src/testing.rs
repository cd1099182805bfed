//! In-process stand-ins for the transport and storage seams.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chatsync_cache::{CacheStorage, MemoryStorage};
use chatsync_proto::{
    ChatTransportBackend, Error, Message, ResumedStream, StreamEvent, StreamHandle, TurnRequest,
};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::notice::{Notice, Notifier};

pub type EventTx = mpsc::UnboundedSender<Result<StreamEvent, Error>>;
type EventRx = mpsc::UnboundedReceiver<Result<StreamEvent, Error>>;

#[derive(Default)]
struct Script {
    turns: VecDeque<EventRx>,
    resumes: VecDeque<(Option<Message>, EventRx)>,
    requests: Vec<TurnRequest>,
}

/// A backend whose streams are fed by the test through channels.
///
/// Turns without a queued channel end immediately without a terminal event.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    script: Arc<Mutex<Script>>,
}

impl ScriptedTransport {
    /// Queue the stream for the next `send`.
    pub fn expect_turn(&self) -> EventTx {
        let (tx, rx) = mpsc::unbounded_channel();
        self.script.lock().unwrap().turns.push_back(rx);
        tx
    }

    /// Queue a running generation for the next resume check.
    pub fn expect_resume(&self, snapshot: Option<Message>) -> EventTx {
        let (tx, rx) = mpsc::unbounded_channel();
        self.script
            .lock()
            .unwrap()
            .resumes
            .push_back((snapshot, rx));
        tx
    }

    pub fn requests(&self) -> Vec<TurnRequest> {
        self.script.lock().unwrap().requests.clone()
    }
}

#[async_trait]
impl ChatTransportBackend for ScriptedTransport {
    fn send(&self, request: TurnRequest) -> StreamHandle {
        let mut script = self.script.lock().unwrap();
        let conversation_id = request.conversation_id.clone();
        script.requests.push(request);
        let rx = script.turns.pop_front().unwrap_or_else(|| {
            let (_, rx) = mpsc::unbounded_channel();
            rx
        });
        StreamHandle::new(conversation_id, UnboundedReceiverStream::new(rx))
    }

    async fn check_resumable(
        &self,
        conversation_id: &str,
    ) -> Result<Option<ResumedStream>, Error> {
        let next = self.script.lock().unwrap().resumes.pop_front();
        Ok(next.map(|(snapshot, rx)| ResumedStream {
            snapshot,
            handle: StreamHandle::new(conversation_id, UnboundedReceiverStream::new(rx)),
        }))
    }
}

/// Memory storage that counts writes.
#[derive(Default)]
pub struct CountingStorage {
    inner: MemoryStorage,
    writes: AtomicUsize,
}

impl CountingStorage {
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl CacheStorage for CountingStorage {
    fn get(&self, key: &str) -> chatsync_cache::Result<Option<String>> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> chatsync_cache::Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.set(key, value)
    }
}

pub fn notices() -> (Notifier, mpsc::UnboundedReceiver<Notice>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Notifier::new(tx), rx)
}

pub fn drain(rx: &mut mpsc::UnboundedReceiver<Notice>) -> Vec<Notice> {
    let mut out = Vec::new();
    while let Ok(notice) = rx.try_recv() {
        out.push(notice);
    }
    out
}
