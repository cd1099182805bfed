//! The turn controller: drives one mounted conversation against a transport.

use std::time::Duration;

use chatsync_cache::MessageCache;
use chatsync_proto::{
    ChatTransport, DEFAULT_CHAT_MODEL, Message, Role, StopHandle, StreamEvent, StreamHandle,
    Trigger, TurnRequest, UploadFile, Uploader, Usage, Visibility,
};

use crate::composer::{Composer, UploadFailure};
use crate::engine::{Applied, HydrationSource, Reconciler};
use crate::error::{SubmitRejected, TurnError};
use crate::notice::{Notifier, login_redirect};
use crate::phase::Status;

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub model_id: String,
    pub visibility: Visibility,
    /// Upper bound on the wait for each stream event. `None` waits forever.
    pub stream_timeout: Option<Duration>,
    /// Key sent with [`Notice::Revalidate`](crate::Notice::Revalidate) when a
    /// turn completes.
    pub revalidate_key: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            model_id: DEFAULT_CHAT_MODEL.to_string(),
            visibility: Visibility::default(),
            stream_timeout: None,
            revalidate_key: "chat-history".to_string(),
        }
    }
}

/// What the caller knows about a conversation when it mounts it.
#[derive(Debug, Clone)]
pub struct MountOptions {
    /// Server-rendered message list.
    pub snapshot: Vec<Message>,
    /// Usage that came with the snapshot.
    pub usage: Option<Usage>,
    /// Attach to a generation still running on the server.
    pub auto_resume: bool,
    /// Submitted as the first turn once hydration finishes.
    pub query: Option<String>,
}

impl Default for MountOptions {
    fn default() -> Self {
        Self {
            snapshot: Vec::new(),
            usage: None,
            auto_resume: true,
            query: None,
        }
    }
}

/// Outcome of one [`ChatSession::pump`] call.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// No stream is attached.
    Idle,
    Applied(StreamEvent),
    Ignored,
    Finished,
    Failed(TurnError),
    /// The stream was stopped through a [`StopHandle`].
    Cancelled,
}

impl Step {
    /// Whether the turn is over.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Step::Applied(_) | Step::Ignored)
    }
}

enum Pulled {
    Next(Option<Result<StreamEvent, chatsync_proto::Error>>),
    TimedOut(Duration),
}

/// One conversation view: engine, composer and the stream of the current
/// turn. Owned by a single task.
pub struct ChatSession {
    transport: ChatTransport,
    engine: Reconciler,
    composer: Composer,
    config: SessionConfig,
    notifier: Notifier,
    stream: Option<StreamHandle>,
}

impl ChatSession {
    pub fn new(
        transport: ChatTransport,
        cache: MessageCache,
        config: SessionConfig,
        notifier: Notifier,
    ) -> Self {
        let engine = Reconciler::new(cache.clone(), notifier.clone(), config.revalidate_key.clone());
        Self {
            transport,
            engine,
            composer: Composer::new(cache),
            config,
            notifier,
            stream: None,
        }
    }

    // -- accessors --

    pub fn conversation_id(&self) -> &str {
        self.engine.conversation_id()
    }

    pub fn messages(&self) -> &[Message] {
        self.engine.messages()
    }

    pub fn status(&self) -> Status {
        self.engine.status()
    }

    pub fn usage(&self) -> Option<&Usage> {
        self.engine.usage()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// The engine, for local edits while no turn is running.
    pub fn engine_mut(&mut self) -> &mut Reconciler {
        &mut self.engine
    }

    pub fn composer(&self) -> &Composer {
        &self.composer
    }

    pub fn composer_mut(&mut self) -> &mut Composer {
        &mut self.composer
    }

    pub fn is_streaming(&self) -> bool {
        self.stream.is_some()
    }

    // -- mount --

    /// Show `conversation_id`. Any stream of the previous conversation is
    /// detached first.
    pub async fn mount(
        &mut self,
        conversation_id: impl Into<String>,
        options: MountOptions,
    ) -> HydrationSource {
        let conversation_id = conversation_id.into();
        if let Some(old) = self.stream.take() {
            tracing::debug!(
                conversation_id = old.conversation_id(),
                "detaching stream of previous conversation"
            );
        }
        self.engine.remount(conversation_id.clone());

        let MountOptions {
            snapshot,
            usage,
            auto_resume,
            query,
        } = options;

        if auto_resume {
            match self.transport.check_resumable(&conversation_id).await {
                Ok(Some(resumed)) => {
                    tracing::info!(%conversation_id, "resuming active stream");
                    let source = self
                        .engine
                        .hydrate_resuming(snapshot, usage, resumed.snapshot);
                    self.stream = Some(resumed.handle);
                    return source;
                }
                Ok(None) => {}
                Err(err) if err.is_auth_required() => {
                    self.notifier
                        .redirect(login_redirect(&format!("/chat/{conversation_id}")));
                }
                Err(err) => {
                    tracing::warn!(%conversation_id, error = %err, "resume check failed");
                }
            }
        }

        let source = self.engine.hydrate(snapshot, usage);

        if let Some(query) = query.filter(|q| !q.trim().is_empty()) {
            self.composer.set_text(query);
            if let Err(rejected) = self.submit() {
                tracing::debug!(%rejected, "initial query not submitted");
            }
        }
        source
    }

    // -- turns --

    /// Send the composer's content as a new turn. Returns the id of the
    /// appended user message.
    pub fn submit(&mut self) -> Result<String, SubmitRejected> {
        if !self.engine.status().accepts_submit() {
            tracing::debug!(status = ?self.engine.status(), "submit rejected while busy");
            return Err(SubmitRejected::Busy);
        }
        let parts = self.composer.build_parts();
        if parts.is_empty() {
            tracing::debug!("submit rejected: nothing to send");
            return Err(SubmitRejected::Empty);
        }

        let message = Message::new(Role::User, parts);
        let id = message.id.clone();
        if !self.engine.begin_submit(message.clone()) {
            return Err(SubmitRejected::Busy);
        }
        self.composer.clear();
        self.start_turn(message, Trigger::SubmitMessage);
        Ok(id)
    }

    /// Drop the answer to the last user message and ask for a new one.
    pub fn regenerate(&mut self) -> Result<(), SubmitRejected> {
        if !self.engine.status().accepts_submit() {
            return Err(SubmitRejected::Busy);
        }
        let message = self
            .engine
            .begin_regenerate()
            .ok_or(SubmitRejected::NothingToRegenerate)?;
        self.start_turn(message, Trigger::RegenerateMessage);
        Ok(())
    }

    fn start_turn(&mut self, message: Message, trigger: Trigger) {
        let request = TurnRequest {
            conversation_id: self.engine.conversation_id().to_string(),
            message,
            model_id: self.config.model_id.clone(),
            visibility: self.config.visibility,
            trigger,
        };
        tracing::debug!(
            conversation_id = %request.conversation_id,
            model = %request.model_id,
            ?trigger,
            "starting turn"
        );
        self.stream = Some(self.transport.send(request));
    }

    /// Wait for the next event of the current turn and fold it in.
    pub async fn pump(&mut self) -> Step {
        let timeout = self.config.stream_timeout;
        let (source, pulled) = match self.stream.as_mut() {
            None => return Step::Idle,
            Some(handle) => {
                let source = handle.conversation_id().to_string();
                let pulled = match timeout {
                    Some(limit) => match tokio::time::timeout(limit, handle.next()).await {
                        Ok(next) => Pulled::Next(next),
                        Err(_) => Pulled::TimedOut(limit),
                    },
                    None => Pulled::Next(handle.next().await),
                };
                (source, pulled)
            }
        };

        let event = match pulled {
            Pulled::TimedOut(limit) => return self.fail_turn(TurnError::Timeout(limit)),
            Pulled::Next(Some(Ok(event))) => event,
            Pulled::Next(Some(Err(err))) => return self.fail_turn(err.into()),
            Pulled::Next(None) => {
                let stopped = self.stream.as_ref().is_some_and(StreamHandle::is_stopped);
                if stopped {
                    self.stream = None;
                    self.engine.cancel();
                    return Step::Cancelled;
                }
                return self.fail_turn(TurnError::Interrupted);
            }
        };

        match self.engine.apply(&source, event.clone()) {
            Applied::Folded | Applied::Usage => Step::Applied(event),
            Applied::Ignored => Step::Ignored,
            Applied::Finished => {
                self.stream = None;
                Step::Finished
            }
            Applied::Failed(message) => {
                self.stream = None;
                let err = TurnError::Transport(message);
                self.report(&err);
                Step::Failed(err)
            }
        }
    }

    /// Pump until the turn is over, handing every applied event to
    /// `on_event`.
    pub async fn drive(&mut self, mut on_event: impl FnMut(&StreamEvent)) -> Step {
        loop {
            let step = self.pump().await;
            if let Step::Applied(event) = &step {
                on_event(event);
            }
            if step.is_terminal() {
                return step;
            }
        }
    }

    /// Cancel the running turn. Returns `false` when nothing was running.
    pub fn stop(&mut self) -> bool {
        let Some(handle) = self.stream.take() else {
            return false;
        };
        handle.stop();
        self.engine.cancel()
    }

    /// Stops the current turn from another task.
    pub fn stop_handle(&self) -> Option<StopHandle> {
        self.stream.as_ref().map(StreamHandle::stop_handle)
    }

    /// Upload files into the composer and report the ones that failed.
    pub async fn attach(
        &mut self,
        uploader: &dyn Uploader,
        files: Vec<UploadFile>,
    ) -> Vec<UploadFailure> {
        let failures = self.composer.attach(uploader, files).await;
        for failure in &failures {
            if failure.auth_required {
                self.notifier.redirect(self.login_location());
            } else {
                self.notifier
                    .toast(format!("Failed to upload {}: {}", failure.name, failure.message));
            }
        }
        failures
    }

    fn fail_turn(&mut self, err: TurnError) -> Step {
        if let Some(handle) = self.stream.take() {
            handle.stop();
        }
        tracing::warn!(
            conversation_id = self.engine.conversation_id(),
            error = %err,
            "turn failed"
        );
        self.engine.fail();
        self.report(&err);
        Step::Failed(err)
    }

    fn report(&self, err: &TurnError) {
        if err.is_auth_required() {
            self.notifier.redirect(self.login_location());
        } else {
            self.notifier.toast(err.to_string());
        }
    }

    fn login_location(&self) -> String {
        login_redirect(&format!("/chat/{}", self.engine.conversation_id()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notice::Notice;
    use crate::phase::Phase;
    use crate::testing::{CountingStorage, ScriptedTransport, drain, notices};
    use chatsync_cache::MemoryStorage;
    use chatsync_proto::{Attachment, Error, Part};
    use std::sync::Arc;

    fn msg(id: &str, role: Role, text: &str) -> Message {
        Message {
            id: id.into(),
            role,
            parts: vec![Part::text(text)],
        }
    }

    fn delta(text: &str) -> Result<StreamEvent, Error> {
        Ok(StreamEvent::TextDelta(text.into()))
    }

    fn session_with(
        transport: &ScriptedTransport,
        cache: MessageCache,
        config: SessionConfig,
    ) -> (ChatSession, tokio::sync::mpsc::UnboundedReceiver<Notice>) {
        let (notifier, rx) = notices();
        let session = ChatSession::new(ChatTransport::new(transport.clone()), cache, config, notifier);
        (session, rx)
    }

    fn session(
        transport: &ScriptedTransport,
    ) -> (ChatSession, tokio::sync::mpsc::UnboundedReceiver<Notice>) {
        session_with(
            transport,
            MessageCache::new(MemoryStorage::new()),
            SessionConfig::default(),
        )
    }

    #[tokio::test]
    async fn submit_hello_appends_user_message() {
        let transport = ScriptedTransport::default();
        let _tx = transport.expect_turn();
        let (mut session, _rx) = session(&transport);
        session.mount("c1", MountOptions::default()).await;

        session.composer_mut().set_text("Hello");
        let id = session.submit().expect("accepted");

        assert_eq!(session.messages().len(), 1);
        let sent = &session.messages()[0];
        assert_eq!(sent.id, id);
        assert_eq!(sent.role, Role::User);
        assert_eq!(sent.parts, vec![Part::text("Hello")]);
        assert_eq!(session.status(), Status::Submitted);
        assert_eq!(session.composer().text(), "");

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].conversation_id, "c1");
        assert_eq!(requests[0].trigger, Trigger::SubmitMessage);
        assert_eq!(requests[0].model_id, DEFAULT_CHAT_MODEL);
    }

    #[tokio::test]
    async fn hi_there_completes_turn() {
        let transport = ScriptedTransport::default();
        let tx = transport.expect_turn();
        let (mut session, mut rx) = session(&transport);
        session.mount("c1", MountOptions::default()).await;
        session.composer_mut().set_text("Hello");
        session.submit().unwrap();

        tx.send(delta("Hi")).unwrap();
        tx.send(delta(" there")).unwrap();
        tx.send(Ok(StreamEvent::Done)).unwrap();

        let mut seen = Vec::new();
        let step = session
            .drive(|event| seen.push(event.clone()))
            .await;

        assert_eq!(step, Step::Finished);
        assert_eq!(seen.len(), 2);
        assert_eq!(session.messages().len(), 2);
        assert_eq!(session.messages()[1].role, Role::Assistant);
        assert_eq!(session.messages()[1].text(), "Hi there");
        assert_eq!(session.status(), Status::Ready);
        assert!(!session.is_streaming());

        let revalidations = drain(&mut rx)
            .into_iter()
            .filter(|n| matches!(n, Notice::Revalidate { .. }))
            .count();
        assert_eq!(revalidations, 1);
    }

    #[tokio::test]
    async fn done_writes_cache_once() {
        let transport = ScriptedTransport::default();
        let tx = transport.expect_turn();
        let storage = Arc::new(CountingStorage::default());
        let (mut session, _rx) = session_with(
            &transport,
            MessageCache::from_shared(storage.clone()),
            SessionConfig::default(),
        );
        session.mount("c1", MountOptions::default()).await;
        session.composer_mut().set_text("Hello");
        session.submit().unwrap();
        tx.send(delta("Hi")).unwrap();
        assert!(matches!(session.pump().await, Step::Applied(_)));

        let before = storage.writes();
        tx.send(Ok(StreamEvent::Done)).unwrap();
        assert_eq!(session.pump().await, Step::Finished);
        assert_eq!(storage.writes() - before, 1);
    }

    #[tokio::test]
    async fn stop_keeps_applied_deltas_only() {
        let transport = ScriptedTransport::default();
        let tx = transport.expect_turn();
        let (mut session, _rx) = session(&transport);
        session.mount("c1", MountOptions::default()).await;
        session.composer_mut().set_text("Tell me a story");
        session.submit().unwrap();

        tx.send(delta("Once")).unwrap();
        tx.send(delta(" upon")).unwrap();
        session.pump().await;
        session.pump().await;

        assert!(session.stop());
        assert!(!session.stop());
        // Delivered after stop returned.
        let _ = tx.send(delta(" a time"));

        assert_eq!(session.pump().await, Step::Idle);
        assert_eq!(session.messages()[1].text(), "Once upon");
        assert_eq!(session.status(), Status::Ready);
    }

    #[tokio::test]
    async fn stop_handle_cancels_from_another_task() {
        let transport = ScriptedTransport::default();
        let tx = transport.expect_turn();
        let (mut session, _rx) = session(&transport);
        session.mount("c1", MountOptions::default()).await;
        session.composer_mut().set_text("Hi");
        session.submit().unwrap();
        tx.send(delta("Par")).unwrap();
        session.pump().await;

        let stop = session.stop_handle().expect("turn running");
        tokio::spawn(async move { stop.stop() }).await.unwrap();

        assert_eq!(session.pump().await, Step::Cancelled);
        assert_eq!(session.messages()[1].text(), "Par");
        assert_eq!(session.engine_mut().phase(), Phase::Live);
    }

    #[tokio::test]
    async fn resume_shows_partial_then_pending_delta() {
        let transport = ScriptedTransport::default();
        let partial = msg("a1", Role::Assistant, "Hello, wor");
        let tx = transport.expect_resume(Some(partial));
        let (mut session, _rx) = session(&transport);

        session
            .mount(
                "c1",
                MountOptions {
                    snapshot: vec![msg("u1", Role::User, "Greet the world")],
                    ..Default::default()
                },
            )
            .await;

        assert_eq!(session.status(), Status::Streaming);
        assert_eq!(session.messages().len(), 2);
        assert_eq!(session.messages()[1].text(), "Hello, wor");

        tx.send(delta("ld")).unwrap();
        tx.send(Ok(StreamEvent::Done)).unwrap();
        assert_eq!(session.drive(|_| {}).await, Step::Finished);

        assert_eq!(session.messages().len(), 2);
        assert_eq!(session.messages()[1].text(), "Hello, world");
        assert_eq!(session.status(), Status::Ready);
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn resume_check_skipped_without_auto_resume() {
        let transport = ScriptedTransport::default();
        let _tx = transport.expect_resume(None);
        let (mut session, _rx) = session(&transport);

        session
            .mount(
                "c1",
                MountOptions {
                    auto_resume: false,
                    ..Default::default()
                },
            )
            .await;
        assert_eq!(session.status(), Status::Ready);
        assert!(!session.is_streaming());
    }

    #[tokio::test]
    async fn remount_detaches_old_stream() {
        let transport = ScriptedTransport::default();
        let old = transport.expect_turn();
        let cache = MessageCache::new(MemoryStorage::new());
        let (mut session, _rx) =
            session_with(&transport, cache.clone(), SessionConfig::default());
        session.mount("c1", MountOptions::default()).await;
        session.composer_mut().set_text("First chat");
        session.submit().unwrap();

        session
            .mount(
                "c2",
                MountOptions {
                    snapshot: vec![msg("x1", Role::User, "Second chat")],
                    ..Default::default()
                },
            )
            .await;
        let _ = old.send(delta("leaked"));

        assert_eq!(session.pump().await, Step::Idle);
        assert_eq!(session.messages().len(), 1);
        assert_eq!(session.messages()[0].text(), "Second chat");
        assert_eq!(cache.read("c1").unwrap().len(), 1);
    }

    #[tokio::test]
    async fn error_event_fails_turn_and_keeps_partial() {
        let transport = ScriptedTransport::default();
        let tx = transport.expect_turn();
        let (mut session, mut rx) = session(&transport);
        session.mount("c1", MountOptions::default()).await;
        session.composer_mut().set_text("Hi");
        session.submit().unwrap();

        tx.send(delta("Hal")).unwrap();
        tx.send(Ok(StreamEvent::Error("model overloaded".into())))
            .unwrap();

        let step = session.drive(|_| {}).await;
        assert_eq!(step, Step::Failed(TurnError::Transport("model overloaded".into())));
        assert_eq!(session.status(), Status::Error);
        assert_eq!(session.messages()[1].text(), "Hal");
        assert!(drain(&mut rx).contains(&Notice::Toast {
            message: "model overloaded".into()
        }));

        // A failed turn leaves the conversation usable.
        let _retry = transport.expect_turn();
        session.composer_mut().set_text("Again");
        assert!(session.submit().is_ok());
    }

    #[tokio::test]
    async fn auth_failure_redirects_to_login() {
        let transport = ScriptedTransport::default();
        let tx = transport.expect_turn();
        let (mut session, mut rx) = session(&transport);
        session.mount("c1", MountOptions::default()).await;
        session.composer_mut().set_text("Hi");
        session.submit().unwrap();

        tx.send(Err(Error::AuthRequired)).unwrap();
        assert_eq!(session.pump().await, Step::Failed(TurnError::AuthRequired));

        let notices = drain(&mut rx);
        assert!(notices.contains(&Notice::Redirect {
            location: "/login?next=%2Fchat%2Fc1".into()
        }));
        assert!(!notices.iter().any(|n| matches!(n, Notice::Toast { .. })));
    }

    #[tokio::test]
    async fn stream_end_without_done_is_interrupted() {
        let transport = ScriptedTransport::default();
        let tx = transport.expect_turn();
        let (mut session, _rx) = session(&transport);
        session.mount("c1", MountOptions::default()).await;
        session.composer_mut().set_text("Hi");
        session.submit().unwrap();

        tx.send(delta("cut")).unwrap();
        drop(tx);

        assert_eq!(
            session.drive(|_| {}).await,
            Step::Failed(TurnError::Interrupted)
        );
        assert_eq!(session.messages()[1].text(), "cut");
        assert_eq!(session.status(), Status::Error);
    }

    #[tokio::test(start_paused = true)]
    async fn silent_stream_times_out() {
        let transport = ScriptedTransport::default();
        let _tx = transport.expect_turn();
        let config = SessionConfig {
            stream_timeout: Some(Duration::from_secs(30)),
            ..Default::default()
        };
        let (mut session, _rx) =
            session_with(&transport, MessageCache::new(MemoryStorage::new()), config);
        session.mount("c1", MountOptions::default()).await;
        session.composer_mut().set_text("Hi");
        session.submit().unwrap();

        assert_eq!(
            session.pump().await,
            Step::Failed(TurnError::Timeout(Duration::from_secs(30)))
        );
        assert_eq!(session.status(), Status::Error);
        assert!(!session.is_streaming());
    }

    #[tokio::test]
    async fn submit_rejections() {
        let transport = ScriptedTransport::default();
        let _tx = transport.expect_turn();
        let (mut session, _rx) = session(&transport);
        session.mount("c1", MountOptions::default()).await;

        assert_eq!(session.submit(), Err(SubmitRejected::Empty));
        assert_eq!(session.regenerate(), Err(SubmitRejected::NothingToRegenerate));

        session.composer_mut().set_text("first");
        session.submit().unwrap();
        session.composer_mut().set_text("second");
        assert_eq!(session.submit(), Err(SubmitRejected::Busy));
        assert_eq!(session.messages().len(), 1);
        assert_eq!(session.composer().text(), "second");
    }

    #[tokio::test]
    async fn regenerate_resends_last_user_message() {
        let transport = ScriptedTransport::default();
        let tx = transport.expect_turn();
        let (mut session, _rx) = session(&transport);
        session
            .mount(
                "c1",
                MountOptions {
                    snapshot: vec![
                        msg("u1", Role::User, "Name a color"),
                        msg("a1", Role::Assistant, "Blue"),
                    ],
                    ..Default::default()
                },
            )
            .await;

        session.regenerate().unwrap();
        assert_eq!(session.messages().len(), 1);

        tx.send(delta("Green")).unwrap();
        tx.send(Ok(StreamEvent::Done)).unwrap();
        session.drive(|_| {}).await;

        let requests = transport.requests();
        assert_eq!(requests[0].trigger, Trigger::RegenerateMessage);
        assert_eq!(requests[0].message.id, "u1");
        assert_eq!(session.messages().len(), 2);
        assert_eq!(session.messages()[1].text(), "Green");
    }

    #[tokio::test]
    async fn initial_query_is_submitted_after_hydration() {
        let transport = ScriptedTransport::default();
        let _tx = transport.expect_turn();
        let (mut session, _rx) = session(&transport);

        session
            .mount(
                "c1",
                MountOptions {
                    query: Some("What is ownership?".into()),
                    ..Default::default()
                },
            )
            .await;

        assert_eq!(session.status(), Status::Submitted);
        assert_eq!(transport.requests()[0].message.text(), "What is ownership?");
    }

    struct FlakyUploader;

    #[async_trait::async_trait]
    impl Uploader for FlakyUploader {
        async fn upload(&self, file: UploadFile) -> Result<Attachment, Error> {
            match file.name.as_str() {
                "expired.png" => Err(Error::AuthRequired),
                "huge.png" => Err(Error::Api {
                    status: 413,
                    code: None,
                    message: "File size should be less than 5MB".into(),
                }),
                _ => Ok(Attachment {
                    url: format!("https://files.example/{}", file.name),
                    name: file.name,
                    content_type: file.content_type,
                }),
            }
        }
    }

    #[tokio::test]
    async fn upload_failures_become_notices() {
        let transport = ScriptedTransport::default();
        let (mut session, mut rx) = session(&transport);
        session.mount("c1", MountOptions::default()).await;

        let files = ["ok.png", "huge.png", "expired.png"]
            .into_iter()
            .map(|name| UploadFile {
                name: name.into(),
                content_type: "image/png".into(),
                bytes: Vec::new(),
            })
            .collect();
        let failures = session.attach(&FlakyUploader, files).await;

        assert_eq!(failures.len(), 2);
        assert_eq!(session.composer().attachments().len(), 1);

        let notices = drain(&mut rx);
        assert!(notices.iter().any(|n| matches!(
            n,
            Notice::Toast { message } if message.starts_with("Failed to upload huge.png")
        )));
        assert!(notices.contains(&Notice::Redirect {
            location: "/login?next=%2Fchat%2Fc1".into()
        }));
    }
}
