mod resume;
mod stream;
mod types;
mod upload;

use async_trait::async_trait;
use chatsync_proto::error::Error;
use chatsync_proto::{
    Attachment, ChatTransport, ChatTransportBackend, ResumedStream, StreamHandle, TurnRequest,
    UploadFile, Uploader,
};
use reqwest::StatusCode;
use std::sync::Arc;

pub use types::ServerSnapshot;

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Configuration for the HTTP chat backend.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub base_url: String,
    /// Raw `Cookie` header value carrying the ambient session.
    pub session_cookie: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".into(),
            session_cookie: None,
        }
    }
}

impl HttpConfig {
    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url.trim_end_matches('/'))
    }
}

/// A cheap, cloneable client for one chat backend.
#[derive(Clone)]
pub struct HttpClient {
    state: Arc<ClientState>,
}

impl HttpClient {
    pub fn new(config: HttpConfig) -> Self {
        Self {
            state: Arc::new(ClientState {
                client: reqwest::Client::new(),
                config,
            }),
        }
    }

    /// This client as a type-erased transport for the engine.
    pub fn transport(&self) -> ChatTransport {
        ChatTransport::new(self.clone())
    }

    /// Fetch the server-rendered view of a conversation. An unknown
    /// conversation yields an empty snapshot.
    pub async fn snapshot(&self, conversation_id: &str) -> Result<ServerSnapshot, Error> {
        let url = self
            .state
            .config
            .endpoint(&format!("/api/chat/{conversation_id}/messages"));
        let resp = self
            .state
            .authorized(self.state.client.get(&url))
            .send()
            .await
            .map_err(|e| Error::Http(Box::new(e)))?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(ServerSnapshot::default());
        }
        let resp = stream::ensure_success(resp).await?;
        resp.json().await.map_err(|e| Error::Http(Box::new(e)))
    }
}

// ---------------------------------------------------------------------------
// Internals
// ---------------------------------------------------------------------------

struct ClientState {
    client: reqwest::Client,
    config: HttpConfig,
}

impl ClientState {
    fn authorized(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.session_cookie {
            Some(cookie) => req.header(reqwest::header::COOKIE, cookie),
            None => req,
        }
    }
}

#[async_trait]
impl ChatTransportBackend for HttpClient {
    fn send(&self, request: TurnRequest) -> StreamHandle {
        let conversation_id = request.conversation_id.clone();
        let body = types::ChatRequestBody {
            id: request.conversation_id,
            message: request.message,
            selected_chat_model: request.model_id,
            selected_visibility_type: request.visibility,
            trigger: request.trigger,
        };
        StreamHandle::new(conversation_id, stream::open(Arc::clone(&self.state), body))
    }

    async fn check_resumable(
        &self,
        conversation_id: &str,
    ) -> Result<Option<ResumedStream>, Error> {
        resume::check(Arc::clone(&self.state), conversation_id).await
    }
}

#[async_trait]
impl Uploader for HttpClient {
    async fn upload(&self, file: UploadFile) -> Result<Attachment, Error> {
        upload::upload(Arc::clone(&self.state), file).await
    }
}
