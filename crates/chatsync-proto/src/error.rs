/// Errors that can occur while talking to the chat backend.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("http error: {0}")]
    Http(Box<dyn std::error::Error + Send + Sync>),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("sse error: {0}")]
    Sse(String),

    /// The backend answered with a 401-class status. This is the only
    /// authentication signal the client understands.
    #[error("authentication required")]
    AuthRequired,

    #[error("api error ({status}): {message}")]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
    },

    #[error("{0}")]
    Other(String),
}

impl Error {
    pub fn is_auth_required(&self) -> bool {
        matches!(self, Error::AuthRequired)
    }
}
