use std::time::Duration;

/// Why a turn ended without `done`. Always terminal for that turn only.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TurnError {
    #[error("{0}")]
    Transport(String),

    #[error("authentication required")]
    AuthRequired,

    #[error("no stream event within {0:?}")]
    Timeout(Duration),

    #[error("stream closed before completion")]
    Interrupted,
}

impl TurnError {
    pub fn is_auth_required(&self) -> bool {
        matches!(self, TurnError::AuthRequired)
    }
}

impl From<chatsync_proto::Error> for TurnError {
    fn from(err: chatsync_proto::Error) -> Self {
        match err {
            chatsync_proto::Error::AuthRequired => TurnError::AuthRequired,
            chatsync_proto::Error::Api { message, .. } => TurnError::Transport(message),
            other => TurnError::Transport(other.to_string()),
        }
    }
}

/// A submission that was dropped by local validation. Never shown to the
/// user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SubmitRejected {
    #[error("nothing to send")]
    Empty,

    #[error("a response is still in progress")]
    Busy,

    #[error("no user message to regenerate from")]
    NothingToRegenerate,
}
