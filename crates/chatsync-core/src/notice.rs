use tokio::sync::mpsc;

use crate::phase::Status;

/// Messages for the collaborators around the engine: the view, the toast
/// layer, the router and the conversation list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    StatusChanged(Status),
    Toast { message: String },
    Redirect { location: String },
    /// Refresh the conversation list stored under `key`.
    Revalidate { key: String },
}

/// Fire-and-forget sender for [`Notice`]s. Sending never blocks or fails.
#[derive(Debug, Clone, Default)]
pub struct Notifier {
    tx: Option<mpsc::UnboundedSender<Notice>>,
}

impl Notifier {
    pub fn new(tx: mpsc::UnboundedSender<Notice>) -> Self {
        Self { tx: Some(tx) }
    }

    /// A notifier with nobody listening.
    pub fn disconnected() -> Self {
        Self::default()
    }

    pub fn send(&self, notice: Notice) {
        let Some(tx) = &self.tx else {
            return;
        };
        if tx.send(notice).is_err() {
            tracing::trace!("notice receiver dropped");
        }
    }

    pub fn toast(&self, message: impl Into<String>) {
        self.send(Notice::Toast {
            message: message.into(),
        });
    }

    pub fn redirect(&self, location: impl Into<String>) {
        self.send(Notice::Redirect {
            location: location.into(),
        });
    }

    pub fn revalidate(&self, key: &str) {
        self.send(Notice::Revalidate {
            key: key.to_string(),
        });
    }
}

/// Login page URL that brings the user back to `current` afterwards.
pub fn login_redirect(current: &str) -> String {
    let next: String = url::form_urlencoded::byte_serialize(current.as_bytes()).collect();
    format!("/login?next={next}")
}
