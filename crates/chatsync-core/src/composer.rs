use chatsync_cache::MessageCache;
use chatsync_proto::{Attachment, Part, UploadFile, Uploader};
use futures::future::join_all;

/// An upload that did not produce an attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFailure {
    pub name: String,
    pub auth_required: bool,
    pub message: String,
}

/// Text and attachments for the next turn.
///
/// The text survives restarts through the cache's draft slot.
pub struct Composer {
    text: String,
    attachments: Vec<Attachment>,
    upload_queue: Vec<String>,
    cache: MessageCache,
}

impl Composer {
    pub fn new(cache: MessageCache) -> Self {
        let text = cache.read_draft().unwrap_or_default();
        Self {
            text,
            attachments: Vec::new(),
            upload_queue: Vec::new(),
            cache,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.cache.write_draft(&self.text);
    }

    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    /// Names of files currently uploading.
    pub fn upload_queue(&self) -> &[String] {
        &self.upload_queue
    }

    pub fn add_attachment(&mut self, attachment: Attachment) {
        self.attachments.push(attachment);
    }

    pub fn remove_attachment(&mut self, url: &str) -> bool {
        let before = self.attachments.len();
        self.attachments.retain(|a| a.url != url);
        self.attachments.len() != before
    }

    /// File parts first, then the text. Empty text is left out.
    pub fn build_parts(&self) -> Vec<Part> {
        let mut parts: Vec<Part> = self.attachments.iter().map(Attachment::to_part).collect();
        if !self.text.trim().is_empty() {
            parts.push(Part::text(self.text.clone()));
        }
        parts
    }

    pub fn clear(&mut self) {
        self.attachments.clear();
        self.set_text("");
    }

    /// Upload `files` concurrently. Successful uploads become attachments;
    /// the rest are returned.
    pub async fn attach(
        &mut self,
        uploader: &dyn Uploader,
        files: Vec<UploadFile>,
    ) -> Vec<UploadFailure> {
        self.upload_queue = files.iter().map(|f| f.name.clone()).collect();

        let uploads = files.into_iter().map(|file| async move {
            let name = file.name.clone();
            (name, uploader.upload(file).await)
        });
        let results = join_all(uploads).await;
        self.upload_queue.clear();

        let mut failures = Vec::new();
        for (name, result) in results {
            match result {
                Ok(attachment) => {
                    tracing::debug!(name = %name, url = %attachment.url, "uploaded attachment");
                    self.attachments.push(attachment);
                }
                Err(err) => {
                    tracing::warn!(name = %name, error = %err, "upload failed");
                    failures.push(UploadFailure {
                        name,
                        auth_required: err.is_auth_required(),
                        message: err.to_string(),
                    });
                }
            }
        }
        failures
    }
}
