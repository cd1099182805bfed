use crate::ClientState;
use crate::stream::ensure_success;
use crate::types::UploadResponse;
use chatsync_proto::error::Error;
use chatsync_proto::{Attachment, UploadFile};
use reqwest::multipart::{Form, Part};
use std::sync::Arc;

pub async fn upload(state: Arc<ClientState>, file: UploadFile) -> Result<Attachment, Error> {
    let url = state.config.endpoint("/api/files/upload");
    let name = file.name.clone();

    let part = Part::bytes(file.bytes)
        .file_name(file.name)
        .mime_str(&file.content_type)
        .map_err(|e| Error::Http(Box::new(e)))?;
    let form = Form::new().part("file", part);

    let resp = state
        .authorized(state.client.post(&url))
        .multipart(form)
        .send()
        .await
        .map_err(|e| Error::Http(Box::new(e)))?;
    let resp = ensure_success(resp).await?;

    let body: UploadResponse = resp.json().await.map_err(|e| Error::Http(Box::new(e)))?;
    tracing::debug!(file = %name, url = %body.url, "uploaded attachment");

    Ok(Attachment {
        url: body.url,
        name: body.pathname,
        content_type: body.content_type,
    })
}
