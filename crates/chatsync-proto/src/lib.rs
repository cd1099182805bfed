pub mod error;
pub mod handle;
pub mod message;
pub mod models;
pub mod stream;
pub mod transport;

pub use error::Error;
pub use handle::{StopHandle, StreamHandle};
pub use message::{FilePart, Message, Part, Role, TextPart, generate_id};
pub use models::{ChatModel, DEFAULT_CHAT_MODEL, chat_models, find_model};
pub use stream::{StreamEvent, Usage};
pub use transport::{
    Attachment, ChatTransport, ChatTransportBackend, ResumedStream, Trigger, TurnRequest,
    UploadFile, Uploader, Visibility,
};
