use serde::{Deserialize, Serialize};

/// Mint a new message or conversation id without a server round trip.
pub fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

// ---------------------------------------------------------------------------
// Parts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextPart {
    pub text: String,
}

/// A reference to an uploaded file. The bytes live in external storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilePart {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "mediaType")]
    pub media_type: String,
}

/// The closed set of content fragments a message can carry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Part {
    Text(TextPart),
    File(FilePart),
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Part::Text(TextPart { text: text.into() })
    }

    /// True for parts that carry nothing worth sending.
    pub fn is_empty(&self) -> bool {
        match self {
            Part::Text(t) => t.text.trim().is_empty(),
            Part::File(f) => f.url.is_empty(),
        }
    }
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub parts: Vec<Part>,
}

impl Message {
    /// Create a message with a freshly minted id.
    pub fn new(role: Role, parts: Vec<Part>) -> Self {
        Self {
            id: generate_id(),
            role,
            parts,
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, vec![Part::text(text)])
    }

    /// Concatenated text of all text parts, in order.
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| match p {
                Part::Text(t) => Some(t.text.as_str()),
                Part::File(_) => None,
            })
            .collect()
    }

    /// Append a text delta: extends the trailing text part, or starts a new
    /// one when the message ends in a file part.
    pub fn push_text(&mut self, delta: &str) {
        match self.parts.last_mut() {
            Some(Part::Text(t)) => t.text.push_str(delta),
            _ => self.parts.push(Part::text(delta)),
        }
    }

    pub fn push_file(&mut self, file: FilePart) {
        self.parts.push(Part::File(file));
    }
}
