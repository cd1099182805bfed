/// The model selected when the user has not picked one.
pub const DEFAULT_CHAT_MODEL: &str = "chat-model";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChatModel {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
}

const CHAT_MODELS: &[ChatModel] = &[
    ChatModel {
        id: "chat-model",
        name: "General",
        description: "Advanced multimodal model with vision and text capabilities",
    },
    ChatModel {
        id: "chat-model-reasoning",
        name: "Expert",
        description: "Uses advanced chain-of-thought reasoning for complex problems",
    },
];

pub fn chat_models() -> &'static [ChatModel] {
    CHAT_MODELS
}

pub fn find_model(id: &str) -> Option<&'static ChatModel> {
    CHAT_MODELS.iter().find(|m| m.id == id)
}
