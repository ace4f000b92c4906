//! Wire types of the conversation endpoint

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Body of `POST /backend-api/conversation`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationRequest {
    pub action: String,
    pub messages: Vec<ConversationMessage>,
    pub model: String,
    pub parent_message_id: Uuid,
}

impl ConversationRequest {
    /// Ask the next question in a thread
    pub fn next(question: &str, model: &str, parent_message_id: Uuid) -> Self {
        Self {
            action: "next".to_string(),
            messages: vec![ConversationMessage::user(question)],
            model: model.to_string(),
            parent_message_id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub id: Uuid,
    pub role: String,
    pub content: MessageContent,
}

impl ConversationMessage {
    /// User message with a fresh id
    pub fn user(text: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            role: "user".to_string(),
            content: MessageContent::text(text),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageContent {
    pub content_type: String,
    pub parts: Vec<String>,
}

impl MessageContent {
    pub fn text(text: &str) -> Self {
        Self {
            content_type: "text".to_string(),
            parts: vec![text.to_string()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_shape() {
        let thread = Uuid::new_v4();
        let request = ConversationRequest::next("What is Rust?", "text-davinci-002-render", thread);
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["action"], "next");
        assert_eq!(json["model"], "text-davinci-002-render");
        assert_eq!(json["parent_message_id"], thread.to_string());
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][0]["content"]["content_type"], "text");
        assert_eq!(json["messages"][0]["content"]["parts"][0], "What is Rust?");
        assert!(json["messages"][0]["id"].is_string());
    }

    #[test]
    fn test_message_ids_are_fresh() {
        let a = ConversationMessage::user("q");
        let b = ConversationMessage::user("q");
        assert_ne!(a.id, b.id);
    }
}
