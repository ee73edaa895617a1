//! Wire types for the chat endpoint

use serde::{Deserialize, Serialize};

/// Message role in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One role-tagged message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Request body for one completion. `stream` is always false: the reply
/// comes back whole, not incrementally.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
}

/// Successful response body; only the nested reply text is of interest.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    pub message: ResponseMessage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResponseMessage {
    pub content: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_serializes_to_the_expected_wire_format() {
        let request = ChatRequest {
            model: "llama3.2".to_string(),
            messages: vec![
                ChatMessage::system("Be helpful."),
                ChatMessage::user("What is polymorphism?"),
            ],
            stream: false,
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({
                "model": "llama3.2",
                "messages": [
                    {"role": "system", "content": "Be helpful."},
                    {"role": "user", "content": "What is polymorphism?"},
                ],
                "stream": false,
            })
        );
    }

    #[test]
    fn reply_text_is_extracted_from_the_nested_message() {
        let body = r#"{
            "model": "llama3.2",
            "created_at": "2024-11-04T12:00:00Z",
            "message": {"role": "assistant", "content": "Many forms, one interface."},
            "done": true,
            "eval_count": 42
        }"#;

        let response: ChatResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.message.content, "Many forms, one interface.");
    }
}
