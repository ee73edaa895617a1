//! HTTP client for the chat endpoint

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

use super::types::{ChatRequest, ChatResponse};

pub const DEFAULT_CHAT_URL: &str = "http://localhost:11434/api/chat";
pub const DEFAULT_MODEL: &str = "llama3.2";

/// Substitute reply when the endpoint answers with a non-success status.
pub const SERVICE_FAILURE_REPLY: &str = "Sorry, I couldn't generate a response.";

/// Substitute reply when the endpoint cannot be reached or sends garbage.
pub const TRANSPORT_FAILURE_REPLY: &str = "An error occurred while processing your request.";

/// A hung endpoint must not stall the loop forever.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Anything that can answer a chat request.
#[async_trait]
pub trait ChatService: Send + Sync {
    async fn complete(&self, request: &ChatRequest) -> ChatOutcome;
}

/// Result of one completion call. Failures carry their detail but never
/// propagate as errors; the loop always gets a reply to show.
#[derive(Debug, Clone)]
pub enum ChatOutcome {
    Reply(String),
    /// The endpoint answered with a non-success status.
    ServiceError { status: u16, body: String },
    /// The endpoint could not be reached, timed out, or sent a malformed body.
    TransportError { detail: String },
}

impl ChatOutcome {
    /// The text displayed and recorded as the assistant turn.
    pub fn reply_text(&self) -> &str {
        match self {
            ChatOutcome::Reply(text) => text,
            ChatOutcome::ServiceError { .. } => SERVICE_FAILURE_REPLY,
            ChatOutcome::TransportError { .. } => TRANSPORT_FAILURE_REPLY,
        }
    }

    /// Error line to surface alongside the substitute reply, if any.
    pub fn error_detail(&self) -> Option<String> {
        match self {
            ChatOutcome::Reply(_) => None,
            ChatOutcome::ServiceError { status, body } => {
                Some(format!("Chat endpoint returned {status}: {body}"))
            }
            ChatOutcome::TransportError { detail } => {
                Some(format!("Error communicating with the chat endpoint: {detail}"))
            }
        }
    }
}

/// Client for an Ollama-compatible chat endpoint.
pub struct OllamaChat {
    client: reqwest::Client,
    url: String,
}

impl OllamaChat {
    pub fn new(url: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { client, url })
    }
}

#[async_trait]
impl ChatService for OllamaChat {
    async fn complete(&self, request: &ChatRequest) -> ChatOutcome {
        tracing::debug!(
            "asking {} with {} messages",
            request.model,
            request.messages.len()
        );

        let response = match self.client.post(&self.url).json(request).send().await {
            Ok(response) => response,
            Err(e) => {
                return ChatOutcome::TransportError {
                    detail: e.to_string(),
                }
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_else(|e| e.to_string());
            return ChatOutcome::ServiceError {
                status: status.as_u16(),
                body,
            };
        }

        match response.json::<ChatResponse>().await {
            Ok(body) => ChatOutcome::Reply(body.message.content),
            Err(e) => ChatOutcome::TransportError {
                detail: e.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{ChatSession, SYSTEM_PROMPT};

    struct StubChat(ChatOutcome);

    #[async_trait]
    impl ChatService for StubChat {
        async fn complete(&self, _request: &ChatRequest) -> ChatOutcome {
            self.0.clone()
        }
    }

    #[test]
    fn a_reply_passes_through_unchanged() {
        let outcome = ChatOutcome::Reply("Use traits.".to_string());
        assert_eq!(outcome.reply_text(), "Use traits.");
        assert!(outcome.error_detail().is_none());
    }

    #[test]
    fn service_failures_substitute_the_fixed_reply_and_keep_the_raw_body() {
        let outcome = ChatOutcome::ServiceError {
            status: 404,
            body: r#"{"error":"model 'llama3.2' not found"}"#.to_string(),
        };
        assert_eq!(outcome.reply_text(), SERVICE_FAILURE_REPLY);
        let detail = outcome.error_detail().unwrap();
        assert!(detail.contains("404"));
        assert!(detail.contains("model 'llama3.2' not found"));
    }

    #[test]
    fn transport_failures_get_their_own_substitute_reply() {
        let outcome = ChatOutcome::TransportError {
            detail: "connection refused".to_string(),
        };
        assert_eq!(outcome.reply_text(), TRANSPORT_FAILURE_REPLY);
        assert!(outcome.error_detail().unwrap().contains("connection refused"));
    }

    #[tokio::test]
    async fn a_failed_exchange_still_records_a_user_assistant_pair() {
        let chat = StubChat(ChatOutcome::ServiceError {
            status: 500,
            body: "internal error".to_string(),
        });
        let mut session = ChatSession::new(DEFAULT_MODEL, SYSTEM_PROMPT);

        let request = session.request("What is polymorphism?");
        let outcome = chat.complete(&request).await;
        session.record_exchange("What is polymorphism?", outcome.reply_text());

        let turns = session.turns();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].content, "What is polymorphism?");
        assert_eq!(turns[1].content, SERVICE_FAILURE_REPLY);
    }

    #[tokio::test]
    async fn a_successful_exchange_grows_history_by_exactly_two() {
        let chat = StubChat(ChatOutcome::Reply("It takes many forms.".to_string()));
        let mut session = ChatSession::new(DEFAULT_MODEL, SYSTEM_PROMPT);
        session.record_exchange("Warm-up?", "Done.");

        let request = session.request("What is polymorphism?");
        let outcome = chat.complete(&request).await;
        session.record_exchange("What is polymorphism?", outcome.reply_text());

        assert_eq!(session.turns().len(), 4);
        assert_eq!(session.turns()[3].content, "It takes many forms.");
    }
}
