//! The conversation-history accumulator

use crate::chat::{ChatMessage, ChatRequest};

/// Fixed framing sent as the first message of every request.
pub const SYSTEM_PROMPT: &str =
    "You are a helpful interview assistant. Provide clear, concise, and professional answers.";

/// Running conversation for one process lifetime.
///
/// Turns are append-only and always come in user/assistant pairs. The whole
/// history is replayed verbatim on every request; nothing is evicted or
/// summarized, and nothing survives a restart.
pub struct ChatSession {
    model: String,
    system_prompt: String,
    turns: Vec<ChatMessage>,
}

impl ChatSession {
    pub fn new(model: impl Into<String>, system_prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            system_prompt: system_prompt.into(),
            turns: Vec::new(),
        }
    }

    /// Build the request for a new question: system prompt first, then every
    /// prior turn in original order, then the question as the last message.
    pub fn request(&self, question: &str) -> ChatRequest {
        let mut messages = Vec::with_capacity(self.turns.len() + 2);
        messages.push(ChatMessage::system(&self.system_prompt));
        messages.extend(self.turns.iter().cloned());
        messages.push(ChatMessage::user(question));

        ChatRequest {
            model: self.model.clone(),
            messages,
            stream: false,
        }
    }

    /// Record a completed exchange: the user turn, then the assistant turn.
    pub fn record_exchange(&mut self, question: &str, reply: &str) {
        self.turns.push(ChatMessage::user(question));
        self.turns.push(ChatMessage::assistant(reply));
    }

    pub fn turns(&self) -> &[ChatMessage] {
        &self.turns
    }

    /// Number of completed question/answer exchanges.
    pub fn exchanges(&self) -> usize {
        self.turns.len() / 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::Role;

    #[test]
    fn exchange_appends_user_then_assistant() {
        let mut session = ChatSession::new("llama3.2", SYSTEM_PROMPT);
        session.record_exchange("What is polymorphism?", "It lets one interface take many forms.");

        let turns = session.turns();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].role, Role::User);
        assert_eq!(turns[0].content, "What is polymorphism?");
        assert_eq!(turns[1].role, Role::Assistant);
        assert_eq!(turns[1].content, "It lets one interface take many forms.");
        assert_eq!(session.exchanges(), 1);
    }

    #[test]
    fn prior_turns_are_untouched_by_later_exchanges() {
        let mut session = ChatSession::new("llama3.2", SYSTEM_PROMPT);
        session.record_exchange("First question?", "First answer.");
        let snapshot: Vec<_> = session.turns().to_vec();

        session.record_exchange("Second question?", "Second answer.");

        assert_eq!(session.turns().len(), 4);
        assert_eq!(&session.turns()[..2], &snapshot[..]);
    }

    #[test]
    fn second_request_replays_the_full_history_in_order() {
        let mut session = ChatSession::new("llama3.2", SYSTEM_PROMPT);
        session.record_exchange("What is polymorphism?", "It lets one interface take many forms.");

        let request = session.request("Explain it with an example.");

        // 1 system + 2 per completed exchange + 1 new user message
        assert_eq!(request.messages.len(), 1 + 2 * session.exchanges() + 1);
        assert_eq!(request.messages[0].role, Role::System);
        assert_eq!(request.messages[0].content, SYSTEM_PROMPT);
        assert_eq!(request.messages[1].content, "What is polymorphism?");
        assert_eq!(request.messages[2].content, "It lets one interface take many forms.");
        assert_eq!(request.messages[3].role, Role::User);
        assert_eq!(request.messages[3].content, "Explain it with an example.");
        assert!(!request.stream);
    }

    #[test]
    fn building_a_request_does_not_record_anything() {
        let session = ChatSession::new("llama3.2", SYSTEM_PROMPT);
        let _ = session.request("Anything at all?");
        assert!(session.turns().is_empty());
    }
}
