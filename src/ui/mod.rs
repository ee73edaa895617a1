//! UI components using ratatui

mod activity;
mod conversation;
mod layout;
mod status;
mod styles;

pub use activity::*;
pub use conversation::*;
pub use layout::*;
pub use status::*;
pub use styles::*;

use ratatui::Frame;

use crate::app::ConversationEntry;

/// Where the session loop currently is; drives the activity panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopStage {
    /// Microphone open, waiting for or recording speech
    Listening,
    /// Captured audio is at the transcription service
    Transcribing,
    /// Question dispatched, waiting for the model
    Thinking,
}

/// State needed for rendering (borrowed references)
pub struct RenderState<'a> {
    pub entries: &'a [ConversationEntry],
    pub stage: LoopStage,
    pub model: &'a str,
    pub chat_url: &'a str,
    pub scroll_offset: usize,
    pub status_message: Option<&'a str>,
    pub exchanges: usize,
}

/// Main draw function
pub fn draw(frame: &mut Frame, state: &RenderState) {
    let chunks = create_layout(frame.area());

    // Draw the exchange stream
    draw_conversation(frame, chunks[0], state);

    // Draw the activity panel
    draw_activity(frame, chunks[1], state);

    // Draw status bar
    draw_status(frame, chunks[2], state);
}
