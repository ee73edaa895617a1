//! Activity panel widget

use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use super::{styles, LoopStage, RenderState};

/// Draw the panel showing what the loop is doing right now
pub fn draw_activity(frame: &mut Frame, area: Rect, state: &RenderState) {
    let (title, border_style, message) = match state.stage {
        LoopStage::Listening => (
            " Listening ",
            styles::listening_style(),
            "Speak your question. Finish with a full stop, and pause when you're done.",
        ),
        LoopStage::Transcribing => (
            " Transcribing ",
            styles::busy_style(),
            "Turning your words into text...",
        ),
        LoopStage::Thinking => (
            " Thinking ",
            styles::busy_style(),
            "Waiting for the model's answer...",
        ),
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style)
        .title(title);

    let line = Line::from(vec![
        Span::raw("  "),
        Span::styled(message, styles::text_style()),
    ]);

    let paragraph = Paragraph::new(line).block(block);
    frame.render_widget(paragraph, area);
}
