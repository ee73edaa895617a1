//! Status bar widget

use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use super::{styles, LoopStage, RenderState};

/// Draw the status bar
pub fn draw_status(frame: &mut Frame, area: Rect, state: &RenderState) {
    let mut spans = vec![];

    // Model
    spans.push(Span::styled(
        format!(" {} ", state.model),
        styles::model_style(),
    ));
    spans.push(Span::styled(" | ", styles::status_style()));

    // Stage indicator
    let stage = match state.stage {
        LoopStage::Listening => Span::styled("Listening", styles::listening_style()),
        LoopStage::Transcribing => Span::styled("Transcribing...", styles::busy_style()),
        LoopStage::Thinking => Span::styled("Thinking...", styles::busy_style()),
    };
    spans.push(stage);

    // Exchange count
    spans.push(Span::styled(" | ", styles::status_style()));
    spans.push(Span::styled(
        format!("{} exchanges", state.exchanges),
        styles::status_style(),
    ));

    // Transient status message
    if let Some(msg) = state.status_message {
        spans.push(Span::styled(" | ", styles::status_style()));
        spans.push(Span::styled(msg, styles::status_style()));
    }

    // Endpoint (right aligned)
    let endpoint = format!("{} ", state.chat_url);
    let left_len: usize = spans.iter().map(|s| s.content.len()).sum();
    let padding = (area.width as usize).saturating_sub(left_len + endpoint.len());
    if padding > 0 {
        spans.push(Span::raw(" ".repeat(padding)));
    }
    spans.push(Span::styled(endpoint, styles::status_style()));

    let line = Line::from(spans);
    frame.render_widget(Paragraph::new(line), area);
}
