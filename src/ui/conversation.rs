//! Exchange stream widget

use ratatui::{
    layout::Rect,
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use crate::app::EntryKind;

use super::{styles, RenderState};

/// Draw the question/answer stream with inline status messages
pub fn draw_conversation(frame: &mut Frame, area: Rect, state: &RenderState) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style())
        .title(" Interview Assistant ");

    let inner = block.inner(area);

    let mut lines: Vec<Line> = Vec::new();

    for (index, entry) in state.entries.iter().enumerate() {
        match entry.kind {
            EntryKind::Question => {
                lines.push(Line::from(Span::styled("You: ", styles::question_style())));
                for line in entry.text.lines() {
                    lines.push(Line::from(Span::styled(line.to_string(), styles::text_style())));
                }
                lines.push(Line::from(""));
            }
            EntryKind::Answer => {
                lines.push(Line::from(Span::styled(
                    "Assistant: ",
                    styles::answer_style(),
                )));
                for line in entry.text.lines() {
                    lines.push(Line::from(Span::styled(line.to_string(), styles::text_style())));
                }
                lines.push(Line::from(""));
            }
            EntryKind::Notice => {
                // The opening instruction reads as part of the page, not a warning.
                let style = if index == 0 {
                    styles::instruction_style()
                } else {
                    styles::notice_style()
                };
                for line in entry.text.lines() {
                    lines.push(Line::from(Span::styled(line.to_string(), style)));
                }
                lines.push(Line::from(""));
            }
            EntryKind::Failure => {
                for line in entry.text.lines() {
                    lines.push(Line::from(Span::styled(
                        line.to_string(),
                        styles::failure_style(),
                    )));
                }
                lines.push(Line::from(""));
            }
        }
    }

    // Keep the newest lines in view unless the user scrolled back
    let visible_height = inner.height as usize;
    let total_lines = lines.len();
    let scroll = if total_lines > visible_height {
        let max_scroll = total_lines.saturating_sub(visible_height);
        max_scroll.saturating_sub(state.scroll_offset)
    } else {
        0
    };

    let paragraph = Paragraph::new(Text::from(lines))
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((scroll as u16, 0));

    frame.render_widget(paragraph, area);
}
