//! Layout definitions

use ratatui::layout::{Constraint, Direction, Layout, Rect};

/// Create the main layout with exchange, activity, and status areas
pub fn create_layout(area: Rect) -> Vec<Rect> {
    Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(5),    // Exchange stream (expandable)
            Constraint::Length(3), // Activity panel (fixed height)
            Constraint::Length(1), // Status bar
        ])
        .split(area)
        .to_vec()
}
