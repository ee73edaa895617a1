//! UI styles and colors (Catppuccin theme)

use ratatui::style::{Color, Modifier, Style};

// Catppuccin Mocha palette (the subset in use)
pub const MAUVE: Color = Color::Rgb(203, 166, 247);
pub const RED: Color = Color::Rgb(243, 139, 168);
pub const YELLOW: Color = Color::Rgb(249, 226, 175);
pub const GREEN: Color = Color::Rgb(166, 227, 161);
pub const SAPPHIRE: Color = Color::Rgb(116, 199, 236);
pub const BLUE: Color = Color::Rgb(137, 180, 250);
pub const TEXT: Color = Color::Rgb(205, 214, 244);
pub const SUBTEXT0: Color = Color::Rgb(166, 173, 200);
pub const OVERLAY1: Color = Color::Rgb(127, 132, 156);
pub const SURFACE2: Color = Color::Rgb(88, 91, 112);

pub fn question_style() -> Style {
    Style::default().fg(SAPPHIRE).add_modifier(Modifier::BOLD)
}

pub fn answer_style() -> Style {
    Style::default().fg(MAUVE)
}

pub fn notice_style() -> Style {
    Style::default().fg(YELLOW).add_modifier(Modifier::ITALIC)
}

pub fn failure_style() -> Style {
    Style::default().fg(RED)
}

pub fn instruction_style() -> Style {
    Style::default().fg(OVERLAY1).add_modifier(Modifier::ITALIC)
}

pub fn listening_style() -> Style {
    Style::default().fg(GREEN).add_modifier(Modifier::BOLD)
}

pub fn busy_style() -> Style {
    Style::default().fg(YELLOW)
}

pub fn text_style() -> Style {
    Style::default().fg(TEXT)
}

pub fn border_style() -> Style {
    Style::default().fg(SURFACE2)
}

pub fn status_style() -> Style {
    Style::default().fg(SUBTEXT0)
}

pub fn model_style() -> Style {
    Style::default().fg(BLUE)
}
