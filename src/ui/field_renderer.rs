//! Field rendering for bound inputs

use labconsole_forms::forms::FieldProps;
use ratatui::{
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

/// Rows taken by one field (borders + content)
pub const FIELD_HEIGHT: u16 = 3;

/// Draw a field from the props its binding last rendered.
///
/// The first error only shows once the field has been touched.
pub fn draw_field(frame: &mut Frame, area: Rect, label: &str, props: &FieldProps, is_active: bool) {
    let show_error = props.touched && props.has_error();

    let accent = if show_error {
        Color::Red
    } else if is_active {
        Color::Cyan
    } else {
        Color::DarkGray
    };

    let text = props.text();
    let display = if text.is_empty() && !is_active {
        "(empty)".to_string()
    } else {
        text
    };
    let cursor = if is_active { "▌" } else { "" };

    let content = Paragraph::new(Line::from(vec![
        Span::styled(display, Style::default().fg(accent)),
        Span::styled(cursor, Style::default().fg(Color::Cyan)),
    ]));

    let mut block = Block::default()
        .title(format!(" {label} "))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(accent));

    if show_error {
        if let Some(error) = props.error() {
            block = block.title_bottom(Line::from(Span::styled(
                format!(" {error} "),
                Style::default().fg(Color::Red),
            )));
        }
    }

    frame.render_widget(content.wrap(Wrap { trim: false }).block(block), area);
}
