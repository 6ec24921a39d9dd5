//! UI module for rendering the TUI

mod components;
mod field_renderer;
mod personnel_form;
pub mod widgets;

use crate::app::App;
use labconsole_forms::forms::{FieldProps, FormInstance};
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};
use self::widgets::TextInput;

/// One input as seen by the draw loop
pub struct RowView {
    pub label: &'static str,
    input: TextInput,
    mounted: FieldProps,
}

impl RowView {
    /// Latest props pushed into the input
    pub fn props(&self) -> FieldProps {
        self.input.props().unwrap_or_else(|| self.mounted.clone())
    }
}

/// What a frame is drawn from.
///
/// Holds handles shared with the `App` rather than borrowing it, so frames
/// can keep being drawn while a key press is still awaiting a validation
/// or a submission.
pub struct Screen {
    pub form: FormInstance,
    pub rows: Vec<RowView>,
    pub active_field: usize,
    pub status_message: Option<String>,
    pub roster: Vec<String>,
}

impl Screen {
    pub fn capture(app: &App) -> Self {
        Self {
            form: app.form.clone(),
            rows: app
                .rows
                .iter()
                .map(|row| RowView {
                    label: row.label,
                    input: row.input.clone(),
                    mounted: row.props(),
                })
                .collect(),
            active_field: app.active_field,
            status_message: app.status_message.clone(),
            roster: app.roster.clone(),
        }
    }
}

/// Main draw function
pub fn draw(frame: &mut Frame, screen: &Screen) {
    let [main_area, status_area] =
        Layout::vertical([Constraint::Min(0), Constraint::Length(1)]).areas(frame.area());

    personnel_form::draw(frame, main_area, screen);
    draw_status_bar(frame, status_area, screen);
}

fn draw_status_bar(frame: &mut Frame, area: Rect, screen: &Screen) {
    let state = screen.form.get_state();
    let mut spans = vec![];

    let validity = if state.is_valid {
        Span::styled(" ● ", Style::default().fg(Color::Green))
    } else {
        Span::styled(" ○ ", Style::default().fg(Color::Red))
    };
    spans.push(validity);

    if state.is_dirty {
        spans.push(Span::styled("modified ", Style::default().fg(Color::Yellow)));
    }
    if state.is_submitting {
        spans.push(Span::styled("submitting... ", Style::default().fg(Color::Yellow)));
    }
    if state.is_validating {
        spans.push(Span::styled("checking... ", Style::default().fg(Color::Yellow)));
    }

    spans.push(Span::styled(
        "Tab: next  Enter: register  Ctrl+R: reset  Esc: quit",
        Style::default().fg(Color::DarkGray),
    ));

    if let Some(msg) = &screen.status_message {
        spans.push(Span::raw(" | "));
        spans.push(Span::styled(msg, Style::default().fg(Color::Green)));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}
