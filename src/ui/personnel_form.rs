//! Personnel registration modal

use super::components::{render_button, BUTTON_HEIGHT};
use super::field_renderer::{draw_field, FIELD_HEIGHT};
use super::Screen;
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Style},
    text::Line,
    widgets::{Block, Borders, Clear, List, ListItem},
    Frame,
};

/// Width of the modal in columns
const MODAL_WIDTH: u16 = 64;

/// Draw the modal centered in `area`, with the session roster below it
pub fn draw(frame: &mut Frame, area: Rect, screen: &Screen) {
    let [form_area, roster_area] = Layout::vertical([
        Constraint::Length(modal_height(screen)),
        Constraint::Min(0),
    ])
    .areas(area);
    let modal = centered(form_area, MODAL_WIDTH);

    frame.render_widget(Clear, modal);
    let block = Block::default()
        .title(" Register Personnel ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));
    let inner = block.inner(modal);
    frame.render_widget(block, modal);

    let mut constraints: Vec<Constraint> = screen
        .rows
        .iter()
        .map(|_| Constraint::Length(FIELD_HEIGHT))
        .collect();
    constraints.push(Constraint::Length(BUTTON_HEIGHT));
    let chunks = Layout::vertical(constraints).split(inner);

    for (index, row) in screen.rows.iter().enumerate() {
        draw_field(
            frame,
            chunks[index],
            row.label,
            &row.props(),
            index == screen.active_field,
        );
    }

    let label = if screen.form.is_submitting() {
        "Registering..."
    } else {
        "Register (Enter)"
    };
    render_button(
        frame,
        chunks[screen.rows.len()],
        label,
        screen.form.is_submitting(),
    );

    draw_roster(frame, centered(roster_area, MODAL_WIDTH), &screen.roster);
}

fn draw_roster(frame: &mut Frame, area: Rect, roster: &[String]) {
    let items: Vec<ListItem> = if roster.is_empty() {
        vec![ListItem::new(Line::styled(
            "No one registered yet",
            Style::default().fg(Color::DarkGray),
        ))]
    } else {
        roster.iter().map(|name| ListItem::new(name.as_str())).collect()
    };

    let list = List::new(items).block(
        Block::default()
            .title(format!(" Registered ({}) ", roster.len()))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray)),
    );
    frame.render_widget(list, area);
}

fn modal_height(screen: &Screen) -> u16 {
    screen.rows.len() as u16 * FIELD_HEIGHT + BUTTON_HEIGHT + 2
}

fn centered(area: Rect, width: u16) -> Rect {
    let width = width.min(area.width);
    Rect {
        x: area.x + (area.width - width) / 2,
        width,
        ..area
    }
}
