// crates/chat-client/src/ui.rs

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::app::{App, Screen};
use crate::components::{
    compose::draw_compose,
    help::draw_help,
    login::draw_login,
    message_feed::draw_message_feed,
    presence_list::draw_presence_list,
    status_bar::draw_status_bar,
};

pub fn draw(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(6),    // Main content
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    draw_header(f, chunks[0], app);

    match app.screen {
        Screen::Login => draw_login(f, centered_rect(50, 40, chunks[1]), app),
        Screen::Chat => draw_room(f, chunks[1], app),
    }

    draw_status_bar(f, chunks[2], app);

    if app.show_help {
        draw_help(f, centered_rect(60, 60, f.size()), app.screen);
    }
}

fn draw_header(f: &mut Frame, area: Rect, app: &App) {
    let header_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(33),
            Constraint::Percentage(34),
            Constraint::Percentage(33),
        ])
        .split(area);

    let who = app
        .session
        .display_name()
        .map(|name| name.to_string())
        .unwrap_or_else(|| "not joined".to_string());
    let left = Line::from(vec![
        Span::styled("Chat", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
        Span::raw(" - "),
        Span::raw(who),
    ]);
    f.render_widget(
        Paragraph::new(left).block(Block::default().borders(Borders::ALL)),
        header_chunks[0],
    );

    let center = format!(
        "Hub: {} | Online: {} | Msgs: {}",
        app.hub_addr(),
        app.session.presence().len(),
        app.session.feed().len()
    );
    f.render_widget(
        Paragraph::new(center)
            .style(Style::default().fg(Color::Yellow))
            .block(Block::default().borders(Borders::ALL)),
        header_chunks[1],
    );

    let hints = match app.screen {
        Screen::Login => "[F1]Help [Enter]Join [Ctrl-C]Quit",
        Screen::Chat => "[F1]Help [Esc]Leave [Ctrl-C]Quit",
    };
    f.render_widget(
        Paragraph::new(hints)
            .style(Style::default().fg(Color::Gray))
            .block(Block::default().borders(Borders::ALL)),
        header_chunks[2],
    );
}

fn draw_room(f: &mut Frame, area: Rect, app: &App) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(24), // Participants
            Constraint::Min(20),    // Feed + compose
        ])
        .split(area);

    draw_presence_list(f, columns[0], app);

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(3)])
        .split(columns[1]);

    draw_message_feed(f, right[0], app);
    draw_compose(f, right[1], app);
}

pub fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
