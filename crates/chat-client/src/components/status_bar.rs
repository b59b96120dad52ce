// crates/chat-client/src/components/status_bar.rs

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use chat_client::SessionState;

use crate::app::{App, NoticeLevel};

pub fn draw_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let state = app.session.state();
    let state_color = match state {
        SessionState::Live => Color::Green,
        SessionState::Connecting | SessionState::Handshaking | SessionState::Reconnecting => Color::Yellow,
        SessionState::Closed => Color::Red,
        SessionState::Idle => Color::Gray,
    };

    let mut spans = vec![
        Span::styled(
            format!("[{}]", state),
            Style::default().fg(state_color).add_modifier(Modifier::BOLD),
        ),
        Span::raw(" "),
    ];

    if let Some(notice) = &app.notice {
        let color = match notice.level {
            NoticeLevel::Info => Color::White,
            NoticeLevel::Warning => Color::Yellow,
            NoticeLevel::Error => Color::Red,
        };
        spans.push(Span::styled(notice.text.as_str(), Style::default().fg(color)));
    }

    let paragraph = Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::ALL));

    f.render_widget(paragraph, area);
}
