// crates/chat-client/src/components/login.rs

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use crate::app::App;

pub fn draw_login(f: &mut Frame, area: Rect, app: &App) {
    f.render_widget(Clear, area);

    let block = Block::default()
        .title(" Join the room ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2), // Prompt
            Constraint::Length(3), // Name input
            Constraint::Min(1),    // Hint
        ])
        .split(inner);

    let prompt = Paragraph::new("Choose a display name")
        .style(Style::default().fg(Color::Gray))
        .alignment(Alignment::Center);
    f.render_widget(prompt, chunks[0]);

    let input = Paragraph::new(Line::from(vec![
        Span::raw("Name: "),
        Span::styled(
            app.input_buffer.as_str(),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
    ]))
    .block(Block::default().borders(Borders::BOTTOM));
    f.render_widget(input, chunks[1]);
    if !app.show_help {
        f.set_cursor(chunks[1].x + 6 + app.input_cursor as u16, chunks[1].y);
    }

    let hint = Paragraph::new("[Enter] Join | [Ctrl-C] Quit")
        .style(Style::default().fg(Color::Gray))
        .alignment(Alignment::Center);
    f.render_widget(hint, chunks[2]);
}
