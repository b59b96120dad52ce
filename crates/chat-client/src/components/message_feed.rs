// crates/chat-client/src/components/message_feed.rs

use chrono::Local;
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem},
    Frame,
};

use crate::app::App;

pub fn draw_message_feed(f: &mut Frame, area: Rect, app: &App) {
    let feed = app.session.feed().as_slice();
    let me = app.session.display_name();

    // Newest at the bottom; show the tail that fits.
    let visible = area.height.saturating_sub(2) as usize;
    let start = feed.len().saturating_sub(visible);

    let items: Vec<ListItem> = feed[start..]
        .iter()
        .map(|message| {
            let author_color = if Some(&message.author) == me {
                Color::Cyan
            } else {
                Color::Green
            };
            ListItem::new(Line::from(vec![
                Span::styled(
                    message.sent_at.with_timezone(&Local).format("%H:%M:%S ").to_string(),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::styled(
                    message.author.to_string(),
                    Style::default().fg(author_color).add_modifier(Modifier::BOLD),
                ),
                Span::raw(": "),
                Span::raw(message.body.as_str()),
            ]))
        })
        .collect();

    let list = List::new(items).block(Block::default().title(" Messages ").borders(Borders::ALL));

    f.render_widget(list, area);
}
