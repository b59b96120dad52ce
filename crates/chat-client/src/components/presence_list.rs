// crates/chat-client/src/components/presence_list.rs

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, List, ListItem},
    Frame,
};

use crate::app::App;

pub fn draw_presence_list(f: &mut Frame, area: Rect, app: &App) {
    let me = app.session.display_name();

    // Hub order is join order; duplicates are shown as received.
    let items: Vec<ListItem> = app
        .session
        .presence()
        .iter()
        .map(|name| {
            let style = if Some(name) == me {
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            ListItem::new(name.to_string()).style(style)
        })
        .collect();

    let list = List::new(items).block(
        Block::default()
            .title(format!(" Participants ({}) ", app.session.presence().len()))
            .borders(Borders::ALL),
    );

    f.render_widget(list, area);
}
