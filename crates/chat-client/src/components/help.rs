// crates/chat-client/src/components/help.rs

use ratatui::{
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph},
    Frame,
};

use crate::app::Screen;

fn entry(key: &'static str, color: Color, text: &'static str) -> ListItem<'static> {
    ListItem::new(Line::from(vec![
        Span::styled(key, Style::default().fg(color).add_modifier(Modifier::BOLD)),
        Span::raw(text),
    ]))
}

pub fn draw_help(f: &mut Frame, area: Rect, screen: Screen) {
    f.render_widget(Clear, area);

    let mut help_items = match screen {
        Screen::Login => vec![entry("Enter", Color::Green, " - Join with the typed name")],
        Screen::Chat => vec![
            entry("Enter", Color::Green, " - Send message"),
            entry("Esc", Color::Yellow, " - Leave the room"),
        ],
    };
    help_items.extend([
        entry("←/→", Color::White, " - Move cursor"),
        entry("Backspace", Color::White, " - Delete character"),
        entry("F1", Color::Gray, " - Toggle help"),
        entry("Ctrl-C", Color::Red, " - Quit"),
    ]);

    let help_list = List::new(help_items).block(
        Block::default()
            .title(" Help - Keyboard Shortcuts ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)),
    );
    f.render_widget(help_list, area);

    let footer = Paragraph::new("Press F1 or Esc to close help")
        .style(Style::default().fg(Color::Gray))
        .alignment(Alignment::Center);
    let footer_area = Rect {
        x: area.x,
        y: area.y + area.height.saturating_sub(2),
        width: area.width,
        height: 1,
    };
    f.render_widget(footer, footer_area);
}
