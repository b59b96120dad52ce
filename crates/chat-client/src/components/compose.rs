// crates/chat-client/src/components/compose.rs

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use chat_client::SessionState;

use crate::app::App;

pub fn draw_compose(f: &mut Frame, area: Rect, app: &App) {
    let live = app.session.state() == SessionState::Live;
    let border = if live { Color::Yellow } else { Color::DarkGray };

    let input = Paragraph::new(app.input_buffer.as_str()).block(
        Block::default()
            .title(" Message [Enter] Send ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border)),
    );
    f.render_widget(input, area);

    if !app.show_help {
        f.set_cursor(area.x + 1 + app.input_cursor as u16, area.y + 1);
    }
}
