// crates/chat-client/src/app.rs

use chat_client::{ClientConfig, Session, SessionError, SessionEvent, SessionState, TcpHubChannel};
use chat_core::DisplayName;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Login,
    Chat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

pub struct App {
    config: ClientConfig,
    pub session: Session<TcpHubChannel>,

    // UI state
    pub screen: Screen,
    pub should_quit: bool,
    pub show_help: bool,
    pub notice: Option<Notice>,

    // Input buffer (cursor counts chars, not bytes)
    pub input_buffer: String,
    pub input_cursor: usize,
}

impl App {
    pub fn new(config: ClientConfig) -> Self {
        let session = Session::new(TcpHubChannel::new(&config));

        Self {
            config,
            session,
            screen: Screen::Login,
            should_quit: false,
            show_help: false,
            notice: None,
            input_buffer: String::new(),
            input_cursor: 0,
        }
    }

    pub fn hub_addr(&self) -> &str {
        &self.config.hub_addr
    }

    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
    }

    // -----------------------------------------------------------------------
    // Input editing
    // -----------------------------------------------------------------------

    pub fn enter_char(&mut self, c: char) {
        let at = self.byte_index();
        self.input_buffer.insert(at, c);
        self.input_cursor += 1;
    }

    pub fn delete_char(&mut self) {
        if self.input_cursor == 0 {
            return;
        }
        self.input_cursor -= 1;
        let at = self.byte_index();
        self.input_buffer.remove(at);
    }

    pub fn move_cursor_left(&mut self) {
        self.input_cursor = self.input_cursor.saturating_sub(1);
    }

    pub fn move_cursor_right(&mut self) {
        self.input_cursor = (self.input_cursor + 1).min(self.input_buffer.chars().count());
    }

    fn clear_input(&mut self) {
        self.input_buffer.clear();
        self.input_cursor = 0;
    }

    fn byte_index(&self) -> usize {
        self.input_buffer
            .char_indices()
            .nth(self.input_cursor)
            .map(|(i, _)| i)
            .unwrap_or(self.input_buffer.len())
    }

    // -----------------------------------------------------------------------
    // Actions
    // -----------------------------------------------------------------------

    /// Enter on either screen: join on login, send in the room.
    pub async fn submit_input(&mut self) {
        match self.screen {
            Screen::Login => self.join().await,
            Screen::Chat => self.send().await,
        }
    }

    async fn join(&mut self) {
        let name = match DisplayName::parse(&self.input_buffer) {
            Ok(name) => name,
            Err(e) => {
                self.set_notice(NoticeLevel::Error, e.to_string());
                return;
            }
        };

        self.set_notice(NoticeLevel::Info, format!("Connecting to {}...", self.config.hub_addr));
        match self.session.join(name.clone()).await {
            Ok(()) => {
                self.screen = Screen::Chat;
                self.clear_input();
                self.set_notice(NoticeLevel::Info, format!("Joined as {}", name));
            }
            Err(e) => {
                // A failed join leaves the session closed; retrying needs a new one.
                self.session = Session::new(TcpHubChannel::new(&self.config));
                self.set_notice(NoticeLevel::Error, e.to_string());
            }
        }
    }

    async fn send(&mut self) {
        match self.session.post_message(&self.input_buffer).await {
            Ok(()) => {
                self.clear_input();
                self.notice = None;
            }
            Err(SessionError::Validation(e)) => self.set_notice(NoticeLevel::Warning, e.to_string()),
            Err(e) => self.set_notice(NoticeLevel::Error, e.to_string()),
        }
    }

    /// Leave the room and go back to login with a fresh session.
    pub async fn leave(&mut self) {
        self.session.leave().await;
        self.session = Session::new(TcpHubChannel::new(&self.config));
        self.screen = Screen::Login;
        self.clear_input();
        self.set_notice(NoticeLevel::Info, "Left the room");
        info!("Back at login");
    }

    pub fn apply_updates(&mut self, events: Vec<SessionEvent>) {
        for event in events {
            let SessionEvent::StateChanged(state) = event else {
                continue;
            };
            match state {
                SessionState::Reconnecting => {
                    self.set_notice(NoticeLevel::Warning, "Connection dropped, reconnecting...")
                }
                SessionState::Live => self.set_notice(
                    NoticeLevel::Warning,
                    "Reconnected; messages sent while offline may be missing",
                ),
                SessionState::Closed => self.set_notice(
                    NoticeLevel::Error,
                    "Connection to the hub was lost. Press Esc to return to login",
                ),
                _ => {}
            }
        }
    }

    fn set_notice(&mut self, level: NoticeLevel, text: impl Into<String>) {
        self.notice = Some(Notice {
            level,
            text: text.into(),
        });
    }
}
