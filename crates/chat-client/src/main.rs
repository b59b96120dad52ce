// crates/chat-client/src/main.rs

mod app;
mod components;
mod ui;

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use chat_client::ClientConfig;
use clap::Parser;
use crossterm::{
    event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures::StreamExt;
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::app::{App, Screen};

#[derive(Parser)]
#[clap(name = "chat-client")]
#[clap(about = "Terminal client for the chat hub")]
struct Cli {
    /// Hub address, overrides the config file
    #[clap(long)]
    hub: Option<String>,

    /// TOML configuration file
    #[clap(short, long)]
    config: Option<PathBuf>,

    /// Join right away with this display name
    #[clap(short, long)]
    name: Option<String>,

    /// Write logs to this file (nothing is logged otherwise)
    #[clap(long)]
    log_file: Option<PathBuf>,

    /// Give up instead of reconnecting when the connection drops
    #[clap(long)]
    no_reconnect: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(path) = &cli.log_file {
        init_logging(path)?;
    }
    let config = load_config(&cli)?;
    info!(hub = %config.hub_addr, reconnect = config.reconnect.enabled, "Starting chat-client");

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(config);
    let res = run_app(&mut terminal, &mut app, cli.name).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        error!(error = %err, "chat-client failed");
        eprintln!("Error: {:?}", err);
    }

    Ok(())
}

fn init_logging(path: &Path) -> Result<()> {
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

/// Config file (or defaults), then command line overrides.
fn load_config(cli: &Cli) -> Result<ClientConfig> {
    let mut config = match &cli.config {
        Some(path) => ClientConfig::load(path)?,
        None => ClientConfig::default(),
    };

    if let Some(hub) = &cli.hub {
        config.hub_addr = hub.clone();
    }
    if cli.no_reconnect {
        config.reconnect.enabled = false;
    }
    Ok(config)
}

async fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    auto_join: Option<String>,
) -> Result<()> {
    let mut events = EventStream::new();

    if let Some(name) = auto_join {
        name.chars().for_each(|c| app.enter_char(c));
        terminal.draw(|f| ui::draw(f, app))?;
        app.submit_input().await;
    }

    loop {
        terminal.draw(|f| ui::draw(f, app))?;

        tokio::select! {
            event = events.next() => match event {
                Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                    // Joining or sending can wait on the hub; Ctrl-C still quits.
                    tokio::select! {
                        _ = handle_key(app, key) => {}
                        _ = quit_requested(&mut events) => app.should_quit = true,
                    }
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e.into()),
                None => break,
            },

            updates = app.session.next_update() => {
                app.apply_updates(updates);
            }
        }

        if app.should_quit {
            break;
        }
    }

    app.session.leave().await;
    Ok(())
}

fn is_quit(key: &KeyEvent) -> bool {
    key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c')
}

/// Resolves on Ctrl-C; other input is dropped.
async fn quit_requested(events: &mut EventStream) {
    while let Some(Ok(event)) = events.next().await {
        if matches!(event, Event::Key(key) if key.kind == KeyEventKind::Press && is_quit(&key)) {
            return;
        }
    }
    std::future::pending::<()>().await
}

async fn handle_key(app: &mut App, key: KeyEvent) {
    if is_quit(&key) {
        app.should_quit = true;
        return;
    }

    if app.show_help {
        if matches!(key.code, KeyCode::F(1) | KeyCode::Esc) {
            app.toggle_help();
        }
        return;
    }

    match key.code {
        KeyCode::F(1) => app.toggle_help(),
        KeyCode::Enter => app.submit_input().await,
        KeyCode::Esc if app.screen == Screen::Chat => app.leave().await,
        KeyCode::Backspace => app.delete_char(),
        KeyCode::Left => app.move_cursor_left(),
        KeyCode::Right => app.move_cursor_right(),
        KeyCode::Char(c) => app.enter_char(c),
        _ => {}
    }
}
