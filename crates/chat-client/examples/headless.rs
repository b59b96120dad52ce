// Line-mode chat client: first line is the display name, every line
// after that is a message. `/quit` (or EOF) leaves.
//
//   cargo run -p chat-client --example headless
//   CHAT_HUB_ADDR=10.0.0.5:7163 cargo run -p chat-client --example headless

use std::env;
use std::error::Error;

use chat_client::{ClientConfig, Session, SessionEvent, SessionState, TcpHubChannel};
use chat_core::DisplayName;
use tokio::io::{self, AsyncBufReadExt, BufReader};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let config = ClientConfig {
        hub_addr: env::var("CHAT_HUB_ADDR").unwrap_or_else(|_| "127.0.0.1:7163".to_string()),
        ..ClientConfig::default()
    };

    let mut lines = BufReader::new(io::stdin()).lines();
    let mut session = Session::new(TcpHubChannel::new(&config));

    println!("Hub: {}", config.hub_addr);
    let name = loop {
        println!("Display name:");
        let Some(line) = lines.next_line().await? else {
            return Ok(());
        };
        match DisplayName::parse(&line) {
            Ok(name) => break name,
            Err(e) => eprintln!("{}", e),
        }
    };

    session.join(name).await?;
    println!("-- in the room: {}", join_names(&session));
    for message in session.feed() {
        println!("{}: {}", message.author, message.body);
    }

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if line.trim() == "/quit" {
                    break;
                }
                if let Err(e) = session.post_message(&line).await {
                    eprintln!("!! {}", e);
                }
            }

            updates = session.next_update() => {
                for event in updates {
                    match event {
                        SessionEvent::ParticipantJoined(who) => println!("-- {} joined", who),
                        SessionEvent::MessagePosted(message) => {
                            println!("{}: {}", message.author, message.body)
                        }
                        SessionEvent::StateChanged(state) => println!("-- {}", state),
                    }
                }
                if session.state() == SessionState::Closed {
                    break;
                }
            }
        }
    }

    session.leave().await;
    Ok(())
}

fn join_names(session: &Session<TcpHubChannel>) -> String {
    session
        .presence()
        .iter()
        .map(|name| name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
