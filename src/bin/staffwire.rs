//! Staffwire command-line client
//!
//! Bootstraps the persisted session, connects to the realtime endpoint and
//! reads commands from stdin:
//!
//! ```text
//! send <receiver> <text>      send a message
//! support <receiver> <text>   send a support message
//! unread                      show unread counters
//! messages                    show the message log
//! logout                      log out and exit
//! quit                        exit
//! ```

use anyhow::Context;
use staffwire::bootstrap::BootstrapOutcome;
use staffwire::client::StaffwireClient;
use staffwire::protocol::Message;
use staffwire::storage::ClientSettings;
use tokio::io::{AsyncBufReadExt, BufReader};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    staffwire::init();

    let settings_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "staffwire.json".to_string());
    let settings = ClientSettings::load(&settings_path)
        .with_context(|| format!("loading settings from {}", settings_path))?;

    let client = StaffwireClient::from_settings(settings).context("building client")?;
    client.connection().set_notification_handler(|toast| {
        println!("[{:?}] {}", toast.level, toast.text);
    });

    match client.init().await {
        BootstrapOutcome::Validated(user) => println!("Signed in as {}", user.email),
        BootstrapOutcome::NoToken => println!("No saved session; log in from the dashboard first"),
        BootstrapOutcome::Expired => println!("Saved session expired; log in again"),
        BootstrapOutcome::Superseded => {}
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let mut parts = line.trim().splitn(3, ' ');
        match (parts.next(), parts.next(), parts.next()) {
            (Some("send"), Some(receiver), Some(text)) => {
                send(&client, receiver, text, false).await
            }
            (Some("support"), Some(receiver), Some(text)) => {
                send(&client, receiver, text, true).await
            }
            (Some("unread"), _, _) => {
                let counts = client.notifications().counts();
                println!(
                    "general={} support={} total={}",
                    counts.general, counts.support, counts.total
                );
            }
            (Some("messages"), _, _) => {
                for message in client.connection().messages() {
                    println!(
                        "{} {} -> {}: {}",
                        message.created_at, message.sender_id, message.receiver_id, message.content
                    );
                }
            }
            (Some("logout"), _, _) => {
                client.logout().await;
                break;
            }
            (Some("quit"), _, _) => break,
            (Some(""), _, _) | (None, _, _) => {}
            _ => println!("Unknown command"),
        }
    }

    client.dispose();
    Ok(())
}

/// Send a message and keep a local echo in the message log
async fn send(client: &StaffwireClient, receiver: &str, text: &str, is_support: bool) {
    if !client.connection().send_message(receiver, text, is_support) {
        println!("not connected, message not sent");
        return;
    }
    if let Some(user) = client.session_state().await.user {
        let echo = Message::outgoing(&user.id, &user.role, receiver, text, is_support);
        client.connection().add_message(echo);
    }
    println!("sent");
}
