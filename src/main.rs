//! Real-time chat client - demo entry point
//!
//! Connects to the broker, subscribes to one room, prints inbound events,
//! and publishes each stdin line as a chat message.

use std::env;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use chat_realtime_client::{ChatClient, ChatMessage, ClientConfig, RoomCallbacks, RoomId};

/// Default broker base URL
const DEFAULT_BASE_URL: &str = "ws://127.0.0.1:8080";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging with environment filter
    // Use RUST_LOG env var to control log level
    // e.g., RUST_LOG=debug or RUST_LOG=chat_realtime_client=trace
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("chat_realtime_client=info")),
        )
        .init();

    let room_id = RoomId(
        env::args()
            .nth(1)
            .unwrap_or_else(|| "1".to_string())
            .parse::<i64>()?,
    );
    let base_url = env::var("CHAT_BROKER_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());

    let mut config = ClientConfig::new(base_url);
    if let Ok(cookie) = env::var("CHAT_SESSION_COOKIE") {
        config = config.with_cookie(cookie);
    }

    let client = ChatClient::new(config);
    client.connect().await?;
    info!("Connected; joining room {}", room_id);

    let callbacks = RoomCallbacks::new()
        .on_message(|payload| match payload.as_json() {
            Some(value) => {
                match serde_json::from_value::<ChatMessage>(value.clone()) {
                    Ok(msg) => println!("[{}] {}: {}", msg.time_sent, msg.author, msg.content),
                    Err(_) => println!("message: {}", value),
                }
            }
            None => warn!("Undecodable message payload: {:?}", payload),
        })
        .on_delete(|payload| match payload.as_json() {
            Some(value) => println!("message {} deleted", value),
            None => warn!("Undecodable delete payload: {:?}", payload),
        })
        .on_edit(|payload| match payload.as_json() {
            Some(value) => println!("message edited: {}", value),
            None => warn!("Undecodable edit payload: {:?}", payload),
        });

    let keys = client.subscribe_to_room(room_id, callbacks).await?;
    info!("Subscribed to {:?}", keys);
    println!("Type a message and press enter to send; Ctrl-D to quit.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let content = line.trim();
        if content.is_empty() {
            continue;
        }
        if let Err(e) = client.send_message(room_id, content).await {
            error!("Failed to send message: {}", e);
        }
    }

    client.unsubscribe_from_room(room_id).await?;
    client.disconnect().await?;
    info!("Disconnected");
    Ok(())
}
