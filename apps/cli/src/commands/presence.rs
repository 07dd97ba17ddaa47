//! Presence and messaging commands.

use super::{ConnectArgs, Connection, one_shot, print_json};
use anyhow::Context;
use serde_json::Value;
use std::time::Duration;

/// `sharex users`
pub async fn users(args: &ConnectArgs) -> anyhow::Result<()> {
    let connection = Connection::open(args).await?;
    let (cb, rx) = one_shot();
    connection.client.get_all_users(cb).context("Failed to request users")?;
    print_json(&connection.result(rx).await?)
}

/// `sharex send <uuid> <message>`
///
/// The message is sent as JSON when it parses, as a string otherwise.
pub async fn send(args: &ConnectArgs, uuid: &str, message: &str) -> anyhow::Result<()> {
    let connection = Connection::open(args).await?;
    let msg = serde_json::from_str(message).unwrap_or_else(|_| Value::String(message.to_string()));
    connection.client.send_msg(uuid, msg).context("Failed to send message")?;
    connection.client.shutdown();
    // The socket writer flushes queued frames before closing.
    tokio::time::sleep(Duration::from_millis(200)).await;
    eprintln!("Message sent to {uuid}");
    Ok(())
}

/// `sharex public-data <uuid>`
pub async fn public_data(args: &ConnectArgs, uuid: &str) -> anyhow::Result<()> {
    let connection = Connection::open(args).await?;
    let (cb, rx) = one_shot();
    connection.client.request_public_data(uuid, cb).context("Failed to request public data")?;
    print_json(&connection.result(rx).await?)
}
