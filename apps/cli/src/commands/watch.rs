//! `sharex watch`: stream lifecycle events as JSON lines.

use super::{ConnectArgs, Connection};
use serde_json::json;

/// Print every lifecycle event until Ctrl-C.
pub async fn execute(args: &ConnectArgs) -> anyhow::Result<()> {
    let mut connection = Connection::start(args)?;
    eprintln!("Watching {} as {} (Ctrl-C to stop)", connection.client.url(), connection.client.my_uuid());

    loop {
        tokio::select! {
            event = connection.events.recv() => {
                let Some(event) = event else { break };
                println!("{}", json!({"event": event.tag(), "payload": event.payload()}));
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    connection.client.shutdown();
    Ok(())
}
