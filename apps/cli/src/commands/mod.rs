//! Command implementations for the Sharex CLI.

pub mod db;
pub mod file;
pub mod presence;
pub mod watch;

use anyhow::{Context, bail};
use clap::Args;
use serde_json::Value;
use sharex_core::{
    ConnectionState, DebugEndpoint, FileStore, HostLocation, KeyValueStore, LifecycleEvent, LifecycleHandler,
    MemoryStore, ResultCallback, SdkOptions, SharexClient, callback,
};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;

/// Where and how to connect.
#[derive(Args, Debug, Clone)]
pub struct ConnectArgs {
    /// Options file (TOML)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Host name of a debug endpoint
    #[arg(long, global = true)]
    pub host: Option<String>,

    /// Page port of a debug endpoint (the socket is one above)
    #[arg(long, global = true)]
    pub port: Option<u16>,

    /// Page address to derive host, port and package from
    #[arg(long, global = true)]
    pub page_url: Option<String>,

    /// File preserving the session id across runs
    #[arg(long, global = true)]
    pub session_file: Option<PathBuf>,

    /// Seconds to wait for the connection and for each result
    #[arg(long, default_value_t = 10, global = true)]
    pub timeout: u64,
}

impl ConnectArgs {
    fn wait(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    /// Build options from the config file and flag overrides.
    pub fn options(&self) -> anyhow::Result<SdkOptions> {
        let mut options = match &self.config {
            Some(path) => SdkOptions::load(path)
                .with_context(|| format!("Failed to load options from {}", path.display()))?,
            None => SdkOptions::default(),
        };

        match (&self.host, self.port) {
            (host, Some(port)) => {
                let host = host.clone().unwrap_or_else(|| "localhost".to_string());
                options.debug = Some(DebugEndpoint { host, port });
            }
            (Some(_), None) => bail!("--host requires --port"),
            (None, None) => {}
        }
        if self.session_file.is_some() {
            options.preserve_session_id = true;
        }
        Ok(options)
    }

    /// Create a client without connecting.
    pub fn client(&self) -> anyhow::Result<SharexClient> {
        let options = self.options()?;
        let location = self
            .page_url
            .as_deref()
            .map(HostLocation::parse)
            .transpose()
            .context("Invalid --page-url")?;
        let storage: Box<dyn KeyValueStore> = match &self.session_file {
            Some(path) => Box::new(FileStore::new(path)),
            None => Box::new(MemoryStore::new()),
        };
        SharexClient::new(options, location.as_ref(), storage.as_ref())
            .context("Failed to create Sharex client")
    }
}

/// A started client plus the lifecycle events it reports.
pub struct Connection {
    pub client: SharexClient,
    pub events: mpsc::UnboundedReceiver<LifecycleEvent>,
    wait: Duration,
}

impl Connection {
    /// Create the client and start connecting without waiting.
    pub fn start(args: &ConnectArgs) -> anyhow::Result<Self> {
        let client = args.client()?;
        let (tx, events) = mpsc::unbounded_channel();
        let handler: LifecycleHandler = Arc::new(move |event| {
            let _ = tx.send(event);
        });
        client.init(Some(handler)).context("Failed to start connection")?;
        Ok(Self { client, events, wait: args.wait() })
    }

    /// Create the client and wait until the connection is open.
    pub async fn open(args: &ConnectArgs) -> anyhow::Result<Self> {
        let connection = Self::start(args)?;
        let mut state = connection.client.subscribe_state();
        timeout(connection.wait, state.wait_for(|s| *s == ConnectionState::Connected))
            .await
            .with_context(|| format!("Timed out connecting to {}", connection.client.url()))?
            .context("Connection task stopped")?;
        tracing::info!(url = %connection.client.url(), uuid = %connection.client.my_uuid(), "Connected");
        Ok(connection)
    }

    /// Wait for the result delivered to a callback from [`one_shot`].
    pub async fn result(&self, rx: oneshot::Receiver<Value>) -> anyhow::Result<Value> {
        timeout(self.wait, rx)
            .await
            .context("Timed out waiting for a result")?
            .context("Result callback dropped")
    }
}

/// A callback that hands its first result to the returned receiver.
pub fn one_shot() -> (ResultCallback, oneshot::Receiver<Value>) {
    let (tx, rx) = oneshot::channel();
    let tx = Mutex::new(Some(tx));
    let cb = callback(move |value| {
        if let Some(tx) = tx.lock().unwrap_or_else(PoisonError::into_inner).take() {
            let _ = tx.send(value);
        }
    });
    (cb, rx)
}

/// Parse a JSON command-line argument.
pub fn parse_json(name: &str, raw: &str) -> anyhow::Result<Value> {
    serde_json::from_str(raw).with_context(|| format!("{name} must be valid JSON"))
}

/// Print a value as pretty JSON on stdout.
pub fn print_json(value: &Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> ConnectArgs {
        ConnectArgs {
            config: None,
            host: None,
            port: None,
            page_url: None,
            session_file: None,
            timeout: 10,
        }
    }

    #[test]
    fn test_port_flag_sets_debug_endpoint() {
        let options = ConnectArgs { port: Some(8080), ..args() }.options().unwrap();
        let debug = options.debug.unwrap();
        assert_eq!(debug.host, "localhost");
        assert_eq!(debug.port, 8080);
    }

    #[test]
    fn test_host_without_port_is_rejected() {
        assert!(ConnectArgs { host: Some("10.0.0.1".into()), ..args() }.options().is_err());
    }

    #[test]
    fn test_session_file_enables_preservation() {
        let options =
            ConnectArgs { session_file: Some(PathBuf::from("s.json")), ..args() }.options().unwrap();
        assert!(options.preserve_session_id);
    }

    #[test]
    fn test_one_shot_keeps_first_result() {
        let (cb, mut rx) = one_shot();
        cb(Value::from(1));
        cb(Value::from(2));
        assert_eq!(rx.try_recv().unwrap(), Value::from(1));
    }
}
