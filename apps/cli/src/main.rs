//! Sharex CLI - command-line client for Sharex hosts.
//!
//! The `sharex` command connects to a host the way a plugin page would and
//! issues one request, or watches lifecycle events until interrupted.

mod commands;

use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use commands::ConnectArgs;
use commands::db::DbCommand;
use commands::file::FileCommand;

/// Sharex CLI - talk to a Sharex host from the terminal
#[derive(Parser, Debug)]
#[command(name = "sharex", author, version, about = "Command-line client for Sharex hosts")]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "warn", global = true)]
    log_level: String,

    #[command(flatten)]
    connect: ConnectArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print lifecycle events and notifications until Ctrl-C
    Watch,

    /// List the users connected to the host
    Users,

    /// Send a direct message to a user
    Send {
        /// Recipient session id
        uuid: String,
        /// Message (JSON, or plain text)
        message: String,
    },

    /// Show the public data of a user
    PublicData {
        /// Session id of the user
        uuid: String,
    },

    /// Read or write JSON files on the host
    File {
        #[command(subcommand)]
        command: FileCommand,
    },

    /// Work with a document database on the host
    Db {
        /// Database name
        name: String,
        #[command(subcommand)]
        command: DbCommand,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Logs go to stderr so stdout stays machine-readable.
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();

    match args.command {
        Command::Watch => commands::watch::execute(&args.connect).await,
        Command::Users => commands::presence::users(&args.connect).await,
        Command::Send { uuid, message } => {
            commands::presence::send(&args.connect, &uuid, &message).await
        }
        Command::PublicData { uuid } => commands::presence::public_data(&args.connect, &uuid).await,
        Command::File { command } => commands::file::execute(&args.connect, command).await,
        Command::Db { name, command } => commands::db::execute(&args.connect, &name, command).await,
    }
}
