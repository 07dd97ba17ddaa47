//! JSON file commands.

use super::{ConnectArgs, Connection, one_shot, parse_json, print_json};
use anyhow::Context;
use clap::Subcommand;

/// File command options.
#[derive(Subcommand, Debug)]
pub enum FileCommand {
    /// Write a JSON object or array to a file on the host
    Write {
        /// File name
        filename: String,
        /// Content (JSON object or array)
        data: String,
    },
    /// Read a JSON file from the host
    Read {
        /// File name
        filename: String,
    },
}

/// Execute a file command.
pub async fn execute(args: &ConnectArgs, command: FileCommand) -> anyhow::Result<()> {
    let (cb, rx) = one_shot();
    let connection = match command {
        FileCommand::Write { filename, data } => {
            let data = parse_json("data", &data)?;
            let connection = Connection::open(args).await?;
            connection
                .client
                .create_json_file(&filename, data, cb)
                .context("Failed to write file")?;
            connection
        }
        FileCommand::Read { filename } => {
            let connection = Connection::open(args).await?;
            connection.client.read_json_file(&filename, cb).context("Failed to read file")?;
            connection
        }
    };
    print_json(&connection.result(rx).await?)
}
