//! Document database commands.

use super::{ConnectArgs, Connection, one_shot, parse_json, print_json};
use anyhow::Context;
use clap::{Args, Subcommand};
use sharex_core::InsertOptions;

/// Selects documents by filter expression or by `_uuid`.
#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
pub struct Selector {
    /// Filter expression passed to the host
    #[arg(long)]
    pub query: Option<String>,

    /// `_uuid` of a single document
    #[arg(long)]
    pub id: Option<String>,
}

/// Database command options.
#[derive(Subcommand, Debug)]
pub enum DbCommand {
    /// Insert a document or an array of documents
    Insert {
        /// Collection name
        collection: String,
        /// Document(s) as JSON
        data: String,
        /// Stamp a fresh `_uuid` onto each document
        #[arg(long)]
        identity: bool,
    },
    /// Fetch documents, optionally filtered
    Find {
        /// Collection name
        collection: String,
        /// Filter expression passed to the host
        #[arg(long)]
        query: Option<String>,
    },
    /// Apply a partial update
    Update {
        /// Collection name
        collection: String,
        #[command(flatten)]
        selector: Selector,
        /// Fields to change, as a JSON object
        document: String,
    },
    /// Delete documents
    Delete {
        /// Collection name
        collection: String,
        #[command(flatten)]
        selector: Selector,
    },
}

/// Execute a database command against database `name`.
pub async fn execute(args: &ConnectArgs, name: &str, command: DbCommand) -> anyhow::Result<()> {
    let connection = Connection::open(args).await?;
    let store = connection.client.create_db_instance(name, None).context("Invalid database name")?;
    let (cb, rx) = one_shot();

    match command {
        DbCommand::Insert { collection, data, identity } => {
            let data = parse_json("data", &data)?;
            store
                .insert_with(&collection, data, InsertOptions { identity }, Some(cb))
                .context("Insert failed")?;
        }
        DbCommand::Find { collection, query } => {
            store.find(&collection, query.as_deref(), cb).context("Find failed")?;
        }
        DbCommand::Update { collection, selector, document } => {
            let document = parse_json("document", &document)?;
            match (selector.id, selector.query) {
                (Some(id), _) => store.update_by_id(&collection, &id, &document, cb),
                (None, query) => {
                    store.update(&collection, query.as_deref().unwrap_or_default(), &document, cb)
                }
            }
            .context("Update failed")?;
        }
        DbCommand::Delete { collection, selector } => {
            match (selector.id, selector.query) {
                (Some(id), _) => store.delete_by_id(&collection, &id, cb),
                (None, query) => store.delete(&collection, query.as_deref().unwrap_or_default(), cb),
            }
            .context("Delete failed")?;
        }
    }

    print_json(&connection.result(rx).await?)
}
