use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use config::Config;
use database::{firestore_pool, RescueDatabase};
use import::import;
use logging::init_logging;
use server::serve;

mod admin;
mod auth;
mod chat;
mod config;
mod contact;
mod dashboard;
mod database;
mod error;
mod geo;
mod guard;
mod help;
mod image_host;
mod import;
mod join;
mod logging;
mod model;
mod payment;
mod profile;
mod rate_limiter;
mod record;
mod routes;
mod server;
mod server_state;
mod submission;

#[derive(Parser)]
struct Opts {
    #[clap(subcommand)]
    subcmd: SubCommand,
}

#[derive(Subcommand)]
enum SubCommand {
    /// Load a JSON export of the browser app's collections into Firestore.
    Import {
        source: PathBuf,
    },
    Serve {
        #[clap(short, long)]
        port: Option<u16>,

        /// Keep everything in process memory instead of Firestore.
        #[clap(long)]
        in_memory: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let opts = Opts::parse();

    let subcommand = opts.subcmd;

    match subcommand {
        SubCommand::Import { source } => {
            let db = RescueDatabase::firestore(firestore_pool()?);
            import(source, &db).await?;
        }
        SubCommand::Serve { port, in_memory } => {
            serve(Config::load(port)?, in_memory).await?;
        }
    }

    Ok(())
}
