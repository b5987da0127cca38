mod api;
mod config;
mod directory;
mod edits;
mod emoticon;
mod error;
mod history;
mod info;
mod output;
mod pager;
mod unread;

use std::io;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::api::ApiClient;
use crate::config::{Config, ConfigError, ORG_VAR, TOKEN_VAR};
use crate::directory::DirectoryCache;
use crate::error::CommandError;
use crate::output::Emphasis;

#[derive(Parser)]
#[command(
    name = "hipchat",
    version,
    about = "HipChat command-line client",
    after_help = "Environment:\n  HIPCHAT_ORG    organization subdomain (required)\n  HIPCHAT_TOKEN  API access token (required)\n  HIPCHAT_LOG    log filter, e.g. debug\n\nExamples:\n  hipchat unread\n  hipchat room Ops\n  hipchat edits \"Dev Ops\"\n  hipchat emoticon shipit"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    #[command(about = "Show details for a room")]
    Room { name: String },
    #[command(about = "Print unread messages from every conversation")]
    Unread,
    #[command(about = "Look up an emoticon and show its image")]
    Emoticon { name: String },
    #[command(about = "Show s/old/new/ corrections applied to messages in a room")]
    Edits { room_name: String },
    #[command(about = "List group admins")]
    Admin,
    #[command(about = "Show the local room/user directory cache")]
    Cache,
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    let config = match Config::load() {
        Ok(config) => config,
        Err(ConfigError::Missing(name)) => {
            println!("{name} must be set. Export {ORG_VAR} and {TOKEN_VAR} first.");
            return;
        }
    };

    if let Err(error) = run(cli.command, &config) {
        if error.is_unauthorized() {
            eprintln!("Authentication failed. Check that {TOKEN_VAR} is valid for {}.", config.org);
            return;
        }
        eprintln!("{error}");
        std::process::exit(1);
    }
}

fn run(command: Command, config: &Config) -> Result<(), CommandError> {
    let api = ApiClient::new(&config.api_base_url, config.token.clone())?;
    let cache = DirectoryCache::new(config.cache_path.clone());
    let emphasis = Emphasis::detect();
    tracing::debug!(base_url = %config.api_base_url, cache = %config.cache_path.display(), "starting");

    match command {
        Command::Room { name } => info::show_room(&api, &name, emphasis)?,
        Command::Unread => {
            let mut stdout = io::stdout().lock();
            unread::summarize(&api, &cache, emphasis, &mut stdout)?;
        }
        Command::Emoticon { name } => emoticon::show(&api, &name, emphasis)?,
        Command::Edits { room_name } => {
            let mut stdout = io::stdout().lock();
            edits::print_edits(&api, &room_name, emphasis, &mut stdout)?;
        }
        Command::Admin => info::show_admins(&api)?,
        Command::Cache => info::show_cache(&cache),
    }
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("HIPCHAT_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}
