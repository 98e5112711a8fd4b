//! CLI module for the gameinfo service
//!
//! Provides the command-line interface for creating the cache table and for
//! running a single refresh without starting the HTTP server.

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};

use crate::{
    cache_keys,
    configuration::{get_configuration, set_configuration, Config, State},
    error::Error,
    handler::refresh::{self, RefreshJob},
    helpers::{parse_player_id, parse_world_id},
    model::BlockScope,
    provider::PgCacheStore,
};

/// Gameinfo cache service
#[derive(Parser)]
#[command(name = "gameinfo")]
#[command(about = "Read-through cache of block-edit statistics", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP server and refresh worker (default if no command specified)
    Serve,

    /// Create the cache table
    Migrate,

    /// Run one refresh against the source and exit
    Refresh {
        #[command(subcommand)]
        command: RefreshCommands,
    },
}

#[derive(Subcommand)]
pub enum RefreshCommands {
    /// Recompute the block counts of one scope
    BlockCounts {
        /// World id, 0 for all worlds
        #[arg(long, default_value = "0")]
        wid: String,

        /// Player id, 0 for all players
        #[arg(long, default_value = "0")]
        pid: String,
    },

    /// Re-read players seen since the last bulk refresh
    Players {
        /// Ignore the stored sentinel and read every player
        #[arg(long)]
        full: bool,
    },

    /// Re-read every world
    Worlds,
}

/// Initialize configuration and return Config
pub fn init_config() -> Result<Config, Error> {
    set_configuration()?;
    get_configuration()
}

pub async fn run_migrate() -> Result<(), Error> {
    let config = init_config()?;

    let url = config.cache_database_url.as_deref().ok_or_else(|| {
        Error::ConfigurationError(String::from(
            "CACHE_DATABASE_URL is required to migrate",
        ))
    })?;

    tracing::info!("Creating cache table...");
    PgCacheStore::new(url, &config).await?.migrate().await?;
    tracing::info!("Migrations complete");

    Ok(())
}

pub async fn run_refresh(command: RefreshCommands) -> Result<(), Error> {
    let config = init_config()?;
    let (state, _receiver) = State::init(config).await?;

    let job = match command {
        RefreshCommands::BlockCounts { wid, pid } => {
            let wid = parse_world_id(Some(&wid))?;
            let pid = parse_player_id(Some(&pid))?;
            RefreshJob::BlockCounts(BlockScope::new(wid, pid))
        },
        RefreshCommands::Players { full } => RefreshJob::Players {
            last_update: players_last_update(&state, full).await?,
        },
        RefreshCommands::Worlds => RefreshJob::Worlds,
    };

    tracing::info!("Refreshing {}", job);
    refresh::run(&state, &job).await?;
    tracing::info!("Refresh complete");

    Ok(())
}

async fn players_last_update(
    state: &State,
    full: bool,
) -> Result<DateTime<Utc>, Error> {
    if full {
        return Ok(DateTime::UNIX_EPOCH);
    }

    let sentinel = state.cache.get(&cache_keys::players_sentinel()).await?;
    Ok(sentinel.map_or(DateTime::UNIX_EPOCH, |record| record.timestamp))
}
