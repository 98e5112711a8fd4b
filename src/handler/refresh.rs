//! Refresh engine
//!
//! Computes a scope from the source and writes it back into the cache store.
//! One source connection is opened per invocation and closed on every path.

use std::{fmt, time::Instant};

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use crate::{
    cache_keys,
    configuration::State,
    error::Error,
    model::{BlockScope, CacheKey, CachedRecord, ListMeta},
    provider::SourceConnection,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshJob {
    BlockCounts(BlockScope),
    /// Incremental: only users seen after `last_update` are re-read.
    Players { last_update: DateTime<Utc> },
    /// Always a full snapshot.
    Worlds,
}

impl RefreshJob {
    /// Record that identifies the job for in-flight tracking.
    pub fn scope_key(&self) -> CacheKey {
        match self {
            RefreshJob::BlockCounts(scope) => scope.cache_key(),
            RefreshJob::Players { .. } => cache_keys::players_sentinel(),
            RefreshJob::Worlds => cache_keys::worlds_sentinel(),
        }
    }
}

impl fmt::Display for RefreshJob {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.scope_key())
    }
}

pub async fn run(state: &State, job: &RefreshJob) -> Result<(), Error> {
    let mut connection = state.source.connect().await?;

    let result = match job {
        RefreshJob::BlockCounts(scope) => {
            refresh_block_counts(state, connection.as_mut(), scope).await
        },
        RefreshJob::Players { last_update } => {
            refresh_players(state, connection.as_mut(), *last_update).await
        },
        RefreshJob::Worlds => refresh_worlds(state, connection.as_mut()).await,
    };

    if let Err(e) = connection.close().await {
        warn!("Failed to close source connection for {}: {}", job, e);
    }

    result
}

async fn refresh_block_counts(
    state: &State,
    connection: &mut dyn SourceConnection,
    scope: &BlockScope,
) -> Result<(), Error> {
    let timer = Instant::now();
    let counts = connection.block_counts(scope).await?;
    let compute_ms = elapsed_ms(timer);

    let record =
        CachedRecord::new(scope.cache_key(), &scope.entry(counts), Utc::now())?
            .with_compute_duration(compute_ms);
    state.cache.upsert(record).await?;

    info!("Refreshed {} in {}ms", scope.cache_key(), compute_ms);
    Ok(())
}

async fn refresh_players(
    state: &State,
    connection: &mut dyn SourceConnection,
    last_update: DateTime<Utc>,
) -> Result<(), Error> {
    let started = Utc::now();
    let timer = Instant::now();
    let players = connection.players_since(last_update.timestamp()).await?;

    let records = players
        .into_iter()
        .filter(|player| {
            if player.pid == cache_keys::PLAYERS_SENTINEL_ID {
                warn!("Skipping player {} with reserved id", player.name);
                return false;
            }
            true
        })
        .map(|player| {
            CachedRecord::new(cache_keys::player(player.pid), &player, Utc::now())
        })
        .collect::<Result<Vec<_>, _>>()?;

    let count = records.len();
    write_all(state, records).await?;

    let compute_ms = elapsed_ms(timer);
    let sentinel =
        CachedRecord::new(cache_keys::players_sentinel(), &ListMeta::default(), started)?
            .with_compute_duration(compute_ms);
    state.cache.upsert(sentinel).await?;

    info!("Refreshed {} players in {}ms", count, compute_ms);
    Ok(())
}

async fn refresh_worlds(
    state: &State,
    connection: &mut dyn SourceConnection,
) -> Result<(), Error> {
    let started = Utc::now();
    let timer = Instant::now();
    let worlds = connection.worlds().await?;

    let records = worlds
        .into_iter()
        .filter(|world| {
            if world.wid == cache_keys::WORLDS_SENTINEL_ID {
                warn!("Skipping world {} with reserved id", world.name);
                return false;
            }
            true
        })
        .map(|world| {
            CachedRecord::new(cache_keys::world(world.wid), &world, Utc::now())
        })
        .collect::<Result<Vec<_>, _>>()?;

    let count = records.len();
    write_all(state, records).await?;

    let compute_ms = elapsed_ms(timer);
    let sentinel =
        CachedRecord::new(cache_keys::worlds_sentinel(), &ListMeta::default(), started)?
            .with_compute_duration(compute_ms);
    state.cache.upsert(sentinel).await?;

    info!("Refreshed {} worlds in {}ms", count, compute_ms);
    Ok(())
}

/// Upserts every record independently; fails if any single write failed so
/// the caller leaves the sentinel untouched.
async fn write_all(
    state: &State,
    records: Vec<CachedRecord>,
) -> Result<(), Error> {
    let total = records.len();
    let results: Vec<Result<(), Error>> = stream::iter(records)
        .map(|record| async move {
            let key = record.key.clone();
            state.cache.upsert(record).await.map_err(|e| {
                warn!("Failed to write {}: {}", key, e);
                e
            })
        })
        .buffer_unordered(state.config.bulk_upsert_concurrency)
        .collect()
        .await;

    let failed = results.iter().filter(|result| result.is_err()).count();
    if failed > 0 {
        return Err(Error::TaskError(format!(
            "{} of {} cache writes failed",
            failed, total
        )));
    }

    debug!("Wrote {} records", total);
    Ok(())
}

fn elapsed_ms(timer: Instant) -> i64 {
    i64::try_from(timer.elapsed().as_millis()).unwrap_or(i64::MAX)
}
