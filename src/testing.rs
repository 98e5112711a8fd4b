//! Fakes and builders shared by the unit tests.

use std::{
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future;

use crate::{
    configuration::{Config, State},
    error::Error,
    handler::refresh_queue::{RefreshQueue, RefreshReceiver},
    model::{BlockCounts, BlockScope, CacheKey, CachedRecord, Player, World},
    provider::{MemoryCacheStore, SourceConnection, SourceExecutor},
};

const POLL_INTERVAL: Duration = Duration::from_millis(5);
const POLL_ATTEMPTS: usize = 400;

/// In-memory source that records every query it answers.
#[derive(Debug, Clone, Default)]
pub struct FakeSource {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    counts: Mutex<BlockCounts>,
    players: Mutex<Vec<Player>>,
    worlds: Mutex<Vec<World>>,
    failing: AtomicBool,
    hanging: AtomicBool,
    opened: AtomicUsize,
    closed: AtomicUsize,
    count_calls: Mutex<Vec<BlockScope>>,
    players_calls: Mutex<Vec<i64>>,
    worlds_calls: AtomicUsize,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_counts(self, counts: BlockCounts) -> Self {
        self.set_counts(counts);
        self
    }

    pub fn with_players(self, players: Vec<Player>) -> Self {
        *self.inner.players.lock().unwrap() = players;
        self
    }

    pub fn with_worlds(self, worlds: Vec<World>) -> Self {
        self.set_worlds(worlds);
        self
    }

    /// Every query fails; connecting and closing still succeed.
    pub fn failing(self) -> Self {
        self.inner.failing.store(true, Ordering::SeqCst);
        self
    }

    /// Block-count queries never answer.
    pub fn hanging(self) -> Self {
        self.inner.hanging.store(true, Ordering::SeqCst);
        self
    }

    pub fn recover(&self) {
        self.inner.failing.store(false, Ordering::SeqCst);
    }

    pub fn set_counts(&self, counts: BlockCounts) {
        *self.inner.counts.lock().unwrap() = counts;
    }

    pub fn set_worlds(&self, worlds: Vec<World>) {
        *self.inner.worlds.lock().unwrap() = worlds;
    }

    pub fn opened(&self) -> usize {
        self.inner.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.inner.closed.load(Ordering::SeqCst)
    }

    pub fn count_calls(&self) -> Vec<BlockScope> {
        self.inner.count_calls.lock().unwrap().clone()
    }

    pub fn players_calls(&self) -> Vec<i64> {
        self.inner.players_calls.lock().unwrap().clone()
    }

    /// Total number of queries answered or attempted.
    pub fn queries(&self) -> usize {
        self.inner.count_calls.lock().unwrap().len()
            + self.inner.players_calls.lock().unwrap().len()
            + self.inner.worlds_calls.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), Error> {
        if self.inner.failing.load(Ordering::SeqCst) {
            return Err(Error::TaskError(String::from("source unavailable")));
        }
        Ok(())
    }
}

#[async_trait]
impl SourceExecutor for FakeSource {
    async fn connect(&self) -> Result<Box<dyn SourceConnection>, Error> {
        self.inner.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeConnection {
            source: self.clone(),
        }))
    }
}

struct FakeConnection {
    source: FakeSource,
}

#[async_trait]
impl SourceConnection for FakeConnection {
    async fn block_counts(&mut self, scope: &BlockScope) -> Result<BlockCounts, Error> {
        self.source.inner.count_calls.lock().unwrap().push(*scope);
        if self.source.inner.hanging.load(Ordering::SeqCst) {
            future::pending::<()>().await;
        }
        self.source.check()?;
        Ok(*self.source.inner.counts.lock().unwrap())
    }

    async fn players_since(&mut self, since: i64) -> Result<Vec<Player>, Error> {
        self.source.inner.players_calls.lock().unwrap().push(since);
        self.source.check()?;

        let joined = DateTime::<Utc>::from_timestamp(since, 0).unwrap_or_default();
        let players = self.source.inner.players.lock().unwrap();
        Ok(players
            .iter()
            .filter(|player| player.joined > joined)
            .cloned()
            .collect())
    }

    async fn worlds(&mut self) -> Result<Vec<World>, Error> {
        self.source.inner.worlds_calls.fetch_add(1, Ordering::SeqCst);
        self.source.check()?;
        Ok(self.source.inner.worlds.lock().unwrap().clone())
    }

    async fn close(self: Box<Self>) -> Result<(), Error> {
        self.source.inner.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// `State` over an empty memory store and `source`. The receiver is only
/// needed by tests that run the refresh worker.
pub fn state(source: FakeSource) -> (State, RefreshReceiver) {
    state_with_config(source, Config::default())
}

pub fn state_with_config(
    source: FakeSource,
    config: Config,
) -> (State, RefreshReceiver) {
    let (refresher, receiver) = RefreshQueue::new();
    let state = State::new(
        config,
        Arc::new(MemoryCacheStore::new()),
        Arc::new(source),
        refresher,
    );
    (state, receiver)
}

pub fn player(pid: i64, name: &str) -> Player {
    Player {
        pid,
        uuid: format!("00000000-0000-0000-0000-{:012}", pid),
        name: name.to_owned(),
        joined: Utc::now(),
    }
}

pub async fn seed<T: serde::Serialize>(
    state: &State,
    key: CacheKey,
    payload: &T,
    timestamp: DateTime<Utc>,
) {
    let record = CachedRecord::new(key, payload, timestamp).unwrap();
    state.cache.upsert(record).await.unwrap();
}

pub async fn wait_for(condition: impl Fn() -> bool) {
    for _ in 0..POLL_ATTEMPTS {
        if condition() {
            return;
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
    panic!("condition not met in time");
}

/// Waits until `key` is stored.
pub async fn eventually(state: &State, key: &CacheKey) -> CachedRecord {
    refreshed_after(state, key, DateTime::<Utc>::MIN_UTC).await
}

/// Waits until `key` carries a timestamp newer than `after`.
pub async fn refreshed_after(
    state: &State,
    key: &CacheKey,
    after: DateTime<Utc>,
) -> CachedRecord {
    for _ in 0..POLL_ATTEMPTS {
        if let Some(record) = state.cache.get(key).await.unwrap() {
            if record.timestamp > after {
                return record;
            }
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
    panic!("{} was not refreshed in time", key);
}
