//! Background refresh worker
//!
//! Request handlers submit jobs to a `RefreshQueue`; `refresh_task` drains the
//! queue and runs each job on its own task, bounded by `REFRESH_MAX_TASKS`.
//! A job that outlives `REFRESH_TIMEOUT_SECS` is abandoned and its permit
//! returned.

use std::{collections::HashMap, sync::Arc, time::Duration};

use tokio::{
    sync::{mpsc, Mutex, Semaphore},
    time::{timeout, Instant},
};
use tracing::{debug, error, info, warn};

use crate::{
    configuration::{AppState, Config, State},
    error::Error,
    model::CacheKey,
};

use super::refresh::{self, RefreshJob};

pub type RefreshReceiver = mpsc::UnboundedReceiver<RefreshJob>;

#[derive(Debug, Clone)]
pub struct RefreshQueue {
    sender: mpsc::UnboundedSender<RefreshJob>,
}

impl RefreshQueue {
    pub fn new() -> (RefreshQueue, RefreshReceiver) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (RefreshQueue { sender }, receiver)
    }

    /// Never blocks; the job starts once the worker picks it up.
    pub fn submit(&self, job: RefreshJob) {
        if let Err(e) = self.sender.send(job) {
            warn!("Refresh worker is gone, dropping {}", e.0);
        }
    }
}

/// Scope key -> start of the refresh currently running for it.
#[derive(Debug, Clone)]
struct InFlight {
    ttl: Duration,
    started: Arc<Mutex<HashMap<CacheKey, Instant>>>,
}

impl InFlight {
    fn new(ttl: Duration) -> Self {
        InFlight {
            ttl,
            started: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn from_config(config: &Config) -> Option<Self> {
        config
            .refresh_single_flight
            .then(|| Self::new(Duration::from_secs(config.refresh_in_flight_ttl)))
    }

    /// Marks `key` as running unless a live marker already exists. Markers
    /// older than the TTL are taken over.
    async fn try_start(&self, key: &CacheKey) -> bool {
        let mut started = self.started.lock().await;
        let now = Instant::now();

        match started.get(key) {
            Some(since) if now.duration_since(*since) < self.ttl => false,
            _ => {
                started.insert(key.clone(), now);
                true
            },
        }
    }

    async fn complete(&self, key: &CacheKey) {
        self.started.lock().await.remove(key);
    }
}

pub async fn refresh_task(
    app_state: AppState<State>,
    mut receiver: RefreshReceiver,
) -> Result<(), Error> {
    let max_tasks = app_state.config.refresh_max_tasks;
    let permits = Arc::new(Semaphore::new(max_tasks));
    let limit = Duration::from_secs(app_state.config.refresh_timeout);
    let in_flight = InFlight::from_config(&app_state.config);

    info!(
        "Starting refresh worker (max {} tasks, {}s limit, single flight {})",
        max_tasks,
        limit.as_secs(),
        in_flight.is_some()
    );

    while let Some(job) = receiver.recv().await {
        let key = job.scope_key();

        if let Some(in_flight) = &in_flight {
            if !in_flight.try_start(&key).await {
                debug!("Refresh of {} already running, skipped", key);
                continue;
            }
        }

        let permit = permits.clone().acquire_owned().await?;
        let app_state = app_state.clone();
        let in_flight = in_flight.clone();

        tokio::spawn(async move {
            let run = refresh::run(&app_state, &job);
            let result = match timeout(limit, run).await {
                Ok(result) => result,
                Err(elapsed) => Err(Error::from(elapsed)),
            };

            if let Err(e) = result {
                error!("Refresh of {} failed: {}", key, e);
            }

            if let Some(in_flight) = in_flight {
                in_flight.complete(&key).await;
            }

            drop(permit);
        });
    }

    info!("Refresh queue closed, stopping worker");
    Ok(())
}
