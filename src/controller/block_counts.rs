use actix_web::{get, web, HttpResponse};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::{
    configuration::{AppState, State},
    error::Error,
    handler::refresh::{self, RefreshJob},
    helpers::{parse_player_id, parse_world_id},
    model::{BlockCounts, BlockCountsEntry, BlockScope},
};

use super::{respond, CacheInfo};

#[get("/block-counts")]
async fn index(
    state: web::Data<AppState<State>>,
    data: web::Query<Query>,
) -> Result<HttpResponse, Error> {
    let wid = parse_world_id(data.wid.as_deref())?;
    let pid = parse_player_id(data.pid.as_deref())?;
    let scope = BlockScope::new(wid, pid);
    let now = Utc::now();

    let record = match state.cache.get(&scope.cache_key()).await? {
        Some(record) => record,
        None => {
            // nothing to serve yet, fill the cache before answering
            refresh::run(&state, &RefreshJob::BlockCounts(scope)).await?;

            let response = Response {
                pid,
                wid,
                data: BlockCounts::default(),
                cache: CacheInfo {
                    last_update: now,
                    refreshed: true,
                },
            };
            return respond(&state, &response, None);
        },
    };

    let entry: BlockCountsEntry = record.decode()?;
    let stale = !record.is_fresh(scope.policy(), now);

    let response = Response {
        pid: entry.pid,
        wid: entry.wid,
        data: entry.counts,
        cache: CacheInfo {
            last_update: record.timestamp,
            refreshed: stale,
        },
    };
    let job = stale.then_some(RefreshJob::BlockCounts(scope));

    respond(&state, &response, job)
}

#[derive(Debug, Deserialize)]
pub struct Query {
    wid: Option<String>,
    pid: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Response {
    pub pid: i64,
    pub wid: i64,
    pub data: BlockCounts,
    pub cache: CacheInfo,
}
