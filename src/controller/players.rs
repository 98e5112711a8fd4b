use actix_web::{get, web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};

use crate::{
    cache_keys,
    configuration::{AppState, State},
    error::Error,
    handler::refresh::{self, RefreshJob},
    helpers::{parse_cursor, parse_page_size, Scope},
    model::{CacheKind, CachedRecord, Cursor, Player},
    provider::{Scan, ScanPage},
};

use super::{respond, CacheInfo};

#[get("/players")]
async fn index(
    state: web::Data<AppState<State>>,
    data: web::Query<Query>,
) -> Result<HttpResponse, Error> {
    let limit = parse_page_size(data.lx.as_deref())?;

    match parse_cursor(data.cx.as_deref()) {
        Some(cursor) => next_page(&state, cursor, limit).await,
        None => first_page(&state, limit).await,
    }
}

/// The only page that carries cache metadata and may trigger a refresh.
async fn first_page(state: &State, limit: usize) -> Result<HttpResponse, Error> {
    let now = Utc::now();
    let mut page = scan_first_page(state, limit).await?;

    // never bootstrapped: fill the list inline and serve what it wrote
    let bootstrap = !starts_with_sentinel(&page.records);
    if bootstrap {
        refresh::run(
            state,
            &RefreshJob::Players {
                last_update: DateTime::UNIX_EPOCH,
            },
        )
        .await?;
        page = scan_first_page(state, limit).await?;
    }

    let mut records = page.records;
    let sentinel = starts_with_sentinel(&records).then(|| records.remove(0));

    let stale = !bootstrap
        && sentinel
            .as_ref()
            .is_some_and(|record| !record.is_fresh(Scope::PlayerList, now));
    let last_update = match (&sentinel, bootstrap) {
        (Some(sentinel), false) => sentinel.timestamp,
        _ => now,
    };

    let response = Response {
        players: items(&records)?,
        cx: page.next_cursor,
        cache: Some(CacheInfo {
            last_update,
            refreshed: bootstrap || stale,
        }),
    };
    let job = stale.then_some(RefreshJob::Players { last_update });

    respond(state, &response, job)
}

/// One extra record for the sentinel, which sorts first.
async fn scan_first_page(state: &State, limit: usize) -> Result<ScanPage, Error> {
    state
        .cache
        .scan(Scan::page(CacheKind::Players, None, limit + 1))
        .await
}

fn starts_with_sentinel(records: &[CachedRecord]) -> bool {
    records
        .first()
        .is_some_and(|record| record.key == cache_keys::players_sentinel())
}

async fn next_page(
    state: &State,
    cursor: Cursor,
    limit: usize,
) -> Result<HttpResponse, Error> {
    let page = state
        .cache
        .scan(Scan::page(CacheKind::Players, Some(cursor), limit))
        .await?;

    let response = Response {
        players: items(&page.records)?,
        cx: page.next_cursor,
        cache: None,
    };

    respond(state, &response, None)
}

fn items(records: &[CachedRecord]) -> Result<Vec<Item>, Error> {
    records
        .iter()
        .filter(|record| record.key != cache_keys::players_sentinel())
        .map(|record| -> Result<Item, Error> {
            Ok(Item {
                player: record.decode()?,
                timestamp: record.timestamp,
            })
        })
        .collect()
}

fn cursor_or_false<S: Serializer>(
    cursor: &Option<Cursor>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match cursor {
        Some(cursor) => serializer.serialize_str(cursor.as_str()),
        None => serializer.serialize_bool(false),
    }
}

#[derive(Debug, Deserialize)]
pub struct Query {
    cx: Option<String>,
    lx: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Item {
    #[serde(flatten)]
    pub player: Player,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct Response {
    pub players: Vec<Item>,
    #[serde(serialize_with = "cursor_or_false")]
    pub cx: Option<Cursor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache: Option<CacheInfo>,
}
