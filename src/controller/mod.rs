//! API Controller modules
//!
//! Each handler validates its query, reads the cache, serves what it found and
//! decides whether the scope has to be refreshed.

use actix_web::{http::header::ContentType, web::Bytes, HttpResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{configuration::State, error::Error, handler::refresh::RefreshJob};

use deferred::DeferredRefresh;

pub mod block_counts;
pub mod deferred;
pub mod players;
pub mod worlds;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheInfo {
    pub last_update: DateTime<Utc>,
    /// Set whenever a refresh was started by this request.
    pub refreshed: bool,
}

/// JSON response; `job` is queued only after the body has been sent.
pub fn respond<T: Serialize>(
    state: &State,
    body: &T,
    job: Option<RefreshJob>,
) -> Result<HttpResponse, Error> {
    let bytes = Bytes::from(serde_json::to_vec(body)?);
    let mut response = HttpResponse::Ok();
    response.content_type(ContentType::json());

    let response = match job {
        Some(job) => response.body(DeferredRefresh::new(
            bytes,
            job,
            state.refresher.clone(),
        )),
        None => response.body(bytes),
    };

    Ok(response)
}
