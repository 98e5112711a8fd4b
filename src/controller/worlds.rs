use actix_web::{get, web, HttpResponse};
use chrono::Utc;
use serde::Serialize;

use crate::{
    cache_keys,
    configuration::{AppState, State},
    error::Error,
    handler::refresh::{self, RefreshJob},
    helpers::Scope,
    model::{CacheKind, World},
    provider::Scan,
};

use super::{respond, CacheInfo};

#[get("/worlds")]
async fn index(state: web::Data<AppState<State>>) -> Result<HttpResponse, Error> {
    let now = Utc::now();
    let page = state.cache.scan(Scan::all(CacheKind::Worlds)).await?;

    let (sentinel, records): (Vec<_>, Vec<_>) = page
        .records
        .into_iter()
        .partition(|record| record.key == cache_keys::worlds_sentinel());
    let worlds = records
        .iter()
        .map(|record| record.decode())
        .collect::<Result<Vec<World>, Error>>()?;

    let Some(sentinel) = sentinel.into_iter().next() else {
        refresh::run(&state, &RefreshJob::Worlds).await?;

        let response = Response {
            worlds,
            cache: CacheInfo {
                last_update: now,
                refreshed: true,
            },
        };
        return respond(&state, &response, None);
    };

    let stale = !sentinel.is_fresh(Scope::WorldList, now);
    let response = Response {
        worlds,
        cache: CacheInfo {
            last_update: sentinel.timestamp,
            refreshed: stale,
        },
    };

    respond(&state, &response, stale.then_some(RefreshJob::Worlds))
}

#[derive(Debug, Serialize)]
pub struct Response {
    pub worlds: Vec<World>,
    pub cache: CacheInfo,
}

#[cfg(test)]
mod tests {
    use actix_web::{http::StatusCode, test, App};
    use chrono::{DateTime, Duration};

    use super::*;
    use crate::{
        handler::refresh_queue::refresh_task,
        model::ListMeta,
        testing::{self, FakeSource},
    };

    fn world(wid: i64, name: &str) -> World {
        World {
            wid,
            name: name.to_owned(),
        }
    }

    async fn seed_worlds(state: &State, worlds: &[World], sentinel_at: DateTime<Utc>) {
        for world in worlds {
            testing::seed(state, cache_keys::world(world.wid), world, sentinel_at)
                .await;
        }
        testing::seed(
            state,
            cache_keys::worlds_sentinel(),
            &ListMeta::default(),
            sentinel_at,
        )
        .await;
    }

    async fn request(app_state: &AppState<State>) -> (StatusCode, serde_json::Value) {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(app_state.clone()))
                .service(index),
        )
        .await;
        let response = test::call_service(
            &app,
            test::TestRequest::get().uri("/worlds").to_request(),
        )
        .await;
        let status = response.status();
        let body = test::read_body(response).await;
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[actix_web::test]
    async fn test_fresh_list_is_served_without_sentinel() {
        let source = FakeSource::new();
        let (state, mut receiver) = testing::state(source.clone());
        let worlds = [world(1, "world"), world(2, "world_nether")];
        seed_worlds(&state, &worlds, Utc::now() - Duration::minutes(59)).await;
        let app_state = AppState::new(state);

        let (status, body) = request(&app_state).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body["worlds"],
            serde_json::json!([
                {"wid": 1, "name": "world"},
                {"wid": 2, "name": "world_nether"}
            ])
        );
        assert_eq!(body["cache"]["refreshed"], false);
        assert!(receiver.try_recv().is_err());
        assert_eq!(source.queries(), 0);
    }

    #[actix_web::test]
    async fn test_stale_list_is_served_then_fully_refreshed() {
        let source = FakeSource::new();
        let (state, receiver) = testing::state(source.clone());
        let stale_at = Utc::now() - Duration::hours(2);
        seed_worlds(&state, &[world(1, "world"), world(2, "old")], stale_at).await;
        source.set_worlds(vec![world(1, "world"), world(2, "renamed")]);
        let app_state = AppState::new(state);

        let (_, body) = request(&app_state).await;

        assert_eq!(body["worlds"][1]["name"], "old");
        assert_eq!(body["cache"]["refreshed"], true);
        assert_eq!(source.queries(), 0);

        tokio::spawn(refresh_task(app_state.clone(), receiver));
        testing::refreshed_after(&app_state, &cache_keys::worlds_sentinel(), stale_at)
            .await;

        for wid in [1, 2] {
            let record = app_state
                .cache
                .get(&cache_keys::world(wid))
                .await
                .unwrap()
                .unwrap();
            assert!(record.timestamp > stale_at);
        }
        let (_, body) = request(&app_state).await;
        assert_eq!(body["worlds"][1]["name"], "renamed");
        assert_eq!(body["cache"]["refreshed"], false);
    }

    #[actix_web::test]
    async fn test_missing_sentinel_bootstraps_list() {
        let source = FakeSource::new().with_worlds(vec![world(1, "world")]);
        let (state, _receiver) = testing::state(source.clone());
        let app_state = AppState::new(state);

        let (status, body) = request(&app_state).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["worlds"], serde_json::json!([]));
        assert_eq!(body["cache"]["refreshed"], true);
        assert_eq!(source.closed(), 1);

        let (_, body) = request(&app_state).await;
        assert_eq!(body["worlds"], serde_json::json!([{"wid": 1, "name": "world"}]));
    }
}
