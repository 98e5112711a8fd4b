use chrono::{DateTime, Utc};
use sqlx::{types::Json, Error};

use crate::model::{Cache_Entry, Table};

use super::QueryResult;

impl Table<Cache_Entry> {
    pub async fn get(
        &self,
        kind: &str,
        key: &str,
    ) -> Result<Option<Cache_Entry>, Error> {
        sqlx::query_as(
            r#"
            SELECT "kind", "key", "payload", "timestamp", "compute_duration_ms"
            FROM "cache_entry"
            WHERE "kind" = $1 AND "key" = $2
            "#,
        )
        .bind(kind)
        .bind(key)
        .persistent(true)
        .fetch_optional(&self.pool)
        .await
    }

    /// Entries of one kind in shortlex key order, optionally restricted to a
    /// single key and/or starting strictly after `after`. `limit = None`
    /// returns everything.
    pub async fn scan(
        &self,
        kind: &str,
        key: Option<&str>,
        after: Option<&str>,
        limit: Option<i64>,
    ) -> Result<Vec<Cache_Entry>, Error> {
        sqlx::query_as(
            r#"
            SELECT "kind", "key", "payload", "timestamp", "compute_duration_ms"
            FROM "cache_entry"
            WHERE "kind" = $1
              AND ($2::TEXT IS NULL OR "key" = $2)
              AND (
                $3::TEXT IS NULL
                OR (char_length("key"), "key") > (char_length($3), $3::TEXT COLLATE "C")
              )
            ORDER BY char_length("key"), "key"
            LIMIT $4
            "#,
        )
        .bind(kind)
        .bind(key)
        .bind(after)
        .bind(limit)
        .persistent(true)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn upsert(
        &self,
        kind: &str,
        key: &str,
        payload: &serde_json::Value,
        timestamp: DateTime<Utc>,
        compute_duration_ms: Option<i64>,
    ) -> Result<QueryResult, Error> {
        sqlx::query(
            r#"
            INSERT INTO "cache_entry" ("kind", "key", "payload", "timestamp", "compute_duration_ms")
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT ("kind", "key") DO UPDATE SET
                "payload" = EXCLUDED."payload",
                "timestamp" = EXCLUDED."timestamp",
                "compute_duration_ms" = EXCLUDED."compute_duration_ms"
            "#,
        )
        .bind(kind)
        .bind(key)
        .bind(Json(payload))
        .bind(timestamp)
        .bind(compute_duration_ms)
        .persistent(true)
        .execute(&self.pool)
        .await
    }
}
