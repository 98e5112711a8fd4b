//! Cache models
//!
//! Records as they live in the cache store, plus the typed payloads each
//! entity kind carries.

use std::{cmp::Ordering, fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use sqlx::{types::Json, FromRow};

use crate::{
    cache_keys,
    error::Error,
    helpers::freshness::Scope,
};

// =============================================================================
// KEYS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CacheKind {
    BlockCounts,
    Players,
    Worlds,
}

impl CacheKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheKind::BlockCounts => cache_keys::BLOCK_COUNTS,
            CacheKind::Players => cache_keys::PLAYERS,
            CacheKind::Worlds => cache_keys::WORLDS,
        }
    }
}

impl fmt::Display for CacheKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CacheKind {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            cache_keys::BLOCK_COUNTS => Ok(CacheKind::BlockCounts),
            cache_keys::PLAYERS => Ok(CacheKind::Players),
            cache_keys::WORLDS => Ok(CacheKind::Worlds),
            _ => Err(Error::FieldNotExist(format!("cache kind {}", value))),
        }
    }
}

/// Composite identity of a cached record: entity kind plus key.
///
/// Keys order by kind, then shortlex (shorter first, then lexicographic), so
/// decimal ids enumerate in numeric order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub kind: CacheKind,
    pub name: String,
}

impl CacheKey {
    pub fn new(kind: CacheKind, name: impl Into<String>) -> Self {
        CacheKey {
            kind,
            name: name.into(),
        }
    }
}

impl Ord for CacheKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.kind
            .cmp(&other.kind)
            .then_with(|| self.name.len().cmp(&other.name.len()))
            .then_with(|| self.name.cmp(&other.name))
    }
}

impl PartialOrd for CacheKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.name)
    }
}

/// Opaque pagination token handed out by a cache store scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(pub String);

impl Cursor {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// =============================================================================
// RECORDS
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct CachedRecord {
    pub key: CacheKey,
    pub payload: serde_json::Value,
    /// Last write; the only staleness signal.
    pub timestamp: DateTime<Utc>,
    pub compute_duration_ms: Option<i64>,
}

impl CachedRecord {
    pub fn new<T: Serialize>(
        key: CacheKey,
        payload: &T,
        timestamp: DateTime<Utc>,
    ) -> Result<Self, Error> {
        Ok(CachedRecord {
            key,
            payload: serde_json::to_value(payload)?,
            timestamp,
            compute_duration_ms: None,
        })
    }

    pub fn with_compute_duration(mut self, compute_duration_ms: i64) -> Self {
        self.compute_duration_ms = Some(compute_duration_ms);
        self
    }

    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, Error> {
        Ok(serde_json::from_value(self.payload.clone())?)
    }

    pub fn is_fresh(&self, scope: Scope, now: DateTime<Utc>) -> bool {
        scope.is_fresh(self.timestamp, now)
    }
}

/// Row of the `cache_entry` table.
#[derive(Debug, FromRow)]
pub struct Cache_Entry {
    pub kind: String,
    pub key: String,
    pub payload: Json<serde_json::Value>,
    pub timestamp: DateTime<Utc>,
    pub compute_duration_ms: Option<i64>,
}

impl TryFrom<Cache_Entry> for CachedRecord {
    type Error = Error;

    fn try_from(entry: Cache_Entry) -> Result<Self, Self::Error> {
        Ok(CachedRecord {
            key: CacheKey::new(entry.kind.parse()?, entry.key),
            payload: entry.payload.0,
            timestamp: entry.timestamp,
            compute_duration_ms: entry.compute_duration_ms,
        })
    }
}

// =============================================================================
// PAYLOADS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BlockCounts {
    pub broken: i64,
    pub placed: i64,
    pub rolledback: i64,
}

/// Payload of a `BlockCounts` record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockCountsEntry {
    pub pid: i64,
    pub wid: i64,
    #[serde(flatten)]
    pub counts: BlockCounts,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub pid: i64,
    pub uuid: String,
    pub name: String,
    pub joined: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct World {
    pub wid: i64,
    pub name: String,
}

/// Payload of a list sentinel record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListMeta {
    pub name: String,
}

impl Default for ListMeta {
    fn default() -> Self {
        ListMeta {
            name: cache_keys::SENTINEL_NAME.to_owned(),
        }
    }
}

// =============================================================================
// SCOPES
// =============================================================================

/// World/player dimensions of an aggregate-counts request. 0 means "all".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockScope {
    Server,
    World { wid: i64 },
    Player { pid: i64 },
    PlayerInWorld { wid: i64, pid: i64 },
}

impl BlockScope {
    pub fn new(wid: i64, pid: i64) -> Self {
        match (wid, pid) {
            (0, 0) => BlockScope::Server,
            (wid, 0) => BlockScope::World { wid },
            (0, pid) => BlockScope::Player { pid },
            (wid, pid) => BlockScope::PlayerInWorld { wid, pid },
        }
    }

    pub fn wid(&self) -> i64 {
        match *self {
            BlockScope::World { wid } | BlockScope::PlayerInWorld { wid, .. } => {
                wid
            },
            BlockScope::Server | BlockScope::Player { .. } => 0,
        }
    }

    pub fn pid(&self) -> i64 {
        match *self {
            BlockScope::Player { pid } | BlockScope::PlayerInWorld { pid, .. } => {
                pid
            },
            BlockScope::Server | BlockScope::World { .. } => 0,
        }
    }

    pub fn policy(&self) -> Scope {
        match self {
            BlockScope::Server => Scope::Server,
            BlockScope::World { .. } => Scope::World,
            BlockScope::Player { .. } => Scope::Player,
            BlockScope::PlayerInWorld { .. } => Scope::PlayerInWorld,
        }
    }

    /// Parameters in the order the count query binds them: one filter set
    /// per sub-count (placed, broken, rolled back).
    pub fn bind_params(&self) -> Vec<i64> {
        let filter: &[i64] = match self {
            BlockScope::Server => &[],
            BlockScope::World { wid } => &[*wid],
            BlockScope::Player { pid } => &[*pid],
            BlockScope::PlayerInWorld { wid, pid } => &[*wid, *pid],
        };

        filter.repeat(3)
    }

    pub fn cache_key(&self) -> CacheKey {
        cache_keys::block_counts(self.pid(), self.wid())
    }

    pub fn entry(&self, counts: BlockCounts) -> BlockCountsEntry {
        BlockCountsEntry {
            pid: self.pid(),
            wid: self.wid(),
            counts,
        }
    }
}
