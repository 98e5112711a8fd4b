//! Centralized cache key constants
//!
//! Entity kinds, reserved sentinel identities and the composite key builders
//! used by the controllers and the refresh engine.

use crate::model::{CacheKey, CacheKind};

// Entity kinds
pub const BLOCK_COUNTS: &str = "BlockCounts";
pub const PLAYERS: &str = "Players";
pub const WORLDS: &str = "Worlds";

/// Reserved player id of the "last bulk refresh" record. Source user row ids
/// start at 1, and the key sorts before every real player.
pub const PLAYERS_SENTINEL_ID: i64 = 0;

/// Reserved world id of the "last bulk refresh" record. Valid world ids are
/// 0-999.
pub const WORLDS_SENTINEL_ID: i64 = 99999;

pub const SENTINEL_NAME: &str = "_LASTUPDATE";

/// `pid-wid`, 0 standing for "all".
pub fn block_counts(pid: i64, wid: i64) -> CacheKey {
    CacheKey::new(CacheKind::BlockCounts, format!("{}-{}", pid, wid))
}

pub fn player(pid: i64) -> CacheKey {
    CacheKey::new(CacheKind::Players, pid.to_string())
}

pub fn world(wid: i64) -> CacheKey {
    CacheKey::new(CacheKind::Worlds, wid.to_string())
}

pub fn players_sentinel() -> CacheKey {
    player(PLAYERS_SENTINEL_ID)
}

pub fn worlds_sentinel() -> CacheKey {
    world(WORLDS_SENTINEL_ID)
}
