//! Rows read from the block-edit log.

use chrono::{DateTime, Utc};
use sqlx::FromRow;

use super::{BlockCounts, Player, World};

#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRow)]
pub struct Co_Block_Counts {
    pub placed: i64,
    pub broken: i64,
    pub rolledback: i64,
}

impl From<Co_Block_Counts> for BlockCounts {
    fn from(row: Co_Block_Counts) -> Self {
        BlockCounts {
            broken: row.broken,
            placed: row.placed,
            rolledback: row.rolledback,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Co_User {
    pub rowid: i64,
    pub uuid: String,
    pub user: String,
    /// Unix seconds.
    pub time: i64,
}

impl From<Co_User> for Player {
    fn from(row: Co_User) -> Self {
        Player {
            pid: row.rowid,
            uuid: row.uuid,
            name: row.user,
            joined: DateTime::<Utc>::from_timestamp(row.time, 0)
                .unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Co_World {
    pub id: i64,
    pub world: String,
}

impl From<Co_World> for World {
    fn from(row: Co_World) -> Self {
        World {
            wid: row.id,
            name: row.world,
        }
    }
}
