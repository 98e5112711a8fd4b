use sqlx::Error;

use crate::model::{BlockScope, Co_Block_Counts};

use super::{Connection, DataBase};

// Sub-count order is placed, broken, rolled back; parameters repeat per
// sub-count, see `BlockScope::bind_params`.

const SERVER_COUNTS: &str = r#"
    SELECT
        (SELECT COUNT(`rowid`) FROM `co_block` WHERE `action` = 1 AND `rolled_back` = 0) AS `placed`,
        (SELECT COUNT(`rowid`) FROM `co_block` WHERE `action` = 0 AND `rolled_back` = 0) AS `broken`,
        (SELECT COUNT(`rowid`) FROM `co_block` WHERE `rolled_back` = 1) AS `rolledback`
"#;

const WORLD_COUNTS: &str = r#"
    SELECT
        (SELECT COUNT(`rowid`) FROM `co_block` WHERE `action` = 1 AND `rolled_back` = 0 AND `wid` = ?) AS `placed`,
        (SELECT COUNT(`rowid`) FROM `co_block` WHERE `action` = 0 AND `rolled_back` = 0 AND `wid` = ?) AS `broken`,
        (SELECT COUNT(`rowid`) FROM `co_block` WHERE `rolled_back` = 1 AND `wid` = ?) AS `rolledback`
"#;

const PLAYER_COUNTS: &str = r#"
    SELECT
        (SELECT COUNT(`rowid`) FROM `co_block` WHERE `action` = 1 AND `rolled_back` = 0 AND `user` = ?) AS `placed`,
        (SELECT COUNT(`rowid`) FROM `co_block` WHERE `action` = 0 AND `rolled_back` = 0 AND `user` = ?) AS `broken`,
        (SELECT COUNT(`rowid`) FROM `co_block` WHERE `rolled_back` = 1 AND `user` = ?) AS `rolledback`
"#;

const PLAYER_IN_WORLD_COUNTS: &str = r#"
    SELECT
        (SELECT COUNT(`rowid`) FROM `co_block` WHERE `action` = 1 AND `rolled_back` = 0 AND `wid` = ? AND `user` = ?) AS `placed`,
        (SELECT COUNT(`rowid`) FROM `co_block` WHERE `action` = 0 AND `rolled_back` = 0 AND `wid` = ? AND `user` = ?) AS `broken`,
        (SELECT COUNT(`rowid`) FROM `co_block` WHERE `rolled_back` = 1 AND `wid` = ? AND `user` = ?) AS `rolledback`
"#;

pub fn count_query(scope: &BlockScope) -> &'static str {
    match scope {
        BlockScope::Server => SERVER_COUNTS,
        BlockScope::World { .. } => WORLD_COUNTS,
        BlockScope::Player { .. } => PLAYER_COUNTS,
        BlockScope::PlayerInWorld { .. } => PLAYER_IN_WORLD_COUNTS,
    }
}

pub async fn get_counts(
    connection: &mut Connection,
    scope: &BlockScope,
) -> Result<Co_Block_Counts, Error> {
    let mut query =
        sqlx::query_as::<DataBase, Co_Block_Counts>(count_query(scope));

    for param in scope.bind_params() {
        query = query.bind(param);
    }

    query.fetch_one(connection).await
}
