use sqlx::Error;

use crate::model::Co_User;

use super::Connection;

/// Users with a known identity whose `time` is strictly after `since`
/// (unix seconds).
pub async fn get_since(
    connection: &mut Connection,
    since: i64,
) -> Result<Vec<Co_User>, Error> {
    sqlx::query_as(
        r#"
        SELECT
            CAST(`rowid` AS SIGNED) AS `rowid`,
            `uuid`,
            `user`,
            CAST(`time` AS SIGNED) AS `time`
        FROM `co_user`
        WHERE `uuid` IS NOT NULL AND `time` > ?
        ORDER BY `rowid`
        "#,
    )
    .bind(since)
    .fetch_all(connection)
    .await
}
