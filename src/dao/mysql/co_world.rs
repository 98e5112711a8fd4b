use sqlx::Error;

use crate::model::Co_World;

use super::Connection;

pub async fn get_all(connection: &mut Connection) -> Result<Vec<Co_World>, Error> {
    sqlx::query_as(
        r#"
        SELECT CAST(`id` AS SIGNED) AS `id`, `world`
        FROM `co_world`
        ORDER BY `id`
        "#,
    )
    .fetch_all(connection)
    .await
}
