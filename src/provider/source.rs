use std::{fmt::Debug, str::FromStr};

use async_trait::async_trait;
use sqlx::{ConnectOptions as _, Connection as _};

use crate::{
    dao::mysql::{co_block, co_user, co_world, ConnectOptions, Connection},
    error::Error,
    model::{BlockCounts, BlockScope, Player, World},
};

/// Opens one connection to the block-edit log per refresh.
#[async_trait]
pub trait SourceExecutor: Send + Sync + Debug {
    async fn connect(&self) -> Result<Box<dyn SourceConnection>, Error>;
}

/// A live source connection. Callers must `close` it on every path.
#[async_trait]
pub trait SourceConnection: Send {
    async fn block_counts(&mut self, scope: &BlockScope) -> Result<BlockCounts, Error>;

    /// Identity-bearing users with activity strictly after `since` (unix
    /// seconds).
    async fn players_since(&mut self, since: i64) -> Result<Vec<Player>, Error>;

    async fn worlds(&mut self) -> Result<Vec<World>, Error>;

    async fn close(self: Box<Self>) -> Result<(), Error>;
}

#[derive(Debug)]
pub struct MySqlSource {
    options: ConnectOptions,
}

impl MySqlSource {
    pub fn new(database_url: &str) -> Result<MySqlSource, Error> {
        let options = ConnectOptions::from_str(database_url)?;
        Ok(MySqlSource { options })
    }
}

#[async_trait]
impl SourceExecutor for MySqlSource {
    async fn connect(&self) -> Result<Box<dyn SourceConnection>, Error> {
        let connection = self.options.connect().await?;
        Ok(Box::new(MySqlSession { connection }))
    }
}

struct MySqlSession {
    connection: Connection,
}

#[async_trait]
impl SourceConnection for MySqlSession {
    async fn block_counts(&mut self, scope: &BlockScope) -> Result<BlockCounts, Error> {
        let row = co_block::get_counts(&mut self.connection, scope).await?;
        Ok(row.into())
    }

    async fn players_since(&mut self, since: i64) -> Result<Vec<Player>, Error> {
        let rows = co_user::get_since(&mut self.connection, since).await?;
        Ok(rows.into_iter().map(Player::from).collect())
    }

    async fn worlds(&mut self) -> Result<Vec<World>, Error> {
        let rows = co_world::get_all(&mut self.connection).await?;
        Ok(rows.into_iter().map(World::from).collect())
    }

    async fn close(self: Box<Self>) -> Result<(), Error> {
        let MySqlSession { connection } = *self;
        connection.close().await?;
        Ok(())
    }
}
