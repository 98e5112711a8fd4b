pub use self::types::{ConnectOptions, Connection, DataBase};

pub mod co_block;
pub mod co_user;
pub mod co_world;
mod types;
