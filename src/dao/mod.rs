pub mod mysql;
pub mod postgre;

pub use postgre::{get_path, read_migration, PoolOption, PoolType, QueryResult};
