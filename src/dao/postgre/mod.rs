pub use self::{
    path::{get_path, read_migration},
    types::{PoolOption, PoolType, QueryResult},
};

mod cache_entry;
mod path;
mod types;
