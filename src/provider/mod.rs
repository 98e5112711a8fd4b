pub use self::{
    cache_store::{
        decode_cursor, encode_cursor, CacheStore, MemoryCacheStore,
        PgCacheStore, Scan, ScanFilter, ScanPage,
    },
    source::{MySqlSource, SourceConnection, SourceExecutor},
};

mod cache_store;
mod source;
