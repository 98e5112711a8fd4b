use std::{collections::BTreeMap, fmt::Debug};

use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use tokio::sync::RwLock;

use crate::{
    configuration::Config,
    dao::{read_migration, PoolOption},
    error::Error,
    model::{Cache_Entry, CacheKey, CacheKind, CachedRecord, Cursor, Table},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanFilter {
    Key(String),
}

/// Ordered enumeration of one entity kind.
#[derive(Debug, Clone)]
pub struct Scan {
    pub kind: CacheKind,
    pub filter: Option<ScanFilter>,
    pub cursor: Option<Cursor>,
    /// `None` returns every matching record.
    pub limit: Option<usize>,
}

impl Scan {
    pub fn all(kind: CacheKind) -> Self {
        Scan {
            kind,
            filter: None,
            cursor: None,
            limit: None,
        }
    }

    pub fn page(kind: CacheKind, cursor: Option<Cursor>, limit: usize) -> Self {
        Scan {
            kind,
            filter: None,
            cursor,
            limit: Some(limit),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ScanPage {
    pub records: Vec<CachedRecord>,
    /// Set only when more records follow this page.
    pub next_cursor: Option<Cursor>,
}

/// Key/value store holding the cached records.
#[async_trait]
pub trait CacheStore: Send + Sync + Debug {
    async fn get(&self, key: &CacheKey) -> Result<Option<CachedRecord>, Error> {
        let page = self
            .scan(Scan {
                kind: key.kind,
                filter: Some(ScanFilter::Key(key.name.clone())),
                cursor: None,
                limit: Some(1),
            })
            .await?;

        Ok(page.records.into_iter().next())
    }

    async fn scan(&self, scan: Scan) -> Result<ScanPage, Error>;

    /// Full overwrite of the record stored under `record.key`.
    async fn upsert(&self, record: CachedRecord) -> Result<(), Error>;
}

pub fn encode_cursor(key: &CacheKey) -> Cursor {
    Cursor(URL_SAFE_NO_PAD.encode(key.name.as_bytes()))
}

pub fn decode_cursor(cursor: &Cursor) -> Result<String, Error> {
    URL_SAFE_NO_PAD
        .decode(cursor.as_str())
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .ok_or_else(|| Error::invalid_param("cx", cursor.as_str()))
}

/// Trims a page fetched with one extra record and derives the cursor.
fn into_page(mut records: Vec<CachedRecord>, limit: Option<usize>) -> ScanPage {
    let next_cursor = match limit {
        Some(limit) if records.len() > limit => {
            records.truncate(limit);
            records.last().map(|record| encode_cursor(&record.key))
        },
        _ => None,
    };

    ScanPage {
        records,
        next_cursor,
    }
}

// =============================================================================
// Postgres
// =============================================================================

#[derive(Debug)]
pub struct PgCacheStore {
    pub cache_entry: Table<Cache_Entry>,
}

impl PgCacheStore {
    pub async fn new(
        database_url: &str,
        config: &Config,
    ) -> Result<PgCacheStore, Error> {
        let pool = PoolOption::new()
            .max_connections(config.cache_max_connections)
            .connect(database_url)
            .await?;

        Ok(PgCacheStore {
            cache_entry: Table::new(pool),
        })
    }

    pub async fn migrate(&self) -> Result<(), Error> {
        let sql = read_migration("cache_entry.sql")?;
        sqlx::query(&sql).execute(&self.cache_entry.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl CacheStore for PgCacheStore {
    async fn get(&self, key: &CacheKey) -> Result<Option<CachedRecord>, Error> {
        self.cache_entry
            .get(key.kind.as_str(), &key.name)
            .await?
            .map(CachedRecord::try_from)
            .transpose()
    }

    async fn scan(&self, scan: Scan) -> Result<ScanPage, Error> {
        let after = scan.cursor.as_ref().map(decode_cursor).transpose()?;
        let key = scan.filter.as_ref().map(|ScanFilter::Key(key)| key.as_str());
        let fetch = scan.limit.map(|limit| limit as i64 + 1);

        let entries = self
            .cache_entry
            .scan(scan.kind.as_str(), key, after.as_deref(), fetch)
            .await?;
        let records = entries
            .into_iter()
            .map(CachedRecord::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(into_page(records, scan.limit))
    }

    async fn upsert(&self, record: CachedRecord) -> Result<(), Error> {
        self.cache_entry
            .upsert(
                record.key.kind.as_str(),
                &record.key.name,
                &record.payload,
                record.timestamp,
                record.compute_duration_ms,
            )
            .await?;
        Ok(())
    }
}

// =============================================================================
// Memory
// =============================================================================

/// In-process store, used when no cache database is configured.
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    entries: RwLock<BTreeMap<CacheKey, CachedRecord>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn scan(&self, scan: Scan) -> Result<ScanPage, Error> {
        let after = scan
            .cursor
            .as_ref()
            .map(decode_cursor)
            .transpose()?
            .map(|name| CacheKey::new(scan.kind, name));
        let fetch = scan.limit.map_or(usize::MAX, |limit| limit + 1);

        let entries = self.entries.read().await;
        let records = entries
            .values()
            .filter(|record| record.key.kind == scan.kind)
            .filter(|record| match &scan.filter {
                Some(ScanFilter::Key(key)) => &record.key.name == key,
                None => true,
            })
            .filter(|record| after.as_ref().map_or(true, |after| &record.key > after))
            .take(fetch)
            .cloned()
            .collect();

        Ok(into_page(records, scan.limit))
    }

    async fn upsert(&self, record: CachedRecord) -> Result<(), Error> {
        let mut entries = self.entries.write().await;
        entries.insert(record.key.clone(), record);
        Ok(())
    }
}
