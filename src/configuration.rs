use std::{env, fs, io, ops::Deref, sync::Arc};

use tracing::{info, warn};

use crate::{
    error::Error,
    handler::refresh_queue::{RefreshQueue, RefreshReceiver},
    provider::{
        CacheStore, MemoryCacheStore, MySqlSource, PgCacheStore,
        SourceExecutor,
    },
};

#[derive(Debug)]
pub struct AppState<T>(Arc<T>);

impl<T> AppState<T> {
    pub fn new(state: T) -> AppState<T> {
        AppState(Arc::new(state))
    }
}

impl<T> Clone for AppState<T> {
    fn clone(&self) -> AppState<T> {
        AppState(Arc::clone(&self.0))
    }
}

impl<T> Deref for AppState<T> {
    type Target = Arc<T>;

    fn deref(&self) -> &Arc<T> {
        &self.0
    }
}

#[derive(Debug)]
pub struct State {
    pub config: Config,
    pub cache: Arc<dyn CacheStore>,
    pub source: Arc<dyn SourceExecutor>,
    pub refresher: RefreshQueue,
}

impl State {
    pub fn new(
        config: Config,
        cache: Arc<dyn CacheStore>,
        source: Arc<dyn SourceExecutor>,
        refresher: RefreshQueue,
    ) -> State {
        State {
            config,
            cache,
            source,
            refresher,
        }
    }

    /// Builds the adapters named by `config`. The receiver must be handed to
    /// `refresh_task`.
    pub async fn init(config: Config) -> Result<(State, RefreshReceiver), Error> {
        let cache = Self::init_cache(&config).await?;
        let source = Arc::new(MySqlSource::new(&config.source_database_url)?);
        let (refresher, receiver) = RefreshQueue::new();

        Ok((Self::new(config, cache, source, refresher), receiver))
    }

    async fn init_cache(config: &Config) -> Result<Arc<dyn CacheStore>, Error> {
        match &config.cache_database_url {
            Some(url) => {
                let store = PgCacheStore::new(url, config).await?;
                store.migrate().await?;
                info!("Using postgres cache store");
                Ok(Arc::new(store))
            },
            None => {
                warn!("CACHE_DATABASE_URL not set, cache is kept in memory");
                Ok(Arc::new(MemoryCacheStore::new()))
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server_host: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,
    pub source_database_url: String,
    pub cache_database_url: Option<String>,
    pub cache_max_connections: u32,
    pub refresh_max_tasks: usize,
    pub refresh_single_flight: bool,
    pub refresh_in_flight_ttl: u64,
    pub refresh_timeout: u64,
    pub bulk_upsert_concurrency: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server_host: String::from("0.0.0.0"),
            port: 8080,
            allowed_origins: vec![String::from("https://interflare.net")],
            source_database_url: String::new(),
            cache_database_url: None,
            cache_max_connections: 10,
            refresh_max_tasks: 4,
            refresh_single_flight: false,
            refresh_in_flight_ttl: 300,
            refresh_timeout: 120,
            bulk_upsert_concurrency: 16,
        }
    }
}

pub fn get_configuration() -> Result<Config, Error> {
    let server_host = env::var("SERVER_HOST")?;
    let port: u16 = env::var("PORT")?.parse()?;
    let allowed_origins = env::var("ALLOWED_ORIGINS")?
        .split(',')
        .map(|item| item.trim().to_owned())
        .filter(|item| !item.is_empty())
        .collect::<Vec<String>>();

    let source_database_url = env::var("SOURCE_DATABASE_URL")?;
    let cache_database_url = env::var("CACHE_DATABASE_URL")
        .ok()
        .filter(|url| !url.trim().is_empty());
    let cache_max_connections = env::var("CACHE_MAX_CONNECTIONS")?.parse()?;

    let refresh_max_tasks: usize = env::var("REFRESH_MAX_TASKS")?.parse()?;
    let refresh_single_flight = env::var("REFRESH_SINGLE_FLIGHT")?.parse()?;
    let refresh_in_flight_ttl =
        env::var("REFRESH_IN_FLIGHT_TTL_SECS")?.parse()?;
    let refresh_timeout: u64 = env::var("REFRESH_TIMEOUT_SECS")?.parse()?;
    let bulk_upsert_concurrency: usize =
        env::var("BULK_UPSERT_CONCURRENCY")?.parse()?;

    if refresh_max_tasks == 0
        || refresh_timeout == 0
        || bulk_upsert_concurrency == 0
    {
        return Err(Error::ConfigurationError(String::from(
            "REFRESH_MAX_TASKS, REFRESH_TIMEOUT_SECS and BULK_UPSERT_CONCURRENCY must be positive",
        )));
    }

    let config = Config {
        server_host,
        port,
        allowed_origins,
        source_database_url,
        cache_database_url,
        cache_max_connections,
        refresh_max_tasks,
        refresh_single_flight,
        refresh_in_flight_ttl,
        refresh_timeout,
        bulk_upsert_concurrency,
    };

    Ok(config)
}

/// Loads `gameinfo.conf` and, when present, `.env` into the process
/// environment. Variables that are already set are left alone.
pub fn set_configuration() -> Result<(), Error> {
    let config_file: &str = ".env";
    let gameinfo_config_file: &str = "gameinfo.conf";

    let directory = env!("CARGO_MANIFEST_DIR");
    let path = format!("{}/{}", directory, config_file);
    let gameinfo_config_path = format!("{}/{}", directory, gameinfo_config_file);

    let gameinfo_config_string = fs::read_to_string(gameinfo_config_path)?;
    let config_string = match fs::read_to_string(path) {
        Ok(config) => config,
        Err(e) if e.kind() == io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(e.into()),
    };

    // .env first so that its values win over the committed defaults
    for (key, value) in parse_config_string(&config_string)
        .into_iter()
        .chain(parse_config_string(&gameinfo_config_string))
    {
        if env::var_os(&key).is_none() {
            env::set_var(key, value);
        }
    }

    Ok(())
}

fn parse_config_string(config: &str) -> Vec<(String, String)> {
    config
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| (key.trim().to_owned(), value.trim().to_owned()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config_string() {
        let parsed = parse_config_string(
            "# defaults\nPORT=8080\n\nSOURCE_DATABASE_URL=mysql://u:p@h/db?a=b\nbroken line\n",
        );

        assert_eq!(
            parsed,
            vec![
                (String::from("PORT"), String::from("8080")),
                (
                    String::from("SOURCE_DATABASE_URL"),
                    String::from("mysql://u:p@h/db?a=b")
                ),
            ]
        );
    }

    #[test]
    fn test_shipped_defaults_parse() {
        let directory = env!("CARGO_MANIFEST_DIR");
        let defaults =
            fs::read_to_string(format!("{}/gameinfo.conf", directory)).unwrap();
        let keys: Vec<String> = parse_config_string(&defaults)
            .into_iter()
            .map(|(key, _)| key)
            .collect();

        for key in [
            "SERVER_HOST",
            "PORT",
            "ALLOWED_ORIGINS",
            "CACHE_MAX_CONNECTIONS",
            "REFRESH_MAX_TASKS",
            "REFRESH_SINGLE_FLIGHT",
            "REFRESH_IN_FLIGHT_TTL_SECS",
            "REFRESH_TIMEOUT_SECS",
            "BULK_UPSERT_CONCURRENCY",
        ] {
            assert!(keys.iter().any(|k| k == key), "{} missing", key);
        }
    }
}
