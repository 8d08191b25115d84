use crate::error::{ForestError, ForestResult};
use std::env;
use std::str::FromStr;

pub const DEFAULT_PORT: u16 = 9103;
pub const DEFAULT_FEED_LIMIT: usize = 20;
pub const DEFAULT_BUCKET: &str = "memory-images";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Supabase,
    Local,
}

impl FromStr for BackendKind {
    type Err = ForestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "supabase" => Ok(BackendKind::Supabase),
            "local" => Ok(BackendKind::Local),
            other => Err(ForestError::Config(format!(
                "MEMORY_FOREST_BACKEND must be 'supabase' or 'local', got '{}'",
                other
            ))),
        }
    }
}

/// What a view does with a failed read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadErrorPolicy {
    /// Degrade to an empty list / zero count.
    Silent,
    /// Keep the error and render it.
    Visible,
}

impl FromStr for ReadErrorPolicy {
    type Err = ForestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "silent" => Ok(ReadErrorPolicy::Silent),
            "visible" => Ok(ReadErrorPolicy::Visible),
            other => Err(ForestError::Config(format!(
                "MEMORY_FOREST_READ_ERRORS must be 'silent' or 'visible', got '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind: String,
    pub port: u16,
    pub backend: BackendKind,
    pub supabase_url: Option<String>,
    pub supabase_anon_key: Option<String>,
    pub bucket: String,
    pub db_path: String,
    pub blob_dir: String,
    pub feed_limit: usize,
    pub read_errors: ReadErrorPolicy,
    pub site_url: Option<String>,
    pub client_idle_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            backend: BackendKind::Local,
            supabase_url: None,
            supabase_anon_key: None,
            bucket: DEFAULT_BUCKET.to_string(),
            db_path: "./memory_forest.db".to_string(),
            blob_dir: "./blobs".to_string(),
            feed_limit: DEFAULT_FEED_LIMIT,
            read_errors: ReadErrorPolicy::Silent,
            site_url: None,
            client_idle_secs: 86_400,
        }
    }
}

impl Config {
    pub fn from_env() -> ForestResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup; `from_env` passes `std::env`.
    pub fn from_lookup<F>(lookup: F) -> ForestResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let supabase_url = non_empty("SUPABASE_URL").map(|u| u.trim_end_matches('/').to_string());
        let supabase_anon_key = non_empty("SUPABASE_ANON_KEY");

        let backend = match non_empty("MEMORY_FOREST_BACKEND") {
            Some(v) => v.parse()?,
            None if supabase_url.is_some() => BackendKind::Supabase,
            None => defaults.backend,
        };

        if backend == BackendKind::Supabase
            && (supabase_url.is_none() || supabase_anon_key.is_none())
        {
            return Err(ForestError::Config(
                "SUPABASE_URL and SUPABASE_ANON_KEY must be set for the supabase backend"
                    .to_string(),
            ));
        }

        let port = parse_or(non_empty("MEMORY_FOREST_PORT"), "MEMORY_FOREST_PORT", defaults.port)?;
        let feed_limit = parse_or(
            non_empty("MEMORY_FOREST_FEED_LIMIT"),
            "MEMORY_FOREST_FEED_LIMIT",
            defaults.feed_limit,
        )?;
        if feed_limit == 0 {
            return Err(ForestError::Config(
                "MEMORY_FOREST_FEED_LIMIT must be at least 1".to_string(),
            ));
        }
        let client_idle_secs = parse_or(
            non_empty("MEMORY_FOREST_CLIENT_IDLE_SECS"),
            "MEMORY_FOREST_CLIENT_IDLE_SECS",
            defaults.client_idle_secs,
        )?;

        let read_errors = match non_empty("MEMORY_FOREST_READ_ERRORS") {
            Some(v) => v.parse()?,
            None => defaults.read_errors,
        };

        Ok(Self {
            bind: non_empty("MEMORY_FOREST_BIND").unwrap_or(defaults.bind),
            port,
            backend,
            supabase_url,
            supabase_anon_key,
            bucket: non_empty("MEMORY_FOREST_BUCKET").unwrap_or(defaults.bucket),
            db_path: non_empty("MEMORY_FOREST_DB_PATH").unwrap_or(defaults.db_path),
            blob_dir: non_empty("MEMORY_FOREST_BLOB_DIR").unwrap_or(defaults.blob_dir),
            feed_limit,
            read_errors,
            site_url: non_empty("MEMORY_FOREST_SITE_URL"),
            client_idle_secs,
        })
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

fn parse_or<T: FromStr>(value: Option<String>, key: &str, default: T) -> ForestResult<T> {
    match value {
        Some(v) => v
            .trim()
            .parse()
            .map_err(|_| ForestError::Config(format!("{} must be a valid number, got '{}'", key, v))),
        None => Ok(default),
    }
}
