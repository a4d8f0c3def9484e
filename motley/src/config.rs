/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Runtime options.
//!
//! Options come from FedBOX-style environment files: `.env` and then
//! `.env.<env>` in a configuration directory, each key optionally
//! prefixed with `FEDBOX_`. File values take precedence over the
//! process environment. Command-line flags are applied on top by the
//! binary.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing::Level;

/// Prefix applied to every configuration key.
pub const KEY_PREFIX: &str = "FEDBOX";

pub const KEY_ENV: &str = "ENV";
pub const KEY_LOG_LEVEL: &str = "LOG_LEVEL";
pub const KEY_HOSTNAME: &str = "HOSTNAME";
pub const KEY_STORAGE: &str = "STORAGE";
pub const KEY_STORAGE_PATH: &str = "STORAGE_PATH";
pub const KEY_MAX_ITEMS: &str = "MAX_ITEMS";
pub const KEY_PAGE_SIZE: &str = "PAGE_SIZE";
pub const KEY_SYNC_TIMEOUT_MS: &str = "SYNC_TIMEOUT_MS";
pub const KEY_HTTP_TIMEOUT_MS: &str = "HTTP_TIMEOUT_MS";

/// Default bound on items accumulated for one collection.
pub const DEFAULT_MAX_ITEMS: usize = 100;
/// Default page size served by the filesystem backend.
pub const DEFAULT_PAGE_SIZE: usize = 50;
pub const DEFAULT_SYNC_TIMEOUT: Duration = Duration::from_millis(800);
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid environment type {0:?}")]
    InvalidEnv(String),

    #[error("unknown storage type {0:?}")]
    UnknownStorage(String),

    #[error("invalid value {value:?} for {key}")]
    InvalidValue { key: &'static str, value: String },

    #[error("no configuration files found in {0}")]
    NoConfigFiles(PathBuf),

    #[error("reading {path}: {source}")]
    Dotenv {
        path: PathBuf,
        #[source]
        source: dotenvy::Error,
    },
}

/// Deployment environment, selecting the `.env.<env>` overlay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Env {
    #[default]
    Dev,
    Prod,
    Qa,
    Test,
}

impl Env {
    pub fn as_str(&self) -> &'static str {
        match self {
            Env::Dev => "dev",
            Env::Prod => "prod",
            Env::Qa => "qa",
            Env::Test => "test",
        }
    }
}

impl FromStr for Env {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        if lower.starts_with("prod") {
            Ok(Env::Prod)
        } else if lower.starts_with("dev") {
            Ok(Env::Dev)
        } else if lower.starts_with("qa") {
            Ok(Env::Qa)
        } else if lower.starts_with("test") {
            Ok(Env::Test)
        } else {
            Err(ConfigError::InvalidEnv(s.to_string()))
        }
    }
}

impl fmt::Display for Env {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Storage backend kinds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StorageType {
    #[default]
    Fs,
    Http,
    BoltDb,
    Badger,
    Sqlite,
}

impl StorageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageType::Fs => "fs",
            StorageType::Http => "http",
            StorageType::BoltDb => "boltdb",
            StorageType::Badger => "badger",
            StorageType::Sqlite => "sqlite",
        }
    }
}

impl FromStr for StorageType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fs" => Ok(StorageType::Fs),
            "http" | "https" => Ok(StorageType::Http),
            "boltdb" | "bolt" => Ok(StorageType::BoltDb),
            "badger" => Ok(StorageType::Badger),
            "sqlite" => Ok(StorageType::Sqlite),
            _ => Err(ConfigError::UnknownStorage(s.to_string())),
        }
    }
}

impl fmt::Display for StorageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One storage descriptor: backend kind plus its base path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    pub kind: StorageType,
    pub path: PathBuf,
}

impl StorageConfig {
    /// The directory holding data for `host` in environment `env`.
    ///
    /// FedBOX lays storage out as `<path>/<type>/<env>/<host>`; when
    /// that directory does not exist the base path is used as is.
    pub fn base_path(&self, env: Env, host: Option<&str>) -> PathBuf {
        let mut scoped = self.path.join(self.kind.as_str()).join(env.as_str());
        if let Some(host) = host {
            scoped = scoped.join(host);
        }
        if scoped.is_dir() {
            scoped
        } else {
            self.path.clone()
        }
    }
}

/// Engine limits shared by the collector, the sync scopes and the
/// backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub max_items: usize,
    pub page_size: usize,
    pub sync_timeout: Duration,
    pub http_timeout: Duration,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_items: DEFAULT_MAX_ITEMS,
            page_size: DEFAULT_PAGE_SIZE,
            sync_timeout: DEFAULT_SYNC_TIMEOUT,
            http_timeout: DEFAULT_HTTP_TIMEOUT,
        }
    }
}

/// Everything needed to start a browsing session.
#[derive(Debug, Clone, PartialEq)]
pub struct Options {
    pub env: Env,
    pub log_level: Level,
    pub urls: Vec<String>,
    pub storage: Vec<StorageConfig>,
    pub limits: Limits,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            env: Env::Dev,
            log_level: Level::INFO,
            urls: Vec::new(),
            storage: Vec::new(),
            limits: Limits::default(),
        }
    }
}

/// Key lookup over env-file values layered above the process
/// environment.
struct Lookup {
    files: HashMap<String, String>,
}

impl Lookup {
    // Un-prefixed keys are read from env files only.
    fn get(&self, key: &str) -> Option<String> {
        let prefixed = format!("{}_{}", KEY_PREFIX, key);
        self.files
            .get(&prefixed)
            .cloned()
            .or_else(|| std::env::var(&prefixed).ok())
            .or_else(|| self.files.get(key).cloned())
            .filter(|v| !v.trim().is_empty())
    }

    fn parse<T: FromStr>(&self, key: &'static str) -> Result<Option<T>, ConfigError> {
        match self.get(key) {
            Some(value) => value
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| ConfigError::InvalidValue { key, value }),
            None => Ok(None),
        }
    }
}

fn read_env_file(path: &Path, into: &mut HashMap<String, String>) -> Result<bool, ConfigError> {
    if !path.is_file() {
        return Ok(false);
    }
    let iter = dotenvy::from_path_iter(path).map_err(|source| ConfigError::Dotenv {
        path: path.to_path_buf(),
        source,
    })?;
    for entry in iter {
        let (key, value) = entry.map_err(|source| ConfigError::Dotenv {
            path: path.to_path_buf(),
            source,
        })?;
        into.insert(key, value);
    }
    Ok(true)
}

pub fn parse_log_level(s: &str) -> Result<Level, ConfigError> {
    match s.trim().to_ascii_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" | "warning" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => Err(ConfigError::InvalidValue {
            key: KEY_LOG_LEVEL,
            value: s.to_string(),
        }),
    }
}

/// Load options from the env files found in `dir`.
///
/// `env` selects the overlay file; when absent, the `ENV` key from
/// `.env` (or the process environment) decides, defaulting to dev.
pub fn load_from_env(dir: &Path, env: Option<Env>) -> Result<Options, ConfigError> {
    let mut files = HashMap::new();
    let mut found = read_env_file(&dir.join(".env"), &mut files)?;

    let base = Lookup {
        files: files.clone(),
    };
    let env = match env {
        Some(env) => env,
        None => base.parse::<Env>(KEY_ENV)?.unwrap_or_default(),
    };
    found |= read_env_file(&dir.join(format!(".env.{}", env)), &mut files)?;
    if !found {
        return Err(ConfigError::NoConfigFiles(dir.to_path_buf()));
    }
    let lookup = Lookup { files };

    let log_level = match lookup.get(KEY_LOG_LEVEL) {
        Some(level) => parse_log_level(&level)?,
        None => Level::INFO,
    };

    let mut urls = Vec::new();
    if let Some(host) = lookup.get(KEY_HOSTNAME) {
        let host = host.trim().trim_end_matches('/');
        if host.contains("://") {
            urls.push(host.to_string());
        } else {
            urls.push(format!("https://{}", host));
        }
    }

    let kind = lookup
        .parse::<StorageType>(KEY_STORAGE)?
        .unwrap_or_default();
    let path = lookup
        .get(KEY_STORAGE_PATH)
        .map(PathBuf::from)
        .unwrap_or_else(|| dir.to_path_buf());

    let defaults = Limits::default();
    let limits = Limits {
        max_items: lookup
            .parse(KEY_MAX_ITEMS)?
            .unwrap_or(defaults.max_items),
        page_size: lookup
            .parse(KEY_PAGE_SIZE)?
            .unwrap_or(defaults.page_size),
        sync_timeout: lookup
            .parse(KEY_SYNC_TIMEOUT_MS)?
            .map_or(defaults.sync_timeout, Duration::from_millis),
        http_timeout: lookup
            .parse(KEY_HTTP_TIMEOUT_MS)?
            .map_or(defaults.http_timeout, Duration::from_millis),
    };

    Ok(Options {
        env,
        log_level,
        urls,
        storage: vec![StorageConfig { kind, path }],
        limits,
    })
}
