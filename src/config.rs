//! Application configuration.
//!
//! Precedence: CLI > env > config file > defaults. The first config file found
//! among `--config`, `$PLP_BOOKSTORE_CONFIG`, `<config dir>/plp-bookstore.toml` and
//! `./plp-bookstore.toml` is used.

use crate::errors::DbError;
use crate::query::MAX_LIMIT;
use crate::runner::QuerySettings;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "plp-bookstore.toml";
pub const ENV_CONFIG: &str = "PLP_BOOKSTORE_CONFIG";
pub const ENV_URI: &str = "PLP_BOOKSTORE_URI";
pub const ENV_DB: &str = "PLP_BOOKSTORE_DB";
pub const ENV_COLLECTION: &str = "PLP_BOOKSTORE_COLLECTION";
pub const ENV_SEED: &str = "PLP_BOOKSTORE_SEED";
pub const ENV_LOG_DIR: &str = "PLP_BOOKSTORE_LOG_DIR";
pub const ENV_LOG_LEVEL: &str = "PLP_BOOKSTORE_LOG_LEVEL";
pub const ENV_LOG_RETENTION: &str = "PLP_BOOKSTORE_LOG_RETENTION";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub dir: PathBuf,
    pub level: String,
    /// Rolled files kept per appender.
    pub retention: u32,
    pub console: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self { dir: PathBuf::from("logs"), level: "info".into(), retention: 5, console: true }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub uri: String,
    pub database: String,
    pub collection: String,
    /// Loaded into the collection before the run when it is empty.
    pub seed_file: Option<PathBuf>,
    pub log: LogConfig,
    pub queries: QuerySettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            uri: "file://./data".into(),
            database: "plp_bookstore".into(),
            collection: "books".into(),
            seed_file: None,
            log: LogConfig::default(),
            queries: QuerySettings::default(),
        }
    }
}

/// Values given on the command line; `None` leaves the lower layers alone.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub uri: Option<String>,
    pub database: Option<String>,
    pub collection: Option<String>,
    pub seed_file: Option<PathBuf>,
    pub log_dir: Option<PathBuf>,
    pub log_level: Option<String>,
}

impl AppConfig {
    /// # Errors
    /// Returns `Config` when the file is unreadable or not valid TOML for this schema.
    pub fn from_file(path: &Path) -> Result<Self, DbError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| DbError::Config(format!("{}: {e}", path.display())))?;
        toml::from_str(&text).map_err(|e| DbError::Config(format!("{}: {e}", path.display())))
    }

    /// Applies environment overrides read through `lookup`.
    ///
    /// # Errors
    /// Returns `Config` for unparsable values.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), DbError> {
        if let Some(v) = lookup(ENV_URI) {
            self.uri = v;
        }
        if let Some(v) = lookup(ENV_DB) {
            self.database = v;
        }
        if let Some(v) = lookup(ENV_COLLECTION) {
            self.collection = v;
        }
        if let Some(v) = lookup(ENV_SEED) {
            self.seed_file = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup(ENV_LOG_DIR) {
            self.log.dir = PathBuf::from(v);
        }
        if let Some(v) = lookup(ENV_LOG_LEVEL) {
            self.log.level = v;
        }
        if let Some(v) = lookup(ENV_LOG_RETENTION) {
            self.log.retention = v
                .trim()
                .parse()
                .map_err(|_| DbError::Config(format!("{ENV_LOG_RETENTION}: not a number: {v}")))?;
        }
        Ok(())
    }

    pub fn apply_cli(&mut self, cli: CliOverrides) {
        if let Some(v) = cli.uri {
            self.uri = v;
        }
        if let Some(v) = cli.database {
            self.database = v;
        }
        if let Some(v) = cli.collection {
            self.collection = v;
        }
        if let Some(v) = cli.seed_file {
            self.seed_file = Some(v);
        }
        if let Some(v) = cli.log_dir {
            self.log.dir = v;
        }
        if let Some(v) = cli.log_level {
            self.log.level = v;
        }
    }

    /// # Errors
    /// Returns `Config` for empty names or an unknown log level.
    pub fn validate(&self) -> Result<(), DbError> {
        if self.database.trim().is_empty() {
            return Err(DbError::Config("database name is empty".into()));
        }
        if self.collection.trim().is_empty() {
            return Err(DbError::Config("collection name is empty".into()));
        }
        if self.log.level.parse::<log::LevelFilter>().is_err() {
            return Err(DbError::Config(format!("unknown log level {}", self.log.level)));
        }
        if self.queries.page == 0 {
            return Err(DbError::Config("queries.page is 1-based".into()));
        }
        if !(1..=MAX_LIMIT).contains(&self.queries.page_size) {
            return Err(DbError::Config(format!(
                "queries.page_size must be between 1 and {MAX_LIMIT}, got {}",
                self.queries.page_size
            )));
        }
        Ok(())
    }
}

/// Candidate config files in lookup order.
#[must_use]
pub fn config_paths(cli_cfg: Option<&Path>) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Some(p) = cli_cfg {
        paths.push(p.to_path_buf());
    }
    if let Ok(p) = std::env::var(ENV_CONFIG) {
        paths.push(PathBuf::from(p));
    }
    if let Some(dir) = dirs_next::config_dir() {
        paths.push(dir.join(CONFIG_FILE_NAME));
    }
    if let Ok(cur) = std::env::current_dir() {
        paths.push(cur.join(CONFIG_FILE_NAME));
    }
    paths
}

/// Builds the effective configuration.
///
/// # Errors
/// Returns `Config` if an explicit `--config` file is missing, a file does not parse,
/// or the result fails validation.
pub fn load_config(cli_cfg: Option<&Path>, cli: CliOverrides) -> Result<AppConfig, DbError> {
    if let Some(p) = cli_cfg
        && !p.exists()
    {
        return Err(DbError::Config(format!("config file not found: {}", p.display())));
    }
    let mut cfg = match config_paths(cli_cfg).into_iter().find(|p| p.is_file()) {
        Some(p) => {
            log::debug!("using config file {}", p.display());
            AppConfig::from_file(&p)?
        }
        None => AppConfig::default(),
    };
    cfg.apply_env(|k| std::env::var(k).ok())?;
    cfg.apply_cli(cli);
    cfg.validate()?;
    Ok(cfg)
}
