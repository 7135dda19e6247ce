//! log4rs setup: rolling files under the log directory plus warnings on stderr.
//!
//! | file          | targets                      |
//! |---------------|------------------------------|
//! | `app.log`     | everything not routed below  |
//! | `queries.log` | `plp_bookstore::queries`     |
//! | `audit.log`   | `plp_bookstore::audit`       |
//! | `dev.log`     | `plp_bookstore::dev` (opt-in)|

use crate::config::LogConfig;
use crate::errors::DbError;
use log::LevelFilter;
use log4rs::append::console::{ConsoleAppender, Target};
use log4rs::append::rolling_file::RollingFileAppender;
use log4rs::append::rolling_file::policy::compound::{
    CompoundPolicy, roll::fixed_window::FixedWindowRoller, trigger::size::SizeTrigger,
};
use log4rs::config::{Appender, Config, Logger, Root};
use log4rs::encode::pattern::PatternEncoder;
use log4rs::filter::threshold::ThresholdFilter;
use std::path::Path;
use std::sync::OnceLock;

const PATTERN: &str = "{d(%Y-%m-%d %H:%M:%S%.3f)} [{l}] {t} - {m}{n}";
const ROLL_SIZE: u64 = 10 * 1024 * 1024;

static HANDLE: OnceLock<log4rs::Handle> = OnceLock::new();

fn rolling(base: &Path, stem: &str, keep: u32) -> Result<RollingFileAppender, DbError> {
    let pattern = base.join(format!("{stem}.{{}}.log"));
    let roller = FixedWindowRoller::builder()
        .build(&pattern.display().to_string(), keep)
        .map_err(|e| DbError::Logging(e.to_string()))?;
    let policy = CompoundPolicy::new(Box::new(SizeTrigger::new(ROLL_SIZE)), Box::new(roller));
    RollingFileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(PATTERN)))
        .build(base.join(format!("{stem}.log")), Box::new(policy))
        .map_err(|e| DbError::Logging(e.to_string()))
}

/// Parses `error|warn|info|debug|trace|off`; anything else is a `Config` error.
///
/// # Errors
/// Returns `Config` for unknown level names.
pub fn parse_level(level: &str) -> Result<LevelFilter, DbError> {
    level
        .trim()
        .parse::<LevelFilter>()
        .map_err(|_| DbError::Config(format!("unknown log level {level}")))
}

/// Builds the log4rs configuration without installing it.
///
/// # Errors
/// Returns `Logging` if the directory or an appender cannot be created.
pub fn build_config(cfg: &LogConfig, dev_log: bool) -> Result<Config, DbError> {
    let lvl = parse_level(&cfg.level)?;
    std::fs::create_dir_all(&cfg.dir).map_err(|e| DbError::Logging(e.to_string()))?;
    let keep = cfg.retention.max(1);

    let mut builder = Config::builder()
        .appender(Appender::builder().build("app", Box::new(rolling(&cfg.dir, "app", keep)?)))
        .appender(
            Appender::builder().build("queries", Box::new(rolling(&cfg.dir, "queries", keep)?)),
        )
        .appender(Appender::builder().build("audit", Box::new(rolling(&cfg.dir, "audit", keep)?)))
        .logger(Logger::builder().appender("audit").additive(false).build("plp_bookstore::audit", lvl))
        .logger(Logger::builder().appender("queries").build("plp_bookstore::queries", lvl));

    let mut root = Root::builder().appender("app");
    if cfg.console {
        let console = ConsoleAppender::builder()
            .target(Target::Stderr)
            .encoder(Box::new(PatternEncoder::new("[{l}] {m}{n}")))
            .build();
        builder = builder.appender(
            Appender::builder()
                .filter(Box::new(ThresholdFilter::new(LevelFilter::Warn)))
                .build("console", Box::new(console)),
        );
        root = root.appender("console");
    }

    builder = if dev_log {
        builder
            .appender(Appender::builder().build("dev", Box::new(rolling(&cfg.dir, "dev", keep)?)))
            .logger(
                Logger::builder()
                    .appender("dev")
                    .additive(false)
                    .build(crate::utils::devlog::DEV_TARGET, LevelFilter::Trace),
            )
    } else {
        builder.logger(
            Logger::builder().additive(false).build(crate::utils::devlog::DEV_TARGET, LevelFilter::Off),
        )
    };

    builder.build(root.build(lvl)).map_err(|e| DbError::Logging(e.to_string()))
}

/// Installs (or replaces) the process-wide logging configuration.
///
/// # Errors
/// Returns `Logging` if the configuration cannot be built or another logger is installed.
pub fn configure_logging(cfg: &LogConfig, dev_log: bool) -> Result<(), DbError> {
    let config = build_config(cfg, dev_log)?;
    if let Some(handle) = HANDLE.get() {
        handle.set_config(config);
        return Ok(());
    }
    let handle = log4rs::init_config(config).map_err(|e| DbError::Logging(e.to_string()))?;
    let _ = HANDLE.set(handle);
    log::debug!("logging to {} at {}", cfg.dir.display(), cfg.level);
    Ok(())
}

/// `PLP_BOOKSTORE_DEV_LOG=1|true|yes` routes developer trace lines to `dev.log`.
#[must_use]
pub fn dev_log_from_env() -> bool {
    std::env::var("PLP_BOOKSTORE_DEV_LOG")
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}
