// File: ./src/logging.rs
//! Process-wide logger setup.
//!
//! The library only talks to the `log` facade. Binaries call [`init_logging`]
//! once to route records to stderr and to an append-only file in the data
//! directory.
use crate::context::AppContext;
use log::LevelFilter;
use once_cell::sync::OnceCell;
use simplelog::{
    ColorChoice, CombinedLogger, ConfigBuilder, SharedLogger, TermLogger, TerminalMode,
    WriteLogger,
};
use std::fs::OpenOptions;

static LOGGER_LEVEL: OnceCell<LevelFilter> = OnceCell::new();

pub fn default_level() -> LevelFilter {
    if cfg!(debug_assertions) {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    }
}

pub fn parse_level(level: &str) -> Result<LevelFilter, String> {
    match level.trim().to_ascii_lowercase().as_str() {
        "off" => Ok(LevelFilter::Off),
        "trace" => Ok(LevelFilter::Trace),
        "debug" => Ok(LevelFilter::Debug),
        "info" => Ok(LevelFilter::Info),
        "warn" | "warning" => Ok(LevelFilter::Warn),
        "error" => Ok(LevelFilter::Error),
        other => Err(format!(
            "unsupported log level `{other}`; expected off|trace|debug|info|warn|error"
        )),
    }
}

/// Parses a configured level, falling back to [`default_level`] with a note on
/// stderr when the value is not recognised.
pub fn level_or_default(level: &str) -> LevelFilter {
    parse_level(level).unwrap_or_else(|e| {
        let fallback = default_level();
        eprintln!("{}; using `{}`", e, fallback);
        fallback
    })
}

/// Installs the global logger. Repeated calls are no-ops and return the level
/// chosen by the first call. Never panics: if the log file cannot be opened,
/// logging continues on stderr only.
pub fn init_logging(ctx: &dyn AppContext, level: LevelFilter) -> LevelFilter {
    let active = LOGGER_LEVEL.get_or_init(|| {
        let config = ConfigBuilder::new()
            .add_filter_allow_str("invahelp")
            .build();

        let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
            level,
            config.clone(),
            TerminalMode::Stderr,
            ColorChoice::Auto,
        )];

        if let Some(path) = ctx.get_log_path() {
            match OpenOptions::new().create(true).append(true).open(&path) {
                Ok(file) => loggers.push(WriteLogger::new(level, config, file)),
                Err(e) => eprintln!("Could not open log file {:?}: {}", path, e),
            }
        }

        if let Err(e) = CombinedLogger::init(loggers) {
            // Another logger was installed by the embedding application.
            eprintln!("Logger already set: {}", e);
        }
        level
    });
    *active
}
