//! Builds the root [`slog::Logger`] for `bgpalerter`.
//!
//! Two drains are supported, matching the `--log-format` CLI flag: a human-readable
//! terminal drain (colored when stderr is a tty) and a newline-delimited JSON drain
//! for log shippers. Both are wrapped in `slog_async` so a slow sink (e.g. disk
//! contention) never blocks the event-dispatch thread.

use slog::{Drain, Level, Logger};
use sloggers::types::Severity;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Plain,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "plain" => Ok(LogFormat::Plain),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format: {other}")),
        }
    }
}

/// Parse one of the level names the CLI accepts (`info`, `debug`, `trace`, `warn`,
/// `error`, `crit`) into a [`slog::Level`].
pub fn parse_level(level: &str) -> Result<Level, String> {
    Level::from_str(&level.to_ascii_lowercase()).map_err(|_| format!("unknown log level: {level}"))
}

/// Build the root logger. `level` gates what gets through to the drain; the drain
/// itself never filters.
pub fn root_logger(level: Level, format: LogFormat) -> Logger {
    match format {
        LogFormat::Plain => {
            let decorator = slog_term::TermDecorator::new().build();
            let drain = slog_term::FullFormat::new(decorator).build().fuse();
            let drain = slog::LevelFilter::new(drain, level).fuse();
            let drain = slog_async::Async::new(drain).build().fuse();
            Logger::root(drain, slog::o!())
        }
        LogFormat::Json => {
            let drain = slog_json::Json::new(std::io::stdout())
                .add_default_keys()
                .build()
                .fuse();
            let drain = slog::LevelFilter::new(drain, level).fuse();
            let drain = slog_async::Async::new(drain).build().fuse();
            Logger::root(drain, slog::o!())
        }
    }
}

/// A logger that drops everything, for library code under test that doesn't care
/// about log output.
pub fn test_logger() -> Logger {
    if cfg!(feature = "test_logger") {
        let decorator = slog_term::TermDecorator::new().build();
        let drain = slog_term::FullFormat::new(decorator).build().fuse();
        let drain = slog::LevelFilter::new(drain, Level::Trace).fuse();
        Logger::root(drain.fuse(), slog::o!())
    } else {
        Logger::root(slog::Discard, slog::o!())
    }
}

/// Map a [`sloggers::types::Severity`] (used when building file drains through
/// `sloggers`) to the equivalent [`slog::Level`].
pub fn severity_to_level(severity: Severity) -> Level {
    match severity {
        Severity::Trace => Level::Trace,
        Severity::Debug => Level::Debug,
        Severity::Info => Level::Info,
        Severity::Warning => Level::Warning,
        Severity::Error => Level::Error,
        Severity::Critical => Level::Critical,
    }
}
