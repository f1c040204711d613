//! `send_to_log` (`runner.py`): forward an already-rendered alert message to
//! the structured logger at a fixed level per registration site (`hijack` at
//! `warn`, `low-visibility` at `warn`, `error` at `error`, per `runner.py`'s
//! `partial(send_to_log, log_method=...)` wiring).

use alert_engine::Sink;
use slog::{Level, Logger};

pub struct LogSink {
    log: Logger,
    level: Level,
}

impl LogSink {
    pub fn new(log: Logger, level: Level) -> Self {
        Self { log, level }
    }
}

impl Sink for LogSink {
    fn deliver(&self, message: &str) {
        slog::log!(self.log, self.level, "{}", message);
    }
}
