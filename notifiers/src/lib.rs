//! Out-of-core notification sinks (§1, "Explicitly OUT of scope"; §6,
//! "Notification sinks"): thin adapters implementing [`alert_engine::Sink`]
//! for the three delivery mechanisms the original `runner.py` wires up.

pub mod log_sink;
pub mod mail;
pub mod severity;
pub mod webhook;

pub use log_sink::LogSink;
pub use mail::MailSink;
pub use severity::Severity;
pub use webhook::WebhookSink;
