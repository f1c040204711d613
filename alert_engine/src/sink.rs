//! The `on(event, callback)` registration surface (§4.2, "Sink registration"),
//! reimplemented as a capability: a sink is anything that can `deliver` a
//! rendered message, rather than a bare function pointer (§9 design notes,
//! "Callback fan-out → interface abstraction").

use std::fmt;
use thiserror::Error;

/// The five event names the engine recognizes. Registering on anything else is
/// an invalid-argument error (§4.2, §7.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Hijack,
    LowVisibility,
    Difference,
    Heartbeat,
    Error,
}

impl EventKind {
    pub const ALL: [EventKind; 5] = [
        EventKind::Hijack,
        EventKind::LowVisibility,
        EventKind::Difference,
        EventKind::Heartbeat,
        EventKind::Error,
    ];

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "hijack" => Some(EventKind::Hijack),
            "low-visibility" => Some(EventKind::LowVisibility),
            "difference" => Some(EventKind::Difference),
            "heartbeat" => Some(EventKind::Heartbeat),
            "error" => Some(EventKind::Error),
            _ => None,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EventKind::Hijack => "hijack",
            EventKind::LowVisibility => "low-visibility",
            EventKind::Difference => "difference",
            EventKind::Heartbeat => "heartbeat",
            EventKind::Error => "error",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("this is not a valid event: {0}")]
    InvalidEvent(String),
}

/// A notification destination. Implementations live in the `notifiers` crate;
/// the engine only ever sees this trait object, so a panicking or slow sink
/// cannot be named by the core (§7, propagation policy: "the core never raises
/// out of the hot path to its sinks").
pub trait Sink: Send + Sync {
    fn deliver(&self, message: &str);
}

/// Deliver `message` to every sink registered for `event`, in registration
/// order, isolating each call so one sink's panic doesn't stop the rest
/// (§7, propagation policy).
pub(crate) fn fan_out(sinks: &[Box<dyn Sink>], message: &str) {
    for sink in sinks {
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| sink.deliver(message)));
        if result.is_err() {
            // A sink panicked; the panic is already reported by the default hook.
            // Subsequent sinks for this event must still run.
            continue;
        }
    }
}
