//! The Alert Engine (§4.2): aggregates classified feed events into hijack and
//! low-visibility incidents, evaluates them against configured thresholds on a
//! timer, and fans out rendered alert messages to registered sinks.

pub mod actor;
pub mod engine;
pub mod incident;
pub mod sink;

pub use engine::{AlertEngine, EngineConfig, IncidentKey};
pub use incident::{HijackIncident, PeerList, VisibilityRecord};
pub use sink::{EngineError, EventKind, Sink};
