//! The Feed Client (§4.1): subscribes to the upstream RIS-style streaming feed,
//! classifies inbound updates against a prefix watch-list, and emits typed
//! [`event::FeedEvent`]s for the Alert Engine to aggregate.

pub mod classifier;
pub mod client;
pub mod error;
pub mod event;
pub mod messages;

pub use client::{FeedClient, ProxyConfig, EX_TEMPFAIL};
pub use error::ClientError;
pub use event::FeedEvent;
