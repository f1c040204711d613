//! The typed events the Feed Client emits to the Alert Engine (§4.1, "Emitted
//! events and their payload shapes").

use ipnet::IpNet;

#[derive(Debug, Clone, PartialEq)]
pub struct PrefixOrigin {
    pub prefix: IpNet,
    pub origin_as: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HijackEvent {
    pub expected: PrefixOrigin,
    pub altered: PrefixOrigin,
    pub description: Option<String>,
    pub peer: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DifferenceEvent {
    pub expected_prefix: IpNet,
    pub altered_prefix: IpNet,
    pub origin_as: u32,
    pub description: Option<String>,
    pub peer: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WithdrawalEvent {
    pub prefix: IpNet,
    pub peer: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnnouncementEvent {
    pub prefix: IpNet,
    pub peer: String,
    pub path: Vec<u32>,
    pub next_hop: String,
}

#[derive(Debug, Clone)]
pub enum FeedEvent {
    Hijack(HijackEvent),
    Difference(DifferenceEvent),
    Withdrawal(WithdrawalEvent),
    Announcement(AnnouncementEvent),
    /// The raw `ris_error` frame, forwarded verbatim.
    Error(serde_json::Value),
}
