//! Wire shapes for the upstream RIS-style streaming JSON channel (§4.1).

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub struct SubscribeFrame {
    #[serde(rename = "type")]
    pub frame_type: &'static str,
    pub data: SubscribeData,
}

#[derive(Debug, Serialize)]
pub struct SubscribeData {
    pub prefix: String,
    #[serde(rename = "moreSpecific")]
    pub more_specific: bool,
    #[serde(rename = "type")]
    pub update_type: &'static str,
    #[serde(rename = "socketOptions")]
    pub socket_options: SocketOptions,
}

#[derive(Debug, Serialize)]
pub struct SocketOptions {
    #[serde(rename = "includeRaw")]
    pub include_raw: bool,
}

/// A `ris_subscribe` frame for one monitored prefix, per §4.1's exact shape.
pub fn subscribe_frame(prefix: &str) -> SubscribeFrame {
    SubscribeFrame {
        frame_type: "ris_subscribe",
        data: SubscribeData {
            prefix: prefix.to_string(),
            more_specific: true,
            update_type: "UPDATE",
            socket_options: SocketOptions { include_raw: false },
        },
    }
}

#[derive(Debug, Serialize)]
pub struct PingFrame {
    #[serde(rename = "type")]
    pub frame_type: &'static str,
}

pub const PING_FRAME: PingFrame = PingFrame { frame_type: "ping" };

/// The envelope every inbound frame is decoded into, before dispatch on `frame_type`.
#[derive(Debug, Deserialize)]
pub struct InboundFrame {
    #[serde(rename = "type")]
    pub frame_type: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

/// `data` of a `ris_message` frame.
#[derive(Debug, Deserialize)]
pub struct RisMessageData {
    pub peer: String,
    #[serde(default)]
    pub path: Vec<u32>,
    #[serde(default)]
    pub announcements: Vec<AnnouncementGroup>,
    #[serde(default)]
    pub withdrawals: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct AnnouncementGroup {
    pub next_hop: String,
    #[serde(default)]
    pub prefixes: Vec<String>,
}

/// A prefix marker used only to recognize the pong-but-not-quite-JSON quirk
/// before a full parse is attempted (see [`crate::client::looks_like_pong`]).
pub const PONG_QUIRK_PREFIX: &str = r#"{"type": "pong","#;
