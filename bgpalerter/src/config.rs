//! The YAML configuration document (§6, "Configuration keys"), plus the
//! notification-routing keys the original `runner.py` reads
//! (`slack-web-hook`, `sender-notifications-email`, `notified-emails`) that
//! select which notifier adapters get wired up (SPEC_FULL.md, "Supplemented
//! features").

use ipnet::IpNet;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read { path: String, source: std::io::Error },
    #[error("failed to parse config file {path}: {source}")]
    Parse { path: String, source: serde_yaml::Error },
}

fn default_repeat_alert_after_seconds() -> u64 {
    10
}

fn default_reset_after_seconds() -> u64 {
    600
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(rename = "websocket-data-service")]
    pub websocket_data_service: String,

    #[serde(rename = "proxy-host")]
    pub proxy_host: Option<String>,
    #[serde(rename = "proxy-port")]
    pub proxy_port: Option<u16>,

    #[serde(rename = "monitored-prefixes-files")]
    pub monitored_prefixes_files: Vec<String>,

    #[serde(rename = "number-peers-before-hijack-alert", default)]
    pub number_peers_before_hijack_alert: usize,
    #[serde(rename = "number-peers-before-low-visibility-alert", default)]
    pub number_peers_before_low_visibility_alert: usize,
    #[serde(rename = "repeat-alert-after-seconds", default = "default_repeat_alert_after_seconds")]
    pub repeat_alert_after_seconds: u64,
    #[serde(rename = "reset-after-seconds", default = "default_reset_after_seconds")]
    pub reset_after_seconds: u64,
    #[serde(rename = "repeat-status-heartbeat-after-seconds", default)]
    pub repeat_status_heartbeat_after_seconds: u64,

    #[serde(rename = "permitted-more-specific-announcements", default)]
    pub permitted_more_specific_announcements: HashMap<u32, Vec<IpNet>>,

    #[serde(rename = "slack-web-hook")]
    pub slack_web_hook: Option<String>,
    #[serde(rename = "sender-notifications-email")]
    pub sender_notifications_email: Option<String>,
    #[serde(rename = "notified-emails", default)]
    pub notified_emails: Vec<String>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }
}
