//! Watch-list file loading (§6, "Watch-list file(s)"): one or more YAML
//! files, each a mapping of CIDR to `{ base_asn, description?, ignore_morespec? }`,
//! merged into the [`net_prefix::MonitoredPrefix`] list the core indexes.

use net_prefix::MonitoredPrefix;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WatchlistError {
    #[error("failed to read watch-list file {path}: {source}")]
    Read { path: String, source: std::io::Error },
    #[error("failed to parse watch-list file {path}: {source}")]
    Parse { path: String, source: serde_yaml::Error },
    #[error("invalid prefix {prefix:?} in {path}: {source}")]
    InvalidPrefix {
        path: String,
        prefix: String,
        source: ipnet::AddrParseError,
    },
}

#[derive(Debug, Deserialize)]
struct WatchlistEntry {
    base_asn: u32,
    description: Option<String>,
    #[serde(default)]
    ignore_morespec: bool,
}

/// Load and merge every file in `paths`, in order. A prefix repeated across
/// files keeps the first file's entry, consistent with `net_prefix::PrefixIndex`
/// keeping the first of a duplicate `prefix` seen during `build`.
pub fn load(paths: &[String]) -> Result<Vec<MonitoredPrefix>, WatchlistError> {
    let mut monitored = Vec::new();
    let mut seen = std::collections::HashSet::new();

    for path in paths {
        let raw = std::fs::read_to_string(path).map_err(|source| WatchlistError::Read {
            path: path.clone(),
            source,
        })?;
        let entries: HashMap<String, WatchlistEntry> =
            serde_yaml::from_str(&raw).map_err(|source| WatchlistError::Parse {
                path: path.clone(),
                source,
            })?;

        for (prefix_str, entry) in entries {
            if !seen.insert(prefix_str.clone()) {
                continue;
            }
            let prefix = prefix_str.parse().map_err(|source| WatchlistError::InvalidPrefix {
                path: path.clone(),
                prefix: prefix_str.clone(),
                source,
            })?;
            let mut monitored_prefix = MonitoredPrefix::new(prefix, entry.base_asn)
                .with_monitor_more_specific(!entry.ignore_morespec);
            if let Some(description) = entry.description {
                monitored_prefix = monitored_prefix.with_description(description);
            }
            monitored.push(monitored_prefix);
        }
    }

    Ok(monitored)
}
