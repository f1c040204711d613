//! The IP-network value type and the prefix watch-list index.
//!
//! This is the leaf crate in the dependency order: the classifier and feed client
//! build on top of it, nothing here depends on them.

use ipnet::IpNet;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single watch-list entry. Immutable once built into a [`PrefixIndex`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitoredPrefix {
    pub prefix: IpNet,
    pub origin_as: u32,
    pub description: Option<String>,
    pub monitor_more_specific: bool,
}

impl MonitoredPrefix {
    pub fn new(prefix: IpNet, origin_as: u32) -> Self {
        Self {
            prefix,
            origin_as,
            description: None,
            monitor_more_specific: false,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_monitor_more_specific(mut self, monitor_more_specific: bool) -> Self {
        self.monitor_more_specific = monitor_more_specific;
        self
    }
}

fn ip_version(net: &IpNet) -> u8 {
    match net {
        IpNet::V4(_) => 4,
        IpNet::V6(_) => 6,
    }
}

/// `prefix` is a strict subnet of `supernet`: `supernet` contains `prefix` and they
/// are not the same network. `IpNet::contains` already refuses to match across IP
/// versions, which is how version isolation falls out of this function for free.
fn is_strict_subnet_of(prefix: &IpNet, supernet: &IpNet) -> bool {
    supernet.contains(prefix) && supernet.prefix_len() < prefix.prefix_len()
}

/// Two ordered sequences of [`MonitoredPrefix`], partitioned by IP version.
///
/// Built once at startup from the watch-list and never mutated on the event path,
/// per the data model's invariant that lookups never cross IP versions.
#[derive(Debug, Clone, Default)]
pub struct PrefixIndex {
    v4: Vec<MonitoredPrefix>,
    v6: Vec<MonitoredPrefix>,
    v4_exact: HashMap<IpNet, usize>,
    v6_exact: HashMap<IpNet, usize>,
}

impl PrefixIndex {
    /// Build the index from a watch-list. Preserves the iteration order of
    /// `prefixes`, which is what determines tie-break order among overlapping
    /// more-specific matches. A duplicate `prefix` key keeps the first entry seen
    /// and drops the rest, since the watch-list is keyed uniquely by prefix.
    pub fn build(prefixes: impl IntoIterator<Item = MonitoredPrefix>) -> Self {
        let mut index = Self::default();
        for entry in prefixes {
            let (list, exact) = match ip_version(&entry.prefix) {
                4 => (&mut index.v4, &mut index.v4_exact),
                _ => (&mut index.v6, &mut index.v6_exact),
            };
            if exact.contains_key(&entry.prefix) {
                continue;
            }
            exact.insert(entry.prefix, list.len());
            list.push(entry);
        }
        index
    }

    fn slice_for(&self, prefix: &IpNet) -> (&[MonitoredPrefix], &HashMap<IpNet, usize>) {
        match ip_version(prefix) {
            4 => (&self.v4, &self.v4_exact),
            _ => (&self.v6, &self.v6_exact),
        }
    }

    /// Exact membership: is `prefix` itself a watched entry?
    pub fn exact(&self, prefix: &IpNet) -> Option<&MonitoredPrefix> {
        let (list, exact) = self.slice_for(prefix);
        exact.get(prefix).map(|&i| &list[i])
    }

    /// The longest watched supernet of `prefix` with `monitor_more_specific` set.
    /// Ties (equal prefix length) are broken by earliest insertion order.
    pub fn longest_monitored_supernet(&self, prefix: &IpNet) -> Option<&MonitoredPrefix> {
        let (list, _) = self.slice_for(prefix);
        list.iter()
            .filter(|entry| entry.monitor_more_specific && is_strict_subnet_of(prefix, &entry.prefix))
            .max_by_key(|entry| entry.prefix.prefix_len())
    }

    /// The watch-list entry a given observed `prefix` should be judged against:
    /// an exact match if one exists, otherwise the longest monitored supernet.
    pub fn matching_entry(&self, prefix: &IpNet) -> Option<&MonitoredPrefix> {
        self.exact(prefix).or_else(|| self.longest_monitored_supernet(prefix))
    }

    pub fn len(&self) -> usize {
        self.v4.len() + self.v6.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = &MonitoredPrefix> {
        self.v4.iter().chain(self.v6.iter())
    }
}
