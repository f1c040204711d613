//! Aggregate state the evaluator reasons over (§3, `HijackIncident` /
//! `VisibilityRecord`).

use ipnet::IpNet;
use ris_feed::event::PrefixOrigin;
use std::collections::HashMap;

/// An insertion-ordered set of peer IDs. The original source guards a plain list
/// with a membership test; §9's design notes call for the equivalent
/// insertion-ordered-unique structure so the verbose alert message's peer
/// ordering is deterministic under test (§8 property 6).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PeerList(Vec<String>);

impl PeerList {
    pub fn single(peer: String) -> Self {
        Self(vec![peer])
    }

    /// Append `peer` only if it isn't already present.
    pub fn insert(&mut self, peer: String) {
        if !self.0.contains(&peer) {
            self.0.push(peer);
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

/// Aggregate state for one hijack candidate, keyed by the 4-tuple described in
/// §3.
#[derive(Debug, Clone)]
pub struct HijackIncident {
    pub expected: PrefixOrigin,
    pub altered: PrefixOrigin,
    pub description: Option<String>,
    pub peers: PeerList,
}

/// The 4-tuple identity key for a [`HijackIncident`], rendered the way the
/// original formats it: `"{expected}-{altered}-{expected_as}-{altered_as}"`.
pub fn hijack_key(expected: &PrefixOrigin, altered: &PrefixOrigin) -> String {
    format!(
        "{}-{}-{}-{}",
        expected.prefix, altered.prefix, expected.origin_as, altered.origin_as
    )
}

/// Aggregate state for the withdrawal/announcement balance of one watched
/// prefix: the latest `withdrawn` flag reported by each peer (§3).
#[derive(Debug, Clone, Default)]
pub struct VisibilityRecord {
    pub peers: HashMap<String, bool>,
}

impl VisibilityRecord {
    /// Peers whose latest report was a withdrawal.
    pub fn withdrawn_count(&self) -> usize {
        self.peers.values().filter(|&&withdrawn| withdrawn).count()
    }

    /// Peer IDs in the order they were first seen is not preserved by a
    /// `HashMap`; callers that need a deterministic peer list for the alert
    /// message should sort the returned keys themselves, matching the
    /// original's `list(value.keys())` (dict insertion order in the reference
    /// implementation is not an ordering guarantee this port needs to match
    /// bit-for-bit, only the *count* and *flip* semantics in §8 property 10).
    pub fn withdrawn_peers(&self) -> Vec<String> {
        let mut peers: Vec<String> = self
            .peers
            .iter()
            .filter(|(_, &withdrawn)| withdrawn)
            .map(|(peer, _)| peer.clone())
            .collect();
        peers.sort();
        peers
    }
}

pub type VisibilityMap = HashMap<IpNet, VisibilityRecord>;
pub type HijackMap = HashMap<String, HijackIncident>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peer_list_deduplicates_preserving_order() {
        let mut peers = PeerList::single("p1".to_string());
        peers.insert("p1".to_string());
        peers.insert("p2".to_string());
        peers.insert("p3".to_string());
        assert_eq!(peers.as_slice(), &["p1".to_string(), "p2".to_string(), "p3".to_string()]);
    }

    #[test]
    fn visibility_flip_leaves_peer_not_withdrawn() {
        let mut record = VisibilityRecord::default();
        record.peers.insert("A".to_string(), true);
        record.peers.insert("A".to_string(), false);
        assert_eq!(record.withdrawn_count(), 0);
        assert_eq!(record.peers.get("A"), Some(&false));
    }
}
