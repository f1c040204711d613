//! Pure classification: turn one decoded `ris_message` into zero or more
//! [`FeedEvent`]s, given an immutable [`PrefixIndex`] snapshot (§4.1, "Unpacking of
//! `ris_message`" and "Classification rules").
//!
//! Nothing in this module touches the network; re-feeding the same
//! [`RisMessageData`] through [`classify_frame`] with the same index always
//! produces the same events (§8 property 1, classification purity).

use crate::event::{AnnouncementEvent, DifferenceEvent, FeedEvent, HijackEvent, PrefixOrigin, WithdrawalEvent};
use crate::messages::RisMessageData;
use ipnet::IpNet;
use net_prefix::PrefixIndex;
use slog::debug;

enum NormalizedItem {
    Announcement {
        prefix: String,
        peer: String,
        path: Vec<u32>,
        next_hop: String,
    },
    Withdrawal {
        prefix: String,
        peer: String,
    },
}

/// Expand a `ris_message`'s `data` into normalized items, announcements before
/// withdrawals, preserving the upstream array order within each (§5, ordering
/// guarantees).
fn unpack(data: &RisMessageData) -> Vec<NormalizedItem> {
    let mut items = Vec::new();

    for group in &data.announcements {
        for prefix in &group.prefixes {
            items.push(NormalizedItem::Announcement {
                prefix: prefix.clone(),
                peer: data.peer.clone(),
                path: data.path.clone(),
                next_hop: group.next_hop.clone(),
            });
        }
    }

    for prefix in &data.withdrawals {
        items.push(NormalizedItem::Withdrawal {
            prefix: prefix.clone(),
            peer: data.peer.clone(),
        });
    }

    items
}

fn classify_withdrawal(index: &PrefixIndex, prefix_str: &str, peer: String, log: &slog::Logger) -> Option<FeedEvent> {
    let prefix: IpNet = match prefix_str.parse() {
        Ok(p) => p,
        Err(e) => {
            debug!(log, "dropping withdrawal with unparsable prefix"; "prefix" => prefix_str, "error" => %e);
            return None;
        }
    };

    if index.exact(&prefix).is_some() {
        Some(FeedEvent::Withdrawal(WithdrawalEvent { prefix, peer }))
    } else {
        None
    }
}

fn classify_announcement(
    index: &PrefixIndex,
    prefix_str: &str,
    peer: String,
    path: Vec<u32>,
    next_hop: String,
    log: &slog::Logger,
) -> Option<FeedEvent> {
    let prefix: IpNet = match prefix_str.parse() {
        Ok(p) => p,
        Err(e) => {
            debug!(log, "dropping announcement with unparsable prefix"; "prefix" => prefix_str, "error" => %e);
            return None;
        }
    };

    let origin = match path.last() {
        Some(&asn) => asn,
        None => {
            debug!(log, "dropping announcement with empty AS path"; "prefix" => %prefix);
            return None;
        }
    };

    let matched = match index.matching_entry(&prefix) {
        Some(entry) => entry,
        None => return None,
    };

    let expected = PrefixOrigin {
        prefix: matched.prefix,
        origin_as: matched.origin_as,
    };
    let altered = PrefixOrigin {
        prefix,
        origin_as: origin,
    };

    if altered.origin_as != 0 && altered.origin_as != expected.origin_as {
        Some(FeedEvent::Hijack(HijackEvent {
            expected,
            altered,
            description: matched.description.clone(),
            peer,
        }))
    } else if altered.prefix != expected.prefix {
        Some(FeedEvent::Difference(DifferenceEvent {
            expected_prefix: expected.prefix,
            altered_prefix: altered.prefix,
            origin_as: origin,
            description: matched.description.clone(),
            peer,
        }))
    } else {
        Some(FeedEvent::Announcement(AnnouncementEvent {
            prefix,
            peer,
            path,
            next_hop,
        }))
    }
}

/// Classify a whole `ris_message` payload against `index`, in emission order.
pub fn classify_frame(index: &PrefixIndex, data: &RisMessageData, log: &slog::Logger) -> Vec<FeedEvent> {
    unpack(data)
        .into_iter()
        .filter_map(|item| match item {
            NormalizedItem::Announcement {
                prefix,
                peer,
                path,
                next_hop,
            } => classify_announcement(index, &prefix, peer, path, next_hop, log),
            NormalizedItem::Withdrawal { prefix, peer } => classify_withdrawal(index, &prefix, peer, log),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use net_prefix::MonitoredPrefix;

    fn test_log() -> slog::Logger {
        slog::Logger::root(slog::Discard, slog::o!())
    }

    fn index_with(prefix: &str, origin_as: u32, monitor_more_specific: bool) -> PrefixIndex {
        PrefixIndex::build([
            MonitoredPrefix::new(prefix.parse().unwrap(), origin_as).with_monitor_more_specific(monitor_more_specific)
        ])
    }

    fn message(peer: &str, path: Vec<u32>, prefixes: Vec<&str>, withdrawals: Vec<&str>) -> RisMessageData {
        RisMessageData {
            peer: peer.to_string(),
            path,
            announcements: if prefixes.is_empty() {
                vec![]
            } else {
                vec![crate::messages::AnnouncementGroup {
                    next_hop: "198.51.100.1".to_string(),
                    prefixes: prefixes.into_iter().map(String::from).collect(),
                }]
            },
            withdrawals: withdrawals.into_iter().map(String::from).collect(),
        }
    }

    #[test]
    fn more_specific_hijack() {
        let index = index_with("10.0.0.0/8", 1, true);
        let data = message("P1", vec![9, 2], vec!["10.1.0.0/16"], vec![]);
        let events = classify_frame(&index, &data, &test_log());
        assert_eq!(events.len(), 1);
        match &events[0] {
            FeedEvent::Hijack(h) => {
                assert_eq!(h.expected.prefix, "10.0.0.0/8".parse::<IpNet>().unwrap());
                assert_eq!(h.altered.prefix, "10.1.0.0/16".parse::<IpNet>().unwrap());
                assert_eq!(h.altered.origin_as, 2);
            }
            other => panic!("expected hijack, got {other:?}"),
        }
    }

    #[test]
    fn same_origin_more_specific_is_difference_not_hijack() {
        let index = index_with("10.0.0.0/8", 1, true);
        let data = message("P1", vec![9, 1], vec!["10.1.0.0/16"], vec![]);
        let events = classify_frame(&index, &data, &test_log());
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], FeedEvent::Difference(_)));
    }

    #[test]
    fn monitor_more_specific_false_suppresses_supernet_but_not_exact() {
        let index = index_with("10.0.0.0/8", 1, false);
        let more_specific = message("P1", vec![2], vec!["10.1.0.0/16"], vec![]);
        assert!(classify_frame(&index, &more_specific, &test_log()).is_empty());

        let exact_other_origin = message("P1", vec![2], vec!["10.0.0.0/8"], vec![]);
        let events = classify_frame(&index, &exact_other_origin, &test_log());
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], FeedEvent::Hijack(_)));
    }

    #[test]
    fn exact_match_same_origin_emits_announcement() {
        let index = index_with("192.0.2.0/24", 64500, false);
        let data = message("P1", vec![64500], vec!["192.0.2.0/24"], vec![]);
        let events = classify_frame(&index, &data, &test_log());
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], FeedEvent::Announcement(_)));
    }

    #[test]
    fn version_isolation() {
        let index = index_with("10.0.0.0/8", 1, true);
        let data = message("P1", vec![2], vec!["2001:db8::/32"], vec![]);
        assert!(classify_frame(&index, &data, &test_log()).is_empty());
    }

    #[test]
    fn empty_path_is_dropped() {
        let index = index_with("10.0.0.0/8", 1, true);
        let data = message("P1", vec![], vec!["10.0.0.0/8"], vec![]);
        assert!(classify_frame(&index, &data, &test_log()).is_empty());
    }

    #[test]
    fn withdrawal_of_watched_prefix_emits_withdrawal() {
        let index = index_with("192.0.2.0/24", 64500, false);
        let data = message("P1", vec![], vec![], vec!["192.0.2.0/24"]);
        let events = classify_frame(&index, &data, &test_log());
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], FeedEvent::Withdrawal(_)));
    }

    #[test]
    fn withdrawal_of_unwatched_prefix_is_dropped() {
        let index = index_with("192.0.2.0/24", 64500, false);
        let data = message("P1", vec![], vec![], vec!["198.51.100.0/24"]);
        assert!(classify_frame(&index, &data, &test_log()).is_empty());
    }

    #[test]
    fn announcements_precede_withdrawals_within_a_frame() {
        let index = index_with("192.0.2.0/24", 64500, true);
        let mut data = message("P1", vec![64511], vec!["192.0.2.0/24"], vec!["192.0.2.0/24"]);
        data.withdrawals.push("192.0.2.0/24".to_string());
        let events = classify_frame(&index, &data, &test_log());
        assert!(matches!(events[0], FeedEvent::Hijack(_)));
        assert!(events[1..].iter().all(|e| matches!(e, FeedEvent::Withdrawal(_))));
    }

    #[test]
    fn classification_is_pure() {
        let index = index_with("10.0.0.0/8", 1, true);
        let data = message("P1", vec![2], vec!["10.1.0.0/16"], vec![]);
        let first = format!("{:?}", classify_frame(&index, &data, &test_log()));
        let second = format!("{:?}", classify_frame(&index, &data, &test_log()));
        assert_eq!(first, second);
    }
}
