//! The Alert Engine's pure state machine (§4.2): event handlers, periodic
//! threshold evaluation, message formatting, and sink fan-out. Timer wiring and
//! one-shot reset scheduling live in [`crate::actor`]; this module has no I/O and
//! no knowledge of `tokio`.

use crate::incident::{hijack_key, HijackIncident, HijackMap, PeerList, VisibilityMap, VisibilityRecord};
use crate::sink::{fan_out, EngineError, EventKind, Sink};
use ipnet::IpNet;
use ris_feed::event::FeedEvent;
use slog::{info, Logger};
use std::collections::{HashMap, HashSet};
use std::time::Duration;

/// Configuration recognized by the engine, per §6's table (the transport-level
/// keys — `websocket-data-service`, `proxy-host`/`proxy-port`,
/// `monitored-prefixes-files` — belong to the feed client / binary, not here).
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub number_peers_before_hijack_alert: usize,
    pub number_peers_before_low_visibility_alert: usize,
    pub repeat_alert_after: Duration,
    pub reset_after: Duration,
    /// `None` disables the heartbeat, matching `repeat-status-heartbeat-after-seconds: 0`.
    pub repeat_heartbeat_after: Option<Duration>,
    pub permitted_more_specific_announcements: HashMap<u32, Vec<IpNet>>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            number_peers_before_hijack_alert: 0,
            number_peers_before_low_visibility_alert: 0,
            repeat_alert_after: Duration::from_secs(10),
            reset_after: Duration::from_secs(600),
            repeat_heartbeat_after: None,
            permitted_more_specific_announcements: HashMap::new(),
        }
    }
}

/// Identity of one entry in a Triggered Set (§3).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IncidentKey {
    Hijack(String),
    LowVisibility(IpNet),
}

fn format_peer_list(peers: &[String]) -> String {
    let inner = peers
        .iter()
        .map(|p| format!("'{p}'"))
        .collect::<Vec<_>>()
        .join(", ");
    format!("[{inner}]")
}

fn hijack_message(incident: &HijackIncident) -> String {
    let mut message = format!(
        "Possible Hijack, it should be {} AS{}",
        incident.expected.prefix, incident.expected.origin_as
    );
    match &incident.description {
        Some(description) => message.push_str(&format!(" ({description}) ")),
        None => message.push(' '),
    }
    message.push_str(&format!(
        "now announced {} AS{} seen by {} peers {}",
        incident.altered.prefix,
        incident.altered.origin_as,
        incident.peers.len(),
        format_peer_list(incident.peers.as_slice())
    ));
    message
}

fn low_visibility_message(prefix: &IpNet, peers: &[String]) -> String {
    format!(
        "The prefix {prefix} is not visible anymore from {} peers {}",
        peers.len(),
        format_peer_list(peers)
    )
}

fn difference_message(expected_prefix: &IpNet, altered_prefix: &IpNet) -> String {
    format!("The prefix {expected_prefix} it is not configured to be announced with the more specific {altered_prefix}")
}

/// The pure aggregator state: incident maps, triggered sets, registered sinks.
pub struct AlertEngine {
    config: EngineConfig,
    sinks: HashMap<EventKind, Vec<Box<dyn Sink>>>,
    hijacks: HijackMap,
    visibility: VisibilityMap,
    triggered: HashSet<IncidentKey>,
    log: Logger,
}

impl AlertEngine {
    pub fn new(config: EngineConfig, log: Logger) -> Self {
        let sinks = EventKind::ALL.into_iter().map(|kind| (kind, Vec::new())).collect();
        Self {
            config,
            sinks,
            hijacks: HashMap::new(),
            visibility: HashMap::new(),
            triggered: HashSet::new(),
            log,
        }
    }

    /// Register a sink for `event`. Fails fast on an unrecognized event name
    /// (§4.2, §7.5).
    pub fn on(&mut self, event: &str, sink: Box<dyn Sink>) -> Result<(), EngineError> {
        let kind = EventKind::parse(event).ok_or_else(|| EngineError::InvalidEvent(event.to_string()))?;
        self.sinks.get_mut(&kind).expect("all EventKind variants are seeded in new()").push(sink);
        Ok(())
    }

    fn publish(&self, kind: EventKind, message: &str) {
        fan_out(&self.sinks[&kind], message);
    }

    /// Pure state mutation for one feed event, plus the one case that bypasses
    /// aggregation entirely: `difference` alerts immediately (§4.2).
    pub fn handle_event(&mut self, event: FeedEvent) {
        match event {
            FeedEvent::Hijack(hijack) => {
                let key = hijack_key(&hijack.expected, &hijack.altered);
                self.hijacks
                    .entry(key)
                    .and_modify(|incident| incident.peers.insert(hijack.peer.clone()))
                    .or_insert_with(|| HijackIncident {
                        expected: hijack.expected.clone(),
                        altered: hijack.altered.clone(),
                        description: hijack.description.clone(),
                        peers: PeerList::single(hijack.peer.clone()),
                    });
            }
            FeedEvent::Difference(difference) => {
                let message = difference_message(&difference.expected_prefix, &difference.altered_prefix);
                self.publish(EventKind::Difference, &message);
            }
            FeedEvent::Withdrawal(withdrawal) => {
                self.visibility
                    .entry(withdrawal.prefix)
                    .or_default()
                    .peers
                    .insert(withdrawal.peer, true);
            }
            FeedEvent::Announcement(announcement) => {
                self.visibility
                    .entry(announcement.prefix)
                    .or_default()
                    .peers
                    .insert(announcement.peer, false);
            }
            FeedEvent::Error(raw) => {
                self.publish(EventKind::Error, &raw.to_string());
            }
        }
    }

    fn is_whitelisted(&self, altered_origin_as: u32, altered_prefix: &IpNet) -> bool {
        self.config
            .permitted_more_specific_announcements
            .get(&altered_origin_as)
            .is_some_and(|prefixes| prefixes.contains(altered_prefix))
    }

    /// One evaluation tick (§4.2, "Periodic evaluation"). Returns the set of
    /// incident keys that were newly added to the Triggered Set this tick —
    /// the caller schedules exactly one reset timer per key returned, which is
    /// what gives the coalesced-reset semantics §9's design notes call for.
    pub fn evaluate(&mut self) -> Vec<IncidentKey> {
        let mut newly_triggered = Vec::new();

        for (key, incident) in &self.hijacks {
            if self.is_whitelisted(incident.altered.origin_as, &incident.altered.prefix) {
                continue;
            }
            if incident.peers.len() >= self.config.number_peers_before_hijack_alert {
                let incident_key = IncidentKey::Hijack(key.clone());
                if !self.triggered.contains(&incident_key) {
                    self.publish(EventKind::Hijack, &hijack_message(incident));
                    self.triggered.insert(incident_key.clone());
                    newly_triggered.push(incident_key);
                }
            }
        }

        for (prefix, record) in &self.visibility {
            let withdrawn_peers = record.withdrawn_peers();
            if withdrawn_peers.len() >= self.config.number_peers_before_low_visibility_alert {
                let incident_key = IncidentKey::LowVisibility(*prefix);
                if !self.triggered.contains(&incident_key) {
                    self.publish(EventKind::LowVisibility, &low_visibility_message(prefix, &withdrawn_peers));
                    self.triggered.insert(incident_key.clone());
                    newly_triggered.push(incident_key);
                }
            }
        }

        newly_triggered
    }

    pub fn heartbeat(&self) {
        self.publish(EventKind::Heartbeat, "Still monitoring...");
    }

    pub fn repeat_alert_after(&self) -> Duration {
        self.config.repeat_alert_after
    }

    pub fn reset_after(&self) -> Duration {
        self.config.reset_after
    }

    pub fn repeat_heartbeat_after(&self) -> Option<Duration> {
        self.config.repeat_heartbeat_after
    }

    /// Remove an incident from aggregate state and the Triggered Set (§4.2,
    /// "reset"; §3, `VisibilityRecord`/`HijackIncident` lifecycle).
    pub fn reset(&mut self, key: &IncidentKey) {
        let removed = match key {
            IncidentKey::Hijack(k) => self.hijacks.remove(k).is_some(),
            IncidentKey::LowVisibility(prefix) => self.visibility.remove(prefix).is_some(),
        };
        self.triggered.remove(key);
        if removed {
            info!(self.log, "incident reset"; "key" => format!("{key:?}"));
        }
    }

    #[cfg(test)]
    pub(crate) fn hijack_incident(&self, key: &str) -> Option<&HijackIncident> {
        self.hijacks.get(key)
    }

    #[cfg(test)]
    pub(crate) fn visibility_record(&self, prefix: &IpNet) -> Option<&VisibilityRecord> {
        self.visibility.get(prefix)
    }

    #[cfg(test)]
    pub(crate) fn is_triggered(&self, key: &IncidentKey) -> bool {
        self.triggered.contains(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ris_feed::event::{HijackEvent, PrefixOrigin};
    use std::sync::{Arc, Mutex};

    fn test_log() -> Logger {
        Logger::root(slog::Discard, slog::o!())
    }

    struct RecordingSink {
        messages: Arc<Mutex<Vec<String>>>,
    }

    impl Sink for RecordingSink {
        fn deliver(&self, message: &str) {
            self.messages.lock().unwrap().push(message.to_string());
        }
    }

    fn hijack(expected: &str, expected_as: u32, altered: &str, altered_as: u32, peer: &str) -> FeedEvent {
        FeedEvent::Hijack(HijackEvent {
            expected: PrefixOrigin {
                prefix: expected.parse().unwrap(),
                origin_as: expected_as,
            },
            altered: PrefixOrigin {
                prefix: altered.parse().unwrap(),
                origin_as: altered_as,
            },
            description: None,
            peer: peer.to_string(),
        })
    }

    #[test]
    fn rejects_unknown_event_name() {
        let mut engine = AlertEngine::new(EngineConfig::default(), test_log());
        let messages = Arc::new(Mutex::new(Vec::new()));
        let sink = Box::new(RecordingSink { messages });
        assert!(engine.on("not-a-real-event", sink).is_err());
    }

    #[test]
    fn evidence_aggregation_preserves_peer_order_and_dedupes() {
        let mut engine = AlertEngine::new(EngineConfig::default(), test_log());
        for peer in ["p1", "p1", "p2", "p3"] {
            engine.handle_event(hijack("10.0.0.0/8", 1, "10.0.0.0/8", 2, peer));
        }
        let key = hijack_key(
            &PrefixOrigin { prefix: "10.0.0.0/8".parse().unwrap(), origin_as: 1 },
            &PrefixOrigin { prefix: "10.0.0.0/8".parse().unwrap(), origin_as: 2 },
        );
        let incident = engine.hijack_incident(&key).unwrap();
        assert_eq!(incident.peers.len(), 3);
        assert_eq!(incident.peers.as_slice(), &["p1".to_string(), "p2".to_string(), "p3".to_string()]);
    }

    #[test]
    fn threshold_gating_fires_exactly_once_on_crossing() {
        let config = EngineConfig {
            number_peers_before_hijack_alert: 3,
            ..EngineConfig::default()
        };
        let messages = Arc::new(Mutex::new(Vec::new()));
        let mut engine = AlertEngine::new(config, test_log());
        engine
            .on("hijack", Box::new(RecordingSink { messages: messages.clone() }))
            .unwrap();

        engine.handle_event(hijack("10.0.0.0/8", 1, "10.0.0.0/8", 2, "p1"));
        engine.handle_event(hijack("10.0.0.0/8", 1, "10.0.0.0/8", 2, "p2"));
        engine.evaluate();
        assert!(messages.lock().unwrap().is_empty());

        engine.handle_event(hijack("10.0.0.0/8", 1, "10.0.0.0/8", 2, "p3"));
        let newly_triggered = engine.evaluate();
        assert_eq!(messages.lock().unwrap().len(), 1);
        assert_eq!(newly_triggered.len(), 1);

        // Further ticks don't re-publish once triggered and unchanged incident
        // state keeps crossing the same threshold — still only fires once per
        // coalesced reset cycle.
        engine.evaluate();
        assert_eq!(messages.lock().unwrap().len(), 1);
    }

    #[test]
    fn whitelisted_more_specific_never_alerts() {
        let mut config = EngineConfig::default();
        config
            .permitted_more_specific_announcements
            .insert(2, vec!["10.1.0.0/16".parse().unwrap()]);
        let messages = Arc::new(Mutex::new(Vec::new()));
        let mut engine = AlertEngine::new(config, test_log());
        engine
            .on("hijack", Box::new(RecordingSink { messages: messages.clone() }))
            .unwrap();

        for i in 0..100 {
            engine.handle_event(hijack("10.0.0.0/8", 1, "10.1.0.0/16", 2, &format!("peer{i}")));
        }
        engine.evaluate();
        assert!(messages.lock().unwrap().is_empty());
    }

    #[test]
    fn reset_removes_incident_and_triggered_marker() {
        let mut engine = AlertEngine::new(EngineConfig::default(), test_log());
        engine.handle_event(hijack("10.0.0.0/8", 1, "10.0.0.0/8", 2, "p1"));
        let newly_triggered = engine.evaluate();
        assert_eq!(newly_triggered.len(), 1);
        let key = newly_triggered.into_iter().next().unwrap();
        assert!(engine.is_triggered(&key));

        engine.reset(&key);
        assert!(!engine.is_triggered(&key));
        if let IncidentKey::Hijack(k) = &key {
            assert!(engine.hijack_incident(k).is_none());
        }

        // A subsequent identical event recreates the incident from scratch.
        engine.handle_event(hijack("10.0.0.0/8", 1, "10.0.0.0/8", 2, "p1"));
        if let IncidentKey::Hijack(k) = &key {
            assert_eq!(engine.hijack_incident(k).unwrap().peers.len(), 1);
        }
    }

    #[test]
    fn visibility_flip_then_threshold() {
        let config = EngineConfig {
            number_peers_before_low_visibility_alert: 2,
            ..EngineConfig::default()
        };
        let messages = Arc::new(Mutex::new(Vec::new()));
        let mut engine = AlertEngine::new(config, test_log());
        engine
            .on("low-visibility", Box::new(RecordingSink { messages: messages.clone() }))
            .unwrap();

        use ris_feed::event::WithdrawalEvent;
        let prefix: IpNet = "2001:db8::/32".parse().unwrap();
        engine.handle_event(FeedEvent::Withdrawal(WithdrawalEvent { prefix, peer: "A".to_string() }));
        engine.handle_event(FeedEvent::Withdrawal(WithdrawalEvent { prefix, peer: "B".to_string() }));
        engine.evaluate();
        let msgs = messages.lock().unwrap();
        assert_eq!(msgs.len(), 1);
        assert!(msgs[0].contains("2 peers"));
        drop(msgs);

        use ris_feed::event::AnnouncementEvent;
        engine.handle_event(FeedEvent::Announcement(AnnouncementEvent {
            prefix,
            peer: "A".to_string(),
            path: vec![1],
            next_hop: "::1".to_string(),
        }));
        let record = engine.visibility_record(&prefix).unwrap();
        assert_eq!(record.withdrawn_count(), 1);
    }

    #[test]
    fn difference_publishes_immediately_without_aggregation() {
        use ris_feed::event::DifferenceEvent;
        let messages = Arc::new(Mutex::new(Vec::new()));
        let mut engine = AlertEngine::new(EngineConfig::default(), test_log());
        engine
            .on("difference", Box::new(RecordingSink { messages: messages.clone() }))
            .unwrap();

        engine.handle_event(FeedEvent::Difference(DifferenceEvent {
            expected_prefix: "192.0.2.0/24".parse().unwrap(),
            altered_prefix: "192.0.2.128/25".parse().unwrap(),
            origin_as: 64500,
            description: None,
            peer: "P1".to_string(),
        }));

        let msgs = messages.lock().unwrap();
        assert_eq!(
            msgs[0],
            "The prefix 192.0.2.0/24 it is not configured to be announced with the more specific 192.0.2.128/25"
        );
    }

    #[test]
    fn s1_hijack_message_matches_literal_scenario() {
        let messages = Arc::new(Mutex::new(Vec::new()));
        let mut engine = AlertEngine::new(EngineConfig::default(), test_log());
        engine
            .on("hijack", Box::new(RecordingSink { messages: messages.clone() }))
            .unwrap();
        engine.handle_event(hijack("192.0.2.0/24", 64500, "192.0.2.0/24", 64511, "P1"));
        engine.evaluate();
        let msgs = messages.lock().unwrap();
        assert_eq!(
            msgs[0],
            "Possible Hijack, it should be 192.0.2.0/24 AS64500 now announced 192.0.2.0/24 AS64511 seen by 1 peers ['P1']"
        );
    }
}
