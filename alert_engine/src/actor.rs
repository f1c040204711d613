//! Timer and channel wiring around the pure [`crate::engine::AlertEngine`]: one
//! `tokio::select!` loop multiplexing feed events, the periodic evaluation
//! ticker, the optional heartbeat ticker, and per-incident reset timers (§9
//! design notes: "single actor owns all mutable aggregator state").

use crate::engine::{AlertEngine, IncidentKey};
use ris_feed::event::FeedEvent;
use slog::debug;
use std::time::Duration;
use task_executor::TaskExecutor;
use tokio::sync::mpsc;
use tokio::time::{Interval, MissedTickBehavior};

fn periodic(period: Duration) -> Interval {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

async fn tick_heartbeat(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => futures::future::pending::<()>().await,
    }
}

fn schedule_reset(executor: &TaskExecutor, reset_tx: mpsc::UnboundedSender<IncidentKey>, key: IncidentKey, after: Duration) {
    executor.spawn(
        async move {
            tokio::time::sleep(after).await;
            let _ = reset_tx.send(key);
        },
        "incident-reset",
    );
}

/// Drive `engine` to completion: runs until the feed event channel closes or
/// `executor`'s shutdown signal fires.
pub async fn run(mut engine: AlertEngine, mut events_rx: mpsc::UnboundedReceiver<FeedEvent>, executor: TaskExecutor) {
    let mut shutdown = executor.exit();
    let mut eval_interval = periodic(engine.repeat_alert_after());
    let mut heartbeat_interval = engine.repeat_heartbeat_after().map(periodic);
    let (reset_tx, mut reset_rx) = mpsc::unbounded_channel::<IncidentKey>();

    loop {
        tokio::select! {
            biased;

            _ = shutdown.recv() => {
                debug!(executor.log(), "alert engine actor shutting down");
                return;
            }

            maybe_event = events_rx.recv() => {
                match maybe_event {
                    Some(event) => engine.handle_event(event),
                    None => {
                        debug!(executor.log(), "feed event channel closed, stopping alert engine");
                        return;
                    }
                }
            }

            _ = eval_interval.tick() => {
                for key in engine.evaluate() {
                    schedule_reset(&executor, reset_tx.clone(), key, engine.reset_after());
                }
            }

            _ = tick_heartbeat(&mut heartbeat_interval) => {
                engine.heartbeat();
            }

            Some(key) = reset_rx.recv() => {
                engine.reset(&key);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineConfig;
    use crate::sink::Sink;
    use ris_feed::event::{HijackEvent, PrefixOrigin};
    use slog::Logger;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use task_executor::shutdown_channel;

    struct CountingSink {
        count: Arc<AtomicUsize>,
    }

    impl Sink for CountingSink {
        fn deliver(&self, _message: &str) {
            self.count.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn reset_timer_clears_incident_after_configured_delay() {
        let config = EngineConfig {
            number_peers_before_hijack_alert: 0,
            repeat_alert_after: Duration::from_millis(5),
            reset_after: Duration::from_millis(20),
            ..EngineConfig::default()
        };
        let count = Arc::new(AtomicUsize::new(0));
        let mut engine = AlertEngine::new(config, Logger::root(slog::Discard, slog::o!()));
        engine.on("hijack", Box::new(CountingSink { count: count.clone() })).unwrap();

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (_shutdown_tx, shutdown) = shutdown_channel();
        let executor = TaskExecutor::new(tokio::runtime::Handle::current(), shutdown, Logger::root(slog::Discard, slog::o!()));

        events_tx
            .send(FeedEvent::Hijack(HijackEvent {
                expected: PrefixOrigin { prefix: "10.0.0.0/8".parse().unwrap(), origin_as: 1 },
                altered: PrefixOrigin { prefix: "10.0.0.0/8".parse().unwrap(), origin_as: 2 },
                description: None,
                peer: "p1".to_string(),
            }))
            .unwrap();

        let handle = tokio::spawn(run(engine, events_rx, executor));
        tokio::time::sleep(Duration::from_millis(60)).await;
        drop(events_tx);
        let _ = handle.await;

        assert!(count.load(Ordering::SeqCst) >= 1);
    }
}
