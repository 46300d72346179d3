//! Shared helpers for integration tests.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use taskpet::clock::ManualClock;
use taskpet::config::TrackerConfig;
use taskpet::host::contract::EventEnvelope;
use taskpet::{LocalBackend, OwnerId, Tracker};
use tokio::sync::broadcast;

pub(crate) fn start() -> DateTime<Utc> {
    DateTime::from_timestamp_millis(1_700_000_000_000).expect("valid timestamp")
}

pub(crate) fn owner() -> OwnerId {
    OwnerId::from("owner-int")
}

/// Tracker over two in-memory stores with a manual clock.
pub(crate) struct Harness {
    pub tracker: Tracker,
    pub clock: Arc<ManualClock>,
    pub local: Arc<LocalBackend>,
    pub remote: Arc<LocalBackend>,
}

pub(crate) fn harness(config: &TrackerConfig) -> Harness {
    let clock = Arc::new(ManualClock::new(start()));
    let local = Arc::new(LocalBackend::in_memory());
    let remote = Arc::new(LocalBackend::in_memory());
    let tracker = Tracker::with_clock(config, local.clone(), remote.clone(), clock.clone())
        .expect("build tracker");
    Harness {
        tracker,
        clock,
        local,
        remote,
    }
}

/// Drain all pending events from the broadcast receiver into a Vec.
pub(crate) fn drain_events(rx: &mut broadcast::Receiver<EventEnvelope>) -> Vec<EventEnvelope> {
    let mut events = Vec::new();
    while let Ok(evt) = rx.try_recv() {
        events.push(evt);
    }
    events
}
