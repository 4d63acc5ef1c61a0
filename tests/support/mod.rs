// tests/support/mod.rs
// Scripted adapter and recording channel shared by the pipeline tests.
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use tour_watch::{
    DeliveryError, FetchOutcome, MonitoredItem, Notifier, SourceAdapter, SourceFetchError,
    SourceKind,
};

pub fn item(source: SourceKind, id: &str, venue: &str) -> MonitoredItem {
    MonitoredItem::new(
        source,
        id,
        vec![
            ("Artist".to_string(), "Taylor Swift".to_string()),
            ("Venue".to_string(), venue.to_string()),
        ],
        Utc::now(),
    )
}

/// Plays back queued fetch results, then keeps returning an empty listing.
pub struct ScriptedAdapter {
    kind: SourceKind,
    script: Mutex<VecDeque<Result<FetchOutcome, SourceFetchError>>>,
    calls: Mutex<usize>,
    delay: Duration,
    panics_left: Mutex<usize>,
}

impl ScriptedAdapter {
    pub fn new(kind: SourceKind) -> Arc<Self> {
        Self::build(kind, Duration::ZERO, 0)
    }

    /// Every fetch takes `delay` before answering.
    pub fn slow(kind: SourceKind, delay: Duration) -> Arc<Self> {
        Self::build(kind, delay, 0)
    }

    /// The first `n` fetches panic.
    pub fn panicking(kind: SourceKind, n: usize) -> Arc<Self> {
        Self::build(kind, Duration::ZERO, n)
    }

    fn build(kind: SourceKind, delay: Duration, panics: usize) -> Arc<Self> {
        Arc::new(Self {
            kind,
            script: Mutex::new(VecDeque::new()),
            calls: Mutex::new(0),
            delay,
            panics_left: Mutex::new(panics),
        })
    }

    pub fn push_items(&self, items: Vec<MonitoredItem>) {
        self.script.lock().push_back(Ok(FetchOutcome::new(items)));
    }

    pub fn push_outcome(&self, outcome: FetchOutcome) {
        self.script.lock().push_back(Ok(outcome));
    }

    pub fn push_err(&self, e: SourceFetchError) {
        self.script.lock().push_back(Err(e));
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock()
    }
}

#[async_trait]
impl SourceAdapter for ScriptedAdapter {
    fn kind(&self) -> SourceKind {
        self.kind
    }

    async fn fetch(&self) -> Result<FetchOutcome, SourceFetchError> {
        *self.calls.lock() += 1;
        let panic_now = {
            let mut left = self.panics_left.lock();
            let hit = *left > 0;
            *left = left.saturating_sub(1);
            hit
        };
        if panic_now {
            panic!("scripted adapter blew up");
        }
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.script
            .lock()
            .pop_front()
            .unwrap_or_else(|| Ok(FetchOutcome::new(Vec::new())))
    }
}

/// Keeps every message; optionally fails every send.
#[derive(Default)]
pub struct RecordingChannel {
    sent: Mutex<Vec<(String, String)>>,
    fail: bool,
}

impl RecordingChannel {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        })
    }

    pub fn messages(&self) -> Vec<String> {
        self.sent.lock().iter().map(|(m, _)| m.clone()).collect()
    }

    pub fn recipients(&self) -> Vec<String> {
        self.sent.lock().iter().map(|(_, r)| r.clone()).collect()
    }
}

#[async_trait]
impl Notifier for RecordingChannel {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn send(&self, message: &str, recipient: &str) -> Result<(), DeliveryError> {
        if self.fail {
            return Err(DeliveryError::Unreachable("gateway down".into()));
        }
        self.sent
            .lock()
            .push((message.to_string(), recipient.to_string()));
        Ok(())
    }
}
