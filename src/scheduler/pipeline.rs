// src/scheduler/pipeline.rs
//! One source's fetch → detect → notify → persist cycle and its recovery policy.

use chrono::{DateTime, Utc};
use metrics::{counter, gauge, histogram};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn, Instrument};

use super::backoff::Backoff;
use crate::change_detector::{detect_fetch, FirstRunPolicy};
use crate::error::{PersistError, SourceFetchError};
use crate::ingest::types::{SourceAdapter, SourceKind};
use crate::notify::{AlertDispatcher, NotificationBatch};
use crate::store::{SourceState, StateStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Fetching,
    Detecting,
    Notifying,
    Persisting,
}

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub interval: Duration,
    pub max_backoff: Duration,
    pub first_run: FirstRunPolicy,
    pub notify_on_clear: bool,
}

impl PipelineSettings {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            max_backoff: interval.saturating_mul(12),
            first_run: FirstRunPolicy::default(),
            notify_on_clear: false,
        }
    }

    pub fn with_max_backoff(mut self, max: Duration) -> Self {
        self.max_backoff = max;
        self
    }

    pub fn with_first_run(mut self, policy: FirstRunPolicy) -> Self {
        self.first_run = policy;
        self
    }

    pub fn with_notify_on_clear(mut self, on: bool) -> Self {
        self.notify_on_clear = on;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    Completed {
        new_items: usize,
        suppressed: usize,
        delivered: bool,
    },
    FetchFailed {
        kind: &'static str,
    },
    /// Detection ran but the state could not be saved; retried next cycle.
    PersistFailed {
        new_items: usize,
    },
    /// The stored state could not be read; nothing was fetched or written.
    StateUnavailable,
}

#[derive(Debug, Clone)]
pub struct CycleReport {
    pub outcome: CycleOutcome,
    pub next_delay: Duration,
}

pub struct Pipeline {
    adapter: Arc<dyn SourceAdapter>,
    store: StateStore,
    dispatcher: Arc<AlertDispatcher>,
    settings: PipelineSettings,
    state: SourceState,
    /// In-memory state is ahead of what is on disk.
    dirty: bool,
    /// The stored state was read (or safely moved aside). Until then the
    /// pipeline neither fetches nor writes.
    loaded: bool,
    backoff: Backoff,
    phase: Phase,
}

impl Pipeline {
    /// Load the stored state. A corrupt file is moved aside and the source starts
    /// fresh; a file that cannot be read is left alone and retried every cycle.
    pub async fn open(
        adapter: Arc<dyn SourceAdapter>,
        store: StateStore,
        dispatcher: Arc<AlertDispatcher>,
        settings: PipelineSettings,
    ) -> Self {
        let source = adapter.kind().id();
        let loaded = load_state(&store, source).await;
        match &loaded {
            Some(state) => info!(
                source,
                seen = state.seen_ids.len(),
                first_run = state.is_first_run(),
                "pipeline ready"
            ),
            None => warn!(source, "pipeline ready, state not loaded yet"),
        }
        let backoff = Backoff::new(settings.interval, settings.max_backoff);
        Self {
            adapter,
            store,
            dispatcher,
            settings,
            loaded: loaded.is_some(),
            state: loaded.unwrap_or_default(),
            dirty: false,
            backoff,
            phase: Phase::Idle,
        }
    }

    pub fn kind(&self) -> SourceKind {
        self.adapter.kind()
    }

    pub fn source_id(&self) -> &'static str {
        self.adapter.kind().id()
    }

    pub fn state(&self) -> &SourceState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Run one cycle. Never fails: every error becomes a logged outcome.
    pub async fn run_cycle(&mut self, now: DateTime<Utc>) -> CycleReport {
        let span = tracing::info_span!("pipeline", source = self.source_id());
        self.cycle(now).instrument(span).await
    }

    async fn cycle(&mut self, now: DateTime<Utc>) -> CycleReport {
        let source = self.source_id();
        counter!("monitor_cycles_total", "source" => source).increment(1);

        if !self.loaded {
            match load_state(&self.store, source).await {
                Some(state) => {
                    info!(seen = state.seen_ids.len(), "state loaded");
                    self.state = state;
                    self.loaded = true;
                }
                None => {
                    return CycleReport {
                        outcome: CycleOutcome::StateUnavailable,
                        next_delay: self.settings.interval,
                    }
                }
            }
        }

        self.phase = Phase::Fetching;
        let t0 = Instant::now();
        let fetched = self.adapter.fetch().await;
        histogram!("monitor_fetch_ms", "source" => source)
            .record(t0.elapsed().as_secs_f64() * 1_000.0);

        let outcome = match fetched {
            Ok(outcome) => outcome,
            Err(e) => return self.on_fetch_error(e, now).await,
        };
        for warning in &outcome.warnings {
            warn!(%warning, "partial fetch");
        }
        self.backoff.on_success();

        self.phase = Phase::Detecting;
        let detection = detect_fetch(&outcome, &self.state, self.settings.first_run, now);
        if detection.first_run {
            info!(
                observed = outcome.items.len(),
                suppressed = detection.suppressed,
                policy = ?self.settings.first_run,
                complete = !detection.state.is_first_run(),
                "first run for source"
            );
        }
        if detection.suppressed > 0 {
            counter!("monitor_suppressed_items_total", "source" => source)
                .increment(detection.suppressed as u64);
        }
        // Seen ids are committed before dispatch; a failed alert is never replayed.
        self.state = detection.state;
        self.dirty = true;

        self.phase = Phase::Notifying;
        let new_items = detection.new_items.len();
        let mut delivered = true;
        match NotificationBatch::new(self.kind(), detection.new_items) {
            Some(batch) => {
                info!(new_items, "new items detected");
                counter!("monitor_new_items_total", "source" => source).increment(new_items as u64);
                if let Err(e) = self.dispatcher.notify(&batch).await {
                    delivered = false;
                    counter!("monitor_delivery_errors_total", "source" => source).increment(1);
                    error!(error = %e, "alert delivery failed");
                }
            }
            None => debug!(observed = outcome.items.len(), "no new items"),
        }
        // A partial sweep can look empty without the listings being gone.
        let cleared = detection.cleared && outcome.warnings.is_empty();
        if cleared && self.settings.notify_on_clear {
            info!("previously listed items are gone");
            if let Err(e) = self.dispatcher.notify_cleared(self.kind()).await {
                delivered = false;
                counter!("monitor_delivery_errors_total", "source" => source).increment(1);
                error!(error = %e, "cleared notice delivery failed");
            }
        }

        self.phase = Phase::Persisting;
        let persisted = self.persist().await;
        self.phase = Phase::Idle;

        let next_delay = self.backoff.current();
        if !persisted {
            return CycleReport {
                outcome: CycleOutcome::PersistFailed { new_items },
                next_delay,
            };
        }
        gauge!("monitor_last_success_ts", "source" => source).set(now.timestamp() as f64);
        CycleReport {
            outcome: CycleOutcome::Completed {
                new_items,
                suppressed: detection.suppressed,
                delivered,
            },
            next_delay,
        }
    }

    async fn on_fetch_error(&mut self, e: SourceFetchError, now: DateTime<Utc>) -> CycleReport {
        let kind = e.kind();
        counter!("monitor_fetch_errors_total", "source" => self.source_id(), "kind" => kind)
            .increment(1);
        self.state.last_error = Some(format!("{}: {e}", now.to_rfc3339()));

        let next_delay = match &e {
            SourceFetchError::RateLimited { retry_after } => {
                let delay = self.backoff.on_rate_limit(*retry_after);
                warn!(
                    error = %e,
                    strikes = self.backoff.strikes(),
                    delay_secs = delay.as_secs_f64(),
                    "source throttled, backing off"
                );
                delay
            }
            _ => {
                warn!(error = %e, kind, "fetch failed, retrying next cycle");
                self.backoff.current()
            }
        };

        // A save that failed last cycle is retried now rather than deferred.
        if self.dirty {
            self.phase = Phase::Persisting;
            self.persist().await;
        }
        self.phase = Phase::Idle;

        CycleReport {
            outcome: CycleOutcome::FetchFailed { kind },
            next_delay,
        }
    }

    async fn persist(&mut self) -> bool {
        let source = self.source_id();
        match self.store.save(source, &self.state).await {
            Ok(()) => {
                self.dirty = false;
                true
            }
            Err(e) => {
                counter!("monitor_persist_errors_total", "source" => source).increment(1);
                error!(error = %e, "state save failed, will retry next cycle");
                false
            }
        }
    }
}

/// `None` when the file exists but can neither be read nor moved aside;
/// saving over it would lose the ids it holds.
async fn load_state(store: &StateStore, source: &'static str) -> Option<SourceState> {
    match store.load(source).await {
        Ok(state) => Some(state),
        Err(e @ PersistError::Corrupt { .. }) => {
            error!(source, error = %e, "state file corrupt");
            match store.quarantine(source).await {
                Ok(aside) => {
                    warn!(source, moved_to = %aside.display(), "corrupt state moved aside, starting fresh");
                    Some(SourceState::default())
                }
                Err(qe) => {
                    error!(source, error = %qe, "could not move corrupt state aside");
                    None
                }
            }
        }
        Err(e) => {
            error!(source, error = %e, "state load failed, will retry next cycle");
            None
        }
    }
}
