//! # Change detector
//! Pure diff of a freshly fetched item set against the stored per-source state.
//! No I/O and no clock reads; the caller supplies `now`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

use crate::ingest::types::{FetchOutcome, MonitoredItem};
use crate::store::SourceState;

/// What to do with items observed on a source's very first successful cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FirstRunPolicy {
    /// Record everything as seen, alert on nothing (no storm on first deploy).
    #[default]
    Suppress,
    /// Alert on everything currently listed.
    NotifyAll,
}

#[derive(Debug, Clone)]
pub struct Detection {
    /// Items whose id was never seen before, in fetch order.
    pub new_items: Vec<MonitoredItem>,
    pub state: SourceState,
    pub first_run: bool,
    /// Unseen items swallowed by `FirstRunPolicy::Suppress`.
    pub suppressed: usize,
    /// The previous fetch listed items and this one lists none.
    pub cleared: bool,
}

pub fn detect(
    current: &[MonitoredItem],
    state: &SourceState,
    policy: FirstRunPolicy,
    now: DateTime<Utc>,
) -> Detection {
    let first_run = state.is_first_run();

    let mut emitted: HashSet<String> = HashSet::new();
    let unseen: Vec<MonitoredItem> = current
        .iter()
        .filter(|it| !state.has_seen(it.id()) && emitted.insert(it.id().to_string()))
        .cloned()
        .collect();

    let (new_items, suppressed) = if first_run && policy == FirstRunPolicy::Suppress {
        let n = unseen.len();
        (Vec::new(), n)
    } else {
        (unseen, 0)
    };

    let present_ids: BTreeSet<String> = current.iter().map(|it| it.id().to_string()).collect();
    let mut seen_ids = state.seen_ids.clone();
    seen_ids.extend(present_ids.iter().cloned());

    let cleared = !first_run && !state.present_ids.is_empty() && current.is_empty();

    Detection {
        new_items,
        state: SourceState {
            seen_ids,
            present_ids,
            last_checked_at: Some(now),
            last_error: None,
        },
        first_run,
        suppressed,
        cleared,
    }
}

/// `detect` over a whole fetch. A first run fed by a partial fetch (any
/// warnings) keeps the baseline open: items are recorded, but the source
/// stays on its first run until one fetch comes back complete.
pub fn detect_fetch(
    outcome: &FetchOutcome,
    state: &SourceState,
    policy: FirstRunPolicy,
    now: DateTime<Utc>,
) -> Detection {
    let mut detection = detect(&outcome.items, state, policy, now);
    if detection.first_run && !outcome.warnings.is_empty() {
        detection.state.last_checked_at = None;
    }
    detection
}
