// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod bootstrap;
pub mod change_detector;
pub mod config;
pub mod error;
pub mod ingest;
pub mod logging;
pub mod metrics;
pub mod notify;
pub mod scheduler;
pub mod store;

// ---- Re-exports for stable public API ----
pub use crate::change_detector::{detect, Detection, FirstRunPolicy};
pub use crate::config::{MonitorConfig, SmsConfig};
pub use crate::error::{DeliveryError, PersistError, SourceFetchError};
pub use crate::ingest::types::{FetchOutcome, MonitoredItem, SourceAdapter, SourceKind};
pub use crate::notify::{AlertDispatcher, LogChannel, NotificationBatch, Notifier};
pub use crate::scheduler::{
    CycleOutcome, CycleReport, Orchestrator, Pipeline, PipelineSettings, RunSummary,
    ShutdownHandle,
};
pub use crate::store::{SourceState, StateStore};
