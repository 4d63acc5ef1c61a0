// src/scheduler/mod.rs
//! Runs every pipeline on its own task until a shutdown is requested.

pub mod backoff;
pub mod pipeline;

pub use pipeline::{CycleOutcome, CycleReport, Phase, Pipeline, PipelineSettings};

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use metrics::counter;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::ingest::types::SourceKind;
use crate::notify::AlertDispatcher;

/// Cloneable trigger for a graceful stop. Safe to fire before `run` starts.
#[derive(Clone)]
pub struct ShutdownHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl ShutdownHandle {
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub sources: Vec<SourceKind>,
    /// Tasks that wound down within the grace period.
    pub finished: usize,
    /// Tasks still mid-cycle at the deadline.
    pub aborted: usize,
    pub panicked: usize,
}

pub struct Orchestrator {
    pipelines: Vec<Pipeline>,
    dispatcher: Arc<AlertDispatcher>,
    grace: Duration,
    notify_on_shutdown: bool,
    shutdown: Arc<watch::Sender<bool>>,
}

impl Orchestrator {
    pub fn new(dispatcher: Arc<AlertDispatcher>, grace: Duration) -> Self {
        let (tx, _rx) = watch::channel(false);
        Self {
            pipelines: Vec::new(),
            dispatcher,
            grace,
            notify_on_shutdown: true,
            shutdown: Arc::new(tx),
        }
    }

    pub fn with_shutdown_notice(mut self, on: bool) -> Self {
        self.notify_on_shutdown = on;
        self
    }

    pub fn add_pipeline(&mut self, pipeline: Pipeline) {
        self.pipelines.push(pipeline);
    }

    pub fn sources(&self) -> Vec<SourceKind> {
        self.pipelines.iter().map(Pipeline::kind).collect()
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            tx: self.shutdown.clone(),
        }
    }

    /// Announce, run until shutdown, drain within the grace period, then say goodbye.
    pub async fn run(self) -> RunSummary {
        let Orchestrator {
            pipelines,
            dispatcher,
            grace,
            notify_on_shutdown,
            shutdown,
        } = self;

        let sources: Vec<SourceKind> = pipelines.iter().map(Pipeline::kind).collect();
        let ids: Vec<&str> = sources.iter().map(|s| s.id()).collect();
        info!(sources = ?ids, channel = dispatcher.channel_name(), "monitor starting");

        if let Err(e) = dispatcher.notify_startup(&sources).await {
            warn!(error = %e, "startup notice not delivered");
        }

        let mut stop = shutdown.subscribe();
        let tasks: Vec<(&'static str, JoinHandle<()>)> = pipelines
            .into_iter()
            .map(|p| (p.source_id(), tokio::spawn(drive(p, shutdown.subscribe()))))
            .collect();

        stopped(&mut stop).await;
        info!(grace_secs = grace.as_secs_f64(), "shutdown requested, draining pipelines");

        let mut summary = RunSummary {
            sources,
            ..RunSummary::default()
        };
        let deadline = tokio::time::Instant::now() + grace;
        for (source, mut task) in tasks {
            match tokio::time::timeout_at(deadline, &mut task).await {
                Ok(Ok(())) => summary.finished += 1,
                Ok(Err(e)) => {
                    error!(source, error = %e, "pipeline task panicked");
                    summary.panicked += 1;
                }
                Err(_) => {
                    task.abort();
                    warn!(source, "cycle still running at deadline, aborted");
                    summary.aborted += 1;
                }
            }
        }

        if notify_on_shutdown {
            if let Err(e) = dispatcher.notify_shutdown().await {
                warn!(error = %e, "shutdown notice not delivered");
            }
        }
        info!(
            finished = summary.finished,
            aborted = summary.aborted,
            panicked = summary.panicked,
            "monitor stopped"
        );
        summary
    }
}

/// Resolves once shutdown is requested, or the sender is gone.
async fn stopped(rx: &mut watch::Receiver<bool>) {
    while !*rx.borrow_and_update() {
        if rx.changed().await.is_err() {
            return;
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}

/// First cycle immediately, then one per reported delay. A shutdown only
/// interrupts the wait between cycles, never a cycle in progress. A panicking
/// cycle is logged and the source stays scheduled.
async fn drive(mut pipeline: Pipeline, mut stop: watch::Receiver<bool>) {
    let source = pipeline.source_id();
    let mut delay = Duration::ZERO;
    loop {
        tokio::select! {
            biased;
            _ = stopped(&mut stop) => break,
            _ = tokio::time::sleep(delay) => {}
        }
        let cycle = AssertUnwindSafe(pipeline.run_cycle(chrono::Utc::now())).catch_unwind();
        match cycle.await {
            Ok(report) => {
                debug!(
                    source,
                    outcome = ?report.outcome,
                    next_in_secs = report.next_delay.as_secs_f64(),
                    "cycle finished"
                );
                delay = report.next_delay;
            }
            Err(panic) => {
                counter!("monitor_cycle_panics_total", "source" => source).increment(1);
                error!(source, panic = panic_message(&*panic), "cycle panicked, continuing on schedule");
                delay = pipeline.settings().interval;
            }
        }
    }
    info!(source, "pipeline stopped");
}
