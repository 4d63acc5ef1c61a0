// src/bootstrap.rs
//! Wires configuration into adapters, the alert channel and the orchestrator.

use anyhow::bail;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::change_detector::FirstRunPolicy;
use crate::config::{MonitorConfig, SmsConfig};
use crate::ingest::http::build_client;
use crate::ingest::providers::{
    bandsintown::BandsintownAdapter, countdown::CountdownAdapter, ticketmaster::TicketmasterAdapter,
};
use crate::ingest::types::SourceAdapter;
use crate::notify::{sms::TwilioSms, AlertDispatcher, LogChannel, Notifier};
use crate::scheduler::{Orchestrator, Pipeline, PipelineSettings};
use crate::store::StateStore;

/// Recipient label used when alerts only go to the log.
pub const LOG_RECIPIENT: &str = "log";

/// Twilio when all SMS secrets are set, otherwise the log-only channel.
pub fn build_dispatcher(cfg: &MonitorConfig) -> anyhow::Result<AlertDispatcher> {
    let dispatcher = match SmsConfig::from_env() {
        Some(sms) => {
            info!(from = %sms.from, to = %sms.to, "SMS alerts enabled");
            let channel = TwilioSms::new(
                sms.account_sid,
                sms.auth_token,
                sms.from,
                cfg.request_timeout(),
            )?;
            AlertDispatcher::new(Arc::new(channel) as Arc<dyn Notifier>, sms.to)
        }
        None => {
            warn!("Twilio secrets incomplete, alerts will only be logged");
            AlertDispatcher::new(Arc::new(LogChannel) as Arc<dyn Notifier>, LOG_RECIPIENT)
        }
    };
    Ok(dispatcher.with_max_items(cfg.max_items_per_message))
}

struct Planned {
    adapter: Arc<dyn SourceAdapter>,
    interval: Duration,
    first_run: FirstRunPolicy,
    notify_on_clear: bool,
}

/// Enabled sources that have what they need to run. Misconfigured ones are skipped with a warning.
fn plan_sources(cfg: &MonitorConfig) -> anyhow::Result<Vec<Planned>> {
    let client = build_client(cfg.request_timeout())?;
    let mut planned = Vec::new();

    let cd = &cfg.countdown;
    if cd.enabled {
        planned.push(Planned {
            adapter: Arc::new(CountdownAdapter::new(cd.url.clone(), client.clone())),
            interval: cfg.interval_for(cd.check_interval_secs),
            first_run: cd.first_run,
            notify_on_clear: cd.notify_on_clear,
        });
    }

    let bit = &cfg.bandsintown;
    if bit.enabled && bit.artists.is_empty() {
        warn!(source = "bandsintown", "no artists configured, source skipped");
    } else if bit.enabled {
        let adapter =
            BandsintownAdapter::new(client.clone(), &bit.base_url, bit.app_id.clone(), bit.artists.clone())?
                .with_spacing(Duration::from_millis(bit.request_spacing_ms));
        planned.push(Planned {
            adapter: Arc::new(adapter),
            interval: cfg.interval_for(bit.check_interval_secs),
            first_run: bit.first_run,
            notify_on_clear: bit.notify_on_clear,
        });
    }

    let tm = &cfg.ticketmaster;
    if tm.enabled {
        match tm.resolved_api_key() {
            None => warn!(source = "ticketmaster", "no API key, source skipped"),
            Some(_) if tm.artists.is_empty() => {
                warn!(source = "ticketmaster", "no artists configured, source skipped")
            }
            Some(key) => {
                let adapter =
                    TicketmasterAdapter::new(client.clone(), &tm.base_url, key, tm.artists.clone())?
                        .with_page_size(tm.page_size)
                        .with_spacing(Duration::from_millis(tm.request_spacing_ms));
                planned.push(Planned {
                    adapter: Arc::new(adapter),
                    interval: cfg.interval_for(tm.check_interval_secs),
                    first_run: tm.first_run,
                    notify_on_clear: tm.notify_on_clear,
                });
            }
        }
    }

    if planned.is_empty() {
        bail!("no source is enabled and runnable; check the configuration");
    }
    Ok(planned)
}

/// Build the orchestrator around a given dispatcher. Loads each source's state.
pub async fn build_orchestrator_with(
    cfg: &MonitorConfig,
    dispatcher: Arc<AlertDispatcher>,
) -> anyhow::Result<Orchestrator> {
    let planned = plan_sources(cfg)?;
    let store = StateStore::new(cfg.state_dir.clone());
    let mut orch = Orchestrator::new(dispatcher.clone(), cfg.shutdown_grace())
        .with_shutdown_notice(cfg.notify_on_shutdown);

    for p in planned {
        let settings = PipelineSettings::new(p.interval)
            .with_max_backoff(cfg.max_backoff())
            .with_first_run(p.first_run)
            .with_notify_on_clear(p.notify_on_clear);
        let pipeline = Pipeline::open(p.adapter, store.clone(), dispatcher.clone(), settings).await;
        info!(
            source = pipeline.source_id(),
            interval_secs = p.interval.as_secs(),
            "source registered"
        );
        orch.add_pipeline(pipeline);
    }
    Ok(orch)
}

pub async fn build_orchestrator(cfg: &MonitorConfig) -> anyhow::Result<Orchestrator> {
    let dispatcher = Arc::new(build_dispatcher(cfg)?);
    build_orchestrator_with(cfg, dispatcher).await
}
