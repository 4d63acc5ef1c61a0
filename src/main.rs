//! tour-watch: binary entrypoint.
//! Loads config, starts logging and metrics, then runs every source until Ctrl-C or SIGTERM.

use anyhow::Context;
use tour_watch::{bootstrap, logging, metrics, MonitorConfig, ShutdownHandle};

async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "ctrl-c handler failed");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let term = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "SIGTERM handler failed");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let term = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("ctrl-c received"),
        _ = term => tracing::info!("SIGTERM received"),
    }
}

fn spawn_signal_listener(handle: ShutdownHandle) {
    tokio::spawn(async move {
        wait_for_signal().await;
        handle.trigger();
    });
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op when the file is absent.
    let _ = dotenvy::dotenv();

    let cfg = MonitorConfig::load_default().context("loading monitor config")?;
    logging::init(&cfg)?;

    if let Some(addr) = cfg.metrics_addr {
        metrics::install_exporter(addr)?;
    } else {
        metrics::ensure_described();
    }

    let orchestrator = bootstrap::build_orchestrator(&cfg).await?;
    spawn_signal_listener(orchestrator.shutdown_handle());

    let summary = orchestrator.run().await;
    if summary.aborted > 0 || summary.panicked > 0 {
        tracing::warn!(?summary, "some pipelines did not stop cleanly");
    }
    Ok(())
}
