// src/logging.rs
use anyhow::Context;
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::MonitorConfig;

/// Used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "tour_watch=info,warn";
pub const ENV_LOG_FORMAT: &str = "LOG_FORMAT";
pub const LOG_FILE_NAME: &str = "monitor.log";

fn json_requested() -> bool {
    std::env::var(ENV_LOG_FORMAT).is_ok_and(|v| v.trim().eq_ignore_ascii_case("json"))
}

/// Install the global subscriber: stdout (compact, or JSON with `LOG_FORMAT=json`)
/// plus an append-only JSON file under `log_dir` when one is configured.
pub fn init(cfg: &MonitorConfig) -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let stdout = if json_requested() {
        fmt::layer().json().with_current_span(true).boxed()
    } else {
        fmt::layer().compact().boxed()
    };

    let file = match &cfg.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("create log dir {}", dir.display()))?;
            let path = dir.join(LOG_FILE_NAME);
            let f = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("open log file {}", path.display()))?;
            Some(
                fmt::layer()
                    .json()
                    .with_ansi(false)
                    .with_current_span(true)
                    .with_writer(Mutex::new(f)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout)
        .with(file)
        .try_init()
        .context("global tracing subscriber already set")?;
    Ok(())
}
