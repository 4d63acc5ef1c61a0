// src/config/monitor.rs
use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::change_detector::FirstRunPolicy;
use crate::ingest::providers::{bandsintown, countdown, ticketmaster};

pub const ENV_CONFIG_PATH: &str = "MONITOR_CONFIG_PATH";
pub const ENV_TICKETMASTER_API_KEY: &str = "SECRET_TICKETMASTER_API_KEY";
pub const DEFAULT_TOML_PATH: &str = "config/monitor.toml";
pub const DEFAULT_JSON_PATH: &str = "config/monitor.json";

fn default_artists() -> Vec<String> {
    vec![
        "Taylor Swift".to_string(),
        "The 1975".to_string(),
        "Arctic Monkeys".to_string(),
    ]
}

fn default_spacing_ms() -> u64 {
    500
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CountdownSourceConfig {
    pub enabled: bool,
    pub url: String,
    pub first_run: FirstRunPolicy,
    /// Send a notice when a previously listed countdown disappears.
    pub notify_on_clear: bool,
    pub check_interval_secs: Option<u64>,
}

impl Default for CountdownSourceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            url: countdown::DEFAULT_STORE_URL.to_string(),
            first_run: FirstRunPolicy::Suppress,
            notify_on_clear: true,
            check_interval_secs: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BandsintownConfig {
    pub enabled: bool,
    pub artists: Vec<String>,
    pub app_id: String,
    pub base_url: String,
    pub first_run: FirstRunPolicy,
    pub notify_on_clear: bool,
    pub request_spacing_ms: u64,
    pub check_interval_secs: Option<u64>,
}

impl Default for BandsintownConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            artists: default_artists(),
            app_id: bandsintown::DEFAULT_APP_ID.to_string(),
            base_url: bandsintown::DEFAULT_BASE_URL.to_string(),
            first_run: FirstRunPolicy::Suppress,
            notify_on_clear: false,
            request_spacing_ms: default_spacing_ms(),
            check_interval_secs: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TicketmasterConfig {
    pub enabled: bool,
    pub artists: Vec<String>,
    /// Literal key, or "ENV" / absent to read `SECRET_TICKETMASTER_API_KEY`.
    pub api_key: Option<String>,
    pub base_url: String,
    pub page_size: u32,
    pub first_run: FirstRunPolicy,
    pub notify_on_clear: bool,
    pub request_spacing_ms: u64,
    pub check_interval_secs: Option<u64>,
}

impl Default for TicketmasterConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            artists: Vec::new(),
            api_key: None,
            base_url: ticketmaster::DEFAULT_BASE_URL.to_string(),
            page_size: ticketmaster::DEFAULT_PAGE_SIZE,
            first_run: FirstRunPolicy::Suppress,
            notify_on_clear: false,
            request_spacing_ms: default_spacing_ms(),
            check_interval_secs: None,
        }
    }
}

impl TicketmasterConfig {
    /// Configured key, falling back to the environment for "ENV" or a missing value.
    pub fn resolved_api_key(&self) -> Option<String> {
        match self.api_key.as_deref().map(str::trim) {
            Some(k) if !k.is_empty() && !k.eq_ignore_ascii_case("env") => Some(k.to_string()),
            _ => std::env::var(ENV_TICKETMASTER_API_KEY)
                .ok()
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty()),
        }
    }
}

/// Immutable process-wide configuration snapshot. Changes require a restart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub check_interval_secs: u64,
    pub max_backoff_secs: u64,
    pub request_timeout_secs: u64,
    pub shutdown_grace_secs: u64,
    pub state_dir: PathBuf,
    pub log_dir: Option<PathBuf>,
    pub metrics_addr: Option<SocketAddr>,
    pub notify_on_shutdown: bool,
    pub max_items_per_message: Option<usize>,
    pub countdown: CountdownSourceConfig,
    pub bandsintown: BandsintownConfig,
    pub ticketmaster: TicketmasterConfig,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            check_interval_secs: 300,
            max_backoff_secs: 3600,
            request_timeout_secs: 30,
            shutdown_grace_secs: 10,
            state_dir: PathBuf::from("data"),
            log_dir: None,
            metrics_addr: None,
            notify_on_shutdown: true,
            max_items_per_message: None,
            countdown: CountdownSourceConfig::default(),
            bandsintown: BandsintownConfig::default(),
            ticketmaster: TicketmasterConfig::default(),
        }
    }
}

impl MonitorConfig {
    /// Load from an explicit path. TOML or JSON, picked by extension.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading monitor config from {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let cfg = parse_config(&content, ext.as_str())
            .with_context(|| format!("parsing monitor config {}", path.display()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load using env var + fallbacks:
    /// 1) $MONITOR_CONFIG_PATH
    /// 2) config/monitor.toml
    /// 3) config/monitor.json
    /// 4) built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::load_from(&pb);
            } else {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
        }
        let toml_p = PathBuf::from(DEFAULT_TOML_PATH);
        if toml_p.exists() {
            return Self::load_from(&toml_p);
        }
        let json_p = PathBuf::from(DEFAULT_JSON_PATH);
        if json_p.exists() {
            return Self::load_from(&json_p);
        }
        Ok(Self::default())
    }

    pub fn validate(&self) -> Result<()> {
        if self.check_interval_secs == 0 {
            bail!("check_interval_secs must be > 0");
        }
        if self.request_timeout_secs == 0 {
            bail!("request_timeout_secs must be > 0");
        }
        if self.max_backoff_secs < self.check_interval_secs {
            bail!(
                "max_backoff_secs ({}) must be >= check_interval_secs ({})",
                self.max_backoff_secs,
                self.check_interval_secs
            );
        }
        let overrides = [
            ("countdown", self.countdown.check_interval_secs),
            ("bandsintown", self.bandsintown.check_interval_secs),
            ("ticketmaster", self.ticketmaster.check_interval_secs),
        ];
        for (name, secs) in overrides {
            if secs == Some(0) {
                bail!("{name}.check_interval_secs must be > 0");
            }
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_secs(self.max_backoff_secs)
    }

    /// Per-source override, else the global interval.
    pub fn interval_for(&self, override_secs: Option<u64>) -> Duration {
        Duration::from_secs(override_secs.unwrap_or(self.check_interval_secs))
    }
}

fn parse_config(s: &str, hint_ext: &str) -> Result<MonitorConfig> {
    match hint_ext {
        "toml" => Ok(toml::from_str(s)?),
        "json" => Ok(serde_json::from_str(s)?),
        _ => {
            // No usable extension: JSON if it looks like an object, TOML otherwise.
            if s.trim_start().starts_with('{') {
                Ok(serde_json::from_str(s)?)
            } else {
                Ok(toml::from_str(s)?)
            }
        }
    }
}
