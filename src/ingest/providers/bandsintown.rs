// src/ingest/providers/bandsintown.rs
use anyhow::{bail, Context};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Url};
use serde::Deserialize;
use std::time::Duration;

use crate::error::SourceFetchError;
use crate::ingest::types::{FetchOutcome, MonitoredItem, SourceAdapter, SourceKind};
use crate::ingest::{composite_id, http, normalize_text, ArtistSweep};

pub const DEFAULT_BASE_URL: &str = "https://rest.bandsintown.com";
pub const DEFAULT_APP_ID: &str = "unified_monitor";

// --- tolerant response shapes ---

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum BitResponse {
    Events(Vec<BitEvent>),
    Failure {
        #[serde(alias = "errorMessage", alias = "message")]
        error: String,
    },
}

#[derive(Debug, Deserialize)]
struct BitEvent {
    #[serde(default)]
    id: Option<serde_json::Value>,
    #[serde(default)]
    datetime: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    venue: Option<BitVenue>,
}

#[derive(Debug, Default, Deserialize)]
struct BitVenue {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    city: Option<String>,
    #[serde(default)]
    region: Option<String>,
    #[serde(default)]
    country: Option<String>,
}

impl BitVenue {
    fn location(&self) -> String {
        if let Some(loc) = self.location.as_deref().filter(|s| !s.trim().is_empty()) {
            return loc.trim().to_string();
        }
        [&self.city, &self.region, &self.country]
            .iter()
            .filter_map(|p| p.as_deref())
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

fn event_id(v: &serde_json::Value) -> Option<String> {
    match v {
        serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn or_unknown(s: &str) -> String {
    if s.trim().is_empty() {
        "Unknown".to_string()
    } else {
        s.to_string()
    }
}

/// Map one artist's response body to items. Error objects count as a failure.
pub fn parse_events(
    artist: &str,
    body: &str,
    observed_at: DateTime<Utc>,
) -> Result<Vec<MonitoredItem>, SourceFetchError> {
    let resp: BitResponse = serde_json::from_str(body.trim())
        .map_err(|e| SourceFetchError::Parse(format!("bandsintown body: {e}")))?;

    let events = match resp {
        BitResponse::Events(events) => events,
        BitResponse::Failure { error } => {
            return Err(SourceFetchError::Parse(format!(
                "bandsintown error: {}",
                normalize_text(&error)
            )))
        }
    };

    let mut out = Vec::with_capacity(events.len());
    for ev in events {
        let venue = ev.venue.unwrap_or_default();
        let venue_name = normalize_text(venue.name.as_deref().unwrap_or_default());
        let location = normalize_text(&venue.location());
        let datetime = ev.datetime.unwrap_or_default();
        let date = datetime.split('T').next().unwrap_or_default().to_string();

        let id = match ev.id.as_ref().and_then(event_id) {
            Some(id) => format!("bandsintown:{id}"),
            None => composite_id("bandsintown", &[artist, &venue_name, &datetime]),
        };

        let mut fields = vec![
            ("Artist".to_string(), artist.to_string()),
            ("Venue".to_string(), or_unknown(&venue_name)),
            ("Location".to_string(), or_unknown(&location)),
            ("Date".to_string(), or_unknown(&date)),
        ];
        if let Some(url) = ev.url.filter(|u| !u.trim().is_empty()) {
            fields.push(("Link".to_string(), url));
        }
        out.push(MonitoredItem::new(
            SourceKind::Bandsintown,
            id,
            fields,
            observed_at,
        ));
    }
    Ok(out)
}

pub struct BandsintownAdapter {
    client: Client,
    base: Url,
    app_id: String,
    artists: Vec<String>,
    spacing: Duration,
}

impl BandsintownAdapter {
    pub fn new(
        client: Client,
        base_url: &str,
        app_id: impl Into<String>,
        artists: Vec<String>,
    ) -> anyhow::Result<Self> {
        let base = Url::parse(base_url)
            .with_context(|| format!("invalid bandsintown base_url {base_url}"))?;
        if base.cannot_be_a_base() {
            bail!("bandsintown base_url {base_url} cannot carry a path");
        }
        Ok(Self {
            client,
            base,
            app_id: app_id.into(),
            artists,
            spacing: Duration::from_millis(500),
        })
    }

    /// Pause between artist queries.
    pub fn with_spacing(mut self, spacing: Duration) -> Self {
        self.spacing = spacing;
        self
    }

    fn artist_url(&self, artist: &str) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut segs) = url.path_segments_mut() {
            segs.pop_if_empty().extend(["artists", artist, "events"]);
        }
        url.query_pairs_mut().append_pair("app_id", &self.app_id);
        url
    }

    async fn fetch_artist(
        &self,
        artist: &str,
        observed_at: DateTime<Utc>,
    ) -> Result<Vec<MonitoredItem>, SourceFetchError> {
        let body = http::fetch_text(self.client.get(self.artist_url(artist))).await?;
        parse_events(artist, &body, observed_at)
    }
}

#[async_trait]
impl SourceAdapter for BandsintownAdapter {
    fn kind(&self) -> SourceKind {
        SourceKind::Bandsintown
    }

    async fn fetch(&self) -> Result<FetchOutcome, SourceFetchError> {
        let observed_at = Utc::now();
        let mut sweep = ArtistSweep::new();
        for (i, artist) in self.artists.iter().enumerate() {
            if sweep.is_throttled() {
                sweep.skip(artist);
                continue;
            }
            if i > 0 && !self.spacing.is_zero() {
                tokio::time::sleep(self.spacing).await;
            }
            let result = self.fetch_artist(artist, observed_at).await;
            sweep.record(artist, result);
        }
        sweep.finish()
    }
}
