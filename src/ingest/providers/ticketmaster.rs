// src/ingest/providers/ticketmaster.rs
use anyhow::{bail, Context};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Url};
use serde::Deserialize;
use std::time::Duration;

use crate::error::SourceFetchError;
use crate::ingest::types::{FetchOutcome, MonitoredItem, SourceAdapter, SourceKind};
use crate::ingest::{composite_id, http, normalize_text, ArtistSweep};

pub const DEFAULT_BASE_URL: &str = "https://app.ticketmaster.com";
pub const DEFAULT_PAGE_SIZE: u32 = 20;

#[derive(Debug, Deserialize)]
struct TmResponse {
    #[serde(rename = "_embedded", default)]
    embedded: Option<TmEmbedded>,
}

#[derive(Debug, Deserialize)]
struct TmEmbedded {
    #[serde(default)]
    events: Vec<TmEvent>,
}

#[derive(Debug, Deserialize)]
struct TmEvent {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    dates: Option<TmDates>,
    #[serde(rename = "_embedded", default)]
    embedded: Option<TmEventEmbedded>,
}

#[derive(Debug, Deserialize)]
struct TmDates {
    #[serde(default)]
    start: Option<TmStart>,
}

#[derive(Debug, Deserialize)]
struct TmStart {
    #[serde(rename = "localDate", default)]
    local_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TmEventEmbedded {
    #[serde(default)]
    venues: Vec<TmVenue>,
}

#[derive(Debug, Deserialize)]
struct TmVenue {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    city: Option<TmNamed>,
    #[serde(default)]
    state: Option<TmState>,
}

#[derive(Debug, Deserialize)]
struct TmNamed {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TmState {
    #[serde(rename = "stateCode", default)]
    state_code: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

fn or_unknown(s: String) -> String {
    if s.trim().is_empty() {
        "Unknown".to_string()
    } else {
        s
    }
}

/// Map one artist's discovery response to items. A missing `_embedded` means no events.
pub fn parse_events(
    artist: &str,
    body: &str,
    observed_at: DateTime<Utc>,
) -> Result<Vec<MonitoredItem>, SourceFetchError> {
    let resp: TmResponse = serde_json::from_str(body.trim())
        .map_err(|e| SourceFetchError::Parse(format!("ticketmaster body: {e}")))?;
    let events = resp.embedded.map(|e| e.events).unwrap_or_default();

    let mut out = Vec::with_capacity(events.len());
    for ev in events {
        let name = normalize_text(ev.name.as_deref().unwrap_or_default());
        let date = ev
            .dates
            .and_then(|d| d.start)
            .and_then(|s| s.local_date)
            .unwrap_or_default();
        let venue = ev.embedded.and_then(|e| e.venues.into_iter().next());
        let (venue_name, location) = match venue {
            Some(v) => {
                let city = v.city.and_then(|c| c.name).unwrap_or_default();
                let state = v
                    .state
                    .and_then(|s| s.state_code.or(s.name))
                    .unwrap_or_default();
                let location = [city.trim(), state.trim()]
                    .into_iter()
                    .filter(|p| !p.is_empty())
                    .collect::<Vec<_>>()
                    .join(", ");
                (normalize_text(v.name.as_deref().unwrap_or_default()), location)
            }
            None => (String::new(), String::new()),
        };

        let id = match ev.id.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(id) => format!("ticketmaster:{id}"),
            None => composite_id("ticketmaster", &[artist, &venue_name, &date]),
        };

        let mut fields = vec![
            ("Artist".to_string(), artist.to_string()),
            ("Event".to_string(), or_unknown(name)),
            ("Venue".to_string(), or_unknown(venue_name)),
            ("Location".to_string(), or_unknown(location)),
            ("Date".to_string(), or_unknown(date)),
        ];
        if let Some(url) = ev.url.filter(|u| !u.trim().is_empty()) {
            fields.push(("Link".to_string(), url));
        }
        out.push(MonitoredItem::new(
            SourceKind::Ticketmaster,
            id,
            fields,
            observed_at,
        ));
    }
    Ok(out)
}

pub struct TicketmasterAdapter {
    client: Client,
    endpoint: Url,
    api_key: String,
    artists: Vec<String>,
    page_size: u32,
    spacing: Duration,
}

impl TicketmasterAdapter {
    pub fn new(
        client: Client,
        base_url: &str,
        api_key: impl Into<String>,
        artists: Vec<String>,
    ) -> anyhow::Result<Self> {
        let base = Url::parse(base_url)
            .with_context(|| format!("invalid ticketmaster base_url {base_url}"))?;
        if base.cannot_be_a_base() {
            bail!("ticketmaster base_url {base_url} cannot carry a path");
        }
        let mut endpoint = base;
        if let Ok(mut segs) = endpoint.path_segments_mut() {
            segs.pop_if_empty()
                .extend(["discovery", "v2", "events.json"]);
        }
        Ok(Self {
            client,
            endpoint,
            api_key: api_key.into(),
            artists,
            page_size: DEFAULT_PAGE_SIZE,
            spacing: Duration::from_millis(500),
        })
    }

    pub fn with_page_size(mut self, size: u32) -> Self {
        self.page_size = size.max(1);
        self
    }

    pub fn with_spacing(mut self, spacing: Duration) -> Self {
        self.spacing = spacing;
        self
    }

    async fn fetch_artist(
        &self,
        artist: &str,
        observed_at: DateTime<Utc>,
    ) -> Result<Vec<MonitoredItem>, SourceFetchError> {
        let size = self.page_size.to_string();
        let req = self.client.get(self.endpoint.clone()).query(&[
            ("apikey", self.api_key.as_str()),
            ("keyword", artist),
            ("classificationName", "Music"),
            ("size", size.as_str()),
        ]);
        let body = http::fetch_text(req).await?;
        parse_events(artist, &body, observed_at)
    }
}

#[async_trait]
impl SourceAdapter for TicketmasterAdapter {
    fn kind(&self) -> SourceKind {
        SourceKind::Ticketmaster
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_discovery_payload() {
        let body = r#"{
          "_embedded": {"events": [{
            "id": "vvG1zZ9",
            "name": "The Eras Tour",
            "url": "https://www.ticketmaster.com/event/vvG1zZ9",
            "dates": {"start": {"localDate": "2026-07-18"}},
            "_embedded": {"venues": [{
              "name": "Soldier Field",
              "city": {"name": "Chicago"},
              "state": {"stateCode": "IL"}
            }]}
          }]},
          "page": {"size": 20, "totalElements": 1}
        }"#;
        let items = parse_events("Taylor Swift", body, Utc::now()).unwrap();
        assert_eq!(items.len(), 1);
        let it = &items[0];
        assert_eq!(it.id(), "ticketmaster:vvG1zZ9");
        assert_eq!(it.field("Event"), Some("The Eras Tour"));
        assert_eq!(it.field("Venue"), Some("Soldier Field"));
        assert_eq!(it.field("Location"), Some("Chicago, IL"));
        assert_eq!(it.field("Date"), Some("2026-07-18"));
    }

    #[test]
    fn no_embedded_means_no_events() {
        let body = r#"{"page":{"size":20,"totalElements":0}}"#;
        assert!(parse_events("Nobody", body, Utc::now()).unwrap().is_empty());
    }

    #[test]
    fn array_body_is_a_parse_error() {
        let err = parse_events("X", "[]", Utc::now()).unwrap_err();
        assert!(matches!(err, SourceFetchError::Parse(_)));
    }

    #[test]
    fn endpoint_is_built_from_base() {
        let a = TicketmasterAdapter::new(Client::new(), "https://app.ticketmaster.com/", "k", vec![])
            .unwrap();
        assert_eq!(
            a.endpoint.as_str(),
            "https://app.ticketmaster.com/discovery/v2/events.json"
        );
    }
}
