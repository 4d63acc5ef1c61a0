// src/ingest/mod.rs
pub mod http;
pub mod providers;
pub mod types;

use crate::error::SourceFetchError;
use crate::ingest::types::{FetchOutcome, MonitoredItem};
use std::collections::HashSet;
use std::time::Duration;

/// Normalize scraped/API text: decode entities, strip tags, collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, " ").to_string();

    // 3) Normalize curly quotes to ASCII
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 4) Collapse whitespace
    static RE_WS: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").to_string();
    out.trim().to_string()
}

/// Cap at `max` chars (not bytes).
pub fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        s.chars().take(max).collect()
    }
}

/// Keep the first occurrence of every id, preserving fetch order.
pub fn dedup_by_id(items: Vec<MonitoredItem>) -> Vec<MonitoredItem> {
    let mut seen = HashSet::with_capacity(items.len());
    items
        .into_iter()
        .filter(|it| seen.insert(it.id().to_string()))
        .collect()
}

/// Accumulates per-artist results for artist-driven sources.
///
/// A single artist failing is a warning; the sweep only fails when nothing
/// succeeded. Once throttled, remaining artists are skipped for this cycle.
#[derive(Debug, Default)]
pub(crate) struct ArtistSweep {
    items: Vec<MonitoredItem>,
    warnings: Vec<String>,
    succeeded: usize,
    first_failure: Option<SourceFetchError>,
    throttled: Option<Option<Duration>>,
}

impl ArtistSweep {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn is_throttled(&self) -> bool {
        self.throttled.is_some()
    }

    pub(crate) fn record(
        &mut self,
        artist: &str,
        result: Result<Vec<MonitoredItem>, SourceFetchError>,
    ) {
        match result {
            Ok(mut items) => {
                self.succeeded += 1;
                self.items.append(&mut items);
            }
            Err(e) => {
                tracing::warn!(artist, error = %e, kind = e.kind(), "artist query failed");
                self.warnings.push(format!("{artist}: {e}"));
                if let SourceFetchError::RateLimited { retry_after } = &e {
                    self.throttled = Some(*retry_after);
                }
                if self.first_failure.is_none() {
                    self.first_failure = Some(e);
                }
            }
        }
    }

    pub(crate) fn skip(&mut self, artist: &str) {
        self.warnings
            .push(format!("{artist}: skipped, source is throttling"));
    }

    pub(crate) fn finish(self) -> Result<FetchOutcome, SourceFetchError> {
        if self.succeeded == 0 {
            if let Some(retry_after) = self.throttled {
                return Err(SourceFetchError::RateLimited { retry_after });
            }
            if let Some(e) = self.first_failure {
                return Err(e);
            }
        }
        Ok(FetchOutcome {
            items: dedup_by_id(self.items),
            warnings: self.warnings,
        })
    }
}

/// Composite fallback id for listings that come without a stable upstream id.
pub(crate) fn composite_id(prefix: &str, parts: &[&str]) -> String {
    let joined = parts
        .iter()
        .map(|p| p.trim().to_lowercase())
        .collect::<Vec<_>>()
        .join("|");
    format!("{prefix}:{joined}")
}
