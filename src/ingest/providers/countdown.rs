// src/ingest/providers/countdown.rs
//! Store countdown page: scrape the HTML for timers, launch dates and
//! "coming soon" style announcements.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use sha2::{Digest, Sha256};

use crate::error::SourceFetchError;
use crate::ingest::types::{FetchOutcome, MonitoredItem, SourceAdapter, SourceKind};
use crate::ingest::{dedup_by_id, http, normalize_text, truncate_chars};

pub const DEFAULT_STORE_URL: &str = "https://store.taylorswift.com";

const PREVIEW_CHARS: usize = 200;

static RE_SCRIPT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<script\b[^>]*>(.*?)</script\s*>").unwrap());
static RE_STYLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<style\b[^>]*>.*?</style\s*>").unwrap());
static RE_OPEN_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<([a-z][a-z0-9-]*)\b([^>]*)>").unwrap());
static RE_CLASS_OR_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)\b(?:class|id)\s*=\s*["']([^"']*)["']"#).unwrap());
static RE_TIMER_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)countdown|timer|clock").unwrap());
static RE_DATA_ATTR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\bdata-(countdown|timer|launch-date)\s*=\s*["']([^"']*)["']"#).unwrap()
});
static RE_TEXT_NODE: Lazy<Regex> = Lazy::new(|| Regex::new(r">([^<]+)<").unwrap());
static RE_ANNOUNCEMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)countdown|coming soon|launching|drops in").unwrap());
static RE_SCRIPT_HINT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)countdown|timer|launch|setinterval").unwrap());
static RE_DATE_LITERAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b\d{4}-\d{2}-\d{2}(?:[T ]\d{2}:\d{2}(?::\d{2})?)?").unwrap()
});
static RE_DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Finding {
    TimerElement,
    Announcement,
    LaunchDate,
    ScriptedLaunch,
}

impl Finding {
    fn label(&self) -> &'static str {
        match self {
            Finding::TimerElement => "timer element",
            Finding::Announcement => "announcement",
            Finding::LaunchDate => "launch date",
            Finding::ScriptedLaunch => "scripted launch",
        }
    }
}

/// Timer text ticks every second; mask digit runs so the same countdown keeps its id.
fn mask_digits(s: &str) -> String {
    RE_DIGITS.replace_all(s, "#").to_string()
}

fn item_id(finding: Finding, fingerprint: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(finding.label().as_bytes());
    hasher.update([0x1f]);
    hasher.update(fingerprint.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(26);
    out.push_str("countdown:");
    for b in digest.iter().take(8) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

fn make_item(
    finding: Finding,
    fingerprint: &str,
    preview_label: &str,
    preview: &str,
    observed_at: DateTime<Utc>,
) -> MonitoredItem {
    let mut fields = vec![("Type".to_string(), finding.label().to_string())];
    if !preview.is_empty() {
        fields.push((preview_label.to_string(), preview.to_string()));
    }
    MonitoredItem::new(
        SourceKind::Countdown,
        item_id(finding, fingerprint),
        fields,
        observed_at,
    )
}

/// Pure HTML scan. Order: timer elements, announcements, data attributes, scripts.
pub fn parse_countdowns(html: &str, observed_at: DateTime<Utc>) -> Vec<MonitoredItem> {
    let scripts: Vec<String> = RE_SCRIPT
        .captures_iter(html)
        .filter_map(|c| c.get(1).map(|m| m.as_str().to_string()))
        .collect();
    let without_scripts = RE_SCRIPT.replace_all(html, "");
    let markup = RE_STYLE.replace_all(&without_scripts, "").to_string();
    // ASCII lowercasing keeps byte offsets identical.
    let lowered = markup.to_ascii_lowercase();

    let mut out = Vec::new();

    // 1) elements named like a timer
    for caps in RE_OPEN_TAG.captures_iter(&markup) {
        let (Some(whole), Some(tag), Some(attrs)) = (caps.get(0), caps.get(1), caps.get(2)) else {
            continue;
        };
        let names: Vec<&str> = RE_CLASS_OR_ID
            .captures_iter(attrs.as_str())
            .filter_map(|c| c.get(1).map(|m| m.as_str()))
            .filter(|v| RE_TIMER_NAME.is_match(v))
            .collect();
        if names.is_empty() {
            continue;
        }
        let start = whole.end();
        let close = format!("</{}", tag.as_str().to_ascii_lowercase());
        let end = lowered[start..]
            .find(&close)
            .map(|i| start + i)
            .unwrap_or(start);
        let text = truncate_chars(&normalize_text(&markup[start..end]), PREVIEW_CHARS);
        let fingerprint = format!(
            "{}#{}|{}",
            tag.as_str().to_ascii_lowercase(),
            names.join(" "),
            mask_digits(&text)
        );
        out.push(make_item(
            Finding::TimerElement,
            &fingerprint,
            "Preview",
            &text,
            observed_at,
        ));
    }

    // 2) announcement text
    for caps in RE_TEXT_NODE.captures_iter(&markup) {
        let Some(raw) = caps.get(1) else { continue };
        if !RE_ANNOUNCEMENT.is_match(raw.as_str()) {
            continue;
        }
        let text = truncate_chars(&normalize_text(raw.as_str()), PREVIEW_CHARS);
        if text.is_empty() {
            continue;
        }
        out.push(make_item(
            Finding::Announcement,
            &mask_digits(&text.to_lowercase()),
            "Preview",
            &text,
            observed_at,
        ));
    }

    // 3) launch data attributes, taken verbatim
    for caps in RE_DATA_ATTR.captures_iter(&markup) {
        let (Some(name), Some(value)) = (caps.get(1), caps.get(2)) else {
            continue;
        };
        let value = truncate_chars(&normalize_text(value.as_str()), PREVIEW_CHARS);
        let fingerprint = format!("{}={}", name.as_str().to_ascii_lowercase(), value);
        out.push(make_item(
            Finding::LaunchDate,
            &fingerprint,
            "Value",
            &value,
            observed_at,
        ));
    }

    // 4) launch timestamps embedded in countdown scripts
    for script in scripts.iter().filter(|s| RE_SCRIPT_HINT.is_match(s)) {
        for m in RE_DATE_LITERAL.find_iter(script) {
            out.push(make_item(
                Finding::ScriptedLaunch,
                m.as_str(),
                "Value",
                m.as_str(),
                observed_at,
            ));
        }
    }

    dedup_by_id(out)
}

pub struct CountdownAdapter {
    url: String,
    client: Client,
}

impl CountdownAdapter {
    pub fn new(url: impl Into<String>, client: Client) -> Self {
        Self {
            url: url.into(),
            client,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl SourceAdapter for CountdownAdapter {
    fn kind(&self) -> SourceKind {
        SourceKind::Countdown
    }

    async fn fetch(&self) -> Result<FetchOutcome, SourceFetchError> {
        tracing::debug!(url = %self.url, "checking store page");
        let html = http::fetch_text(self.client.get(&self.url)).await?;
        if html.trim().is_empty() {
            return Err(SourceFetchError::Parse("store page body was empty".into()));
        }
        Ok(FetchOutcome::new(parse_countdowns(&html, Utc::now())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(items: &[MonitoredItem]) -> Vec<String> {
        items.iter().map(|i| i.id().to_string()).collect()
    }

    #[test]
    fn ticking_timer_keeps_its_id() {
        let now = Utc::now();
        let a = parse_countdowns(r#"<div class="hero-countdown">02d 11:04:59</div>"#, now);
        let b = parse_countdowns(r#"<div class="hero-countdown">02d 11:04:12</div>"#, now);
        assert_eq!(a.len(), 1);
        assert_eq!(ids(&a), ids(&b));
        assert_eq!(a[0].field("Preview"), Some("02d 11:04:59"));
    }

    #[test]
    fn launch_dates_are_taken_verbatim() {
        let now = Utc::now();
        let a = parse_countdowns(r#"<span data-launch-date="2026-10-24T00:00"></span>"#, now);
        let b = parse_countdowns(r#"<span data-launch-date="2026-11-01T00:00"></span>"#, now);
        assert_eq!(a.len(), 1);
        assert_ne!(ids(&a), ids(&b));
        assert_eq!(a[0].field("Type"), Some("launch date"));
    }

    #[test]
    fn plain_page_has_no_countdowns() {
        let html = "<html><body><h1>Shop</h1><p>New merch</p></body></html>";
        assert!(parse_countdowns(html, Utc::now()).is_empty());
    }

    #[test]
    fn style_blocks_are_not_announcements() {
        let html = "<style>.countdown{color:red}</style><p>Hello</p>";
        assert!(parse_countdowns(html, Utc::now()).is_empty());
    }

    #[test]
    fn scripted_launch_dates_are_found() {
        let html = r#"<script>var launch = new Date("2026-12-13T09:00:00"); startCountdown(launch);</script>"#;
        let items = parse_countdowns(html, Utc::now());
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].field("Value"), Some("2026-12-13T09:00:00"));
    }

    #[test]
    fn unrelated_scripts_are_ignored() {
        let html = r#"<script>var built = "2026-01-01";</script>"#;
        assert!(parse_countdowns(html, Utc::now()).is_empty());
    }
}
