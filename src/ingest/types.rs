// src/ingest/types.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::SourceFetchError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Countdown,
    Bandsintown,
    Ticketmaster,
}

impl SourceKind {
    /// Stable key used for state files, metrics labels and log fields.
    pub fn id(&self) -> &'static str {
        match self {
            SourceKind::Countdown => "countdown",
            SourceKind::Bandsintown => "bandsintown",
            SourceKind::Ticketmaster => "ticketmaster",
        }
    }

    /// Human name used in messages.
    pub fn label(&self) -> &'static str {
        match self {
            SourceKind::Countdown => "Store countdown",
            SourceKind::Bandsintown => "Bandsintown",
            SourceKind::Ticketmaster => "Ticketmaster",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// One observed item (a countdown instance or a concert listing).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitoredItem {
    id: String,
    source: SourceKind,
    display_fields: Vec<(String, String)>, // label -> text, in render order
    observed_at: DateTime<Utc>,
}

impl MonitoredItem {
    pub fn new(
        source: SourceKind,
        id: impl Into<String>,
        display_fields: Vec<(String, String)>,
        observed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            source,
            display_fields,
            observed_at,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn source(&self) -> SourceKind {
        self.source
    }

    pub fn display_fields(&self) -> &[(String, String)] {
        &self.display_fields
    }

    pub fn field(&self, label: &str) -> Option<&str> {
        self.display_fields
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, v)| v.as_str())
    }

    pub fn observed_at(&self) -> DateTime<Utc> {
        self.observed_at
    }
}

/// Result of a successful fetch: items in fetch order plus non-fatal warnings.
#[derive(Debug, Clone, Default)]
pub struct FetchOutcome {
    pub items: Vec<MonitoredItem>,
    pub warnings: Vec<String>,
}

impl FetchOutcome {
    pub fn new(items: Vec<MonitoredItem>) -> Self {
        Self {
            items,
            warnings: Vec::new(),
        }
    }
}

#[async_trait::async_trait]
pub trait SourceAdapter: Send + Sync {
    fn kind(&self) -> SourceKind;
    async fn fetch(&self) -> Result<FetchOutcome, SourceFetchError>;
}
