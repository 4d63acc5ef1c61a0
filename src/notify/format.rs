// src/notify/format.rs
//! Plain-text alert bodies (SMS friendly: no markup, short lines).

use super::NotificationBatch;
use crate::ingest::types::SourceKind;

pub const SHUTDOWN_MESSAGE: &str = "🛑 Music monitor stopped";

fn headline(source: SourceKind, count: usize) -> String {
    match source {
        SourceKind::Countdown => {
            format!("🚨 NEW countdown detected!\n\nFound {count} countdown(s) on the store page:")
        }
        SourceKind::Bandsintown => format!("🎵 NEW CONCERT ALERT!\n\n{count} new show(s) announced:"),
        SourceKind::Ticketmaster => {
            format!("🎟️ NEW TICKETMASTER EVENT!\n\n{count} new event(s) found:")
        }
    }
}

/// Every item's display fields in the order received, optionally capped.
pub fn render_batch(batch: &NotificationBatch, max_items: Option<usize>) -> String {
    let total = batch.len();
    let listed = max_items.map_or(total, |m| m.min(total));

    let mut out = headline(batch.source(), total);
    for item in batch.items().iter().take(listed) {
        out.push_str("\n\n");
        let lines: Vec<String> = item
            .display_fields()
            .iter()
            .map(|(label, text)| format!("{label}: {text}"))
            .collect();
        out.push_str(&lines.join("\n"));
    }
    if listed < total {
        out.push_str(&format!("\n\n...and {} more!", total - listed));
    }
    out
}

pub fn render_startup(sources: &[SourceKind]) -> String {
    let names = sources
        .iter()
        .map(|s| s.label())
        .collect::<Vec<_>>()
        .join(", ");
    format!("🎵 Music monitor started!\n\nActive monitors:\n{names}\n\nYou'll be notified of new events.")
}

pub fn render_cleared(source: SourceKind) -> String {
    match source {
        SourceKind::Countdown => {
            "ℹ️ The store countdown has ended or been removed from the page.".to_string()
        }
        other => format!("ℹ️ {}: no listings right now, earlier ones were removed.", other.label()),
    }
}
