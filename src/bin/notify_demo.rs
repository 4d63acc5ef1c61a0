//! Sends a sample alert through the configured channel (SMS when the Twilio
//! secrets are set, the log otherwise). Handy for checking credentials.

use chrono::Utc;
use tour_watch::{bootstrap, MonitorConfig, MonitoredItem, NotificationBatch, SourceKind};

fn sample_items() -> Vec<MonitoredItem> {
    let now = Utc::now();
    [
        ("Taylor Swift", "Wembley Stadium", "London, United Kingdom"),
        ("The 1975", "Madison Square Garden", "New York, NY"),
    ]
    .into_iter()
    .enumerate()
    .map(|(i, (artist, venue, location))| {
        MonitoredItem::new(
            SourceKind::Bandsintown,
            format!("bandsintown:demo-{i}"),
            vec![
                ("Artist".to_string(), artist.to_string()),
                ("Venue".to_string(), venue.to_string()),
                ("Location".to_string(), location.to_string()),
                ("Date".to_string(), now.format("%Y-%m-%d").to_string()),
            ],
            now,
        )
    })
    .collect()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt().with_target(false).init();

    let cfg = MonitorConfig::load_default()?;
    let dispatcher = bootstrap::build_dispatcher(&cfg)?;

    if let Some(batch) = NotificationBatch::new(SourceKind::Bandsintown, sample_items()) {
        dispatcher.notify(&batch).await?;
    }

    println!("notify-demo done via {}", dispatcher.channel_name());
    Ok(())
}
