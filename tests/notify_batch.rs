// tests/notify_batch.rs
mod support;

use support::{item, RecordingChannel};
use tour_watch::{AlertDispatcher, NotificationBatch, SourceKind};

#[tokio::test]
async fn three_new_items_make_one_message() {
    let channel = RecordingChannel::new();
    let dispatcher = AlertDispatcher::new(channel.clone(), "+15550002");
    let batch = NotificationBatch::new(
        SourceKind::Bandsintown,
        vec![
            item(SourceKind::Bandsintown, "bandsintown:1", "Wembley Stadium"),
            item(SourceKind::Bandsintown, "bandsintown:2", "Croke Park"),
            item(SourceKind::Bandsintown, "bandsintown:3", "Anfield"),
        ],
    )
    .unwrap();

    dispatcher.notify(&batch).await.unwrap();

    let msgs = channel.messages();
    assert_eq!(msgs.len(), 1);
    let m = &msgs[0];
    assert!(m.contains("3 new show(s)"));
    let pos: Vec<usize> = ["Wembley Stadium", "Croke Park", "Anfield"]
        .iter()
        .map(|v| m.find(v).unwrap())
        .collect();
    assert!(pos.windows(2).all(|w| w[0] < w[1]));
}

#[tokio::test]
async fn cap_lists_the_first_items_and_counts_the_rest() {
    let channel = RecordingChannel::new();
    let dispatcher = AlertDispatcher::new(channel.clone(), "+15550002").with_max_items(Some(1));
    let batch = NotificationBatch::new(
        SourceKind::Ticketmaster,
        vec![
            item(SourceKind::Ticketmaster, "ticketmaster:a", "Soldier Field"),
            item(SourceKind::Ticketmaster, "ticketmaster:b", "MetLife Stadium"),
            item(SourceKind::Ticketmaster, "ticketmaster:c", "SoFi Stadium"),
        ],
    )
    .unwrap();

    dispatcher.notify(&batch).await.unwrap();

    let m = &channel.messages()[0];
    assert!(m.contains("Soldier Field"));
    assert!(!m.contains("MetLife"));
    assert!(m.ends_with("...and 2 more!"));
}

#[test]
fn empty_batches_are_not_built() {
    assert!(NotificationBatch::new(SourceKind::Countdown, Vec::new()).is_none());
}

#[tokio::test]
async fn delivery_errors_surface_to_the_caller() {
    let dispatcher = AlertDispatcher::new(RecordingChannel::failing(), "+15550002");
    assert!(dispatcher.notify_shutdown().await.is_err());
}
