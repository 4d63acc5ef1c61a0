// tests/state_store.rs
use chrono::Utc;
use std::fs;
use tour_watch::{PersistError, SourceState, StateStore};

fn state_with(ids: &[&str]) -> SourceState {
    let mut st = SourceState::default();
    st.seen_ids.extend(ids.iter().map(|s| s.to_string()));
    st.present_ids = st.seen_ids.clone();
    st.last_checked_at = Some(Utc::now());
    st
}

#[tokio::test]
async fn interrupted_write_leaves_previous_state_readable() {
    let tmp = tempfile::tempdir().unwrap();
    let store = StateStore::new(tmp.path());
    let committed = state_with(&["ticketmaster:a"]);
    store.save("ticketmaster", &committed).await.unwrap();

    // Simulate a crash mid-save: half a JSON document in the temp file.
    let stale = tmp.path().join("ticketmaster_state.json.tmp");
    fs::write(&stale, r#"{"seen_ids": ["ticketmaster:a", "tick"#).unwrap();

    assert_eq!(store.load("ticketmaster").await.unwrap(), committed);

    // The next save replaces the stale temp file and commits.
    let next = state_with(&["ticketmaster:a", "ticketmaster:b"]);
    store.save("ticketmaster", &next).await.unwrap();
    assert_eq!(store.load("ticketmaster").await.unwrap(), next);
    assert!(!stale.exists());
}

#[tokio::test]
async fn sources_do_not_share_files() {
    let tmp = tempfile::tempdir().unwrap();
    let store = StateStore::new(tmp.path());
    store
        .save("countdown", &state_with(&["countdown:1"]))
        .await
        .unwrap();
    store
        .save("bandsintown", &state_with(&["bandsintown:7"]))
        .await
        .unwrap();

    let cd = store.load("countdown").await.unwrap();
    assert!(cd.has_seen("countdown:1"));
    assert!(!cd.has_seen("bandsintown:7"));
}

#[tokio::test]
async fn garbage_is_reported_as_corrupt_and_can_be_quarantined() {
    let tmp = tempfile::tempdir().unwrap();
    let store = StateStore::new(tmp.path());
    fs::write(store.path_for("countdown"), "\u{0}\u{0}garbage").unwrap();

    let err = store.load("countdown").await.unwrap_err();
    assert!(matches!(err, PersistError::Corrupt { .. }), "{err}");

    let aside = store.quarantine("countdown").await.unwrap();
    assert!(aside.exists());
    assert!(store.load("countdown").await.unwrap().is_first_run());
}

#[tokio::test]
async fn zero_length_file_counts_as_empty() {
    let tmp = tempfile::tempdir().unwrap();
    let store = StateStore::new(tmp.path());
    fs::write(store.path_for("bandsintown"), "").unwrap();
    assert_eq!(
        store.load("bandsintown").await.unwrap(),
        SourceState::default()
    );
}
