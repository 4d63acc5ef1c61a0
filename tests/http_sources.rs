// tests/http_sources.rs
// Adapters and the SMS channel against a local mock server.

use std::time::Duration;

use tour_watch::ingest::http::build_client;
use tour_watch::ingest::providers::{
    bandsintown::BandsintownAdapter, countdown::CountdownAdapter, ticketmaster::TicketmasterAdapter,
};
use tour_watch::notify::sms::TwilioSms;
use tour_watch::{DeliveryError, Notifier, SourceAdapter, SourceFetchError};
use wiremock::matchers::{body_string_contains, header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client() -> reqwest::Client {
    build_client(Duration::from_secs(5)).unwrap()
}

fn artists(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn countdown_id_is_stable_while_the_timer_ticks() {
    let server = MockServer::start().await;
    let adapter = CountdownAdapter::new(format!("{}/", server.uri()), client());

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"<html><div class="countdown-timer">02:14:09</div></html>"#),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    let first = adapter.fetch().await.unwrap();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"<html><div class="countdown-timer">02:14:08</div></html>"#),
        )
        .mount(&server)
        .await;
    let second = adapter.fetch().await.unwrap();

    assert_eq!(first.items.len(), 1);
    assert_eq!(second.items.len(), 1);
    assert_eq!(first.items[0].id(), second.items[0].id());
}

#[tokio::test]
async fn countdown_empty_body_and_server_error_fail() {
    let server = MockServer::start().await;
    Mock::given(path("/empty"))
        .respond_with(ResponseTemplate::new(200).set_body_string("   "))
        .mount(&server)
        .await;
    Mock::given(path("/down"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let empty = CountdownAdapter::new(format!("{}/empty", server.uri()), client());
    assert!(matches!(
        empty.fetch().await.unwrap_err(),
        SourceFetchError::Parse(_)
    ));
    let down = CountdownAdapter::new(format!("{}/down", server.uri()), client());
    assert!(matches!(
        down.fetch().await.unwrap_err(),
        SourceFetchError::Network(_)
    ));
}

#[tokio::test]
async fn bandsintown_merges_artists_and_keeps_partial_results() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/artists/Taylor%20Swift/events"))
        .and(query_param("app_id", "unified_monitor"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"[{"id":"11","datetime":"2026-06-01T19:30:00",
                 "venue":{"name":"Wembley Stadium","city":"London","country":"United Kingdom"}}]"#,
        ))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/artists/The%201975/events"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let adapter = BandsintownAdapter::new(
        client(),
        &server.uri(),
        "unified_monitor",
        artists(&["Taylor Swift", "The 1975"]),
    )
    .unwrap()
    .with_spacing(Duration::ZERO);

    let out = adapter.fetch().await.unwrap();
    assert_eq!(out.items.len(), 1);
    assert_eq!(out.items[0].id(), "bandsintown:11");
    assert_eq!(out.items[0].field("Venue"), Some("Wembley Stadium"));
    assert_eq!(out.warnings.len(), 1);
    assert!(out.warnings[0].starts_with("The 1975:"));
}

#[tokio::test]
async fn bandsintown_throttle_stops_the_sweep() {
    let server = MockServer::start().await;
    Mock::given(path("/artists/Taylor%20Swift/events"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "120"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(path("/artists/Arctic%20Monkeys/events"))
        .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
        .expect(0)
        .mount(&server)
        .await;

    let adapter = BandsintownAdapter::new(
        client(),
        &server.uri(),
        "unified_monitor",
        artists(&["Taylor Swift", "Arctic Monkeys"]),
    )
    .unwrap()
    .with_spacing(Duration::ZERO);

    match adapter.fetch().await {
        Err(SourceFetchError::RateLimited { retry_after }) => {
            assert_eq!(retry_after, Some(Duration::from_secs(120)))
        }
        other => panic!("expected rate limit, got {other:?}"),
    }
}

#[tokio::test]
async fn ticketmaster_sends_discovery_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/discovery/v2/events.json"))
        .and(query_param("apikey", "k-123"))
        .and(query_param("keyword", "Arctic Monkeys"))
        .and(query_param("classificationName", "Music"))
        .and(query_param("size", "5"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"_embedded":{"events":[{
                "id":"G5v0Z9","name":"Arctic Monkeys: North American Tour",
                "url":"https://www.ticketmaster.com/event/G5v0Z9",
                "dates":{"start":{"localDate":"2026-09-12"}},
                "_embedded":{"venues":[{"name":"Forest Hills Stadium",
                    "city":{"name":"Queens"},"state":{"stateCode":"NY"}}]}}]}}"#,
        ))
        .expect(1)
        .mount(&server)
        .await;

    let adapter = TicketmasterAdapter::new(
        client(),
        &server.uri(),
        "k-123",
        artists(&["Arctic Monkeys"]),
    )
    .unwrap()
    .with_page_size(5)
    .with_spacing(Duration::ZERO);

    let out = adapter.fetch().await.unwrap();
    assert_eq!(out.items.len(), 1);
    assert_eq!(out.items[0].field("Location"), Some("Queens, NY"));
    assert_eq!(out.items[0].field("Date"), Some("2026-09-12"));
}

#[tokio::test]
async fn ticketmaster_without_embedded_means_no_events() {
    let server = MockServer::start().await;
    Mock::given(path("/discovery/v2/events.json"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(r#"{"page":{"totalElements":0}}"#),
        )
        .mount(&server)
        .await;

    let adapter = TicketmasterAdapter::new(client(), &server.uri(), "k", artists(&["Nobody"]))
        .unwrap()
        .with_spacing(Duration::ZERO);
    let out = adapter.fetch().await.unwrap();
    assert!(out.items.is_empty());
    assert!(out.warnings.is_empty());
}

#[tokio::test]
async fn twilio_posts_form_with_basic_auth() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/2010-04-01/Accounts/AC123/Messages.json"))
        .and(header_exists("authorization"))
        .and(body_string_contains("To=%2B15550002"))
        .and(body_string_contains("From=%2B15550001"))
        .respond_with(
            ResponseTemplate::new(201).set_body_string(r#"{"sid":"SM1","status":"queued"}"#),
        )
        .expect(1)
        .mount(&server)
        .await;

    let sms = TwilioSms::new("AC123", "token", "+15550001", Duration::from_secs(5))
        .unwrap()
        .with_api_base(server.uri());
    sms.send("new show", "+15550002").await.unwrap();
}

#[tokio::test]
async fn twilio_failures_are_classified() {
    let server = MockServer::start().await;
    Mock::given(path("/2010-04-01/Accounts/ACbad/Messages.json"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_string(r#"{"code":20003,"message":"Authenticate"}"#),
        )
        .mount(&server)
        .await;
    Mock::given(path("/2010-04-01/Accounts/ACok/Messages.json"))
        .respond_with(ResponseTemplate::new(400).set_body_string(
            r#"{"code":21211,"message":"The 'To' number is not a valid phone number."}"#,
        ))
        .mount(&server)
        .await;

    let bad_auth = TwilioSms::new("ACbad", "x", "+15550001", Duration::from_secs(5))
        .unwrap()
        .with_api_base(server.uri());
    assert!(matches!(
        bad_auth.send("hi", "+15550002").await.unwrap_err(),
        DeliveryError::Auth(_)
    ));

    let bad_to = TwilioSms::new("ACok", "x", "+15550001", Duration::from_secs(5))
        .unwrap()
        .with_api_base(server.uri());
    assert!(matches!(
        bad_to.send("hi", "12").await.unwrap_err(),
        DeliveryError::InvalidRecipient(_)
    ));
}
