//! End-to-end fetch tests against a local mock upstream.
//!
//! These spin a real HTTP server per test and drive the full
//! request/parse/select path, checking the outcome contract the renderer
//! relies on.

use axum::Router;
use axum::http::StatusCode;
use axum::response::Redirect;
use axum::routing::get;

use trackboard::clock;
use trackboard::error::FetchError;
use trackboard_daemon::config::Config;
use trackboard_daemon::fetch::{FetchSource, Fetcher};

/// Serve `app` on an ephemeral local port and return its address.
async fn serve(app: Router) -> std::net::SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind mock upstream");
    let addr = listener.local_addr().expect("failed to get local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("mock upstream died");
    });
    addr
}

fn fetcher_for(addr: std::net::SocketAddr, path: &str) -> Fetcher {
    let mut config = Config::default();
    config.api_base_url = format!("http://{addr}{path}?name_origin=");
    config.origin_code = "10101100".to_string();
    config.destination_code = "10101119".to_string();
    config.http_timeout_secs = 5;
    Fetcher::new(&config).expect("failed to build fetcher")
}

const JOURNEYS: &str = r#"[{
    "legs": [{
        "origin": {
            "name": "Central, Platform 16",
            "departureTimePlanned": "2025-10-09T04:06:00"
        },
        "destination": {
            "name": "Katoomba, Platform 2",
            "arrivalTimePlanned": "2025-10-09T06:05:00"
        },
        "transportation": { "disassembledName": "BMT" }
    }]
}]"#;

#[tokio::test]
async fn test_success_end_to_end() {
    let app = Router::new().route(
        "/trip",
        get(|| async { ([("content-type", "application/json")], JOURNEYS) }),
    );
    let addr = serve(app).await;

    let now = clock::utc_iso_to_epoch("2025-10-09T04:00:00").unwrap();
    let view = fetcher_for(addr, "/trip").fetch(now).await.unwrap();

    assert_eq!(view.origin_station, "Central");
    assert_eq!(view.origin_platform, "Platform 16");
    assert_eq!(view.origin_time, "03:06 PM");
    assert_eq!(view.dest_station, "Katoomba");
    assert_eq!(view.route_label, "Intercity");
}

#[tokio::test]
async fn test_http_error_carries_status_and_body() {
    let app = Router::new().route(
        "/trip",
        get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "upstream maintenance") }),
    );
    let addr = serve(app).await;

    let outcome = fetcher_for(addr, "/trip").fetch(0).await;
    assert_eq!(
        outcome,
        Err(FetchError::HttpStatus {
            status: 503,
            detail: "upstream maintenance".to_string()
        })
    );
}

#[tokio::test]
async fn test_http_error_prefers_structured_body() {
    let app = Router::new().route(
        "/trip",
        get(|| async {
            (
                StatusCode::TOO_MANY_REQUESTS,
                r#"{"error": "rate limited", "details": "try later"}"#,
            )
        }),
    );
    let addr = serve(app).await;

    let outcome = fetcher_for(addr, "/trip").fetch(0).await;
    assert_eq!(
        outcome,
        Err(FetchError::HttpStatus {
            status: 429,
            detail: "rate limited: try later".to_string()
        })
    );
}

#[tokio::test]
async fn test_permanent_redirect_followed_once() {
    let app = Router::new()
        .route("/old", get(|| async { Redirect::permanent("/trip") }))
        .route(
            "/trip",
            get(|| async { ([("content-type", "application/json")], JOURNEYS) }),
        );
    let addr = serve(app).await;

    let now = clock::utc_iso_to_epoch("2025-10-09T04:00:00").unwrap();
    let view = fetcher_for(addr, "/old").fetch(now).await.unwrap();
    assert_eq!(view.origin_station, "Central");
}

#[tokio::test]
async fn test_second_redirect_not_followed() {
    let app = Router::new()
        .route("/a", get(|| async { Redirect::permanent("/b") }))
        .route("/b", get(|| async { Redirect::permanent("/c") }))
        .route(
            "/c",
            get(|| async { ([("content-type", "application/json")], JOURNEYS) }),
        );
    let addr = serve(app).await;

    let outcome = fetcher_for(addr, "/a").fetch(0).await;
    assert!(matches!(
        outcome,
        Err(FetchError::HttpStatus { status: 308, .. })
    ));
}

#[tokio::test]
async fn test_malformed_body() {
    let app = Router::new().route("/trip", get(|| async { "this is not json" }));
    let addr = serve(app).await;

    let outcome = fetcher_for(addr, "/trip").fetch(0).await;
    assert!(matches!(outcome, Err(FetchError::MalformedResponse(_))));
}

#[tokio::test]
async fn test_empty_feed_is_no_data() {
    let app = Router::new().route("/trip", get(|| async { "[]" }));
    let addr = serve(app).await;

    let outcome = fetcher_for(addr, "/trip").fetch(0).await;
    assert_eq!(outcome, Err(FetchError::NoData));
}

#[tokio::test]
async fn test_unreachable_upstream_is_connection_lost() {
    // Bind a port, then free it so the connect is refused.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let outcome = fetcher_for(addr, "/trip").fetch(0).await;
    assert_eq!(outcome, Err(FetchError::ConnectionLost));
}

#[tokio::test]
async fn test_stale_feed_still_selects_first_record() {
    let app = Router::new().route(
        "/trip",
        get(|| async { ([("content-type", "application/json")], JOURNEYS) }),
    );
    let addr = serve(app).await;

    // Hours past the only departure in the feed.
    let now = clock::utc_iso_to_epoch("2025-10-09T09:00:00").unwrap();
    let view = fetcher_for(addr, "/trip").fetch(now).await.unwrap();
    assert_eq!(view.origin_time, "03:06 PM");
}
