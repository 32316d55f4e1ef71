// Integration tests for the HTTP location provider, against a local
// endpoint stub.

use std::time::Duration;

use axum::{routing::get, Json, Router};
use serde_json::{json, Value};

use quickmemo::location::{Accuracy, HttpLocationProvider, LocationError, LocationProvider};

/// Serve `response` on a random local port, after `delay`.
async fn serve_position(response: Value, delay: Duration) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let app = Router::new().route(
        "/v1/position",
        get(move || {
            let response = response.clone();
            async move {
                tokio::time::sleep(delay).await;
                Json(response)
            }
        }),
    );

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}/v1/position", addr)
}

#[tokio::test]
async fn returns_the_reported_coordinate() {
    let endpoint = serve_position(
        json!({"latitude": 35.6581, "longitude": 139.7414, "accuracy_m": 40.0}),
        Duration::ZERO,
    )
    .await;

    let provider = HttpLocationProvider::new(endpoint, Duration::from_secs(2));
    let fix = provider.get_location(Accuracy::Block, None).await.unwrap();

    assert_eq!(fix.latitude, 35.6581);
    assert_eq!(fix.longitude, 139.7414);
}

#[tokio::test]
async fn slow_endpoint_times_out() {
    let endpoint = serve_position(
        json!({"latitude": 0.0, "longitude": 0.0}),
        Duration::from_millis(500),
    )
    .await;

    let provider = HttpLocationProvider::new(endpoint, Duration::from_secs(2));
    let result = provider
        .get_location(Accuracy::City, Some(Duration::from_millis(50)))
        .await;

    assert!(matches!(result, Err(LocationError::Timeout)));
}

#[tokio::test]
async fn coarse_fix_is_rejected() {
    let endpoint = serve_position(
        json!({"latitude": 35.0, "longitude": 139.0, "accuracy_m": 2500.0}),
        Duration::ZERO,
    )
    .await;

    let provider = HttpLocationProvider::new(endpoint, Duration::from_secs(2));
    let result = provider.get_location(Accuracy::Block, None).await;

    assert!(matches!(result, Err(LocationError::Unavailable(_))));
}

#[tokio::test]
async fn fix_without_reported_accuracy_is_accepted() {
    let endpoint = serve_position(
        json!({"latitude": 35.0, "longitude": 139.0}),
        Duration::ZERO,
    )
    .await;

    let provider = HttpLocationProvider::new(endpoint, Duration::from_secs(2));
    let fix = provider.get_location(Accuracy::City, None).await.unwrap();
    assert_eq!(fix.latitude, 35.0);
}

#[tokio::test]
async fn unreachable_endpoint_is_unavailable() {
    // Nothing listens here.
    let provider = HttpLocationProvider::new(
        "http://127.0.0.1:9/v1/position",
        Duration::from_secs(2),
    );
    let result = provider.get_location(Accuracy::City, None).await;

    assert!(matches!(result, Err(LocationError::Unavailable(_))));
}
