mod common;

use std::time::Duration;

use axum::http::{header, HeaderName, HeaderValue, StatusCode};
use common::{dev_state, server};
use cradle_server::ratelimit::RateLimiter;
use serde_json::{json, Value};

const FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");

#[tokio::test]
async fn requests_beyond_the_ceiling_are_rejected() {
    let server = server(dev_state().with_limiter(RateLimiter::new(Duration::from_secs(60), 2)));

    for _ in 0..2 {
        server
            .get("/api/health")
            .add_header(FORWARDED_FOR, HeaderValue::from_static("198.51.100.4"))
            .await
            .assert_status_ok();
    }

    // Same ceiling regardless of which resource is asked for.
    let res = server
        .post("/api/contact/submit")
        .add_header(FORWARDED_FOR, HeaderValue::from_static("198.51.100.4"))
        .json(&json!({}))
        .await;
    res.assert_status(StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(
        res.json::<Value>(),
        json!({
            "success": false,
            "message": "Too many requests from this IP, please try again later."
        })
    );
    let retry_after: u64 = res.headers()[header::RETRY_AFTER]
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!((1..=60).contains(&retry_after));

    // Other clients have their own window.
    server
        .get("/api/health")
        .add_header(FORWARDED_FOR, HeaderValue::from_static("203.0.113.9"))
        .await
        .assert_status_ok();
}
