mod support;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use support::server;

#[tokio::test]
async fn retries_on_503_until_success() {
    let hits = Arc::new(AtomicUsize::new(0));
    let server_hits = hits.clone();

    let server = server::http(move |req| {
        let hits = server_hits.clone();
        async move {
            let body = req.into_body().collect().await.unwrap().to_bytes();
            assert_eq!(&body[..], b"x=1", "body must be replayed on every attempt");

            let n = hits.fetch_add(1, Ordering::SeqCst);
            if n < 2 {
                http::Response::builder()
                    .status(http::StatusCode::SERVICE_UNAVAILABLE)
                    .body(Full::new(Bytes::new()))
                    .unwrap()
            } else {
                http::Response::new(Full::new(Bytes::from_static(b"done")))
            }
        }
    });

    let client = camo::Client::builder()
        .retry(camo::retry::Policy::new(3, Duration::from_millis(50)))
        .build()
        .unwrap();

    let started = Instant::now();
    let res = client
        .post(server.url("/flaky"))
        .body("x=1")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), camo::StatusCode::OK);
    // Two failed attempts then success.
    assert_eq!(hits.load(Ordering::SeqCst), 3);
    assert_eq!(res.attempts(), 3);
    // Two waits of at least 50ms each.
    assert!(started.elapsed() >= Duration::from_millis(100));
    assert_eq!(res.text().await.unwrap(), "done");
}

#[tokio::test]
async fn attempt_count_is_bounded() {
    let hits = Arc::new(AtomicUsize::new(0));
    let server_hits = hits.clone();

    let server = server::http(move |_req| {
        let hits = server_hits.clone();
        async move {
            hits.fetch_add(1, Ordering::SeqCst);
            http::Response::builder()
                .status(http::StatusCode::SERVICE_UNAVAILABLE)
                .body(Full::new(Bytes::new()))
                .unwrap()
        }
    });

    let client = camo::Client::builder()
        .retry(camo::retry::Policy::new(2, Duration::from_millis(1)))
        .build()
        .unwrap();

    let res = client.get(server.url("/down")).send().await.unwrap();
    assert_eq!(res.status(), camo::StatusCode::SERVICE_UNAVAILABLE);
    // With retry_max = 2 the server sees at most 3 requests.
    assert_eq!(hits.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn custom_status_set_drives_retries() {
    let hits = Arc::new(AtomicUsize::new(0));
    let server_hits = hits.clone();

    let server = server::http(move |_req| {
        let hits = server_hits.clone();
        async move {
            let n = hits.fetch_add(1, Ordering::SeqCst);
            let status = if n == 0 {
                http::StatusCode::BAD_GATEWAY
            } else {
                http::StatusCode::OK
            };
            http::Response::builder()
                .status(status)
                .body(Full::new(Bytes::new()))
                .unwrap()
        }
    });

    let client = camo::Client::builder()
        .retry(
            camo::retry::Policy::new(1, Duration::from_millis(1))
                .statuses([camo::StatusCode::BAD_GATEWAY]),
        )
        .build()
        .unwrap();

    let res = client.get(server.url("/")).send().await.unwrap();
    assert_eq!(res.status(), camo::StatusCode::OK);
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn no_retry_without_policy() {
    let hits = Arc::new(AtomicUsize::new(0));
    let server_hits = hits.clone();

    let server = server::http(move |_req| {
        let hits = server_hits.clone();
        async move {
            hits.fetch_add(1, Ordering::SeqCst);
            http::Response::builder()
                .status(http::StatusCode::SERVICE_UNAVAILABLE)
                .body(Full::new(Bytes::new()))
                .unwrap()
        }
    });

    let client = camo::Client::new();
    let res = client.get(server.url("/")).send().await.unwrap();
    assert_eq!(res.status(), camo::StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}
