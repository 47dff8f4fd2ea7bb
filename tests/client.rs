mod support;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use support::server;

#[tokio::test]
async fn test_get() {
    let server = server::http(|_req| async {
        http::Response::new(Full::new(Bytes::from_static(b"Hello")))
    });

    let client = camo::Client::new();
    let res = client.get(server.url("/1")).send().await.unwrap();

    assert_eq!(res.status(), camo::StatusCode::OK);
    assert_eq!(res.attempts(), 1);
    assert!(res.remote_addr().is_some());
    assert_eq!(res.text().await.unwrap(), "Hello");
}

#[tokio::test]
async fn test_post_body_echo() {
    let server = server::http(|req| async {
        assert_eq!(req.method(), http::Method::POST);
        let body = req.into_body().collect().await.unwrap().to_bytes();
        http::Response::new(Full::new(body))
    });

    let client = camo::Client::new();
    let res = client
        .post(server.url("/echo"))
        .body("hello")
        .send()
        .await
        .unwrap();

    assert_eq!(res.text().await.unwrap(), "hello");
}

#[tokio::test]
async fn default_user_agent_is_set() {
    let server = server::http(|req| async move {
        let ua = req
            .headers()
            .get(http::header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_owned();
        http::Response::new(Full::new(Bytes::from(ua)))
    });

    let client = camo::Client::new();
    let body = client
        .get(server.url("/ua"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();

    assert!(body.starts_with("camo/"));
}

#[tokio::test]
async fn custom_user_agent_wins() {
    let server = server::http(|req| async move {
        let ua = req
            .headers()
            .get(http::header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_owned();
        http::Response::new(Full::new(Bytes::from(ua)))
    });

    let client = camo::Client::builder()
        .user_agent("its-a-me")
        .build()
        .unwrap();
    let body = client
        .get(server.url("/ua"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();

    assert_eq!(body, "its-a-me");
}

#[tokio::test]
async fn https_only_rejects_http() {
    let client = camo::Client::builder().https_only(true).build().unwrap();
    let err = client
        .get("http://insecure.example/")
        .send()
        .await
        .unwrap_err();
    assert!(err.is_builder());
}

#[tokio::test]
async fn error_for_status() {
    let server = server::http(|_req| async {
        http::Response::builder()
            .status(http::StatusCode::IM_A_TEAPOT)
            .body(Full::new(Bytes::new()))
            .unwrap()
    });

    let client = camo::Client::new();
    let res = client.get(server.url("/tea")).send().await.unwrap();
    let err = res.error_for_status().unwrap_err();
    assert!(err.is_status());
    assert_eq!(err.status(), Some(camo::StatusCode::IM_A_TEAPOT));
}

#[tokio::test]
async fn request_timeout_surfaces_as_timeout() {
    let server = server::http(|_req| async {
        tokio::time::sleep(std::time::Duration::from_secs(5)).await;
        http::Response::new(Full::new(Bytes::new()))
    });

    let client = camo::Client::new();
    let err = client
        .get(server.url("/slow"))
        .timeout(std::time::Duration::from_millis(100))
        .send()
        .await
        .unwrap_err();
    assert!(err.is_timeout());
}

#[tokio::test]
async fn content_length_is_exposed() {
    let server = server::http(|_req| async {
        http::Response::new(Full::new(Bytes::from_static(b"four")))
    });

    let client = camo::Client::new();
    let res = client.get(server.url("/len")).send().await.unwrap();
    assert_eq!(res.content_length(), Some(4));
}

#[tokio::test]
async fn query_serialization() {
    let server = server::http(|req| async move {
        let query = req.uri().query().unwrap_or_default().to_owned();
        http::Response::new(Full::new(Bytes::from(query)))
    });

    let client = camo::Client::new();
    let body = client
        .get(server.url("/q"))
        .query(&[("a", "1"), ("b", "two words")])
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();

    assert_eq!(body, "a=1&b=two+words");
}

#[tokio::test]
async fn form_body_and_content_type() {
    let server = server::http(|req| async move {
        let content_type = req
            .headers()
            .get(http::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_owned();
        let body = req.into_body().collect().await.unwrap().to_bytes();
        let reply = format!("{content_type};{}", String::from_utf8_lossy(&body));
        http::Response::new(Full::new(Bytes::from(reply)))
    });

    let client = camo::Client::new();
    let body = client
        .post(server.url("/form"))
        .form(&[("x", "1")])
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();

    assert_eq!(body, "application/x-www-form-urlencoded;x=1");
}
