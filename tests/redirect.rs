mod support;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use support::server;

#[tokio::test]
async fn follows_302_and_geturns_get() {
    let server = server::http(|req| async move {
        match req.uri().path() {
            "/start" => {
                assert_eq!(req.method(), http::Method::POST);
                http::Response::builder()
                    .status(http::StatusCode::FOUND)
                    .header(http::header::LOCATION, "/landed")
                    .body(Full::new(Bytes::new()))
                    .unwrap()
            }
            "/landed" => {
                // 302 converts the POST into a bodyless GET.
                assert_eq!(req.method(), http::Method::GET);
                http::Response::new(Full::new(Bytes::from_static(b"landed")))
            }
            other => panic!("unexpected path {other}"),
        }
    });

    let client = camo::Client::new();
    let res = client
        .post(server.url("/start"))
        .body("payload")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), camo::StatusCode::OK);
    assert!(res.url().path().ends_with("/landed"));
    assert_eq!(res.text().await.unwrap(), "landed");
}

#[tokio::test]
async fn preserves_method_and_body_on_307() {
    let server = server::http(|req| async move {
        match req.uri().path() {
            "/start" => http::Response::builder()
                .status(http::StatusCode::TEMPORARY_REDIRECT)
                .header(http::header::LOCATION, "/landed")
                .body(Full::new(Bytes::new()))
                .unwrap(),
            "/landed" => {
                assert_eq!(req.method(), http::Method::POST);
                let body = req.into_body().collect().await.unwrap().to_bytes();
                http::Response::new(Full::new(body))
            }
            other => panic!("unexpected path {other}"),
        }
    });

    let client = camo::Client::new();
    let res = client
        .post(server.url("/start"))
        .body("payload")
        .send()
        .await
        .unwrap();

    assert_eq!(res.text().await.unwrap(), "payload");
}

#[tokio::test]
async fn policy_none_returns_redirect_response() {
    let server = server::http(|_req| async {
        http::Response::builder()
            .status(http::StatusCode::FOUND)
            .header(http::header::LOCATION, "/next")
            .body(Full::new(Bytes::new()))
            .unwrap()
    });

    let client = camo::Client::builder()
        .redirect(camo::redirect::Policy::none())
        .build()
        .unwrap();

    let res = client.get(server.url("/start")).send().await.unwrap();
    assert_eq!(res.status(), camo::StatusCode::FOUND);
    assert_eq!(res.headers()[http::header::LOCATION], "/next");
}

#[tokio::test]
async fn redirect_loop_is_detected() {
    let server = server::http(|_req| async {
        http::Response::builder()
            .status(http::StatusCode::FOUND)
            .header(http::header::LOCATION, "/loop")
            .body(Full::new(Bytes::new()))
            .unwrap()
    });

    let client = camo::Client::new();
    let err = client.get(server.url("/loop")).send().await.unwrap_err();
    assert!(err.is_redirect());
}

#[tokio::test]
async fn referer_set_on_follow() {
    let server = server::http(|req| async move {
        match req.uri().path() {
            "/start" => http::Response::builder()
                .status(http::StatusCode::FOUND)
                .header(http::header::LOCATION, "/landed")
                .body(Full::new(Bytes::new()))
                .unwrap(),
            "/landed" => {
                let referer = req
                    .headers()
                    .get(http::header::REFERER)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_owned();
                http::Response::new(Full::new(Bytes::from(referer)))
            }
            other => panic!("unexpected path {other}"),
        }
    });

    let client = camo::Client::new();
    let body = client
        .get(server.url("/start"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(body.ends_with("/start"), "referer was {body:?}");
}
