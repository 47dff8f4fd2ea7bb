mod support;

use bytes::Bytes;
use http_body_util::Full;
use support::server;

#[tokio::test]
async fn zstd_response_is_decoded() {
    let compressed = zstd::encode_all(&b"a zstd encoded body"[..], 3).unwrap();

    let server = server::http(move |req| {
        let compressed = compressed.clone();
        async move {
            let accepts = req
                .headers()
                .get(http::header::ACCEPT_ENCODING)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_owned();
            assert!(accepts.contains("zstd"), "accept-encoding was {accepts:?}");

            http::Response::builder()
                .header(http::header::CONTENT_ENCODING, "zstd")
                .body(Full::new(Bytes::from(compressed)))
                .unwrap()
        }
    });

    let client = camo::Client::new();
    let res = client.get(server.url("/zst")).send().await.unwrap();
    assert_eq!(res.text().await.unwrap(), "a zstd encoded body");
}

#[tokio::test]
async fn content_length_removed_when_decoding() {
    let compressed = zstd::encode_all(&b"body"[..], 3).unwrap();

    let server = server::http(move |_req| {
        let compressed = compressed.clone();
        async move {
            http::Response::builder()
                .header(http::header::CONTENT_ENCODING, "zstd")
                .header(http::header::CONTENT_LENGTH, compressed.len())
                .body(Full::new(Bytes::from(compressed)))
                .unwrap()
        }
    });

    let client = camo::Client::new();
    let res = client.get(server.url("/zst")).send().await.unwrap();
    assert!(res.content_length().is_none());
    assert_eq!(res.text().await.unwrap(), "body");
}
