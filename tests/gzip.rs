mod support;

use std::io::Write;

use bytes::Bytes;
use http_body_util::Full;
use support::server;

fn gzip_compress(body: &[u8]) -> Vec<u8> {
    let mut encoder = libflate::gzip::Encoder::new(Vec::new()).unwrap();
    encoder.write_all(body).unwrap();
    encoder.finish().into_result().unwrap()
}

#[tokio::test]
async fn gzip_response_is_decoded() {
    let compressed = gzip_compress(b"an encoded response body");

    let server = server::http(move |req| {
        let compressed = compressed.clone();
        async move {
            let accepts = req
                .headers()
                .get(http::header::ACCEPT_ENCODING)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_owned();
            assert!(accepts.contains("gzip"), "accept-encoding was {accepts:?}");

            http::Response::builder()
                .header(http::header::CONTENT_ENCODING, "gzip")
                .body(Full::new(Bytes::from(compressed)))
                .unwrap()
        }
    });

    let client = camo::Client::new();
    let res = client.get(server.url("/gz")).send().await.unwrap();

    // The decoded length is unknowable, so the header is gone.
    assert!(res.headers().get(http::header::CONTENT_ENCODING).is_none());
    assert_eq!(res.text().await.unwrap(), "an encoded response body");
}

#[tokio::test]
async fn gzip_disabled_passes_raw_bytes() {
    let compressed = gzip_compress(b"raw");
    let expected = compressed.clone();

    let server = server::http(move |_req| {
        let compressed = compressed.clone();
        async move {
            http::Response::builder()
                .header(http::header::CONTENT_ENCODING, "gzip")
                .body(Full::new(Bytes::from(compressed)))
                .unwrap()
        }
    });

    let client = camo::Client::builder().gzip(false).build().unwrap();
    let res = client.get(server.url("/gz")).send().await.unwrap();

    assert_eq!(
        res.headers().get(http::header::CONTENT_ENCODING).unwrap(),
        "gzip"
    );
    assert_eq!(res.bytes().await.unwrap(), Bytes::from(expected));
}

#[tokio::test]
async fn unknown_encoding_passes_through() {
    let server = server::http(|_req| async {
        http::Response::builder()
            .header(http::header::CONTENT_ENCODING, "snappy")
            .body(Full::new(Bytes::from_static(b"not actually snappy")))
            .unwrap()
    });

    let client = camo::Client::new();
    let res = client.get(server.url("/snappy")).send().await.unwrap();
    assert_eq!(res.text().await.unwrap(), "not actually snappy");
}
