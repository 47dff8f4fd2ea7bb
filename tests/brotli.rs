mod support;

use std::io::Write;

use bytes::Bytes;
use http_body_util::Full;
use support::server;

fn brotli_compress(body: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    {
        let mut writer = brotli::CompressorWriter::new(&mut out, 4096, 5, 22);
        writer.write_all(body).unwrap();
        writer.flush().unwrap();
    }
    out
}

#[tokio::test]
async fn brotli_response_is_decoded() {
    let compressed = brotli_compress(b"a brotli encoded body");

    let server = server::http(move |req| {
        let compressed = compressed.clone();
        async move {
            let accepts = req
                .headers()
                .get(http::header::ACCEPT_ENCODING)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_owned();
            assert!(accepts.contains("br"), "accept-encoding was {accepts:?}");

            http::Response::builder()
                .header(http::header::CONTENT_ENCODING, "br")
                .body(Full::new(Bytes::from(compressed)))
                .unwrap()
        }
    });

    let client = camo::Client::new();
    let res = client.get(server.url("/br")).send().await.unwrap();
    assert_eq!(res.text().await.unwrap(), "a brotli encoded body");
}
