mod support;

use bytes::Bytes;
use http_body_util::Full;
use support::server;

#[tokio::test]
async fn request_middlewares_run_in_priority_order() {
    let server = server::http(|req| async move {
        let value = req
            .headers()
            .get("x-trace")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_owned();
        http::Response::new(Full::new(Bytes::from(value)))
    });

    fn appending(tag: &'static str) -> impl Fn(&mut camo::Request) -> Result<(), camo::Error> {
        move |request: &mut camo::Request| {
            let prev = request
                .headers()
                .get("x-trace")
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_owned();
            let next = if prev.is_empty() {
                tag.to_owned()
            } else {
                format!("{prev},{tag}")
            };
            request
                .headers_mut()
                .insert("x-trace", next.parse().unwrap());
            Ok(())
        }
    }

    // Registered out of order; priority decides.
    let client = camo::Client::builder()
        .with_request_middleware(20, appending("third"))
        .with_request_middleware(5, appending("first"))
        .with_request_middleware(10, appending("second"))
        .build()
        .unwrap();

    let body = client
        .get(server.url("/trace"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();

    assert_eq!(body, "first,second,third");
}

#[tokio::test]
async fn request_middleware_error_short_circuits() {
    // No server: the middleware must fail before any dial.
    let client = camo::Client::builder()
        .with_request_middleware(0, |_request: &mut camo::Request| {
            Err(camo::Error::from_middleware("rejected"))
        })
        .build()
        .unwrap();

    let err = client
        .get("http://127.0.0.1:9/never")
        .send()
        .await
        .unwrap_err();
    assert!(err.is_middleware());
}

#[tokio::test]
async fn response_middleware_sees_and_mutates() {
    let server = server::http(|_req| async {
        http::Response::new(Full::new(Bytes::from_static(b"ok")))
    });

    let client = camo::Client::builder()
        .with_response_middleware(0, |response: &mut camo::Response| -> Result<(), camo::Error> {
            response
                .headers_mut()
                .insert("x-stamped", "yes".parse().unwrap());
            Ok(())
        })
        .build()
        .unwrap();

    let res = client.get(server.url("/")).send().await.unwrap();
    assert_eq!(res.headers().get("x-stamped").unwrap(), "yes");
}

#[tokio::test]
async fn client_middleware_adjusts_config() {
    let server = server::http(|req| async move {
        let value = req
            .headers()
            .get("x-injected")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_owned();
        http::Response::new(Full::new(Bytes::from(value)))
    });

    let client = camo::Client::builder()
        .with_client_middleware(0, |config: &mut camo::ClientConfig| -> Result<(), camo::Error> {
            config
                .headers
                .insert("x-injected", "at-build".parse().unwrap());
            Ok(())
        })
        .build()
        .unwrap();

    let body = client
        .get(server.url("/"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert_eq!(body, "at-build");
}

#[tokio::test]
async fn unexpected_101_is_an_upgrade_error() {
    use std::io::{Read, Write};
    use std::net::TcpListener;

    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    std::thread::spawn(move || {
        let (mut sock, _) = listener.accept().unwrap();
        let mut buf = [0u8; 4096];
        let _ = sock.read(&mut buf).unwrap();
        sock.write_all(
            b"HTTP/1.1 101 Switching Protocols\r\nUpgrade: websocket\r\nConnection: Upgrade\r\n\r\n",
        )
        .unwrap();
    });

    let client = camo::Client::new();
    let err = client
        .get(format!("http://{addr}/ws"))
        .send()
        .await
        .unwrap_err();
    assert!(err.is_upgrade(), "got: {err:?}");
}
