//! Emulation presets observed from the server side (plain HTTP paths).

mod support;

use bytes::Bytes;
use http_body_util::Full;
use support::server;

use camo::mimic::{emulation, Impersonate, Os};

#[tokio::test]
async fn chrome_headers_reach_the_wire() {
    let server = server::http(|req| async move {
        let ua = req
            .headers()
            .get(http::header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_owned();
        let sec_ch_ua = req
            .headers()
            .get("sec-ch-ua")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_owned();
        http::Response::new(Full::new(Bytes::from(format!("{ua}\n{sec_ch_ua}"))))
    });

    let client = camo::Client::builder()
        .emulation(Impersonate::Chrome131)
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

    let mut lines = body.lines();
    assert!(lines.next().unwrap().contains("Chrome/131"));
    assert!(lines.next().unwrap().contains("\"Chromium\";v=\"131\""));
}

#[tokio::test]
async fn firefox_emulation_sets_te_and_ua() {
    let server = server::http(|req| async move {
        let ua = req
            .headers()
            .get(http::header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_owned();
        let te = req
            .headers()
            .get("te")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_owned();
        http::Response::new(Full::new(Bytes::from(format!("{ua}\n{te}"))))
    });

    let client = camo::Client::builder()
        .emulation(emulation(Impersonate::Firefox133, Os::Linux))
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

    let mut lines = body.lines();
    assert!(lines.next().unwrap().contains("Firefox/133"));
    assert_eq!(lines.next().unwrap(), "trailers");
}

#[tokio::test]
async fn profile_header_order_applies_on_the_wire() {
    use std::io::{Read, Write};
    use std::net::TcpListener;

    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = std::sync::mpsc::channel();
    std::thread::spawn(move || {
        let (mut sock, _) = listener.accept().unwrap();
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = sock.read(&mut chunk).unwrap();
            buf.extend_from_slice(&chunk[..n]);
            if n == 0 || buf.windows(4).any(|w| w == b"\r\n\r\n") {
                break;
            }
        }
        sock.write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 0\r\n\r\n")
            .unwrap();
        tx.send(buf).unwrap();
    });

    let client = camo::Client::builder()
        .emulation(Impersonate::Chrome131)
        .build()
        .unwrap();
    client.get(format!("http://{addr}/")).send().await.unwrap();

    let head = rx.recv().unwrap();
    let head = std::str::from_utf8(&head).unwrap();
    let names: Vec<String> = head
        .lines()
        .skip(1)
        .take_while(|l| !l.is_empty())
        .filter_map(|l| l.split(':').next())
        .map(|n| n.trim().to_ascii_lowercase())
        .collect();

    // Chrome's order: user-agent before accept, accept before
    // accept-encoding, accept-encoding before accept-language.
    let pos = |name: &str| {
        names
            .iter()
            .position(|n| n == name)
            .unwrap_or_else(|| panic!("{name} missing from {names:?}"))
    };
    assert_eq!(pos("host"), 0);
    assert!(pos("sec-ch-ua") < pos("user-agent"));
    assert!(pos("user-agent") < pos("accept"));
    assert!(pos("accept") < pos("accept-encoding"));
    assert!(pos("accept-encoding") < pos("accept-language"));
}

#[test]
fn presets_install_complete_fingerprints() {
    for preset in [
        Impersonate::Chrome131,
        Impersonate::Firefox133,
        Impersonate::Safari18,
        Impersonate::OkHttp5,
        Impersonate::Tor,
    ] {
        let settings = emulation(preset, Os::default());
        assert!(settings.http2.headers_pseudo_order.is_some());
        assert!(settings.http2.settings_order.is_some());
        assert!(settings.headers.is_some());
    }
}

#[test]
fn string_names_resolve() {
    assert_eq!(
        "chrome_131".parse::<Impersonate>().unwrap(),
        Impersonate::Chrome131
    );
    assert_eq!("tor".parse::<Impersonate>().unwrap(), Impersonate::Tor);
    assert!("netscape_4".parse::<Impersonate>().is_err());
}
