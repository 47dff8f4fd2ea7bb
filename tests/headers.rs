//! Wire-level assertions on header ordering.

use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::mpsc;
use std::thread;

/// A single-shot raw server capturing the exact request head bytes.
fn raw_server(response: &'static [u8]) -> (std::net::SocketAddr, mpsc::Receiver<Vec<u8>>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::channel();

    thread::spawn(move || {
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
        sock.write_all(response).unwrap();
        tx.send(buf).unwrap();
    });

    (addr, rx)
}

const OK: &[u8] = b"HTTP/1.1 200 OK\r\ncontent-length: 0\r\n\r\n";

fn header_names(head: &[u8]) -> Vec<String> {
    let head = std::str::from_utf8(head).unwrap();
    head.lines()
        .skip(1)
        .take_while(|line| !line.is_empty())
        .filter_map(|line| line.split(':').next())
        .map(|name| name.trim().to_ascii_lowercase())
        .collect()
}

#[tokio::test]
async fn ordered_headers_appear_in_order() {
    let (addr, rx) = raw_server(OK);

    let client = camo::Client::new();
    client
        .get(format!("http://{addr}/"))
        .ordered_headers(&[
            ("x-second", "2"),
            ("x-first", "1"),
            ("accept", "*/*"),
        ])
        .send()
        .await
        .unwrap();

    let head = rx.recv().unwrap();
    let names = header_names(&head);

    let second = names.iter().position(|n| n == "x-second").unwrap();
    let first = names.iter().position(|n| n == "x-first").unwrap();
    let accept = names.iter().position(|n| n == "accept").unwrap();
    assert!(second < first && first < accept, "order drifted: {names:?}");
}

#[tokio::test]
async fn unknown_headers_follow_known_ones() {
    let (addr, rx) = raw_server(OK);

    let client = camo::Client::new();
    client
        .get(format!("http://{addr}/"))
        .header("zz-unlisted", "v")
        .ordered_headers(&[("x-a", "1"), ("x-b", "2")])
        .send()
        .await
        .unwrap();

    let head = rx.recv().unwrap();
    let names = header_names(&head);

    let a = names.iter().position(|n| n == "x-a").unwrap();
    let b = names.iter().position(|n| n == "x-b").unwrap();
    let unlisted = names.iter().position(|n| n == "zz-unlisted").unwrap();
    assert!(a < b, "known order violated: {names:?}");
    assert!(b < unlisted, "unknown header sorted before known: {names:?}");
}

#[tokio::test]
async fn placeholder_entries_shape_order_without_values() {
    let (addr, rx) = raw_server(OK);

    let client = camo::Client::new();
    let request = client
        .get(format!("http://{addr}/"))
        .ordered_headers(&[(":path", ""), ("x-custom", "v"), ("x-ghost", "")])
        .build()
        .unwrap();

    // The placeholder shapes the order vector but never becomes a header.
    assert_eq!(request.headers().get("x-custom").unwrap(), "v");
    assert!(!request.headers().contains_key("x-ghost"));
    let order = request.header_order().unwrap();
    assert_eq!(
        order.pseudo().unwrap()[0],
        camo::PseudoOrder::Path,
    );

    client.execute(request).await.unwrap();
    let head = rx.recv().unwrap();
    let names = header_names(&head);
    assert!(names.contains(&"x-custom".to_string()));
    assert!(!names.contains(&"x-ghost".to_string()));
}

#[tokio::test]
async fn host_is_first_on_http1() {
    let (addr, rx) = raw_server(OK);

    let client = camo::Client::new();
    client
        .get(format!("http://{addr}/"))
        .send()
        .await
        .unwrap();

    let head = rx.recv().unwrap();
    let names = header_names(&head);
    assert_eq!(names.first().map(String::as_str), Some("host"));
}

#[tokio::test]
async fn request_line_uses_origin_form() {
    let (addr, rx) = raw_server(OK);

    let client = camo::Client::new();
    client
        .get(format!("http://{addr}/a/b?c=d"))
        .send()
        .await
        .unwrap();

    let head = rx.recv().unwrap();
    let request_line = std::str::from_utf8(&head)
        .unwrap()
        .lines()
        .next()
        .unwrap()
        .to_owned();
    assert_eq!(request_line, "GET /a/b?c=d HTTP/1.1");
}
