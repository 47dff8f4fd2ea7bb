//! The protocol selector.
//!
//! One [`UnifiedTransport`] per `(scheme, host, port, proxy)` cache key
//! owns the connections to that origin. The first request dials (and for
//! HTTPS completes the fingerprinted handshake), inspects ALPN, and reuses
//! that same connection for the request itself. An HTTP/2 transport error
//! flips the key to HTTP/1.1 and retries once, provided the request body can
//! be restored.

use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use http::header::{HeaderValue, HOST};
use http::{Method, Uri, Version};
use hyper2::{PseudoOrder, StreamDependency, StreamId};
use tokio::sync::{Mutex as AsyncMutex, OnceCell};
use url::Url;

use super::body::{Body, EngineBody};
use super::decoder::EngineStream;
use super::HttpVersionPref;
use crate::connect::{Conn, Connector, DialPlan};
use crate::error::Error;
use crate::headers::HeaderOrder;
use crate::http1::Http1Settings;
use crate::http2::Http2Settings;
use crate::rt::{TokioExecutor, TokioIo, TokioTimer};
use crate::tls::{AlpnProtos, TlsInfo};

/// Cache key of one transport: target origin plus proxy identity.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub(crate) struct TransportKey {
    pub(crate) is_https: bool,
    pub(crate) host: String,
    pub(crate) port: u16,
    pub(crate) proxy: Option<String>,
}

impl TransportKey {
    pub(crate) fn derive(url: &Url, proxy_identity: Option<String>) -> crate::Result<TransportKey> {
        let host = url
            .host_str()
            .ok_or_else(|| Error::builder("url has no host"))?
            .to_owned();
        let is_https = url.scheme() == "https";
        let port = url.port().unwrap_or(if is_https { 443 } else { 80 });
        Ok(TransportKey {
            is_https,
            host,
            port,
            proxy: proxy_identity,
        })
    }
}

/// Per-client transport cache with single-flight construction: concurrent
/// first requests to one key share a single dial and handshake.
#[derive(Default)]
pub(crate) struct TransportCache {
    entries: Mutex<HashMap<TransportKey, Arc<CacheCell>>>,
}

#[derive(Default)]
struct CacheCell {
    once: OnceCell<UnifiedTransport>,
}

impl TransportCache {
    pub(crate) fn new() -> TransportCache {
        TransportCache::default()
    }

    /// Returns the transport for `key`, constructing it at most once even
    /// under concurrent first use. A failed construction leaves the cell
    /// empty so the next caller retries.
    pub(crate) async fn get_or_create<F, Fut>(
        &self,
        key: &TransportKey,
        init: F,
    ) -> crate::Result<UnifiedTransport>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = crate::Result<UnifiedTransport>>,
    {
        let cell = {
            let mut entries = self.entries.lock().expect("transport cache poisoned");
            entries.entry(key.clone()).or_default().clone()
        };
        cell.once.get_or_try_init(init).await.cloned()
    }

    /// Drops the cached transport for `key` after a fatal exchange error.
    pub(crate) fn evict(&self, key: &TransportKey) {
        let mut entries = self.entries.lock().expect("transport cache poisoned");
        entries.remove(key);
        log::debug!("evicted transport for {}:{}", key.host, key.port);
    }

    /// Drains and clears every cached transport. The next request to any key
    /// dials anew.
    pub(crate) fn clear(&self) {
        self.entries
            .lock()
            .expect("transport cache poisoned")
            .clear();
    }
}

impl fmt::Debug for TransportCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportCache").finish()
    }
}

/// Connection metadata captured at handshake time, surfaced on responses.
#[derive(Clone, Debug, Default)]
pub(crate) struct ConnMeta {
    pub(crate) remote_addr: Option<SocketAddr>,
    pub(crate) tls_info: Option<TlsInfo>,
}

/// The outcome of one exchange, before response-level glue is applied.
pub(crate) struct Exchange {
    pub(crate) status: http::StatusCode,
    pub(crate) version: Version,
    pub(crate) headers: http::HeaderMap,
    pub(crate) stream: EngineStream,
    pub(crate) meta: ConnMeta,
    pub(crate) attempts: u32,
}

/// Everything the transport needs to know about one request.
pub(crate) struct RequestShape<'a> {
    pub(crate) method: Method,
    pub(crate) url: &'a Url,
    pub(crate) headers: http::HeaderMap,
    pub(crate) order: Option<&'a HeaderOrder>,
    pub(crate) body: Option<&'a mut Body>,
    pub(crate) version: HttpVersionPref,
}

struct State {
    prefer_http1: bool,
    h1: Option<hyper2::client::conn::http1::SendRequest<EngineBody>>,
    h2: Option<hyper2::client::conn::http2::SendRequest<EngineBody>>,
    meta: ConnMeta,
    is_proxy: bool,
}

struct Shared {
    url: Url,
    is_https: bool,
    host: String,
    proxies: Arc<Vec<crate::proxy::Proxy>>,
    connector: Connector,
    http1: Http1Settings,
    http2: Http2Settings,
    alpn: Option<AlpnProtos>,
    state: AsyncMutex<State>,
}

impl Shared {
    /// Rotating proxies pick a fresh target on every dial, so the plan is
    /// derived per connection rather than per transport.
    fn plan(&self) -> crate::Result<DialPlan> {
        DialPlan::derive(&self.url, &self.proxies)
    }
}

/// Composite HTTP/1.1 + HTTP/2 transport for one cache key.
#[derive(Clone)]
pub(crate) struct UnifiedTransport {
    shared: Arc<Shared>,
}

impl UnifiedTransport {
    pub(crate) fn new(
        url: Url,
        proxies: Arc<Vec<crate::proxy::Proxy>>,
        connector: Connector,
        http1: Http1Settings,
        http2: Http2Settings,
        alpn: Option<AlpnProtos>,
    ) -> UnifiedTransport {
        let is_https = url.scheme() == "https";
        let host = url.host_str().unwrap_or_default().to_owned();
        UnifiedTransport {
            shared: Arc::new(Shared {
                url,
                is_https,
                host,
                proxies,
                connector,
                http1,
                http2,
                alpn,
                state: AsyncMutex::new(State {
                    prefer_http1: false,
                    h1: None,
                    h2: None,
                    meta: ConnMeta::default(),
                    is_proxy: false,
                }),
            }),
        }
    }

    /// Dispatches one request, applying the ALPN outcome and the
    /// HTTP/2-to-HTTP/1.1 fallback contract.
    pub(crate) async fn round_trip(&self, mut shape: RequestShape<'_>) -> crate::Result<Exchange> {
        let force_h1 = !self.shared.is_https
            || matches!(shape.version, HttpVersionPref::Http1)
            || self.shared.state.lock().await.prefer_http1;

        if force_h1 {
            return self.send_h1(&mut shape, 1).await;
        }

        // Establish (or reuse) the TLS connection and let ALPN pick the mode.
        let use_h2 = self.ensure_connection(&shape).await?;
        if !use_h2 {
            return self.send_h1(&mut shape, 1).await;
        }

        match self.send_h2(&mut shape).await {
            Ok(exchange) => Ok(exchange),
            Err(err) if err.is_fallback_eligible() => {
                let restartable = match &shape.body {
                    Some(body) => body.is_restartable(),
                    None => true,
                };
                if !restartable {
                    // A consumed one-shot body cannot be replayed; surface
                    // the HTTP/2 error unchanged.
                    return Err(err);
                }

                log::debug!(
                    "http2 round trip failed ({err}), falling back to http/1.1 for {}",
                    self.shared.host
                );
                {
                    let mut state = self.shared.state.lock().await;
                    state.prefer_http1 = true;
                    state.h2 = None;
                }
                match self.send_h1(&mut shape, 2).await {
                    Ok(exchange) => Ok(exchange),
                    // Both protocols failed; keep both causes attached.
                    Err(h1_err) => Err(Error::request(FallbackFailed {
                        http2: err,
                        http1: h1_err,
                    })),
                }
            }
            Err(err) => Err(err),
        }
    }

    /// First dial for an HTTPS key. Returns whether ALPN selected `h2`. The
    /// handshaken connection is kept for the first request.
    async fn ensure_connection(&self, shape: &RequestShape<'_>) -> crate::Result<bool> {
        let mut state = self.shared.state.lock().await;
        if state.h2.is_some() {
            return Ok(true);
        }
        if state.h1.is_some() {
            return Ok(false);
        }

        let plan = self.shared.plan()?;
        let conn = self
            .shared
            .connector
            .connect(&plan, self.shared.alpn)
            .await?;
        let meta = ConnMeta {
            remote_addr: conn.remote_addr(),
            tls_info: conn.tls_info().cloned(),
        };
        let is_proxy = conn.is_proxy();

        if conn.is_h2() {
            let sender = self.handshake_h2(conn, shape).await?;
            state.h2 = Some(sender);
        } else {
            let sender = self.handshake_h1(conn).await?;
            state.h1 = Some(sender);
        }
        state.meta = meta;
        state.is_proxy = is_proxy;
        Ok(state.h2.is_some())
    }

    async fn handshake_h1(
        &self,
        conn: Conn,
    ) -> crate::Result<hyper2::client::conn::http1::SendRequest<EngineBody>> {
        let mut builder = hyper2::client::conn::http1::Builder::new();
        builder
            .title_case_headers(self.shared.http1.title_case_headers)
            .preserve_header_case(self.shared.http1.preserve_header_case)
            .http09_responses(self.shared.http1.http09_responses);
        if let Some(max_headers) = self.shared.http1.max_headers {
            builder.max_headers(max_headers);
        }

        let (sender, conn) = builder
            .handshake(TokioIo::new(conn))
            .await
            .map_err(Error::request)?;
        tokio::spawn(async move {
            if let Err(err) = conn.await {
                log::debug!("http1 connection task ended: {err}");
            }
        });
        Ok(sender)
    }

    async fn handshake_h2(
        &self,
        conn: Conn,
        shape: &RequestShape<'_>,
    ) -> crate::Result<hyper2::client::conn::http2::SendRequest<EngineBody>> {
        let http2 = &self.shared.http2;
        let mut builder = hyper2::client::conn::http2::Builder::new(TokioExecutor::new());
        builder.timer(TokioTimer::new());

        builder
            .initial_stream_id(http2.initial_stream_id)
            .initial_stream_window_size(http2.initial_stream_window_size)
            .initial_connection_window_size(http2.initial_connection_window_size)
            .max_concurrent_streams(http2.max_concurrent_streams)
            .header_table_size(http2.header_table_size)
            .max_frame_size(http2.max_frame_size)
            .headers_priority(headers_priority(http2.headers_priority))
            .headers_pseudo_order(self.pseudo_order(shape))
            .settings_order(http2.settings_order)
            .priority(http2.priority.clone());

        if let Some(max_header_list_size) = http2.max_header_list_size {
            builder.max_header_list_size(max_header_list_size);
        }
        if let Some(enable_push) = http2.enable_push {
            builder.enable_push(enable_push);
        }
        if let Some(unknown_setting8) = http2.unknown_setting8 {
            builder.unknown_setting8(unknown_setting8);
        }
        if let Some(unknown_setting9) = http2.unknown_setting9 {
            builder.unknown_setting9(unknown_setting9);
        }

        let (sender, conn) = builder
            .handshake(TokioIo::new(conn))
            .await
            .map_err(Error::request)?;
        tokio::spawn(async move {
            if let Err(err) = conn.await {
                log::debug!("http2 connection task ended: {err}");
            }
        });
        Ok(sender)
    }

    /// The pseudo-header order for this connection: the request's
    /// side-channel wins over the profile's table.
    fn pseudo_order(&self, shape: &RequestShape<'_>) -> Option<[PseudoOrder; 4]> {
        shape
            .order
            .and_then(HeaderOrder::pseudo)
            .or(self.shared.http2.headers_pseudo_order)
    }

    async fn send_h2(&self, shape: &mut RequestShape<'_>) -> crate::Result<Exchange> {
        let (mut sender, meta) = {
            let state = self.shared.state.lock().await;
            match &state.h2 {
                Some(sender) => (sender.clone(), state.meta.clone()),
                None => return Err(Error::request("http2 connection went away")),
            }
        };

        let uri: Uri = shape.url.as_str().parse().map_err(Error::request)?;
        let mut request = http::Request::builder()
            .method(shape.method.clone())
            .uri(uri)
            .version(Version::HTTP_2)
            .body(engine_body(shape)?)
            .map_err(Error::request)?;
        *request.headers_mut() = shape.headers.clone();

        sender.ready().await.map_err(Error::request)?;
        let response = sender.send_request(request).await.map_err(Error::request)?;

        Ok(exchange_from(response, meta, 1))
    }

    async fn send_h1(&self, shape: &mut RequestShape<'_>, attempts: u32) -> crate::Result<Exchange> {
        // Take the idle sender; a concurrent request dials its own
        // connection rather than waiting.
        let (taken, meta, is_proxy) = {
            let mut state = self.shared.state.lock().await;
            (
                state.h1.take().filter(|sender| !sender.is_closed()),
                state.meta.clone(),
                state.is_proxy,
            )
        };

        let (mut sender, meta, is_proxy) = match taken {
            Some(sender) => (sender, meta, is_proxy),
            None => {
                let plan = self.shared.plan()?;
                let conn = self
                    .shared
                    .connector
                    .connect(&plan, Some(AlpnProtos::HTTP1))
                    .await?;
                let meta = ConnMeta {
                    remote_addr: conn.remote_addr(),
                    tls_info: conn.tls_info().cloned(),
                };
                let is_proxy = conn.is_proxy();
                let sender = self.handshake_h1(conn).await?;
                let mut state = self.shared.state.lock().await;
                state.meta = meta.clone();
                state.is_proxy = is_proxy;
                (sender, meta, is_proxy)
            }
        };

        let uri = h1_uri(shape.url, is_proxy)?;
        let mut request = http::Request::builder()
            .method(shape.method.clone())
            .uri(uri)
            .body(engine_body(shape)?)
            .map_err(Error::request)?;
        *request.headers_mut() = h1_headers(shape.url, &shape.headers)?;

        sender.ready().await.map_err(Error::request)?;
        let result = sender.send_request(request).await;

        // Hand the connection back for keep-alive reuse.
        if !sender.is_closed() {
            let mut state = self.shared.state.lock().await;
            if state.h1.is_none() {
                state.h1 = Some(sender);
            }
        }

        let response = result.map_err(Error::request)?;
        Ok(exchange_from(response, meta, attempts))
    }
}

impl fmt::Debug for UnifiedTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnifiedTransport")
            .field("host", &self.shared.host)
            .finish()
    }
}

/// Both the HTTP/2 attempt and the HTTP/1.1 fallback failed.
#[derive(Debug)]
struct FallbackFailed {
    http2: Error,
    http1: Error,
}

impl fmt::Display for FallbackFailed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "http2 error ({}) and http/1.1 fallback error",
            self.http2
        )
    }
}

impl std::error::Error for FallbackFailed {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.http1)
    }
}

fn engine_body(shape: &mut RequestShape<'_>) -> crate::Result<EngineBody> {
    match shape.body.as_deref_mut() {
        Some(body) => body.engine_body(),
        None => Ok(EngineBody::empty()),
    }
}

/// Converts the profile's `(dependency, weight, exclusive)` tuple into the
/// engine's HEADERS frame dependency.
fn headers_priority(priority: Option<(u32, u8, bool)>) -> Option<StreamDependency> {
    priority.map(|(id, weight, exclusive)| {
        StreamDependency::new(StreamId::from(id), weight, exclusive)
    })
}

fn h1_uri(url: &Url, is_proxy: bool) -> crate::Result<Uri> {
    if is_proxy {
        // Absolute-form through a plain HTTP proxy.
        return url.as_str().parse().map_err(Error::request);
    }
    let mut path = url.path().to_owned();
    if let Some(query) = url.query() {
        path.push('?');
        path.push_str(query);
    }
    path.parse().map_err(Error::request)
}

/// HTTP/1.1 carries the authority in a `Host` header, emitted first the way
/// browsers do.
fn h1_headers(url: &Url, headers: &http::HeaderMap) -> crate::Result<http::HeaderMap> {
    let mut out = http::HeaderMap::with_capacity(headers.len() + 1);
    if !headers.contains_key(HOST) {
        let host = url
            .host_str()
            .ok_or_else(|| Error::builder("url has no host"))?;
        let value = match url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_owned(),
        };
        out.insert(HOST, HeaderValue::from_str(&value).map_err(Error::request)?);
    }
    for (name, value) in headers {
        out.append(name.clone(), value.clone());
    }
    Ok(out)
}

fn exchange_from(
    response: http::Response<hyper2::body::Incoming>,
    meta: ConnMeta,
    attempts: u32,
) -> Exchange {
    let (parts, body) = response.into_parts();
    Exchange {
        status: parts.status,
        version: parts.version,
        headers: parts.headers,
        stream: EngineStream::hyper(body),
        meta,
        attempts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_derivation_defaults_ports() {
        let key = TransportKey::derive(&Url::parse("https://example.com/a").unwrap(), None)
            .unwrap();
        assert_eq!(key.port, 443);
        assert!(key.is_https);

        let key = TransportKey::derive(
            &Url::parse("http://example.com:8080/a").unwrap(),
            Some("socks5://p:1080".into()),
        )
        .unwrap();
        assert_eq!(key.port, 8080);
        assert_eq!(key.proxy.as_deref(), Some("socks5://p:1080"));
    }

    #[test]
    fn h1_uri_forms() {
        let url = Url::parse("http://example.com/a/b?c=d").unwrap();
        assert_eq!(h1_uri(&url, false).unwrap().to_string(), "/a/b?c=d");
        assert_eq!(
            h1_uri(&url, true).unwrap().to_string(),
            "http://example.com/a/b?c=d"
        );
    }

    #[test]
    fn headers_priority_converts_at_apply_time() {
        assert!(headers_priority(None).is_none());
        assert!(headers_priority(Some((0, 255, true))).is_some());
    }

    #[test]
    fn host_header_leads() {
        let url = Url::parse("http://example.com:8080/").unwrap();
        let mut headers = http::HeaderMap::new();
        headers.insert("user-agent", HeaderValue::from_static("x"));

        let out = h1_headers(&url, &headers).unwrap();
        let names: Vec<&str> = out.keys().map(|k| k.as_str()).collect();
        assert_eq!(names, ["host", "user-agent"]);
        assert_eq!(out.get(HOST).unwrap(), "example.com:8080");
    }
}
