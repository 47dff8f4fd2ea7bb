//! The asynchronous client.

pub(crate) mod body;
pub(crate) mod decoder;
#[cfg(feature = "http3")]
pub(crate) mod h3;
pub mod multipart;
pub(crate) mod request;
pub(crate) mod response;
pub(crate) mod transport;

use std::collections::HashMap;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};

use http::header::{
    HeaderMap, HeaderValue, ACCEPT_ENCODING, AUTHORIZATION, CONTENT_ENCODING, CONTENT_LENGTH,
    CONTENT_TYPE, COOKIE, LOCATION, PROXY_AUTHORIZATION, REFERER, USER_AGENT, WWW_AUTHENTICATE,
};
use http::{Method, StatusCode};
use url::Url;

pub use body::{Body, BodySource};
pub use request::{Request, RequestBuilder};
pub use response::Response;

use crate::connect::{Connector, DialPlan, LocalBind};
use crate::dns::{cache::CachingResolver, gai::GaiResolver, DnsResolverWithOverrides, DynResolver, Resolve};
use crate::error::{Error, TimedOut};
use crate::headers::{HeaderOrder, HeaderOrderTable, OrderFamily};
use crate::http1::Http1Settings;
use crate::http2::Http2Settings;
use crate::http3::Http3Settings;
use crate::into_url::IntoUrl;
use crate::middleware::{
    run_client_chain, run_request_chain, run_response_chain, ClientChain, ClientMiddleware,
    RequestChain, RequestMiddleware, ResponseChain, ResponseMiddleware,
};
use crate::proxy::Proxy;
use crate::tls::{AlpnProtos, HandshakeConnector, TlsOptions};
#[cfg(feature = "cookies")]
use crate::cookie;
use crate::{redirect, retry};
use decoder::Accepts;
use multipart::BoundaryGenerator;
use transport::{Exchange, RequestShape, TransportCache, TransportKey, UnifiedTransport};

/// Which HTTP versions a client (or a single request) may use.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HttpVersionPref {
    /// Negotiate `h2` or `http/1.1` via ALPN, the browser default.
    #[default]
    All,
    /// HTTP/1.1 only; the offered ALPN carries only `http/1.1`.
    Http1,
    /// HTTP/2 only; the offered ALPN carries only `h2`.
    Http2,
    /// HTTP/3 over QUIC, falling back to HTTP/2 when the server does not
    /// support it.
    Http3,
}

/// The client configuration, mutable by [`ClientMiddleware`]s at build time.
pub struct ClientConfig {
    /// Default headers sent on every request.
    pub headers: HeaderMap,
    /// Total per-request timeout. Defaults to 30 seconds.
    pub timeout: Option<Duration>,
    /// Dial timeout, clamped to the request deadline.
    pub connect_timeout: Option<Duration>,
    /// Proxies, checked in insertion order.
    pub proxies: Vec<Proxy>,
    /// Redirect policy.
    pub redirect: redirect::Policy,
    /// Retry policy for retry-eligible status codes.
    pub retry: retry::Policy,
    /// Refuse plain-`http` URLs.
    pub https_only: bool,
    /// Emit a `Referer` header when following redirects.
    pub referer: bool,
    /// The protocol family this client speaks.
    pub version: HttpVersionPref,
    /// Treat HTTP/3 as mandatory: failures surface instead of falling back
    /// to HTTP/2.
    pub http3_only: bool,
    /// TLS fingerprint options.
    pub tls: TlsOptions,
    /// HTTP/1.1 connection options.
    pub http1: Http1Settings,
    /// HTTP/2 fingerprint settings.
    pub http2: Http2Settings,
    /// HTTP/3 SETTINGS frame content.
    pub http3: Http3Settings,
    /// Per-method header order tables.
    pub header_order_table: HeaderOrderTable,
    /// Multipart boundary flavor.
    pub multipart_boundary: BoundaryGenerator,

    pub(crate) accepts: Accepts,
    pub(crate) local_addr: Option<IpAddr>,
    pub(crate) interface: Option<String>,
    pub(crate) nodelay: bool,
    pub(crate) verbose: bool,
    pub(crate) dns: DnsBackend,
    pub(crate) dns_overrides: HashMap<std::borrow::Cow<'static, str>, Vec<SocketAddr>>,
    pub(crate) dns_cache: Option<(Duration, u32)>,
    #[cfg(feature = "cookies")]
    pub(crate) cookie_store: Option<Arc<dyn cookie::CookieStore>>,
}

pub(crate) enum DnsBackend {
    Gai,
    #[cfg(feature = "hickory-dns")]
    HickorySystem,
    #[cfg(feature = "hickory-dns")]
    HickoryUdp(SocketAddr),
    #[cfg(feature = "hickory-dns")]
    HickoryTls(SocketAddr, String),
    Custom(Arc<dyn Resolve>),
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            headers: HeaderMap::new(),
            timeout: Some(Duration::from_secs(30)),
            connect_timeout: None,
            proxies: Vec::new(),
            redirect: redirect::Policy::default(),
            retry: retry::Policy::never(),
            https_only: false,
            referer: true,
            version: HttpVersionPref::All,
            http3_only: false,
            tls: TlsOptions::default(),
            http1: Http1Settings::default(),
            http2: Http2Settings::default(),
            http3: Http3Settings::default(),
            header_order_table: HeaderOrderTable::new(),
            multipart_boundary: BoundaryGenerator::WebKit,
            accepts: Accepts::default(),
            local_addr: None,
            interface: None,
            nodelay: true,
            verbose: false,
            dns: DnsBackend::Gai,
            dns_overrides: HashMap::new(),
            dns_cache: None,
            #[cfg(feature = "cookies")]
            cookie_store: None,
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("timeout", &self.timeout)
            .field("https_only", &self.https_only)
            .field("version", &self.version)
            .finish()
    }
}

/// An asynchronous `Client` to make Requests with.
///
/// The Client holds a transport cache internally, so it is advised that you
/// create one and **reuse** it. You do **not** have to wrap the `Client` in
/// an [`Rc`](std::rc::Rc) or [`Arc`](std::sync::Arc) to **reuse** it,
/// because it already uses an [`Arc`](std::sync::Arc) internally.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientRef>,
}

struct ClientRef {
    headers: HeaderMap,
    timeout: Option<Duration>,
    version: HttpVersionPref,
    http3_only: bool,
    https_only: bool,
    referer: bool,
    accepts: Accepts,
    proxies: Arc<Vec<Proxy>>,
    proxies_dynamic: bool,
    redirect: redirect::Policy,
    retry: retry::Policy,
    http1: Http1Settings,
    http2: Http2Settings,
    http3: Http3Settings,
    header_order_table: HeaderOrderTable,
    multipart_boundary: BoundaryGenerator,
    connector: Connector,
    cache: TransportCache,
    #[cfg(feature = "http3")]
    h3_states: tokio::sync::Mutex<HashMap<TransportKey, h3::H3State>>,
    #[cfg(feature = "cookies")]
    cookie_store: Option<Arc<dyn cookie::CookieStore>>,
    request_chain: RequestChain,
    response_chain: ResponseChain,
}

/// A `ClientBuilder` can be used to create a `Client` with custom
/// configuration.
#[must_use]
pub struct ClientBuilder {
    config: ClientConfig,
    client_chain: ClientChain,
    request_chain: RequestChain,
    response_chain: ResponseChain,
    error: Option<Error>,
}

const DEFAULT_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientBuilder {
    /// Constructs a new `ClientBuilder`.
    ///
    /// This is the same as `Client::builder()`.
    pub fn new() -> ClientBuilder {
        let mut request_chain = RequestChain::default();
        request_chain.push(
            0,
            Arc::new(|request: &mut Request| -> Result<(), Error> {
                if !request.headers().contains_key(USER_AGENT) {
                    request
                        .headers_mut()
                        .insert(USER_AGENT, HeaderValue::from_static(DEFAULT_USER_AGENT));
                }
                Ok(())
            }) as Arc<dyn RequestMiddleware>,
        );

        let mut response_chain = ResponseChain::default();
        response_chain.push(
            0,
            Arc::new(|response: &mut Response| -> Result<(), Error> {
                if response.status() == StatusCode::SWITCHING_PROTOCOLS {
                    return Err(Error::upgrade("unexpected 101 switching protocols"));
                }
                Ok(())
            }) as Arc<dyn ResponseMiddleware>,
        );

        ClientBuilder {
            config: ClientConfig::default(),
            client_chain: ClientChain::default(),
            request_chain,
            response_chain,
            error: None,
        }
    }

    /// Returns a `Client` that uses this `ClientBuilder` configuration.
    ///
    /// # Errors
    ///
    /// This method fails if a configuration value was invalid, or a client
    /// middleware rejects the configuration.
    pub fn build(self) -> crate::Result<Client> {
        if let Some(error) = self.error {
            return Err(error);
        }

        let mut config = self.config;
        run_client_chain(&self.client_chain, &mut config)?;

        let resolver = build_resolver(&config)?;
        let tls = HandshakeConnector::new(Arc::new(config.tls));

        let user_agent = config.headers.get(USER_AGENT).cloned();
        let connector = Connector {
            resolver,
            tls,
            bind: LocalBind {
                addr: config.local_addr,
                interface: config.interface.clone(),
            },
            nodelay: config.nodelay,
            connect_timeout: config.connect_timeout,
            verbose: config.verbose,
            user_agent,
        };

        let proxies_dynamic = config.proxies.iter().any(Proxy::is_dynamic);

        Ok(Client {
            inner: Arc::new(ClientRef {
                headers: config.headers,
                timeout: config.timeout,
                version: config.version,
                http3_only: config.http3_only,
                https_only: config.https_only,
                referer: config.referer,
                accepts: config.accepts,
                proxies: Arc::new(config.proxies),
                proxies_dynamic,
                redirect: config.redirect,
                retry: config.retry,
                http1: config.http1,
                http2: config.http2,
                http3: config.http3,
                header_order_table: config.header_order_table,
                multipart_boundary: config.multipart_boundary,
                connector,
                cache: TransportCache::new(),
                #[cfg(feature = "http3")]
                h3_states: tokio::sync::Mutex::new(HashMap::new()),
                #[cfg(feature = "cookies")]
                cookie_store: config.cookie_store,
                request_chain: self.request_chain,
                response_chain: self.response_chain,
            }),
        })
    }

    /// Apply a browser emulation preset: TLS fingerprint, HTTP/2 settings,
    /// default headers, header order, and multipart boundary flavor.
    #[cfg(feature = "emulation")]
    pub fn emulation<E>(mut self, emulation: E) -> ClientBuilder
    where
        E: Into<crate::mimic::EmulationSettings>,
    {
        let settings = emulation.into();
        self.config.tls = settings.tls;
        self.config.http2 = settings.http2;
        self.config.http3 = settings.http3;
        if let Some(headers) = settings.headers {
            crate::util::replace_headers(&mut self.config.headers, headers);
        }
        self.config.header_order_table = settings.header_order;
        self.config.multipart_boundary = settings.multipart_boundary;
        self
    }

    /// Use the ClientHello described by a JA3 string.
    pub fn ja3_str(mut self, ja3: &str) -> ClientBuilder {
        match crate::tls::spec_from_ja3(ja3) {
            Ok(spec) => self.config.tls.hello = Some(spec),
            Err(err) => self.error = Some(err),
        }
        self
    }

    /// Use a full [`ClientHelloSpec`](crate::tls::ClientHelloSpec).
    pub fn hello_spec(mut self, spec: crate::tls::ClientHelloSpec) -> ClientBuilder {
        self.config.tls.hello = Some(spec);
        self
    }

    /// Replace the TLS options entirely.
    pub fn tls_options(mut self, tls: TlsOptions) -> ClientBuilder {
        self.config.tls = tls;
        self
    }

    /// Replace the HTTP/1.1 options.
    pub fn http1_settings(mut self, http1: Http1Settings) -> ClientBuilder {
        self.config.http1 = http1;
        self
    }

    /// Replace the HTTP/2 fingerprint settings.
    pub fn http2_settings(mut self, http2: Http2Settings) -> ClientBuilder {
        self.config.http2 = http2;
        self
    }

    /// Replace the HTTP/3 SETTINGS.
    pub fn http3_settings(mut self, http3: Http3Settings) -> ClientBuilder {
        self.config.http3 = http3;
        self
    }

    /// Only use HTTP/1.1.
    pub fn http1_only(mut self) -> ClientBuilder {
        self.config.version = HttpVersionPref::Http1;
        self
    }

    /// Only use HTTP/2.
    pub fn http2_only(mut self) -> ClientBuilder {
        self.config.version = HttpVersionPref::Http2;
        self
    }

    /// Prefer HTTP/3, falling back to HTTP/2 when the server does not
    /// support it.
    pub fn http3(mut self) -> ClientBuilder {
        self.config.version = HttpVersionPref::Http3;
        self
    }

    /// Force HTTP/3: errors surface instead of falling back to HTTP/2.
    pub fn http3_prior_knowledge(mut self) -> ClientBuilder {
        self.config.version = HttpVersionPref::Http3;
        self.config.http3_only = true;
        self
    }

    /// Sets the default headers for every request.
    pub fn default_headers(mut self, headers: HeaderMap) -> ClientBuilder {
        crate::util::replace_headers(&mut self.config.headers, headers);
        self
    }

    /// Sets the `User-Agent` header to be used by this client.
    pub fn user_agent<V>(mut self, value: V) -> ClientBuilder
    where
        HeaderValue: TryFrom<V>,
        <HeaderValue as TryFrom<V>>::Error: Into<http::Error>,
    {
        match HeaderValue::try_from(value) {
            Ok(value) => {
                self.config.headers.insert(USER_AGENT, value);
            }
            Err(err) => self.error = Some(Error::builder(err.into())),
        }
        self
    }

    /// Installs a per-method header order table.
    pub fn header_order_table(mut self, table: HeaderOrderTable) -> ClientBuilder {
        self.config.header_order_table = table;
        self
    }

    /// Add a `Proxy` to the list of proxies the `Client` will use.
    pub fn proxy(mut self, proxy: Proxy) -> ClientBuilder {
        self.config.proxies.push(proxy);
        self
    }

    /// Set a redirect policy for this client.
    pub fn redirect(mut self, policy: redirect::Policy) -> ClientBuilder {
        self.config.redirect = policy;
        self
    }

    /// Set a retry policy for this client.
    pub fn retry(mut self, policy: retry::Policy) -> ClientBuilder {
        self.config.retry = policy;
        self
    }

    /// Enables a total request timeout, from connect to response headers.
    ///
    /// Default is 30 seconds.
    pub fn timeout(mut self, timeout: Duration) -> ClientBuilder {
        self.config.timeout = Some(timeout);
        self
    }

    /// Disables the total request timeout.
    pub fn no_timeout(mut self) -> ClientBuilder {
        self.config.timeout = None;
        self
    }

    /// Set a timeout for only the connect phase of a `Client`.
    pub fn connect_timeout(mut self, timeout: Duration) -> ClientBuilder {
        self.config.connect_timeout = Some(timeout);
        self
    }

    /// Bind to a local IP Address.
    pub fn local_address<T>(mut self, addr: T) -> ClientBuilder
    where
        T: Into<Option<IpAddr>>,
    {
        self.config.local_addr = addr.into();
        self
    }

    /// Bind connections to a network interface by name or literal address.
    ///
    /// A literal IP binds the local socket address; a name uses the OS
    /// device binding.
    pub fn interface(mut self, interface: &str) -> ClientBuilder {
        match interface.parse::<IpAddr>() {
            Ok(addr) => self.config.local_addr = Some(addr),
            Err(_) => self.config.interface = Some(interface.to_owned()),
        }
        self
    }

    /// Set whether sockets have `TCP_NODELAY` enabled.
    pub fn tcp_nodelay(mut self, enabled: bool) -> ClientBuilder {
        self.config.nodelay = enabled;
        self
    }

    /// Restrict the Client to be used with HTTPS only requests.
    pub fn https_only(mut self, enabled: bool) -> ClientBuilder {
        self.config.https_only = enabled;
        self
    }

    /// Enable or disable automatic setting of the `Referer` header.
    pub fn referer(mut self, enabled: bool) -> ClientBuilder {
        self.config.referer = enabled;
        self
    }

    /// Log wire-level reads and writes at trace level.
    pub fn connection_verbose(mut self, verbose: bool) -> ClientBuilder {
        self.config.verbose = verbose;
        self
    }

    /// Use a custom DNS resolver.
    pub fn dns_resolver<R>(mut self, resolver: R) -> ClientBuilder
    where
        R: Resolve + 'static,
    {
        self.config.dns = DnsBackend::Custom(Arc::new(resolver));
        self
    }

    /// Resolve through the system's configured nameservers via hickory.
    #[cfg(feature = "hickory-dns")]
    pub fn hickory_dns(mut self) -> ClientBuilder {
        self.config.dns = DnsBackend::HickorySystem;
        self
    }

    /// Resolve through one UDP nameserver, given as `host:port`.
    #[cfg(feature = "hickory-dns")]
    pub fn dns_server(mut self, addr: &str) -> ClientBuilder {
        match crate::dns::parse_dns_addr(addr) {
            Ok(addr) => self.config.dns = DnsBackend::HickoryUdp(addr),
            Err(err) => self.error = Some(err),
        }
        self
    }

    /// Resolve via DNS-over-TLS. `dns_name` is the server certificate name.
    #[cfg(feature = "hickory-dns")]
    pub fn dns_over_tls(mut self, addr: &str, dns_name: &str) -> ClientBuilder {
        match crate::dns::parse_dns_addr(addr) {
            Ok(addr) => {
                self.config.dns = DnsBackend::HickoryTls(addr, dns_name.to_owned());
            }
            Err(err) => self.error = Some(err),
        }
        self
    }

    /// Cache DNS answers for `ttl`, serving each answer at most `max_uses`
    /// times and round-robining across addresses.
    pub fn dns_cache(mut self, ttl: Duration, max_uses: u32) -> ClientBuilder {
        self.config.dns_cache = Some((ttl, max_uses));
        self
    }

    /// Override DNS resolution for specific domains to particular addresses.
    pub fn resolve(mut self, domain: &str, addr: SocketAddr) -> ClientBuilder {
        self.config
            .dns_overrides
            .insert(domain.to_owned().into(), vec![addr]);
        self
    }

    /// Enable a persistent cookie store for the client (a [`cookie::Jar`]).
    #[cfg(feature = "cookies")]
    pub fn cookie_store(mut self, enable: bool) -> ClientBuilder {
        self.config.cookie_store = if enable {
            Some(Arc::new(cookie::Jar::default()))
        } else {
            None
        };
        self
    }

    /// Use a custom cookie store.
    #[cfg(feature = "cookies")]
    pub fn cookie_provider<C: cookie::CookieStore + 'static>(
        mut self,
        cookie_store: Arc<C>,
    ) -> ClientBuilder {
        self.config.cookie_store = Some(cookie_store as _);
        self
    }

    /// Enable or disable gzip decoding.
    #[cfg(feature = "gzip")]
    pub fn gzip(mut self, enable: bool) -> ClientBuilder {
        self.config.accepts.gzip = enable;
        self
    }

    /// Enable or disable brotli decoding.
    #[cfg(feature = "brotli")]
    pub fn brotli(mut self, enable: bool) -> ClientBuilder {
        self.config.accepts.brotli = enable;
        self
    }

    /// Enable or disable zstd decoding.
    #[cfg(feature = "zstd")]
    pub fn zstd(mut self, enable: bool) -> ClientBuilder {
        self.config.accepts.zstd = enable;
        self
    }

    /// Enable or disable deflate decoding.
    #[cfg(feature = "deflate")]
    pub fn deflate(mut self, enable: bool) -> ClientBuilder {
        self.config.accepts.deflate = enable;
        self
    }

    /// Register a client middleware with the given priority. Lower
    /// priorities run first; equal priorities run in registration order.
    pub fn with_client_middleware<M>(mut self, priority: i32, middleware: M) -> ClientBuilder
    where
        M: ClientMiddleware,
    {
        self.client_chain.push(priority, Arc::new(middleware));
        self
    }

    /// Register a request middleware with the given priority.
    pub fn with_request_middleware<M>(mut self, priority: i32, middleware: M) -> ClientBuilder
    where
        M: RequestMiddleware,
    {
        self.request_chain.push(priority, Arc::new(middleware));
        self
    }

    /// Register a response middleware with the given priority.
    pub fn with_response_middleware<M>(mut self, priority: i32, middleware: M) -> ClientBuilder
    where
        M: ResponseMiddleware,
    {
        self.response_chain.push(priority, Arc::new(middleware));
        self
    }
}

impl fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("config", &self.config)
            .finish()
    }
}

fn build_resolver(config: &ClientConfig) -> crate::Result<DynResolver> {
    let base: Arc<dyn Resolve> = match &config.dns {
        DnsBackend::Gai => Arc::new(GaiResolver::new()),
        #[cfg(feature = "hickory-dns")]
        DnsBackend::HickorySystem => Arc::new(crate::dns::hickory::HickoryDnsResolver::new()),
        #[cfg(feature = "hickory-dns")]
        DnsBackend::HickoryUdp(addr) => {
            Arc::new(crate::dns::hickory::HickoryDnsResolver::udp(*addr))
        }
        #[cfg(feature = "hickory-dns")]
        DnsBackend::HickoryTls(addr, name) => {
            Arc::new(crate::dns::hickory::HickoryDnsResolver::tls(*addr, name))
        }
        DnsBackend::Custom(resolver) => resolver.clone(),
    };

    let base: Arc<dyn Resolve> = if config.dns_overrides.is_empty() {
        base
    } else {
        Arc::new(DnsResolverWithOverrides::new(
            base,
            config.dns_overrides.clone(),
        ))
    };

    let base: Arc<dyn Resolve> = match config.dns_cache {
        Some((ttl, max_uses)) => Arc::new(CachingResolver::new(base, ttl, max_uses)),
        None => base,
    };

    Ok(DynResolver::new(base))
}

impl Client {
    /// Constructs a new `Client` with the default configuration.
    ///
    /// # Panics
    ///
    /// This method panics if the client cannot be initialized. Use
    /// `Client::builder()` if you wish to handle the failure as an `Error`.
    pub fn new() -> Client {
        ClientBuilder::new().build().expect("Client::new()")
    }

    /// Creates a `ClientBuilder` to configure a `Client`.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Convenience method to make a `GET` request to a URL.
    pub fn get<U: IntoUrl>(&self, url: U) -> RequestBuilder {
        self.request(Method::GET, url)
    }

    /// Convenience method to make a `POST` request to a URL.
    pub fn post<U: IntoUrl>(&self, url: U) -> RequestBuilder {
        self.request(Method::POST, url)
    }

    /// Convenience method to make a `PUT` request to a URL.
    pub fn put<U: IntoUrl>(&self, url: U) -> RequestBuilder {
        self.request(Method::PUT, url)
    }

    /// Convenience method to make a `PATCH` request to a URL.
    pub fn patch<U: IntoUrl>(&self, url: U) -> RequestBuilder {
        self.request(Method::PATCH, url)
    }

    /// Convenience method to make a `DELETE` request to a URL.
    pub fn delete<U: IntoUrl>(&self, url: U) -> RequestBuilder {
        self.request(Method::DELETE, url)
    }

    /// Convenience method to make a `HEAD` request to a URL.
    pub fn head<U: IntoUrl>(&self, url: U) -> RequestBuilder {
        self.request(Method::HEAD, url)
    }

    /// Start building a `Request` with the `Method` and `Url`.
    pub fn request<U: IntoUrl>(&self, method: Method, url: U) -> RequestBuilder {
        let request = url.into_url().map(|url| Request::new(method, url));
        RequestBuilder::new(self.clone(), request)
    }

    /// Creates a multipart form using this client's boundary flavor.
    pub fn multipart_form(&self) -> multipart::Form {
        multipart::Form::with_boundary(self.inner.multipart_boundary)
    }

    /// Executes a `Request`.
    pub async fn execute(&self, request: Request) -> crate::Result<Response> {
        let started = Instant::now();
        let timeout = request.timeout().copied().or(self.inner.timeout);
        let fut = self.execute_inner(request, started);
        match timeout {
            Some(timeout) => match tokio::time::timeout(timeout, fut).await {
                Ok(result) => result,
                Err(_) => Err(Error::request(TimedOut)),
            },
            None => fut.await,
        }
    }

    /// Drops every cached transport. The next request to any host dials a
    /// new connection.
    pub fn close_idle_connections(&self) {
        self.inner.cache.clear();
        #[cfg(feature = "http3")]
        {
            if let Ok(mut states) = self.inner.h3_states.try_lock() {
                states.clear();
            }
        }
    }

    async fn execute_inner(&self, mut request: Request, started: Instant) -> crate::Result<Response> {
        if self.inner.https_only && request.url().scheme() != "https" {
            return Err(Error::url_bad_scheme(request.url().clone()));
        }

        // Default headers fill in what the request has not set.
        let defaults = self.inner.headers.clone();
        for (name, value) in defaults.iter() {
            if !request.headers().contains_key(name) {
                request.headers_mut().insert(name.clone(), value.clone());
            }
        }

        run_request_chain(&self.inner.request_chain, &mut request)?;

        let (method, mut url, mut headers, order, mut body, _timeout, version) = request.pieces();
        let version = version.unwrap_or(self.inner.version);

        if let Some(accept_encoding) = self.inner.accepts.as_str() {
            if !headers.contains_key(ACCEPT_ENCODING) {
                headers.insert(ACCEPT_ENCODING, HeaderValue::from_static(accept_encoding));
            }
        }

        let family = match version {
            HttpVersionPref::Http3 => OrderFamily::Http3,
            _ => OrderFamily::Http1Or2,
        };
        let order: Option<HeaderOrder> = order.or_else(|| {
            self.inner
                .header_order_table
                .get(&method, family)
                .cloned()
        });

        let mut method = method;
        let mut visited: Vec<Url> = Vec::new();
        let mut retries: u32 = 0;
        let mut attempts_total: u32 = 0;

        loop {
            #[cfg(feature = "cookies")]
            if let Some(cookie_store) = &self.inner.cookie_store {
                headers.remove(COOKIE);
                cookie::add_cookie_header(&mut headers, &**cookie_store, &url);
            }

            let mut attempt_headers = headers.clone();
            if let Some(order) = &order {
                order.sort_headers(&mut attempt_headers);
            }

            let exchange = self
                .dispatch(&method, &url, attempt_headers, order.as_ref(), body.as_mut(), version)
                .await?;
            attempts_total += exchange.attempts;

            if self.inner.retry.should_retry(exchange.status, retries) {
                let restartable = body.as_ref().map(Body::is_restartable).unwrap_or(true);
                if restartable {
                    retries += 1;
                    log::debug!(
                        "retrying {url} after {:?} (status {})",
                        self.inner.retry.wait(),
                        exchange.status
                    );
                    tokio::time::sleep(self.inner.retry.wait()).await;
                    continue;
                }
            }

            #[cfg(feature = "cookies")]
            if let Some(cookie_store) = &self.inner.cookie_store {
                cookie::store_response_cookies(&**cookie_store, &exchange.headers, &url);
            }

            if exchange.status.is_redirection() {
                if let Some(next) = self.next_redirect(&exchange, &url)? {
                    match self.inner.redirect.check(exchange.status, &next, &visited) {
                        crate::redirect::ActionKind::Follow => {
                            let cross_host = next.host_str() != url.host_str()
                                || next.port_or_known_default() != url.port_or_known_default();
                            if cross_host {
                                headers.remove(AUTHORIZATION);
                                headers.remove(COOKIE);
                                headers.remove(PROXY_AUTHORIZATION);
                                headers.remove(WWW_AUTHENTICATE);
                            }

                            let drop_body = matches!(
                                exchange.status,
                                StatusCode::MOVED_PERMANENTLY
                                    | StatusCode::FOUND
                                    | StatusCode::SEE_OTHER
                            );
                            if drop_body {
                                if method != Method::GET && method != Method::HEAD {
                                    method = Method::GET;
                                }
                                body = None;
                                headers.remove(CONTENT_LENGTH);
                                headers.remove(CONTENT_TYPE);
                                headers.remove(CONTENT_ENCODING);
                            } else {
                                // 307/308 must replay the body verbatim.
                                let restartable =
                                    body.as_ref().map(Body::is_restartable).unwrap_or(true);
                                if !restartable {
                                    return self
                                        .finish_response(exchange, url, attempts_total, started)
                                        .await;
                                }
                            }

                            if self.inner.referer {
                                if let Some(referer) = make_referer(&next, &url) {
                                    headers.insert(REFERER, referer);
                                }
                            }

                            log::debug!("redirecting '{url}' to '{next}'");
                            visited.push(url.clone());
                            url = next;
                            continue;
                        }
                        crate::redirect::ActionKind::Stop => {}
                        crate::redirect::ActionKind::Error(err) => {
                            return Err(Error::redirect(err, url));
                        }
                    }
                }
            }

            return self.finish_response(exchange, url, attempts_total, started).await;
        }
    }

    async fn finish_response(
        &self,
        exchange: Exchange,
        url: Url,
        attempts: u32,
        started: Instant,
    ) -> crate::Result<Response> {
        let mut response = Response::new(
            exchange.status,
            exchange.version,
            exchange.headers,
            exchange.stream,
            self.inner.accepts,
            url,
            exchange.meta.remote_addr,
            exchange.meta.tls_info,
            attempts,
            started.elapsed(),
        );
        run_response_chain(&self.inner.response_chain, &mut response)?;
        Ok(response)
    }

    fn next_redirect(&self, exchange: &Exchange, url: &Url) -> crate::Result<Option<Url>> {
        let Some(location) = exchange.headers.get(LOCATION) else {
            return Ok(None);
        };
        let location = location
            .to_str()
            .map_err(|err| Error::redirect(err, url.clone()))?;
        let next = url
            .join(location)
            .map_err(|err| Error::redirect(err, url.clone()))?;
        Ok(Some(next))
    }

    async fn dispatch(
        &self,
        method: &Method,
        url: &Url,
        headers: HeaderMap,
        order: Option<&HeaderOrder>,
        body: Option<&mut Body>,
        version: HttpVersionPref,
    ) -> crate::Result<Exchange> {
        #[cfg(feature = "http3")]
        if matches!(version, HttpVersionPref::Http3) {
            return self.dispatch_h3(method, url, headers, order, body).await;
        }
        #[cfg(not(feature = "http3"))]
        if matches!(version, HttpVersionPref::Http3) {
            return Err(Error::builder("http3 support is not enabled"));
        }

        self.dispatch_unified(method, url, headers, order, body, version)
            .await
    }

    async fn dispatch_unified(
        &self,
        method: &Method,
        url: &Url,
        headers: HeaderMap,
        order: Option<&HeaderOrder>,
        body: Option<&mut Body>,
        version: HttpVersionPref,
    ) -> crate::Result<Exchange> {
        // A version-pinned client narrows the offered ALPN; otherwise the
        // profile's own list (or hello spec) stands.
        let alpn = match version {
            HttpVersionPref::Http1 => Some(AlpnProtos::HTTP1),
            HttpVersionPref::Http2 => Some(AlpnProtos::HTTP2),
            _ => None,
        };

        let shape = RequestShape {
            method: method.clone(),
            url,
            headers,
            order,
            body,
            version,
        };

        // A per-call proxy function makes connections uncacheable.
        if self.inner.proxies_dynamic {
            let transport = self.build_transport(url, alpn);
            return transport.round_trip(shape).await;
        }

        let plan = DialPlan::derive(url, &self.inner.proxies)?;
        let key = TransportKey::derive(url, plan.proxy.as_ref().map(|p| p.identity()))?;
        let transport = self
            .inner
            .cache
            .get_or_create(&key, || async { Ok(self.build_transport(url, alpn)) })
            .await?;

        match transport.round_trip(shape).await {
            Ok(exchange) => Ok(exchange),
            Err(err) => {
                self.inner.cache.evict(&key);
                Err(err)
            }
        }
    }

    fn build_transport(&self, url: &Url, alpn: Option<AlpnProtos>) -> UnifiedTransport {
        UnifiedTransport::new(
            url.clone(),
            self.inner.proxies.clone(),
            self.inner.connector.clone(),
            self.inner.http1.clone(),
            self.inner.http2.clone(),
            alpn,
        )
    }

    #[cfg(feature = "http3")]
    async fn dispatch_h3(
        &self,
        method: &Method,
        url: &Url,
        headers: HeaderMap,
        order: Option<&HeaderOrder>,
        body: Option<&mut Body>,
    ) -> crate::Result<Exchange> {
        let mut body = body;
        let plan = DialPlan::derive(url, &self.inner.proxies)?;
        let key = TransportKey::derive(url, plan.proxy.as_ref().map(|p| p.identity()))?;

        // Non-SOCKS5 proxies cannot carry QUIC datagrams; that mismatch is a
        // deterministic HTTP/2 fallback, not an error.
        let proxy_blocks_udp = plan
            .proxy
            .as_ref()
            .map(|scheme| !scheme.is_socks5())
            .unwrap_or(false);

        if !proxy_blocks_udp {
            let state = {
                let mut states = self.inner.h3_states.lock().await;
                match states.get(&key) {
                    Some(state) => Ok(state.clone()),
                    None => match h3::connect(&self.inner.connector, &plan, &self.inner.http3)
                        .await
                    {
                        Ok(state) => {
                            states.insert(key.clone(), state.clone());
                            Ok(state)
                        }
                        Err(err) => Err(err),
                    },
                }
            };

            let result = match state {
                Ok(state) => {
                    state
                        .send(method.clone(), url, headers.clone(), body.as_deref_mut())
                        .await
                }
                Err(err) => Err(err),
            };

            match result {
                Ok(exchange) => return Ok(exchange),
                Err(err) if !self.inner.http3_only && h3::error_is_h3_unsupported(&err) => {
                    log::debug!("http3 unavailable for {url} ({err}), falling back to http/2");
                    self.inner.h3_states.lock().await.remove(&key);
                    // fall through to the TCP transports below
                }
                Err(err) => return Err(err),
            }
        } else if self.inner.http3_only {
            return Err(Error::connect("http3 requires a socks5 proxy or none"));
        }

        // Body restoration happens inside the unified transport; a consumed
        // one-shot body surfaces there.
        let shape_body = body;
        let shape_body = match shape_body {
            Some(body) if !body.is_restartable() => {
                return Err(Error::request(
                    "http3 attempt consumed a non-restartable body",
                ));
            }
            other => other,
        };

        self.dispatch_unified(
            method,
            url,
            headers,
            order,
            shape_body,
            HttpVersionPref::All,
        )
        .await
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("version", &self.inner.version)
            .finish()
    }
}

fn make_referer(next: &Url, previous: &Url) -> Option<HeaderValue> {
    if next.scheme() == "http" && previous.scheme() == "https" {
        return None;
    }

    let mut referer = previous.clone();
    let _ = referer.set_username("");
    let _ = referer.set_password(None);
    referer.set_fragment(None);
    referer.as_str().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn referer_not_leaked_downgrade() {
        let https = Url::parse("https://secure.example/page").unwrap();
        let http = Url::parse("http://insecure.example/").unwrap();
        assert!(make_referer(&http, &https).is_none());

        let referer = make_referer(&https, &http).unwrap();
        assert_eq!(referer, "http://insecure.example/");
    }

    #[test]
    fn referer_strips_credentials_and_fragment() {
        let prev = Url::parse("https://user:pw@site.example/a#frag").unwrap();
        let next = Url::parse("https://site.example/b").unwrap();
        let referer = make_referer(&next, &prev).unwrap();
        assert_eq!(referer, "https://site.example/a");
    }

    #[test]
    fn builder_error_is_deferred_to_build() {
        let result = Client::builder().ja3_str("not-a-ja3").build();
        assert!(result.unwrap_err().is_builder());
    }

    #[test]
    fn client_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Client>();
    }
}
