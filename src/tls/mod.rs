//! TLS configuration and the fingerprinted handshaker.
//!
//! The handshake emits a ClientHello shaped by either a set of knob-level
//! [`TlsOptions`] or a full [`ClientHelloSpec`], without helpful reordering:
//! cipher order, curve order, extension set and GREASE slots all come from
//! the caller.

mod cache;
mod cert_compression;
mod ext;
pub mod hello;
mod ja3;

use std::sync::{Arc, Mutex};

use boring::error::ErrorStack;
use boring::ssl::{
    ConnectConfiguration, SslConnector, SslConnectorBuilder, SslCurve, SslMethod, SslRef,
    SslSessionCacheMode, SslVerifyMode, SslVersion,
};
use once_cell::sync::OnceCell;
use tokio::io::{AsyncRead, AsyncWrite};
use typed_builder::TypedBuilder;

pub use cache::SessionKey;
pub use hello::{ClientHelloSpec, KeyShareEntry, TlsExtension};
pub use ja3::{ja3_of, spec_from_ja3};

use cache::SessionCache;
use ext::{TlsBuilderExt, TlsConnectExt};

/// A TLS protocol version.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TlsVersion(pub(crate) SslVersion);

impl TlsVersion {
    /// Version 1.0 of the TLS protocol.
    pub const TLS_1_0: TlsVersion = TlsVersion(SslVersion::TLS1);
    /// Version 1.1 of the TLS protocol.
    pub const TLS_1_1: TlsVersion = TlsVersion(SslVersion::TLS1_1);
    /// Version 1.2 of the TLS protocol.
    pub const TLS_1_2: TlsVersion = TlsVersion(SslVersion::TLS1_2);
    /// Version 1.3 of the TLS protocol.
    pub const TLS_1_3: TlsVersion = TlsVersion(SslVersion::TLS1_3);

    pub(crate) fn from_wire(version: u16) -> Option<TlsVersion> {
        match version {
            hello::VERSION_TLS10 => Some(TlsVersion::TLS_1_0),
            hello::VERSION_TLS11 => Some(TlsVersion::TLS_1_1),
            hello::VERSION_TLS12 => Some(TlsVersion::TLS_1_2),
            hello::VERSION_TLS13 => Some(TlsVersion::TLS_1_3),
            _ => None,
        }
    }
}

/// Application-layer protocol negotiation list, in wire format.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AlpnProtos(pub(crate) &'static [u8]);

impl AlpnProtos {
    /// Offer `http/1.1` only.
    pub const HTTP1: AlpnProtos = AlpnProtos(b"\x08http/1.1");
    /// Offer `h2` only.
    pub const HTTP2: AlpnProtos = AlpnProtos(b"\x02h2");
    /// Offer `h2` then `http/1.1`, the browser default.
    pub const ALL: AlpnProtos = AlpnProtos(b"\x02h2\x08http/1.1");
}

impl Default for AlpnProtos {
    fn default() -> Self {
        Self::ALL
    }
}

/// Application settings (ALPS) protocol.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AlpsProtos(pub(crate) &'static [u8]);

impl AlpsProtos {
    /// ALPS over `http/1.1`.
    pub const HTTP1: AlpsProtos = AlpsProtos(b"http/1.1");
    /// ALPS over `h2`.
    pub const HTTP2: AlpsProtos = AlpsProtos(b"h2");
}

/// Certificate compression algorithms (RFC 8879).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CertCompressionAlgorithm {
    /// zlib (1).
    Zlib,
    /// Brotli (2), the Chrome default.
    Brotli,
    /// zstd (3).
    Zstd,
}

/// Snapshot of TLS details of an established connection, exposed on the
/// response when requested.
#[derive(Clone, Debug)]
pub struct TlsInfo {
    pub(crate) peer_certificate: Option<Vec<u8>>,
}

impl TlsInfo {
    /// The DER-encoded leaf certificate of the peer, if any.
    pub fn peer_certificate(&self) -> Option<&[u8]> {
        self.peer_certificate.as_deref()
    }
}

/// Settings shaping the emitted ClientHello and handshake behavior.
///
/// Profiles build one of these per browser version. `hello` takes precedence
/// for the fields a [`ClientHelloSpec`] carries (versions, ciphers, curve
/// order, extension set); the remaining knobs still apply.
#[derive(TypedBuilder)]
pub struct TlsOptions {
    /// Full ClientHello description, e.g. from a JA3 string.
    #[builder(default, setter(strip_option, into))]
    pub hello: Option<ClientHelloSpec>,

    /// ALPN protocols offered.
    #[builder(default)]
    pub alpn_protos: AlpnProtos,

    /// ALPS protocol, when the browser sends application settings.
    #[builder(default, setter(into))]
    pub alps_protos: Option<AlpsProtos>,

    /// Offer the `session_ticket` extension.
    #[builder(default = true)]
    pub session_ticket: bool,

    /// Minimum TLS version.
    #[builder(default, setter(into))]
    pub min_tls_version: Option<TlsVersion>,

    /// Maximum TLS version.
    #[builder(default, setter(into))]
    pub max_tls_version: Option<TlsVersion>,

    /// Enable TLS 1.3 session resumption via pre-shared keys.
    #[builder(default = false)]
    pub pre_shared_key: bool,

    /// Send a GREASE ECH extension when no ECHConfig is available.
    #[builder(default = false)]
    pub enable_ech_grease: bool,

    /// Permute ClientHello extensions, as Chrome does since 110.
    #[builder(default = false)]
    pub permute_extensions: bool,

    /// Enable GREASE values in ciphers, curves and extensions.
    #[builder(default = true)]
    pub grease_enabled: bool,

    /// Request OCSP stapling (`status_request`).
    #[builder(default = false)]
    pub enable_ocsp_stapling: bool,

    /// Request signed certificate timestamps.
    #[builder(default = false)]
    pub enable_signed_cert_timestamps: bool,

    /// `record_size_limit` extension value.
    #[builder(default, setter(into))]
    pub record_size_limit: Option<u16>,

    /// Limit the number of key shares, as Firefox does.
    #[builder(default, setter(into))]
    pub key_shares_limit: Option<u8>,

    /// Offer the `renegotiation_info` extension.
    #[builder(default = true)]
    pub renegotiation: bool,

    /// Delegated credentials algorithm list (Firefox).
    #[builder(default, setter(strip_option, into))]
    pub delegated_credentials: Option<&'static str>,

    /// BoringSSL cipher configuration string.
    #[builder(default, setter(strip_option, into))]
    pub cipher_list: Option<&'static str>,

    /// Supported curves, in offer order.
    #[builder(default, setter(strip_option, into))]
    pub curves: Option<&'static [SslCurve]>,

    /// Supported signature algorithms.
    #[builder(default, setter(strip_option, into))]
    pub sigalgs_list: Option<&'static str>,

    /// Certificate compression algorithms, in offer order.
    #[builder(default, setter(into))]
    pub cert_compression_algorithms: Option<&'static [CertCompressionAlgorithm]>,
}

impl Default for TlsOptions {
    fn default() -> Self {
        TlsOptions::builder().build()
    }
}

impl std::fmt::Debug for TlsOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsOptions")
            .field("alpn_protos", &self.alpn_protos)
            .field("session_ticket", &self.session_ticket)
            .field("pre_shared_key", &self.pre_shared_key)
            .field("permute_extensions", &self.permute_extensions)
            .field("grease_enabled", &self.grease_enabled)
            .finish()
    }
}

impl TlsOptions {
    /// Whether the handshake may offer session resumption: the emitted hello
    /// must carry a session ticket (TLS 1.2) or ticket + PSK modes + PSK
    /// (TLS 1.3).
    pub(crate) fn offers_resumption(&self) -> bool {
        if let Some(hello) = &self.hello {
            return hello.offers_resumption();
        }
        self.session_ticket || self.pre_shared_key
    }
}

/// TLS connector that emits fingerprint-shaped ClientHellos, with an
/// SNI-keyed client session cache shared by all connections of one client.
#[derive(Clone)]
pub(crate) struct HandshakeConnector {
    options: Arc<TlsOptions>,
    connector: Arc<OnceCell<SslConnector>>,
    session_cache: Arc<Mutex<SessionCache>>,
}

impl HandshakeConnector {
    pub(crate) fn new(options: Arc<TlsOptions>) -> HandshakeConnector {
        HandshakeConnector {
            options,
            connector: Arc::new(OnceCell::new()),
            session_cache: Arc::new(Mutex::new(SessionCache::new())),
        }
    }

    pub(crate) fn options(&self) -> &TlsOptions {
        &self.options
    }

    fn connector(&self) -> Result<&SslConnector, ErrorStack> {
        self.connector.get_or_try_init(|| {
            let mut builder = SslConnector::builder(SslMethod::tls_client())?;

            // Certificate trust is the caller's concern; the transport layer
            // never fails a handshake on trust.
            builder.set_verify(SslVerifyMode::NONE);

            builder.apply_tls_options(&self.options)?;

            if self.options.offers_resumption() {
                builder.set_session_cache_mode(SslSessionCacheMode::CLIENT);
                let cache = self.session_cache.clone();
                builder.set_new_session_callback(move |ssl, session| {
                    if let Some(key) = cache::session_key_of(ssl) {
                        cache.lock().expect("session cache poisoned").insert(key, session);
                    }
                });
            }

            Ok(builder.build())
        })
    }

    /// Performs a TLS handshake over `stream`, offering the connector's
    /// fingerprint. `alpn_override` narrows the offered protocols, used when
    /// the client is pinned to a single HTTP version.
    pub(crate) async fn handshake<S>(
        &self,
        host: &str,
        port: u16,
        alpn_override: Option<AlpnProtos>,
        stream: S,
    ) -> crate::Result<tokio_boring::SslStream<S>>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + Sync + std::fmt::Debug + 'static,
    {
        let connector = self.connector().map_err(crate::error::Error::tls)?;
        let mut conf = connector.configure().map_err(crate::error::Error::tls)?;

        self.setup(&mut conf, host, port, alpn_override)
            .map_err(crate::error::Error::tls)?;

        tokio_boring::connect(conf, host, stream)
            .await
            .map_err(crate::error::Error::tls)
    }

    fn setup(
        &self,
        conf: &mut ConnectConfiguration,
        host: &str,
        port: u16,
        alpn_override: Option<AlpnProtos>,
    ) -> Result<(), ErrorStack> {
        conf.set_verify_hostname(false);
        conf.set_use_server_name_indication(true);

        if let Some(alpn) = alpn_override {
            conf.set_alpn_protos(alpn.0)?;
        }

        conf.configure_ech_grease(self.options.enable_ech_grease)?;
        if let Some(alps) = self.options.alps_protos {
            conf.configure_application_settings(alps)?;
        }

        if self.options.offers_resumption() {
            let key = SessionKey::new(host, port);
            let session = {
                let mut cache = self.session_cache.lock().expect("session cache poisoned");
                cache.get(&key)
            };
            if let Some(session) = session {
                // The session came out of this connector's own context.
                unsafe {
                    conf.set_session(&session)?;
                }
            }
            cache::set_session_key(conf, key);
        }

        Ok(())
    }
}

impl std::fmt::Debug for HandshakeConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandshakeConnector")
            .field("options", &self.options)
            .finish()
    }
}

pub(crate) fn tls_info_of(ssl: &SslRef) -> TlsInfo {
    TlsInfo {
        peer_certificate: ssl.peer_certificate().and_then(|cert| cert.to_der().ok()),
    }
}
