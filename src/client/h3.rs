//! HTTP/3 over QUIC.
//!
//! One [`H3State`] per transport cache key holds the QUIC connection and the
//! request sender. Errors that look like "the server does not speak HTTP/3"
//! (QUIC application errors, handshake or idle timeouts, version
//! negotiation failure, stateless resets, and connection-level socket
//! errors) discard the state so the caller can fall back to HTTP/2;
//! deadline expiry never does.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::{Buf, Bytes};
use futures_util::future;
use http::Uri;
use url::Url;

use super::body::Body;
use super::decoder::EngineStream;
use super::transport::{ConnMeta, Exchange};
#[cfg(feature = "socks")]
use crate::connect::socks_udp;
use crate::connect::{Connector, DialPlan};
use crate::error::Error;
use crate::http3::{Http3Settings, SETTING_MAX_FIELD_SECTION_SIZE};
use crate::proxy::ProxyScheme;

/// An established HTTP/3 connection to one origin.
#[derive(Clone)]
pub(crate) struct H3State {
    sender: h3::client::SendRequest<h3_quinn::OpenStreams, Bytes>,
    remote_addr: SocketAddr,
    /// SOCKS5-relayed responses are buffered in full: the relay lives only
    /// as long as the response read.
    pub(crate) buffer_responses: bool,
}

/// Classifies an error as "the server does not support HTTP/3".
///
/// Deadline expiry and cancellations are never classified as such.
pub(crate) fn is_h3_unsupported(err: &(dyn std::error::Error + 'static)) -> bool {
    let mut source = Some(err);
    while let Some(err) = source {
        if let Some(connection) = err.downcast_ref::<quinn::ConnectionError>() {
            return matches!(
                connection,
                quinn::ConnectionError::VersionMismatch
                    | quinn::ConnectionError::ConnectionClosed(_)
                    | quinn::ConnectionError::ApplicationClosed(_)
                    | quinn::ConnectionError::Reset
                    | quinn::ConnectionError::TimedOut
                    | quinn::ConnectionError::LocallyClosed
            );
        }
        if let Some(connect) = err.downcast_ref::<quinn::ConnectError>() {
            let _ = connect;
            return true;
        }
        if let Some(io) = err.downcast_ref::<io::Error>() {
            return matches!(
                io.kind(),
                io::ErrorKind::ConnectionRefused
                    | io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::NetworkUnreachable
                    | io::ErrorKind::HostUnreachable
                    | io::ErrorKind::BrokenPipe
            );
        }
        source = err.source();
    }
    false
}

pub(crate) fn error_is_h3_unsupported(err: &Error) -> bool {
    if err.is_timeout() {
        return false;
    }
    is_h3_unsupported(err)
}

/// Builds the rustls config for the QUIC handshake: ALPN `h3`, verification
/// left to the caller like the TCP paths.
fn quic_tls_config() -> crate::Result<rustls::ClientConfig> {
    #[derive(Debug)]
    struct NoVerify(Arc<rustls::crypto::CryptoProvider>);

    impl rustls::client::danger::ServerCertVerifier for NoVerify {
        fn verify_server_cert(
            &self,
            _end_entity: &rustls::pki_types::CertificateDer<'_>,
            _intermediates: &[rustls::pki_types::CertificateDer<'_>],
            _server_name: &rustls::pki_types::ServerName<'_>,
            _ocsp_response: &[u8],
            _now: rustls::pki_types::UnixTime,
        ) -> Result<rustls::client::danger::ServerCertVerified, rustls::Error> {
            Ok(rustls::client::danger::ServerCertVerified::assertion())
        }

        fn verify_tls12_signature(
            &self,
            message: &[u8],
            cert: &rustls::pki_types::CertificateDer<'_>,
            dss: &rustls::DigitallySignedStruct,
        ) -> Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
            rustls::crypto::verify_tls12_signature(
                message,
                cert,
                dss,
                &self.0.signature_verification_algorithms,
            )
        }

        fn verify_tls13_signature(
            &self,
            message: &[u8],
            cert: &rustls::pki_types::CertificateDer<'_>,
            dss: &rustls::DigitallySignedStruct,
        ) -> Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
            rustls::crypto::verify_tls13_signature(
                message,
                cert,
                dss,
                &self.0.signature_verification_algorithms,
            )
        }

        fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
            self.0.signature_verification_algorithms.supported_schemes()
        }
    }

    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let mut config = rustls::ClientConfig::builder_with_provider(provider.clone())
        .with_safe_default_protocol_versions()
        .map_err(Error::tls)?
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(NoVerify(provider)))
        .with_no_client_auth();
    config.alpn_protocols = vec![b"h3".to_vec()];
    Ok(config)
}

/// Dials QUIC (directly, or through a SOCKS5 UDP relay) and performs the
/// HTTP/3 handshake with the profile's SETTINGS.
pub(crate) async fn connect(
    connector: &Connector,
    plan: &DialPlan,
    settings: &Http3Settings,
) -> crate::Result<H3State> {
    // QUIC can only traverse a SOCKS5 proxy; any other proxy scheme is a
    // deterministic protocol mismatch handled by the caller's fallback.
    let relay = match &plan.proxy {
        None => None,
        #[cfg(feature = "socks")]
        Some(scheme @ ProxyScheme::Socks5 { .. }) => Some(scheme.clone()),
        Some(_) => {
            return Err(Error::connect("http3 requires a socks5 proxy or none"));
        }
    };

    let remote_addr = connector
        .resolve(&plan.host, plan.port)
        .await?
        .into_iter()
        .next()
        .expect("resolve never returns an empty list");

    let tls = quic_tls_config()?;
    let client_config = quinn::ClientConfig::new(Arc::new(
        quinn::crypto::rustls::QuicClientConfig::try_from(tls).map_err(Error::tls)?,
    ));

    let (endpoint, buffer_responses) = match relay {
        None => {
            let bind: SocketAddr = if remote_addr.is_ipv4() {
                "0.0.0.0:0".parse().expect("literal addr")
            } else {
                "[::]:0".parse().expect("literal addr")
            };
            let mut endpoint = quinn::Endpoint::client(bind).map_err(Error::connect)?;
            endpoint.set_default_client_config(client_config);
            (endpoint, false)
        }
        #[cfg(feature = "socks")]
        Some(ProxyScheme::Socks5 { addr, auth, .. }) => {
            let relay = socks_udp::associate(&addr, auth.as_ref()).await?;
            let socket = relay_socket::SocksQuicSocket::new(relay);
            let runtime = Arc::new(quinn::TokioRuntime);
            let mut endpoint = quinn::Endpoint::new_with_abstract_socket(
                quinn::EndpointConfig::default(),
                None,
                Arc::new(socket),
                runtime,
            )
            .map_err(Error::connect)?;
            endpoint.set_default_client_config(client_config);
            (endpoint, true)
        }
        #[cfg(not(feature = "socks"))]
        Some(_) => unreachable!("socks5 scheme without the socks feature"),
    };

    let connection = endpoint
        .connect(remote_addr, &plan.host)
        .map_err(Error::connect)?
        .await
        .map_err(Error::connect)?;

    let quinn_conn = h3_quinn::Connection::new(connection);
    let mut builder = h3::client::builder();
    apply_settings(&mut builder, settings);
    let (mut driver, sender) = builder
        .build::<_, _, Bytes>(quinn_conn)
        .await
        .map_err(Error::request)?;

    tokio::spawn(async move {
        if let Err(err) = future::poll_fn(|cx| driver.poll_close(cx)).await {
            log::debug!("http3 connection driver ended: {err}");
        }
    });

    Ok(H3State {
        sender,
        remote_addr,
        buffer_responses,
    })
}

/// Maps the profile's HTTP/3 SETTINGS onto the frame the client emits.
/// Ids the engine cannot express are logged and skipped rather than
/// silently claimed.
fn apply_settings(builder: &mut h3::client::Builder, settings: &Http3Settings) {
    for (id, value) in settings.build() {
        match id {
            SETTING_MAX_FIELD_SECTION_SIZE => {
                builder.max_field_section_size(value);
            }
            id if (id.wrapping_sub(0x21)) % 0x1f == 0 => {
                builder.send_grease(true);
            }
            other => {
                log::debug!("http3 setting {other:#x} not expressible, skipped");
            }
        }
    }
}

impl H3State {
    pub(crate) async fn send(
        &self,
        method: http::Method,
        url: &Url,
        headers: http::HeaderMap,
        body: Option<&mut Body>,
    ) -> crate::Result<Exchange> {
        let uri: Uri = url.as_str().parse().map_err(Error::request)?;
        let mut request = http::Request::builder()
            .method(method)
            .uri(uri)
            .body(())
            .map_err(Error::request)?;
        *request.headers_mut() = headers;

        let mut sender = self.sender.clone();
        let mut stream = sender.send_request(request).await.map_err(Error::request)?;

        if let Some(body) = body {
            let mut engine = body.engine_body()?;
            loop {
                use http_body::Body as _;
                let frame = future::poll_fn(|cx| {
                    std::pin::Pin::new(&mut engine).poll_frame(cx)
                })
                .await;
                match frame {
                    Some(Ok(frame)) => {
                        if let Ok(data) = frame.into_data() {
                            stream.send_data(data).await.map_err(Error::request)?;
                        }
                    }
                    Some(Err(err)) => return Err(Error::body(err)),
                    None => break,
                }
            }
        }
        stream.finish().await.map_err(Error::request)?;

        let response = stream.recv_response().await.map_err(Error::request)?;
        let (parts, ()) = response.into_parts();

        let meta = ConnMeta {
            remote_addr: Some(self.remote_addr),
            tls_info: None,
        };

        let mut headers = parts.headers;
        let stream = if self.buffer_responses {
            // The relay socket dies with the request scope; drain now and
            // present the response as a buffered body of known length.
            let mut buffered = Vec::new();
            while let Some(mut chunk) = stream.recv_data().await.map_err(Error::body)? {
                let remaining = chunk.remaining();
                buffered.reserve(remaining);
                while chunk.has_remaining() {
                    let slice = chunk.chunk();
                    buffered.extend_from_slice(slice);
                    let advance = slice.len();
                    chunk.advance(advance);
                }
            }
            headers.insert(
                http::header::CONTENT_LENGTH,
                http::HeaderValue::from(buffered.len() as u64),
            );
            EngineStream::buffered(Bytes::from(buffered))
        } else {
            EngineStream::boxed(RecvBody { stream }.into_stream())
        };

        Ok(Exchange {
            status: parts.status,
            version: parts.version,
            headers,
            stream,
            meta,
            attempts: 1,
        })
    }
}

impl std::fmt::Debug for H3State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("H3State")
            .field("remote_addr", &self.remote_addr)
            .finish()
    }
}

struct RecvBody {
    stream: h3::client::RequestStream<h3_quinn::BidiStream<Bytes>, Bytes>,
}

impl RecvBody {
    fn into_stream(
        self,
    ) -> impl futures_core::Stream<Item = Result<Bytes, crate::error::BoxError>> + Send + Sync
    {
        futures_util::stream::try_unfold(self.stream, |mut stream| async move {
            match stream.recv_data().await {
                Ok(Some(mut chunk)) => {
                    let bytes = chunk.copy_to_bytes(chunk.remaining());
                    Ok(Some((bytes, stream)))
                }
                Ok(None) => Ok(None),
                Err(err) => Err(Box::new(err) as crate::error::BoxError),
            }
        })
    }
}

#[cfg(feature = "socks")]
mod relay_socket {
    //! Adapts a SOCKS5 UDP relay into a QUIC-capable socket: the
    //! encapsulation header is added to every outgoing datagram and
    //! stripped from every incoming one.

    use std::io;
    use std::net::SocketAddr;
    use std::pin::Pin;
    use std::sync::Arc;
    use std::task::{Context, Poll};

    use crate::connect::socks_udp::{decapsulate, encapsulate, UdpRelay};

    #[derive(Debug)]
    pub(super) struct SocksQuicSocket {
        relay: UdpRelay,
    }

    impl SocksQuicSocket {
        pub(super) fn new(relay: UdpRelay) -> SocksQuicSocket {
            SocksQuicSocket { relay }
        }
    }

    impl quinn::AsyncUdpSocket for SocksQuicSocket {
        fn create_io_poller(self: Arc<Self>) -> Pin<Box<dyn quinn::UdpPoller>> {
            Box::pin(RelayPoller { socket: self })
        }

        fn try_send(&self, transmit: &quinn::udp::Transmit) -> io::Result<()> {
            let wrapped = encapsulate(&transmit.destination, transmit.contents);
            self.relay.socket.try_send(&wrapped).map(|_| ())
        }

        fn poll_recv(
            &self,
            cx: &mut Context,
            bufs: &mut [io::IoSliceMut<'_>],
            meta: &mut [quinn::udp::RecvMeta],
        ) -> Poll<io::Result<usize>> {
            let buf = match bufs.first_mut() {
                Some(buf) => buf,
                None => return Poll::Ready(Ok(0)),
            };
            let mut scratch = [0u8; 65536];
            let mut read_buf = tokio::io::ReadBuf::new(&mut scratch);
            match self.relay.socket.poll_recv(cx, &mut read_buf) {
                Poll::Pending => Poll::Pending,
                Poll::Ready(Err(err)) => Poll::Ready(Err(err)),
                Poll::Ready(Ok(())) => {
                    let (from, payload) = decapsulate(read_buf.filled())?;
                    let len = payload.len().min(buf.len());
                    buf[..len].copy_from_slice(&payload[..len]);
                    meta[0] = quinn::udp::RecvMeta {
                        addr: from,
                        len,
                        stride: len,
                        ecn: None,
                        dst_ip: None,
                    };
                    Poll::Ready(Ok(1))
                }
            }
        }

        fn local_addr(&self) -> io::Result<SocketAddr> {
            self.relay.socket.local_addr()
        }

        fn max_transmit_segments(&self) -> usize {
            1
        }

        fn max_receive_segments(&self) -> usize {
            1
        }

        fn may_fragment(&self) -> bool {
            false
        }
    }

    #[derive(Debug)]
    struct RelayPoller {
        socket: Arc<SocksQuicSocket>,
    }

    impl quinn::UdpPoller for RelayPoller {
        fn poll_writable(self: Pin<&mut Self>, cx: &mut Context) -> Poll<io::Result<()>> {
            self.socket.relay.socket.poll_send_ready(cx)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeouts_never_classify_as_unsupported() {
        let err = Error::request(crate::error::TimedOut);
        assert!(!error_is_h3_unsupported(&err));
    }

    #[test]
    fn connection_refused_classifies_as_unsupported() {
        let err = Error::connect(io::Error::from(io::ErrorKind::ConnectionRefused));
        assert!(error_is_h3_unsupported(&err));
    }

    #[test]
    fn quic_timeout_classifies_as_unsupported() {
        let err = Error::request(quinn::ConnectionError::TimedOut);
        assert!(error_is_h3_unsupported(&err));
    }
}
