//! Response body plumbing: content decoding and connection-reuse draining.

use std::fmt;
use std::io;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use bytes::Bytes;
use futures_core::Stream;
use futures_util::StreamExt;
use http::header::{HeaderMap, CONTENT_ENCODING, CONTENT_LENGTH, TRANSFER_ENCODING};

use crate::error::BoxError;

/// On close, at most this many pending bytes are drained to make the
/// connection reusable; larger remainders abort the connection instead.
const DRAIN_LIMIT: usize = 256 * 1024;

/// Which content encodings this client decodes.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Accepts {
    #[cfg(feature = "gzip")]
    pub(crate) gzip: bool,
    #[cfg(feature = "brotli")]
    pub(crate) brotli: bool,
    #[cfg(feature = "zstd")]
    pub(crate) zstd: bool,
    #[cfg(feature = "deflate")]
    pub(crate) deflate: bool,
}

#[allow(clippy::derivable_impls)]
impl Default for Accepts {
    fn default() -> Accepts {
        Accepts {
            #[cfg(feature = "gzip")]
            gzip: true,
            #[cfg(feature = "brotli")]
            brotli: true,
            #[cfg(feature = "zstd")]
            zstd: true,
            #[cfg(feature = "deflate")]
            deflate: true,
        }
    }
}

impl Accepts {
    pub(crate) fn none() -> Accepts {
        Accepts {
            #[cfg(feature = "gzip")]
            gzip: false,
            #[cfg(feature = "brotli")]
            brotli: false,
            #[cfg(feature = "zstd")]
            zstd: false,
            #[cfg(feature = "deflate")]
            deflate: false,
        }
    }

    /// The `Accept-Encoding` value advertising the enabled decoders.
    pub(crate) fn as_str(&self) -> Option<&'static str> {
        match (
            self.is_gzip(),
            self.is_brotli(),
            self.is_zstd(),
            self.is_deflate(),
        ) {
            (true, true, true, true) => Some("gzip, deflate, br, zstd"),
            (true, true, false, true) => Some("gzip, deflate, br"),
            (true, false, false, true) => Some("gzip, deflate"),
            (true, false, false, false) => Some("gzip"),
            (false, true, false, false) => Some("br"),
            (false, false, true, false) => Some("zstd"),
            (false, false, false, true) => Some("deflate"),
            _ => None,
        }
    }

    fn is_gzip(&self) -> bool {
        #[cfg(feature = "gzip")]
        {
            self.gzip
        }
        #[cfg(not(feature = "gzip"))]
        {
            false
        }
    }

    fn is_brotli(&self) -> bool {
        #[cfg(feature = "brotli")]
        {
            self.brotli
        }
        #[cfg(not(feature = "brotli"))]
        {
            false
        }
    }

    fn is_zstd(&self) -> bool {
        #[cfg(feature = "zstd")]
        {
            self.zstd
        }
        #[cfg(not(feature = "zstd"))]
        {
            false
        }
    }

    fn is_deflate(&self) -> bool {
        #[cfg(feature = "deflate")]
        {
            self.deflate
        }
        #[cfg(not(feature = "deflate"))]
        {
            false
        }
    }
}

/// Trailer headers observed at the end of the body stream.
pub(crate) type Trailers = Arc<Mutex<Option<HeaderMap>>>;

/// The raw byte stream of one response, source-agnostic.
pub(crate) struct EngineStream {
    inner: EngineStreamInner,
    trailers: Trailers,
}

enum EngineStreamInner {
    Buffered(Option<Bytes>),
    Hyper(hyper2::body::Incoming),
    #[cfg(feature = "http3")]
    Boxed(Pin<Box<dyn Stream<Item = Result<Bytes, BoxError>> + Send + Sync>>),
}

impl EngineStream {
    pub(crate) fn buffered(bytes: Bytes) -> EngineStream {
        EngineStream {
            inner: EngineStreamInner::Buffered(Some(bytes)),
            trailers: Default::default(),
        }
    }

    pub(crate) fn hyper(incoming: hyper2::body::Incoming) -> EngineStream {
        EngineStream {
            inner: EngineStreamInner::Hyper(incoming),
            trailers: Default::default(),
        }
    }

    #[cfg(feature = "http3")]
    pub(crate) fn boxed<S>(stream: S) -> EngineStream
    where
        S: Stream<Item = Result<Bytes, BoxError>> + Send + Sync + 'static,
    {
        EngineStream {
            inner: EngineStreamInner::Boxed(Box::pin(stream)),
            trailers: Default::default(),
        }
    }

    pub(crate) fn trailers(&self) -> Trailers {
        self.trailers.clone()
    }
}

impl Stream for EngineStream {
    type Item = Result<Bytes, BoxError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        match &mut this.inner {
            EngineStreamInner::Buffered(bytes) => Poll::Ready(bytes.take().map(Ok)),
            EngineStreamInner::Hyper(incoming) => loop {
                return match std::task::ready!(
                    http_body::Body::poll_frame(Pin::new(&mut *incoming), cx)
                ) {
                    Some(Ok(frame)) => {
                        let frame = match frame.into_data() {
                            Ok(data) => return Poll::Ready(Some(Ok(data))),
                            Err(frame) => frame,
                        };
                        if let Ok(trailers) = frame.into_trailers() {
                            *this.trailers.lock().expect("trailers poisoned") = Some(trailers);
                        }
                        continue;
                    }
                    Some(Err(err)) => Poll::Ready(Some(Err(err.into()))),
                    None => Poll::Ready(None),
                };
            },
            #[cfg(feature = "http3")]
            EngineStreamInner::Boxed(stream) => stream.as_mut().poll_next(cx),
        }
    }
}

/// A response body, transparently decoding the negotiated content encoding.
pub(crate) struct Decoder {
    inner: Inner,
}

enum Inner {
    /// No decoding applied.
    Identity(Option<EngineStream>),
    /// A decompressing reader over the raw stream.
    #[cfg(any(
        feature = "gzip",
        feature = "brotli",
        feature = "zstd",
        feature = "deflate"
    ))]
    Decoding(Option<tokio_util::io::ReaderStream<Box<dyn tokio::io::AsyncRead + Send + Sync + Unpin>>>),
}

impl Decoder {
    /// Builds the decoder for a response, inspecting `Content-Encoding` and
    /// stripping the body-metadata headers when a decoding will be applied.
    /// Unknown encodings pass through untouched.
    pub(crate) fn wrap(headers: &mut HeaderMap, stream: EngineStream, accepts: Accepts) -> Decoder {
        let encoding = headers
            .get(CONTENT_ENCODING)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.trim().to_ascii_lowercase());

        let decoded = match encoding.as_deref() {
            #[cfg(feature = "gzip")]
            Some("gzip") if accepts.is_gzip() => {
                Some(boxed_reader(stream, |r| {
                    Box::new(async_compression::tokio::bufread::GzipDecoder::new(r))
                }))
            }
            #[cfg(feature = "brotli")]
            Some("br") if accepts.is_brotli() => {
                Some(boxed_reader(stream, |r| {
                    Box::new(async_compression::tokio::bufread::BrotliDecoder::new(r))
                }))
            }
            #[cfg(feature = "zstd")]
            Some("zstd") if accepts.is_zstd() => {
                Some(boxed_reader(stream, |r| {
                    Box::new(async_compression::tokio::bufread::ZstdDecoder::new(r))
                }))
            }
            #[cfg(feature = "deflate")]
            Some("deflate") if accepts.is_deflate() => {
                Some(boxed_reader(stream, |r| {
                    Box::new(async_compression::tokio::bufread::ZlibDecoder::new(r))
                }))
            }
            _ => None,
        };

        match decoded {
            #[cfg(any(
                feature = "gzip",
                feature = "brotli",
                feature = "zstd",
                feature = "deflate"
            ))]
            Some(stream) => {
                // The decoded length is unknowable up front.
                headers.remove(CONTENT_ENCODING);
                headers.remove(CONTENT_LENGTH);
                headers.remove(TRANSFER_ENCODING);
                Decoder {
                    inner: Inner::Decoding(Some(stream)),
                }
            }
            #[cfg(not(any(
                feature = "gzip",
                feature = "brotli",
                feature = "zstd",
                feature = "deflate"
            )))]
            Some(never) => match never {},
            None => Decoder {
                inner: Inner::Identity(Some(stream)),
            },
        }
    }

}

#[cfg(any(
    feature = "gzip",
    feature = "brotli",
    feature = "zstd",
    feature = "deflate"
))]
type BoxedDecoded =
    tokio_util::io::ReaderStream<Box<dyn tokio::io::AsyncRead + Send + Sync + Unpin>>;

#[cfg(any(
    feature = "gzip",
    feature = "brotli",
    feature = "zstd",
    feature = "deflate"
))]
fn boxed_reader<F>(stream: EngineStream, wrap: F) -> BoxedDecoded
where
    F: FnOnce(
        tokio::io::BufReader<tokio_util::io::StreamReader<IoStream, Bytes>>,
    ) -> Box<dyn tokio::io::AsyncRead + Send + Sync + Unpin>,
{
    let reader = tokio::io::BufReader::new(tokio_util::io::StreamReader::new(IoStream(stream)));
    tokio_util::io::ReaderStream::new(wrap(reader))
}

#[cfg(not(any(
    feature = "gzip",
    feature = "brotli",
    feature = "zstd",
    feature = "deflate"
)))]
enum Never {}

impl Stream for Decoder {
    type Item = crate::Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        match &mut self.inner {
            Inner::Identity(stream) => match stream {
                Some(stream) => Pin::new(stream)
                    .poll_next(cx)
                    .map(|opt| opt.map(|r| r.map_err(crate::error::Error::body))),
                None => Poll::Ready(None),
            },
            #[cfg(any(
                feature = "gzip",
                feature = "brotli",
                feature = "zstd",
                feature = "deflate"
            ))]
            Inner::Decoding(stream) => match stream {
                Some(stream) => Pin::new(stream)
                    .poll_next(cx)
                    .map(|opt| opt.map(|r| r.map_err(crate::error::Error::decode))),
                None => Poll::Ready(None),
            },
        }
    }
}

impl Drop for Decoder {
    fn drop(&mut self) {
        // Drain a bounded remainder so the connection can be reused; skip
        // when no runtime is available (the connection is torn down then).
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return;
        };

        let stream: Option<Box<dyn Stream<Item = Result<Bytes, BoxError>> + Send + Sync + Unpin>> =
            match &mut self.inner {
                Inner::Identity(stream) => stream.take().map(|s| {
                    Box::new(s) as Box<dyn Stream<Item = _> + Send + Sync + Unpin>
                }),
                #[cfg(any(
                    feature = "gzip",
                    feature = "brotli",
                    feature = "zstd",
                    feature = "deflate"
                ))]
                Inner::Decoding(stream) => stream.take().map(|s| {
                    Box::new(s.map(|r| r.map_err(Into::into)))
                        as Box<dyn Stream<Item = _> + Send + Sync + Unpin>
                }),
            };

        if let Some(mut stream) = stream {
            handle.spawn(async move {
                let mut drained = 0usize;
                while let Some(chunk) = stream.next().await {
                    match chunk {
                        Ok(bytes) => {
                            drained += bytes.len();
                            if drained > DRAIN_LIMIT {
                                break;
                            }
                        }
                        Err(_) => break,
                    }
                }
            });
        }
    }
}

impl fmt::Debug for Decoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Decoder").finish()
    }
}

/// Adapts the engine stream into `io::Error` items for `StreamReader`.
pub(crate) struct IoStream(EngineStream);

impl Stream for IoStream {
    type Item = io::Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.0)
            .poll_next(cx)
            .map(|opt| opt.map(|r| r.map_err(io::Error::other)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accept_encoding_advertises_enabled_set() {
        let accepts = Accepts::default();
        #[cfg(all(
            feature = "gzip",
            feature = "brotli",
            feature = "zstd",
            feature = "deflate"
        ))]
        assert_eq!(accepts.as_str(), Some("gzip, deflate, br, zstd"));
        assert_eq!(Accepts::none().as_str(), None);
    }

    #[tokio::test]
    async fn unknown_encoding_passes_through() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_ENCODING, "snappy".parse().unwrap());

        let stream = EngineStream::buffered(Bytes::from_static(b"raw"));
        let mut decoder = Decoder::wrap(&mut headers, stream, Accepts::default());

        assert_eq!(headers.get(CONTENT_ENCODING).unwrap(), "snappy");
        let chunk = decoder.next().await.unwrap().unwrap();
        assert_eq!(chunk, Bytes::from_static(b"raw"));
    }

    #[cfg(feature = "gzip")]
    #[tokio::test]
    async fn gzip_decodes_and_strips_headers() {
        use std::io::Write;

        let mut encoder = libflate::gzip::Encoder::new(Vec::new()).unwrap();
        encoder.write_all(b"hello camo").unwrap();
        let compressed = encoder.finish().into_result().unwrap();

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_ENCODING, "gzip".parse().unwrap());
        headers.insert(CONTENT_LENGTH, compressed.len().to_string().parse().unwrap());

        let stream = EngineStream::buffered(compressed.into());
        let mut decoder = Decoder::wrap(&mut headers, stream, Accepts::default());

        assert!(headers.get(CONTENT_ENCODING).is_none());
        assert!(headers.get(CONTENT_LENGTH).is_none());

        let mut out = Vec::new();
        while let Some(chunk) = decoder.next().await {
            out.extend_from_slice(&chunk.unwrap());
        }
        assert_eq!(out, b"hello camo");
    }
}
