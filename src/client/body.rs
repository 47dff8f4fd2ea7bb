//! Request bodies.
//!
//! A body knows whether it can be replayed: buffered bytes and
//! [`BodySource`]-backed bodies restart for retries and protocol fallback,
//! one-shot streams do not, and their presence forbids fallback after a
//! failed send.

use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use http_body::{Frame, SizeHint};

use crate::error::BoxError;

/// A request body.
pub struct Body {
    inner: Inner,
}

/// A factory for request body streams, enabling replay on retry and
/// protocol fallback.
pub trait BodySource: Send + Sync + 'static {
    /// Opens a fresh instance of the body.
    fn open(&self) -> crate::Result<Body>;

    /// The body length when known up front, used for `Content-Length`.
    fn len(&self) -> Option<u64> {
        None
    }
}

enum Inner {
    Reusable(Bytes),
    Sourced(std::sync::Arc<dyn BodySource>),
    Streaming(http_body_util::combinators::BoxBody<Bytes, BoxError>),
    /// A one-shot stream that has already been handed to the engine.
    Taken,
}

impl Body {
    /// An empty body.
    pub fn empty() -> Body {
        Body {
            inner: Inner::Reusable(Bytes::new()),
        }
    }

    /// A body backed by a replayable source.
    pub fn from_source<S: BodySource>(source: S) -> Body {
        Body {
            inner: Inner::Sourced(std::sync::Arc::new(source)),
        }
    }

    /// Wraps a one-shot byte stream. The resulting body cannot restart, so
    /// no protocol fallback is performed once it has been written.
    pub fn wrap_stream<S, O, E>(stream: S) -> Body
    where
        S: futures_core::Stream<Item = Result<O, E>> + Send + Sync + 'static,
        O: Into<Bytes> + 'static,
        E: Into<BoxError> + 'static,
    {
        use futures_util::TryStreamExt;
        use http_body_util::{BodyExt, StreamBody};

        let body = StreamBody::new(
            stream
                .map_ok(|chunk| Frame::data(chunk.into()))
                .map_err(Into::into),
        );
        Body {
            inner: Inner::Streaming(BodyExt::boxed(body)),
        }
    }

    /// The buffered bytes, when the body is fully buffered.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match &self.inner {
            Inner::Reusable(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// The body length when known.
    pub(crate) fn content_length(&self) -> Option<u64> {
        match &self.inner {
            Inner::Reusable(bytes) => Some(bytes.len() as u64),
            Inner::Sourced(source) => source.len(),
            Inner::Streaming(_) | Inner::Taken => None,
        }
    }

    /// Whether a fresh copy of this body can be produced.
    pub(crate) fn is_restartable(&self) -> bool {
        matches!(self.inner, Inner::Reusable(_) | Inner::Sourced(_))
    }

    /// Produces the engine-level body for one send attempt.
    ///
    /// One-shot streams are consumed by this call; further attempts must
    /// check [`is_restartable`](Self::is_restartable) first.
    pub(crate) fn engine_body(&mut self) -> crate::Result<EngineBody> {
        match &mut self.inner {
            Inner::Reusable(bytes) => Ok(EngineBody::full(bytes.clone())),
            Inner::Sourced(source) => {
                let mut opened = source.open()?;
                match &mut opened.inner {
                    Inner::Sourced(_) => Err(crate::error::Error::body(
                        "body source opened another body source",
                    )),
                    _ => opened.engine_body(),
                }
            }
            Inner::Streaming(_) => {
                let taken = std::mem::replace(&mut self.inner, Inner::Taken);
                match taken {
                    Inner::Streaming(body) => Ok(EngineBody::boxed(body)),
                    _ => unreachable!(),
                }
            }
            Inner::Taken => Err(crate::error::Error::body("stream body already consumed")),
        }
    }
}

impl Default for Body {
    fn default() -> Self {
        Body::empty()
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Body {
        Body {
            inner: Inner::Reusable(bytes),
        }
    }
}

impl From<Vec<u8>> for Body {
    fn from(vec: Vec<u8>) -> Body {
        Body::from(Bytes::from(vec))
    }
}

impl From<String> for Body {
    fn from(s: String) -> Body {
        Body::from(Bytes::from(s))
    }
}

impl From<&'static str> for Body {
    fn from(s: &'static str) -> Body {
        Body::from(Bytes::from_static(s.as_bytes()))
    }
}

impl From<&'static [u8]> for Body {
    fn from(bytes: &'static [u8]) -> Body {
        Body::from(Bytes::from_static(bytes))
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.inner {
            Inner::Reusable(_) => "Reusable",
            Inner::Sourced(_) => "Sourced",
            Inner::Streaming(_) => "Streaming",
            Inner::Taken => "Taken",
        };
        f.debug_struct("Body").field("kind", &kind).finish()
    }
}

/// The body type handed to the HTTP engine.
pub(crate) struct EngineBody {
    inner: EngineInner,
}

enum EngineInner {
    Full(Option<Bytes>),
    Boxed(http_body_util::combinators::BoxBody<Bytes, BoxError>),
}

impl EngineBody {
    pub(crate) fn empty() -> EngineBody {
        EngineBody::full(Bytes::new())
    }

    fn full(bytes: Bytes) -> EngineBody {
        EngineBody {
            inner: EngineInner::Full(if bytes.is_empty() { None } else { Some(bytes) }),
        }
    }

    fn boxed(body: http_body_util::combinators::BoxBody<Bytes, BoxError>) -> EngineBody {
        EngineBody {
            inner: EngineInner::Boxed(body),
        }
    }
}

impl http_body::Body for EngineBody {
    type Data = Bytes;
    type Error = BoxError;

    fn poll_frame(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        match &mut self.inner {
            EngineInner::Full(bytes) => Poll::Ready(bytes.take().map(|b| Ok(Frame::data(b)))),
            EngineInner::Boxed(body) => Pin::new(body).poll_frame(cx),
        }
    }

    fn is_end_stream(&self) -> bool {
        match &self.inner {
            EngineInner::Full(bytes) => bytes.is_none(),
            EngineInner::Boxed(body) => body.is_end_stream(),
        }
    }

    fn size_hint(&self) -> SizeHint {
        match &self.inner {
            EngineInner::Full(Some(bytes)) => SizeHint::with_exact(bytes.len() as u64),
            EngineInner::Full(None) => SizeHint::with_exact(0),
            EngineInner::Boxed(body) => body.size_hint(),
        }
    }
}

impl fmt::Debug for EngineBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineBody").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffered_bodies_restart() {
        let mut body = Body::from("hello");
        assert!(body.is_restartable());
        assert_eq!(body.content_length(), Some(5));

        // Two attempts observe the same bytes.
        let _first = body.engine_body().unwrap();
        let _second = body.engine_body().unwrap();
        assert!(body.is_restartable());
    }

    #[test]
    fn sourced_bodies_restart() {
        struct Counter;

        impl BodySource for Counter {
            fn open(&self) -> crate::Result<Body> {
                Ok(Body::from("fresh"))
            }

            fn len(&self) -> Option<u64> {
                Some(5)
            }
        }

        let mut body = Body::from_source(Counter);
        assert!(body.is_restartable());
        assert_eq!(body.content_length(), Some(5));
        let _ = body.engine_body().unwrap();
        assert!(body.is_restartable());
    }

    #[test]
    fn stream_bodies_are_one_shot() {
        let stream = futures_util::stream::iter(vec![Ok::<_, std::io::Error>("x")]);
        let mut body = Body::wrap_stream(stream);
        assert!(!body.is_restartable());
        assert!(body.content_length().is_none());

        let _ = body.engine_body().unwrap();
        assert!(body.engine_body().is_err());
    }
}
