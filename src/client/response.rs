use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

use bytes::Bytes;
use futures_util::StreamExt;
use http::header::{HeaderMap, CONTENT_LENGTH};
use http::{StatusCode, Version};
use url::Url;

use super::decoder::{Accepts, Decoder, EngineStream, Trailers};
use crate::tls::TlsInfo;

/// A Response to a submitted `Request`.
pub struct Response {
    status: StatusCode,
    version: Version,
    headers: HeaderMap,
    url: Url,
    body: Decoder,
    trailers: Trailers,
    remote_addr: Option<SocketAddr>,
    tls_info: Option<TlsInfo>,
    attempts: u32,
    elapsed: Duration,
}

impl Response {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        status: StatusCode,
        version: Version,
        mut headers: HeaderMap,
        stream: EngineStream,
        accepts: Accepts,
        url: Url,
        remote_addr: Option<SocketAddr>,
        tls_info: Option<TlsInfo>,
        attempts: u32,
        elapsed: Duration,
    ) -> Response {
        let trailers = stream.trailers();
        let body = Decoder::wrap(&mut headers, stream, accepts);
        Response {
            status,
            version,
            headers,
            url,
            body,
            trailers,
            remote_addr,
            tls_info,
            attempts,
            elapsed,
        }
    }

    /// Get the `StatusCode` of this `Response`.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Get the HTTP `Version` of this `Response`.
    pub fn version(&self) -> Version {
        self.version
    }

    /// Get the `Headers` of this `Response`.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Get a mutable reference to the `Headers` of this `Response`.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Get the trailer headers, available after the body has been read to
    /// the end.
    pub fn trailers(&self) -> Option<HeaderMap> {
        self.trailers.lock().expect("trailers poisoned").clone()
    }

    /// Get the final `Url` of this `Response`.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Get the remote address used to get this `Response`.
    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }

    /// Get the TLS details of the connection this response arrived on, when
    /// captured.
    pub fn tls_info(&self) -> Option<&TlsInfo> {
        self.tls_info.as_ref()
    }

    /// How many server-visible attempts this exchange took, counting
    /// protocol fallbacks and retries.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Total time from dispatch to response headers.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Get the content length of the response, if it is known.
    ///
    /// Reasons it may not be known:
    ///
    /// - The response does not include the body (e.g. it responds to a `HEAD`
    ///   request).
    /// - The response is compressed and automatically decoded (thus changing
    ///   the actual decoded length).
    pub fn content_length(&self) -> Option<u64> {
        self.headers
            .get(CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse().ok())
    }

    /// Retrieve the cookies contained in the response.
    ///
    /// Note that invalid 'Set-Cookie' headers will be ignored.
    #[cfg(feature = "cookies")]
    pub fn cookies(&self) -> impl Iterator<Item = cookie_crate::Cookie<'_>> {
        crate::cookie::extract_response_cookies(&self.headers).filter_map(Result::ok)
    }

    /// Stream a chunk of the response body.
    ///
    /// When the response body has been exhausted, this will return `None`.
    pub async fn chunk(&mut self) -> crate::Result<Option<Bytes>> {
        self.body.next().await.transpose()
    }

    /// Get the full response body as `Bytes`.
    pub async fn bytes(mut self) -> crate::Result<Bytes> {
        let mut out = Vec::with_capacity(
            self.content_length().map(|len| len as usize).unwrap_or(0),
        );
        while let Some(chunk) = self.body.next().await {
            out.extend_from_slice(&chunk?);
        }
        Ok(out.into())
    }

    /// Get the response text.
    pub async fn text(self) -> crate::Result<String> {
        let bytes = self.bytes().await?;
        String::from_utf8(bytes.to_vec()).map_err(crate::error::Error::decode)
    }

    /// Try to deserialize the response body as JSON.
    #[cfg(feature = "json")]
    pub async fn json<T: serde::de::DeserializeOwned>(self) -> crate::Result<T> {
        let bytes = self.bytes().await?;
        serde_json::from_slice(&bytes).map_err(crate::error::Error::decode)
    }

    /// Turn a response into an error if the server returned an error status.
    pub fn error_for_status(self) -> crate::Result<Self> {
        if self.status.is_client_error() || self.status.is_server_error() {
            Err(crate::error::Error::status_code(self.url, self.status))
        } else {
            Ok(self)
        }
    }

    /// Turn a reference to a response into an error if the server returned
    /// an error status.
    pub fn error_for_status_ref(&self) -> crate::Result<&Self> {
        if self.status.is_client_error() || self.status.is_server_error() {
            Err(crate::error::Error::status_code(
                self.url.clone(),
                self.status,
            ))
        } else {
            Ok(self)
        }
    }

}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Response")
            .field("url", &self.url.as_str())
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("attempts", &self.attempts)
            .finish()
    }
}
