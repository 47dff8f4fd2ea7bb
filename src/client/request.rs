use std::fmt;
use std::time::Duration;

use http::{header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE}, Method};
use serde::Serialize;
use url::Url;

use super::body::Body;
use super::{Client, HttpVersionPref, Response};
use crate::headers::{split_ordered_headers, HeaderOrder};

/// A request which can be executed with `Client::execute()`.
pub struct Request {
    method: Method,
    url: Url,
    headers: HeaderMap,
    header_order: Option<HeaderOrder>,
    body: Option<Body>,
    timeout: Option<Duration>,
    version: Option<HttpVersionPref>,
}

/// A builder to construct the properties of a `Request`.
#[must_use = "RequestBuilder does nothing until you 'send' it"]
pub struct RequestBuilder {
    client: Client,
    request: crate::Result<Request>,
}

impl Request {
    /// Constructs a new request.
    pub fn new(method: Method, url: Url) -> Self {
        Request {
            method,
            url,
            headers: HeaderMap::new(),
            header_order: None,
            body: None,
            timeout: None,
            version: None,
        }
    }

    /// Get the method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Get a mutable reference to the method.
    pub fn method_mut(&mut self) -> &mut Method {
        &mut self.method
    }

    /// Get the url.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Get a mutable reference to the url.
    pub fn url_mut(&mut self) -> &mut Url {
        &mut self.url
    }

    /// Get the headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Get a mutable reference to the headers.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Get the body.
    pub fn body(&self) -> Option<&Body> {
        self.body.as_ref()
    }

    /// Get a mutable reference to the body.
    pub fn body_mut(&mut self) -> &mut Option<Body> {
        &mut self.body
    }

    /// Get the timeout.
    pub fn timeout(&self) -> Option<&Duration> {
        self.timeout.as_ref()
    }

    /// Get a mutable reference to the timeout.
    pub fn timeout_mut(&mut self) -> &mut Option<Duration> {
        &mut self.timeout
    }

    /// Get the per-request header order, when set.
    pub fn header_order(&self) -> Option<&HeaderOrder> {
        self.header_order.as_ref()
    }

    pub(crate) fn header_order_mut(&mut self) -> &mut Option<HeaderOrder> {
        &mut self.header_order
    }

    /// Get the HTTP version pinned for this request, when any.
    pub fn version(&self) -> Option<HttpVersionPref> {
        self.version
    }

    pub(crate) fn version_mut(&mut self) -> &mut Option<HttpVersionPref> {
        &mut self.version
    }

    pub(crate) fn pieces(
        self,
    ) -> (
        Method,
        Url,
        HeaderMap,
        Option<HeaderOrder>,
        Option<Body>,
        Option<Duration>,
        Option<HttpVersionPref>,
    ) {
        (
            self.method,
            self.url,
            self.headers,
            self.header_order,
            self.body,
            self.timeout,
            self.version,
        )
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("headers", &self.headers)
            .finish()
    }
}

impl RequestBuilder {
    pub(crate) fn new(client: Client, request: crate::Result<Request>) -> RequestBuilder {
        RequestBuilder { client, request }
    }

    /// Add a header to this request.
    pub fn header<K, V>(self, key: K, value: V) -> RequestBuilder
    where
        HeaderName: TryFrom<K>,
        <HeaderName as TryFrom<K>>::Error: Into<http::Error>,
        HeaderValue: TryFrom<V>,
        <HeaderValue as TryFrom<V>>::Error: Into<http::Error>,
    {
        self.and_then(|mut request| {
            let key = <HeaderName as TryFrom<K>>::try_from(key)
                .map_err(|e| crate::error::Error::builder(e.into()))?;
            let value = <HeaderValue as TryFrom<V>>::try_from(value)
                .map_err(|e| crate::error::Error::builder(e.into()))?;
            request.headers_mut().append(key, value);
            Ok(request)
        })
    }

    /// Add a set of headers to the existing ones on this request.
    pub fn headers(self, headers: HeaderMap) -> RequestBuilder {
        self.and_then(|mut request| {
            crate::util::replace_headers(request.headers_mut(), headers);
            Ok(request)
        })
    }

    /// Supply headers together with their wire order.
    ///
    /// Pairs with an empty value are placeholders: they shape the order
    /// without contributing a header. Names starting with `:` order the
    /// pseudo headers on HTTP/2 and HTTP/3.
    pub fn ordered_headers(self, pairs: &[(&str, &str)]) -> RequestBuilder {
        self.and_then(|mut request| {
            let (headers, order) = split_ordered_headers(pairs.iter().copied());
            crate::util::replace_headers(request.headers_mut(), headers);
            *request.header_order_mut() = Some(order);
            Ok(request)
        })
    }

    /// Enable HTTP basic authentication.
    pub fn basic_auth<U, P>(self, username: U, password: Option<P>) -> RequestBuilder
    where
        U: fmt::Display,
        P: fmt::Display,
    {
        let header = crate::util::basic_auth(username, password);
        self.header(http::header::AUTHORIZATION, header)
    }

    /// Enable HTTP bearer authentication.
    pub fn bearer_auth<T>(self, token: T) -> RequestBuilder
    where
        T: fmt::Display,
    {
        self.and_then(move |mut request| {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(crate::error::Error::builder)?;
            request.headers_mut().insert(http::header::AUTHORIZATION, value);
            Ok(request)
        })
    }

    /// Modify the query string of the URL, serializing `query`.
    pub fn query<T: Serialize + ?Sized>(self, query: &T) -> RequestBuilder {
        self.and_then(|mut request| {
            {
                let url = request.url_mut();
                let mut pairs = url.query_pairs_mut();
                let serializer = serde_urlencoded::Serializer::new(&mut pairs);
                query.serialize(serializer).map_err(crate::error::Error::builder)?;
            }
            if let Some("") = request.url().query() {
                request.url_mut().set_query(None);
            }
            Ok(request)
        })
    }

    /// Send a form body, serializing `form`.
    pub fn form<T: Serialize + ?Sized>(self, form: &T) -> RequestBuilder {
        self.and_then(|mut request| {
            let body = serde_urlencoded::to_string(form).map_err(crate::error::Error::builder)?;
            request.headers_mut().insert(
                CONTENT_TYPE,
                HeaderValue::from_static("application/x-www-form-urlencoded"),
            );
            *request.body_mut() = Some(body.into());
            Ok(request)
        })
    }

    /// Send a JSON body, serializing `json`.
    #[cfg(feature = "json")]
    pub fn json<T: Serialize + ?Sized>(self, json: &T) -> RequestBuilder {
        self.and_then(|mut request| {
            let body = serde_json::to_vec(json).map_err(crate::error::Error::builder)?;
            if !request.headers().contains_key(CONTENT_TYPE) {
                request
                    .headers_mut()
                    .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            }
            *request.body_mut() = Some(body.into());
            Ok(request)
        })
    }

    /// Send a multipart form body.
    #[cfg(feature = "multipart")]
    pub fn multipart(self, form: super::multipart::Form) -> RequestBuilder {
        self.and_then(move |mut request| {
            request.headers_mut().insert(
                CONTENT_TYPE,
                HeaderValue::from_str(&format!(
                    "multipart/form-data; boundary={}",
                    form.boundary()
                ))
                .map_err(crate::error::Error::builder)?,
            );
            *request.body_mut() = Some(form.into_body());
            Ok(request)
        })
    }

    /// Set the request body.
    pub fn body<T: Into<Body>>(self, body: T) -> RequestBuilder {
        self.and_then(move |mut request| {
            *request.body_mut() = Some(body.into());
            Ok(request)
        })
    }

    /// Enables a total timeout for this request, from connect to the end of
    /// the response headers.
    pub fn timeout(self, timeout: Duration) -> RequestBuilder {
        self.and_then(move |mut request| {
            *request.timeout_mut() = Some(timeout);
            Ok(request)
        })
    }

    /// Pin the HTTP version used by this request.
    pub fn version(self, version: HttpVersionPref) -> RequestBuilder {
        self.and_then(move |mut request| {
            *request.version_mut() = Some(version);
            Ok(request)
        })
    }

    /// Build the `Request`.
    pub fn build(self) -> crate::Result<Request> {
        self.request
    }

    /// Constructs the request and sends it to the target URL, returning a
    /// future `Response`.
    pub async fn send(self) -> crate::Result<Response> {
        let request = self.request?;
        self.client.execute(request).await
    }

    fn and_then<F>(mut self, f: F) -> RequestBuilder
    where
        F: FnOnce(Request) -> crate::Result<Request>,
    {
        self.request = self.request.and_then(f);
        self
    }
}

impl fmt::Debug for RequestBuilder {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.request {
            Ok(request) => request.fmt(f),
            Err(err) => f.debug_struct("RequestBuilder").field("error", err).finish(),
        }
    }
}
