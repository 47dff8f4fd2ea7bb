//! HTTP Cookies

use std::fmt;
use std::sync::RwLock;

use http::header::{HeaderMap, HeaderValue, SET_COOKIE};
use url::Url;

/// Actions for a persistent cookie store providing session support.
pub trait CookieStore: Send + Sync {
    /// Store a set of Set-Cookie header values received from `url`.
    fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, url: &Url);
    /// Get any Cookie values in the store for `url`.
    fn cookies(&self, url: &Url) -> Option<HeaderValue>;
}

/// A good default `CookieStore` implementation.
///
/// This is the implementation used when simply calling `cookie_store(true)`.
/// This type is exposed to allow creating one and filling it with some
/// existing cookies more easily, before creating a `Client`.
#[derive(Debug, Default)]
pub struct Jar(RwLock<cookie_store::CookieStore>);

impl Jar {
    /// Add a cookie str to this jar.
    ///
    /// # Example
    ///
    /// ```
    /// use camo::cookie::Jar;
    /// use url::Url;
    ///
    /// let cookie = "foo=bar; Domain=yolo.local";
    /// let url = "https://yolo.local".parse::<Url>().unwrap();
    ///
    /// let jar = Jar::default();
    /// jar.add_cookie_str(cookie, &url);
    /// ```
    pub fn add_cookie_str(&self, cookie: &str, url: &Url) {
        let cookies = cookie_crate::Cookie::parse(cookie)
            .ok()
            .map(|c| c.into_owned())
            .into_iter();
        self.0
            .write()
            .expect("cookie jar poisoned")
            .store_response_cookies(cookies, url);
    }
}

impl CookieStore for Jar {
    fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, url: &Url) {
        let iter = cookie_headers.filter_map(|value| {
            std::str::from_utf8(value.as_bytes())
                .ok()
                .and_then(|value| cookie_crate::Cookie::parse(value).ok())
                .map(|cookie| cookie.into_owned())
        });

        self.0
            .write()
            .expect("cookie jar poisoned")
            .store_response_cookies(iter, url);
    }

    fn cookies(&self, url: &Url) -> Option<HeaderValue> {
        let s = self
            .0
            .read()
            .expect("cookie jar poisoned")
            .get_request_values(url)
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("; ");

        if s.is_empty() {
            return None;
        }

        HeaderValue::from_maybe_shared(bytes::Bytes::from(s)).ok()
    }
}

/// Extracts the `Set-Cookie` values of a response.
pub(crate) fn extract_response_cookies(
    headers: &HeaderMap,
) -> impl Iterator<Item = Result<cookie_crate::Cookie<'_>, cookie_crate::ParseError>> {
    headers.get_all(SET_COOKIE).iter().map(|value| {
        std::str::from_utf8(value.as_bytes())
            .map_err(cookie_crate::ParseError::from)
            .and_then(cookie_crate::Cookie::parse)
    })
}

/// Writes the store's cookies for `url` into the request headers.
pub(crate) fn add_cookie_header(
    headers: &mut HeaderMap,
    cookie_store: &dyn CookieStore,
    url: &Url,
) {
    if let Some(header) = cookie_store.cookies(url) {
        headers.insert(http::header::COOKIE, header);
    }
}

/// Stores a response's cookies back into the store.
pub(crate) fn store_response_cookies(
    cookie_store: &dyn CookieStore,
    headers: &HeaderMap,
    url: &Url,
) {
    let mut cookies = headers.get_all(SET_COOKIE).iter();
    cookie_store.set_cookies(&mut cookies, url);
}

impl fmt::Debug for dyn CookieStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CookieStore").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jar_round_trip() {
        let url = Url::parse("https://example.com/").unwrap();
        let jar = Jar::default();
        jar.add_cookie_str("session=abc123; Path=/", &url);

        let header = jar.cookies(&url).unwrap();
        assert_eq!(header, "session=abc123");
    }

    #[test]
    fn set_cookies_from_headers() {
        let url = Url::parse("https://example.com/").unwrap();
        let jar = Jar::default();

        let mut headers = HeaderMap::new();
        headers.append(SET_COOKIE, HeaderValue::from_static("a=1; Path=/"));
        headers.append(SET_COOKIE, HeaderValue::from_static("b=2; Path=/"));
        store_response_cookies(&jar, &headers, &url);

        let mut request_headers = HeaderMap::new();
        add_cookie_header(&mut request_headers, &jar, &url);
        let value = request_headers
            .get(http::header::COOKIE)
            .unwrap()
            .to_str()
            .unwrap();
        assert!(value.contains("a=1"));
        assert!(value.contains("b=2"));
    }
}
