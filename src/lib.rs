#![deny(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! # camo
//!
//! An ergonomic HTTP client that imitates real browsers at the wire level:
//! TLS ClientHello shape (JA3/JA4), HTTP/2 SETTINGS and priorities, header
//! order, and HTTP/3 — with proxies, DNS control and retries built in.
//!
//! - Browser [emulation](#emulation) presets (Chrome, Edge, Firefox, Safari,
//!   iOS, OkHttp, Tor)
//! - JA3-string driven ClientHello construction
//! - Wire-exact header ordering, pseudo headers included
//! - HTTP/1.1, HTTP/2 and experimental HTTP/3 with automatic fallback
//! - HTTP, HTTPS, SOCKS4/4a/5/5h and Unix socket proxies
//! - Custom DNS: nameserver override, DNS-over-TLS, caching
//!
//! ## Emulation
//!
//! ```rust,no_run
//! use camo::{mimic::Impersonate, Client};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), camo::Error> {
//!     // Build a client that looks like Chrome on the wire
//!     let client = Client::builder()
//!         .emulation(Impersonate::Chrome131)
//!         .build()?;
//!
//!     // Use the API you're already familiar with
//!     let resp = client.get("https://tls.peet.ws/api/all").send().await?;
//!     println!("{}", resp.text().await?);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Making a GET request
//!
//! ```rust,no_run
//! # async fn run() -> Result<(), camo::Error> {
//! let body = camo::Client::new()
//!     .get("https://www.rust-lang.org")
//!     .send()
//!     .await?
//!     .text()
//!     .await?;
//!
//! println!("body = {body:?}");
//! # Ok(())
//! # }
//! ```
//!
//! **NOTE**: If you plan to perform multiple requests, it is best to create
//! a [`Client`] and reuse it, taking advantage of the transport cache.
//!
//! ## Proxies
//!
//! ```rust,no_run
//! # fn run() -> Result<(), camo::Error> {
//! let client = camo::Client::builder()
//!     .proxy(camo::Proxy::all("socks5://192.168.1.1:9000")?)
//!     .build()?;
//! # Ok(())
//! # }
//! ```

pub use http::header;
pub use http::Method;
pub use http::{StatusCode, Version};
pub use url::Url;

pub use hyper2::{Priority, PseudoOrder, SettingsOrder, StreamDependency, StreamId};

mod util;

mod client;
mod connect;
mod error;
mod http1;
mod http2;
mod http3;
mod into_url;
mod proxy;
mod rt;

pub mod dns;
pub mod headers;
pub mod middleware;
#[cfg(feature = "emulation")]
#[cfg_attr(docsrs, doc(cfg(feature = "emulation")))]
pub mod mimic;
pub mod redirect;
pub mod retry;
pub mod tls;

#[cfg(feature = "cookies")]
#[cfg_attr(docsrs, doc(cfg(feature = "cookies")))]
pub mod cookie;

pub use self::client::{
    multipart, Body, BodySource, Client, ClientBuilder, ClientConfig, HttpVersionPref, Request,
    RequestBuilder, Response,
};
pub use self::error::{Error, Result};
pub use self::http1::Http1Settings;
pub use self::http2::Http2Settings;
pub use self::http3::Http3Settings;
pub use self::into_url::IntoUrl;
pub use self::middleware::{ClientMiddleware, RequestMiddleware, ResponseMiddleware};
pub use self::proxy::{IntoProxyScheme, Proxy};
pub use self::tls::{
    AlpnProtos, AlpsProtos, CertCompressionAlgorithm, ClientHelloSpec, TlsInfo, TlsOptions,
    TlsVersion,
};

/// Shortcut method to quickly make a `GET` request.
///
/// See also the methods on the [`camo::Response`](./struct.Response.html)
/// type.
///
/// **NOTE**: This function creates a new internal `Client` on each call,
/// and so should not be used if making many requests. Create a
/// [`Client`](./struct.Client.html) instead.
///
/// # Examples
///
/// ```rust,no_run
/// # async fn run() -> Result<(), camo::Error> {
/// let body = camo::get("https://www.rust-lang.org").await?
///     .text().await?;
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// This function fails if:
///
/// - native TLS backend cannot be initialized
/// - supplied `Url` cannot be parsed
/// - there was an error while sending request
/// - redirect limit was exhausted
pub async fn get<T: IntoUrl>(url: T) -> crate::Result<Response> {
    Client::builder().build()?.get(url).send().await
}
