//! Browser emulation presets.
//!
//! Each preset is a pure data function producing the full fingerprint
//! surface of one browser build: ClientHello shape, HTTP/2 settings and
//! priorities, header order tables, default headers, the HTTP/3 SETTINGS,
//! and the multipart boundary flavor.

#![allow(missing_docs)]

#[macro_use]
mod macros;
mod chrome;
mod firefox;
mod okhttp;
mod safari;

use http::HeaderMap;
use typed_builder::TypedBuilder;

use crate::client::multipart::BoundaryGenerator;
use crate::headers::HeaderOrderTable;
use crate::http2::Http2Settings;
use crate::http3::Http3Settings;
use crate::tls::TlsOptions;

use Impersonate::*;

mod emulation_imports {
    pub(crate) use super::{EmulationSettings, Os};
    pub(crate) use crate::client::multipart::BoundaryGenerator;
    pub(crate) use crate::headers::{HeaderOrderTable, OrderFamily};
    pub(crate) use crate::http2::Http2Settings;
    pub(crate) use crate::http3::Http3Settings;
    pub(crate) use http::header::{ACCEPT, ACCEPT_LANGUAGE, UPGRADE_INSECURE_REQUESTS, USER_AGENT};
    pub(crate) use http::{HeaderMap, HeaderName, HeaderValue, Method};
}

mod tls_imports {
    pub(crate) use crate::tls::{AlpnProtos, AlpsProtos, CertCompressionAlgorithm, TlsOptions, TlsVersion};
    pub(crate) use boring::ssl::SslCurve;
    pub(crate) use typed_builder::TypedBuilder;
}

mod http2_imports {
    pub(crate) use hyper2::PseudoOrder::{self, *};
    pub(crate) use hyper2::SettingsOrder::{self, *};
    pub(crate) use hyper2::{Priority, StreamDependency, StreamId};
    pub(crate) use once_cell::sync::Lazy;
}

/// The full fingerprint surface installed by one preset.
#[derive(TypedBuilder, Debug)]
pub struct EmulationSettings {
    /// TLS fingerprint options.
    pub tls: TlsOptions,

    /// HTTP/2 SETTINGS, priorities and pseudo order.
    pub http2: Http2Settings,

    /// HTTP/3 SETTINGS frame content.
    #[builder(default)]
    pub http3: Http3Settings,

    /// Default headers, UA pinned per OS variant.
    #[builder(default, setter(strip_option, into))]
    pub headers: Option<HeaderMap>,

    /// Per-method wire order of headers.
    #[builder(default)]
    pub header_order: HeaderOrderTable,

    /// Multipart boundary generation flavor.
    #[builder(default)]
    pub multipart_boundary: BoundaryGenerator,
}

/// The operating system flavor a preset imitates; affects the `User-Agent`
/// and client-hint headers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Os {
    Windows,
    #[default]
    MacOs,
    Linux,
    Android,
    Ios,
}

impl Os {
    pub(crate) fn platform(self) -> &'static str {
        match self {
            Os::Windows => "\"Windows\"",
            Os::MacOs => "\"macOS\"",
            Os::Linux => "\"Linux\"",
            Os::Android => "\"Android\"",
            Os::Ios => "\"iOS\"",
        }
    }

    pub(crate) fn is_mobile(self) -> bool {
        matches!(self, Os::Android | Os::Ios)
    }
}

/// A browser build to imitate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Impersonate {
    Chrome116,
    Chrome120,
    Chrome124,
    #[default]
    Chrome131,

    Edge131,

    Firefox128,
    Firefox133,
    /// Tor Browser (Firefox ESR based).
    Tor,

    Safari17_5,
    Safari18,
    SafariIos17_4_1,

    OkHttp4_9,
    OkHttp5,
}

/// Produces the settings of a preset for a specific OS flavor.
pub fn emulation(impersonate: Impersonate, os: Os) -> EmulationSettings {
    match impersonate {
        Chrome116 => chrome::v116::settings(os),
        Chrome120 => chrome::v120::settings(os),
        Chrome124 => chrome::v124::settings(os),
        Chrome131 => chrome::v131::settings(os),

        Edge131 => chrome::edge131::settings(os),

        Firefox128 => firefox::ff128::settings(os),
        Firefox133 => firefox::ff133::settings(os),
        Tor => firefox::tor::settings(os),

        Safari17_5 => safari::safari17_5::settings(os),
        Safari18 => safari::safari18::settings(os),
        SafariIos17_4_1 => safari::safari_ios_17_4_1::settings(Os::Ios),

        OkHttp4_9 => okhttp::okhttp4_9::settings(Os::Android),
        OkHttp5 => okhttp::okhttp5::settings(Os::Android),
    }
}

impl From<Impersonate> for EmulationSettings {
    fn from(impersonate: Impersonate) -> Self {
        emulation(impersonate, Os::default())
    }
}

impl std::str::FromStr for Impersonate {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "chrome_116" => Ok(Chrome116),
            "chrome_120" => Ok(Chrome120),
            "chrome_124" => Ok(Chrome124),
            "chrome_131" => Ok(Chrome131),
            "edge_131" => Ok(Edge131),
            "firefox_128" => Ok(Firefox128),
            "firefox_133" => Ok(Firefox133),
            "tor" => Ok(Tor),
            "safari_17.5" => Ok(Safari17_5),
            "safari_18" => Ok(Safari18),
            "safari_ios_17.4.1" => Ok(SafariIos17_4_1),
            "okhttp_4.9" => Ok(OkHttp4_9),
            "okhttp_5" => Ok(OkHttp5),
            _ => Err(format!("unknown emulation preset: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headers::OrderFamily;
    use http::Method;
    use hyper2::PseudoOrder;

    #[test]
    fn every_preset_produces_settings() {
        for preset in [
            Chrome116,
            Chrome120,
            Chrome124,
            Chrome131,
            Edge131,
            Firefox128,
            Firefox133,
            Tor,
            Safari17_5,
            Safari18,
            SafariIos17_4_1,
            OkHttp4_9,
            OkHttp5,
        ] {
            let settings = emulation(preset, Os::default());
            assert!(
                settings.headers.as_ref().is_some_and(|h| h.contains_key("user-agent")),
                "{preset:?} must pin a user-agent"
            );
            assert!(
                !settings.header_order.is_empty(),
                "{preset:?} must install a header order"
            );
        }
    }

    #[test]
    fn chrome_pseudo_order() {
        let settings = emulation(Chrome131, Os::MacOs);
        assert_eq!(
            settings.http2.headers_pseudo_order,
            Some([
                PseudoOrder::Method,
                PseudoOrder::Authority,
                PseudoOrder::Scheme,
                PseudoOrder::Path,
            ])
        );
    }

    #[test]
    fn chrome_settings_values() {
        let settings = emulation(Chrome131, Os::MacOs);
        let http2 = &settings.http2;
        assert_eq!(http2.header_table_size, Some(65536));
        assert_eq!(http2.enable_push, Some(false));
        assert_eq!(http2.initial_stream_window_size, Some(6291456));
        assert_eq!(http2.initial_connection_window_size, Some(15728640));
        assert_eq!(http2.max_header_list_size, Some(262144));
        // Chrome leaves these out of the SETTINGS frame entirely.
        assert!(http2.max_frame_size.is_none());
        assert!(http2.initial_stream_id.is_none());
    }

    #[test]
    fn firefox_starts_at_stream_fifteen_with_priorities() {
        let settings = emulation(Firefox133, Os::Windows);
        assert_eq!(settings.http2.initial_stream_id, Some(15));
        let priorities = settings.http2.priority.as_ref().unwrap();
        assert_eq!(priorities.len(), 6);
        assert_eq!(
            settings.http2.headers_pseudo_order,
            Some([
                PseudoOrder::Method,
                PseudoOrder::Path,
                PseudoOrder::Authority,
                PseudoOrder::Scheme,
            ])
        );
    }

    #[test]
    fn per_os_user_agent() {
        let windows = emulation(Chrome131, Os::Windows);
        let mac = emulation(Chrome131, Os::MacOs);
        let windows_ua = windows.headers.unwrap();
        let mac_ua = mac.headers.unwrap();
        assert!(windows_ua.get("user-agent").unwrap().to_str().unwrap().contains("Windows NT"));
        assert!(mac_ua.get("user-agent").unwrap().to_str().unwrap().contains("Macintosh"));
    }

    #[test]
    fn firefox_uses_its_boundary_flavor() {
        let settings = emulation(Firefox133, Os::Windows);
        assert_eq!(
            settings.multipart_boundary,
            crate::client::multipart::BoundaryGenerator::Firefox
        );
    }

    #[test]
    fn h3_family_order_differs_for_firefox() {
        let settings = emulation(Firefox133, Os::Windows);
        let h2 = settings
            .header_order
            .get(&Method::GET, OrderFamily::Http1Or2)
            .unwrap();
        let h3 = settings
            .header_order
            .get(&Method::GET, OrderFamily::Http3)
            .unwrap();
        assert_ne!(h2.pseudo(), h3.pseudo());
    }
}
