//! Safari presets, desktop and iOS.

use super::emulation_imports::*;
use http2::*;
use tls::*;

macro_rules! mod_generator {
    (
        $mod_name:ident,
        $tls_options:expr,
        $http2_settings:expr,
        [($default_os:ident, $default_ua:tt) $(, ($other_os:ident, $other_ua:tt))*]
    ) => {
        pub(crate) mod $mod_name {
            use super::*;

            #[inline(always)]
            pub(crate) fn settings(os: Os) -> EmulationSettings {
                #[allow(unreachable_patterns)]
                let ua = match os {
                    $(
                        Os::$other_os => $other_ua,
                    )*
                    _ => $default_ua,
                };
                EmulationSettings::builder()
                    .tls($tls_options)
                    .http2($http2_settings)
                    .http3(http3_settings())
                    .headers(header_initializer(ua))
                    .header_order(header_order())
                    .multipart_boundary(BoundaryGenerator::WebKit)
                    .build()
            }
        }
    };
}

macro_rules! http2_settings {
    (1) => {{
        Http2Settings::builder()
            .initial_stream_window_size(2097152)
            .initial_connection_window_size(10551295)
            .max_concurrent_streams(100)
            .enable_push(false)
            .headers_priority(HEADER_PRIORITY)
            .headers_pseudo_order(HEADERS_PSEUDO_ORDER)
            .settings_order(SETTINGS_ORDER)
            .build()
    }};
    (2) => {{
        Http2Settings::builder()
            .initial_stream_window_size(4194304)
            .initial_connection_window_size(10551295)
            .max_concurrent_streams(100)
            .headers_priority(HEADER_PRIORITY)
            .headers_pseudo_order(HEADERS_PSEUDO_ORDER)
            .settings_order(SETTINGS_ORDER)
            .build()
    }};
}

fn http3_settings() -> Http3Settings {
    use crate::http3::*;
    Http3Settings::new()
        .set(SETTING_QPACK_MAX_TABLE_CAPACITY, 4096)
        .set(SETTING_MAX_FIELD_SECTION_SIZE, 1048576)
        .set(SETTING_QPACK_BLOCKED_STREAMS, 100)
}

fn header_order() -> HeaderOrderTable {
    const REGULAR: &[&str] = &[
        "host",
        "content-type",
        "content-length",
        "sec-fetch-dest",
        "user-agent",
        "accept",
        "sec-fetch-site",
        "sec-fetch-mode",
        "accept-language",
        "priority",
        "accept-encoding",
        "cookie",
    ];

    let h2: Vec<&str> = [":method", ":scheme", ":path", ":authority"]
        .into_iter()
        .chain(REGULAR.iter().copied())
        .collect();
    let h3: Vec<&str> = [":method", ":scheme", ":authority", ":path"]
        .into_iter()
        .chain(REGULAR.iter().copied())
        .collect();

    HeaderOrderTable::new()
        .with_default(OrderFamily::Http1Or2, h2)
        .with_default(OrderFamily::Http3, h3)
}

#[inline]
fn header_initializer(ua: &'static str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("sec-fetch-dest", HeaderValue::from_static("document"));
    headers.insert(USER_AGENT, HeaderValue::from_static(ua));
    headers.insert(
        ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
        ),
    );
    headers.insert("sec-fetch-site", HeaderValue::from_static("none"));
    headers.insert("sec-fetch-mode", HeaderValue::from_static("navigate"));
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
    headers.insert("priority", HeaderValue::from_static("u=0, i"));
    headers
}

mod tls {
    use crate::mimic::tls_imports::*;

    pub(super) const CURVES: &[SslCurve] = &[
        SslCurve::X25519,
        SslCurve::SECP256R1,
        SslCurve::SECP384R1,
        SslCurve::SECP521R1,
    ];

    pub(super) const CIPHER_LIST: &str = join!(
        ":",
        "TLS_AES_128_GCM_SHA256",
        "TLS_AES_256_GCM_SHA384",
        "TLS_CHACHA20_POLY1305_SHA256",
        "TLS_ECDHE_ECDSA_WITH_AES_256_GCM_SHA384",
        "TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256",
        "TLS_ECDHE_ECDSA_WITH_CHACHA20_POLY1305_SHA256",
        "TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384",
        "TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256",
        "TLS_ECDHE_RSA_WITH_CHACHA20_POLY1305_SHA256",
        "TLS_ECDHE_ECDSA_WITH_AES_256_CBC_SHA",
        "TLS_ECDHE_ECDSA_WITH_AES_128_CBC_SHA",
        "TLS_ECDHE_RSA_WITH_AES_256_CBC_SHA",
        "TLS_ECDHE_RSA_WITH_AES_128_CBC_SHA",
        "TLS_RSA_WITH_AES_256_GCM_SHA384",
        "TLS_RSA_WITH_AES_128_GCM_SHA256",
        "TLS_RSA_WITH_AES_256_CBC_SHA",
        "TLS_RSA_WITH_AES_128_CBC_SHA",
        "TLS_ECDHE_ECDSA_WITH_3DES_EDE_CBC_SHA",
        "TLS_ECDHE_RSA_WITH_3DES_EDE_CBC_SHA",
        "TLS_RSA_WITH_3DES_EDE_CBC_SHA"
    );

    pub(super) const SIGALGS_LIST: &str = join!(
        ":",
        "ecdsa_secp256r1_sha256",
        "rsa_pss_rsae_sha256",
        "rsa_pkcs1_sha256",
        "ecdsa_secp384r1_sha384",
        "ecdsa_sha1",
        "rsa_pss_rsae_sha384",
        "rsa_pss_rsae_sha384",
        "rsa_pkcs1_sha384",
        "rsa_pss_rsae_sha512",
        "rsa_pkcs1_sha512",
        "rsa_pkcs1_sha1"
    );

    pub(super) const CERT_COMPRESSION_ALGORITHM: &[CertCompressionAlgorithm] =
        &[CertCompressionAlgorithm::Zlib];

    pub(super) fn tls_options() -> TlsOptions {
        TlsOptions::builder()
            .grease_enabled(true)
            .enable_ocsp_stapling(true)
            .enable_signed_cert_timestamps(true)
            .curves(CURVES)
            .sigalgs_list(SIGALGS_LIST)
            .cipher_list(CIPHER_LIST)
            .min_tls_version(TlsVersion::TLS_1_0)
            .max_tls_version(TlsVersion::TLS_1_3)
            .alpn_protos(AlpnProtos::ALL)
            .cert_compression_algorithms(CERT_COMPRESSION_ALGORITHM)
            .build()
    }
}

mod http2 {
    use crate::mimic::http2_imports::*;

    pub(super) const HEADER_PRIORITY: (u32, u8, bool) = (0, 255, true);

    pub(super) const HEADERS_PSEUDO_ORDER: [PseudoOrder; 4] = [Method, Scheme, Path, Authority];

    pub(super) const SETTINGS_ORDER: [SettingsOrder; 8] = [
        HeaderTableSize,
        EnablePush,
        MaxConcurrentStreams,
        InitialWindowSize,
        MaxFrameSize,
        MaxHeaderListSize,
        UnknownSetting8,
        UnknownSetting9,
    ];
}

mod_generator!(
    safari17_5,
    tls_options(),
    http2_settings!(1),
    [(
        MacOs,
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.5 Safari/605.1.15"
    )]
);

mod_generator!(
    safari18,
    tls_options(),
    http2_settings!(2),
    [(
        MacOs,
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/18.0 Safari/605.1.15"
    )]
);

mod_generator!(
    safari_ios_17_4_1,
    tls_options(),
    http2_settings!(1),
    [(
        Ios,
        "Mozilla/5.0 (iPhone; CPU iPhone OS 17_4_1 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4.1 Mobile/15E148 Safari/604.1"
    )]
);
