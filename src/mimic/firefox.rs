//! Firefox presets, including the Tor Browser flavor.

use super::emulation_imports::*;
use http2::*;
use tls::*;

macro_rules! mod_generator {
    (
        $mod_name:ident,
        $tls_options:expr,
        $http2_settings:expr,
        $boundary:expr,
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
                    .multipart_boundary($boundary)
                    .build()
            }
        }
    };
}

macro_rules! tls_options {
    (1, $curves:expr) => {{
        FirefoxTlsOptions::builder()
            .curves($curves)
            .key_shares_limit(2)
            .build()
            .into()
    }};
    (2, $curves:expr) => {{
        FirefoxTlsOptions::builder()
            .curves($curves)
            .key_shares_limit(3)
            .enable_ech_grease(true)
            .pre_shared_key(true)
            .build()
            .into()
    }};
    // Tor Browser disables session identifiers entirely.
    (3, $curves:expr) => {{
        FirefoxTlsOptions::builder()
            .curves($curves)
            .key_shares_limit(2)
            .session_ticket(false)
            .build()
            .into()
    }};
}

macro_rules! http2_settings {
    (1) => {
        Http2Settings::builder()
            .initial_stream_id(15)
            .header_table_size(65536)
            .initial_stream_window_size(131072)
            .max_frame_size(16384)
            .initial_connection_window_size(12517377 + 65535)
            .headers_priority((13, 41, false))
            .headers_pseudo_order(HEADERS_PSEUDO_ORDER)
            .settings_order(SETTINGS_ORDER)
            .priority(PRIORITY.as_slice())
            .build()
    };
    (2) => {
        Http2Settings::builder()
            .initial_stream_id(3)
            .header_table_size(65536)
            .enable_push(false)
            .initial_stream_window_size(131072)
            .max_frame_size(16384)
            .initial_connection_window_size(12517377 + 65535)
            .headers_priority(HEADER_PRIORITY)
            .headers_pseudo_order(HEADERS_PSEUDO_ORDER)
            .settings_order(SETTINGS_ORDER)
            .build()
    };
}

fn http3_settings() -> Http3Settings {
    use crate::http3::*;
    Http3Settings::new()
        .set(SETTING_QPACK_MAX_TABLE_CAPACITY, 65536)
        .set(SETTING_MAX_FIELD_SECTION_SIZE, 393216)
        .set(SETTING_QPACK_BLOCKED_STREAMS, 20)
        .grease(true)
}

fn header_order() -> HeaderOrderTable {
    const REGULAR: &[&str] = &[
        "host",
        "user-agent",
        "accept",
        "accept-language",
        "accept-encoding",
        "referer",
        "content-type",
        "content-length",
        "origin",
        "cookie",
        "upgrade-insecure-requests",
        "sec-fetch-dest",
        "sec-fetch-mode",
        "sec-fetch-site",
        "sec-fetch-user",
        "priority",
        "te",
    ];

    let h2: Vec<&str> = [":method", ":path", ":authority", ":scheme"]
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
    header_firefox_ua!(headers, ua);
    header_firefox_accept!(headers);
    header_firefox_sec_fetch!(headers);
    headers.insert("priority", HeaderValue::from_static("u=0, i"));
    headers
}

mod tls {
    use crate::mimic::tls_imports::*;

    pub(super) const CURVES_1: &[SslCurve] = &[
        SslCurve::X25519,
        SslCurve::SECP256R1,
        SslCurve::SECP384R1,
        SslCurve::SECP521R1,
        SslCurve::FFDHE2048,
        SslCurve::FFDHE3072,
    ];

    pub(super) const CURVES_2: &[SslCurve] = &[
        SslCurve::X25519_MLKEM768,
        SslCurve::X25519,
        SslCurve::SECP256R1,
        SslCurve::SECP384R1,
        SslCurve::SECP521R1,
        SslCurve::FFDHE2048,
        SslCurve::FFDHE3072,
    ];

    pub(super) const CIPHER_LIST: &str = join!(
        ":",
        "TLS_AES_128_GCM_SHA256",
        "TLS_CHACHA20_POLY1305_SHA256",
        "TLS_AES_256_GCM_SHA384",
        "TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256",
        "TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256",
        "TLS_ECDHE_ECDSA_WITH_CHACHA20_POLY1305_SHA256",
        "TLS_ECDHE_RSA_WITH_CHACHA20_POLY1305_SHA256",
        "TLS_ECDHE_ECDSA_WITH_AES_256_GCM_SHA384",
        "TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384",
        "TLS_ECDHE_RSA_WITH_AES_128_CBC_SHA",
        "TLS_ECDHE_RSA_WITH_AES_256_CBC_SHA",
        "TLS_RSA_WITH_AES_128_GCM_SHA256",
        "TLS_RSA_WITH_AES_256_GCM_SHA384",
        "TLS_RSA_WITH_AES_128_CBC_SHA",
        "TLS_RSA_WITH_AES_256_CBC_SHA"
    );

    pub(super) const SIGALGS_LIST: &str = join!(
        ":",
        "ecdsa_secp256r1_sha256",
        "ecdsa_secp384r1_sha384",
        "ecdsa_secp521r1_sha512",
        "rsa_pss_rsae_sha256",
        "rsa_pss_rsae_sha384",
        "rsa_pss_rsae_sha512",
        "rsa_pkcs1_sha256",
        "rsa_pkcs1_sha384",
        "rsa_pkcs1_sha512",
        "ecdsa_sha1",
        "rsa_pkcs1_sha1"
    );

    pub(super) const CERT_COMPRESSION_ALGORITHM: &[CertCompressionAlgorithm] = &[
        CertCompressionAlgorithm::Zlib,
        CertCompressionAlgorithm::Brotli,
        CertCompressionAlgorithm::Zstd,
    ];

    pub(super) const DELEGATED_CREDENTIALS: &str = join!(
        ":",
        "ecdsa_secp256r1_sha256",
        "ecdsa_secp384r1_sha384",
        "ecdsa_secp521r1_sha512",
        "ecdsa_sha1"
    );

    pub(super) const RECORD_SIZE_LIMIT: u16 = 0x4001;

    #[derive(TypedBuilder)]
    pub(super) struct FirefoxTlsOptions {
        curves: &'static [SslCurve],

        #[builder(default = 2)]
        key_shares_limit: u8,

        #[builder(default = false)]
        enable_ech_grease: bool,

        #[builder(default = false)]
        pre_shared_key: bool,

        #[builder(default = true)]
        session_ticket: bool,
    }

    impl From<FirefoxTlsOptions> for TlsOptions {
        fn from(val: FirefoxTlsOptions) -> Self {
            TlsOptions::builder()
                .grease_enabled(false)
                .enable_ocsp_stapling(true)
                .curves(val.curves)
                .sigalgs_list(SIGALGS_LIST)
                .cipher_list(CIPHER_LIST)
                .min_tls_version(TlsVersion::TLS_1_2)
                .max_tls_version(TlsVersion::TLS_1_3)
                .session_ticket(val.session_ticket)
                .pre_shared_key(val.pre_shared_key)
                .enable_ech_grease(val.enable_ech_grease)
                .record_size_limit(RECORD_SIZE_LIMIT)
                .key_shares_limit(val.key_shares_limit)
                .delegated_credentials(DELEGATED_CREDENTIALS)
                .alpn_protos(AlpnProtos::ALL)
                .cert_compression_algorithms(CERT_COMPRESSION_ALGORITHM)
                .build()
        }
    }
}

mod http2 {
    use crate::mimic::http2_imports::*;

    pub(super) const HEADER_PRIORITY: (u32, u8, bool) = (0, 41, false);

    pub(super) const HEADERS_PSEUDO_ORDER: [PseudoOrder; 4] = [Method, Path, Authority, Scheme];

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

    pub(super) static PRIORITY: Lazy<[Priority; 6]> = Lazy::new(|| {
        [
            Priority::new(
                StreamId::from(3),
                StreamDependency::new(StreamId::zero(), 200, false),
            ),
            Priority::new(
                StreamId::from(5),
                StreamDependency::new(StreamId::zero(), 100, false),
            ),
            Priority::new(
                StreamId::from(7),
                StreamDependency::new(StreamId::zero(), 0, false),
            ),
            Priority::new(
                StreamId::from(9),
                StreamDependency::new(StreamId::from(7), 0, false),
            ),
            Priority::new(
                StreamId::from(11),
                StreamDependency::new(StreamId::from(3), 0, false),
            ),
            Priority::new(
                StreamId::from(13),
                StreamDependency::new(StreamId::zero(), 240, false),
            ),
        ]
    });
}

mod_generator!(
    ff128,
    tls_options!(1, CURVES_1),
    http2_settings!(1),
    BoundaryGenerator::Firefox,
    [
        (
            Windows,
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:128.0) Gecko/20100101 Firefox/128.0"
        ),
        (
            MacOs,
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:128.0) Gecko/20100101 Firefox/128.0"
        ),
        (
            Linux,
            "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0"
        ),
        (
            Android,
            "Mozilla/5.0 (Android 14; Mobile; rv:128.0) Gecko/128.0 Firefox/128.0"
        )
    ]
);

mod_generator!(
    ff133,
    tls_options!(2, CURVES_2),
    http2_settings!(1),
    BoundaryGenerator::Firefox,
    [
        (
            Windows,
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:133.0) Gecko/20100101 Firefox/133.0"
        ),
        (
            MacOs,
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:133.0) Gecko/20100101 Firefox/133.0"
        ),
        (
            Linux,
            "Mozilla/5.0 (X11; Linux x86_64; rv:133.0) Gecko/20100101 Firefox/133.0"
        )
    ]
);

// Tor Browser pins the ESR user agent regardless of the host platform.
mod_generator!(
    tor,
    tls_options!(3, CURVES_1),
    http2_settings!(2),
    BoundaryGenerator::Firefox,
    [
        (
            Windows,
            "Mozilla/5.0 (Windows NT 10.0; rv:128.0) Gecko/20100101 Firefox/128.0"
        )
    ]
);
