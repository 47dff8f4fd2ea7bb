//! Chrome and Chromium-derived (Edge) presets.

use super::emulation_imports::*;
use http2::*;
use tls::*;

macro_rules! mod_generator {
    (
        $mod_name:ident,
        $tls_options:expr,
        $http2_settings:expr,
        $header_initializer:ident,
        [($default_os:ident, $default_sec_ch_ua:tt, $default_ua:tt) $(, ($other_os:ident, $other_sec_ch_ua:tt, $other_ua:tt))*]
    ) => {
        pub(crate) mod $mod_name {
            use super::*;

            #[inline(always)]
            pub(crate) fn settings(os: Os) -> EmulationSettings {
                #[allow(unreachable_patterns)]
                let (sec_ch_ua, ua, os) = match os {
                    $(
                        Os::$other_os => ($other_sec_ch_ua, $other_ua, Os::$other_os),
                    )*
                    _ => ($default_sec_ch_ua, $default_ua, Os::$default_os),
                };
                EmulationSettings::builder()
                    .tls($tls_options)
                    .http2($http2_settings)
                    .http3(http3_settings())
                    .headers($header_initializer(sec_ch_ua, ua, os))
                    .header_order(header_order())
                    .multipart_boundary(BoundaryGenerator::WebKit)
                    .build()
            }
        }
    };
}

macro_rules! tls_options {
    (1) => {{
        ChromeTlsOptions::builder().build().into()
    }};
    (2) => {{
        ChromeTlsOptions::builder()
            .permute_extensions(true)
            .enable_ech_grease(true)
            .pre_shared_key(true)
            .build()
            .into()
    }};
    (3, $curves:expr) => {{
        ChromeTlsOptions::builder()
            .curves($curves)
            .permute_extensions(true)
            .enable_ech_grease(true)
            .pre_shared_key(true)
            .build()
            .into()
    }};
}

macro_rules! http2_settings {
    () => {{
        Http2Settings::builder()
            .initial_stream_window_size(6291456)
            .initial_connection_window_size(15728640)
            .max_header_list_size(262144)
            .header_table_size(65536)
            .enable_push(false)
            .headers_priority(HEADER_PRIORITY)
            .headers_pseudo_order(HEADERS_PSEUDO_ORDER)
            .settings_order(SETTINGS_ORDER)
            .build()
    }};
}

fn http3_settings() -> Http3Settings {
    use crate::http3::*;
    Http3Settings::new()
        .set(SETTING_QPACK_MAX_TABLE_CAPACITY, 65536)
        .set(SETTING_MAX_FIELD_SECTION_SIZE, 262144)
        .set(SETTING_QPACK_BLOCKED_STREAMS, 100)
        .grease(true)
}

fn header_order() -> HeaderOrderTable {
    const REGULAR: &[&str] = &[
        "host",
        "cache-control",
        "content-length",
        "content-type",
        "sec-ch-ua",
        "sec-ch-ua-mobile",
        "sec-ch-ua-platform",
        "upgrade-insecure-requests",
        "user-agent",
        "accept",
        "origin",
        "sec-fetch-site",
        "sec-fetch-mode",
        "sec-fetch-user",
        "sec-fetch-dest",
        "referer",
        "accept-encoding",
        "accept-language",
        "cookie",
        "priority",
    ];

    let h2: Vec<&str> = [":method", ":authority", ":scheme", ":path"]
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
fn header_initializer(sec_ch_ua: &'static str, ua: &'static str, os: Os) -> HeaderMap {
    let mut headers = HeaderMap::new();
    header_chrome_sec_ch_ua!(headers, sec_ch_ua, os.platform(), os.is_mobile());
    header_chrome_ua!(headers, ua);
    header_chrome_accept!(headers);
    header_chrome_sec_fetch!(headers);
    headers
}

#[inline]
fn header_initializer_with_priority(
    sec_ch_ua: &'static str,
    ua: &'static str,
    os: Os,
) -> HeaderMap {
    let mut headers = header_initializer(sec_ch_ua, ua, os);
    headers.insert("priority", HeaderValue::from_static("u=0, i"));
    headers
}

mod tls {
    use crate::mimic::tls_imports::*;

    pub(super) const CURVES_1: &[SslCurve] =
        &[SslCurve::X25519, SslCurve::SECP256R1, SslCurve::SECP384R1];

    pub(super) const CURVES_2: &[SslCurve] = &[
        SslCurve::X25519_KYBER768_DRAFT00,
        SslCurve::X25519,
        SslCurve::SECP256R1,
        SslCurve::SECP384R1,
    ];

    pub(super) const CURVES_3: &[SslCurve] = &[
        SslCurve::X25519_MLKEM768,
        SslCurve::X25519,
        SslCurve::SECP256R1,
        SslCurve::SECP384R1,
    ];

    pub(super) const CIPHER_LIST: &str = join!(
        ":",
        "TLS_AES_128_GCM_SHA256",
        "TLS_AES_256_GCM_SHA384",
        "TLS_CHACHA20_POLY1305_SHA256",
        "TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256",
        "TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256",
        "TLS_ECDHE_ECDSA_WITH_AES_256_GCM_SHA384",
        "TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384",
        "TLS_ECDHE_ECDSA_WITH_CHACHA20_POLY1305_SHA256",
        "TLS_ECDHE_RSA_WITH_CHACHA20_POLY1305_SHA256",
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
        "rsa_pss_rsae_sha256",
        "rsa_pkcs1_sha256",
        "ecdsa_secp384r1_sha384",
        "rsa_pss_rsae_sha384",
        "rsa_pkcs1_sha384",
        "rsa_pss_rsae_sha512",
        "rsa_pkcs1_sha512"
    );

    pub(super) const CERT_COMPRESSION_ALGORITHM: &[CertCompressionAlgorithm] =
        &[CertCompressionAlgorithm::Brotli];

    #[derive(TypedBuilder)]
    pub(super) struct ChromeTlsOptions {
        #[builder(default = CURVES_1)]
        curves: &'static [SslCurve],

        #[builder(default = SIGALGS_LIST)]
        sigalgs_list: &'static str,

        #[builder(default = CIPHER_LIST)]
        cipher_list: &'static str,

        #[builder(default = false)]
        enable_ech_grease: bool,

        #[builder(default = false)]
        permute_extensions: bool,

        #[builder(default = false)]
        pre_shared_key: bool,
    }

    impl From<ChromeTlsOptions> for TlsOptions {
        fn from(val: ChromeTlsOptions) -> Self {
            TlsOptions::builder()
                .grease_enabled(true)
                .enable_ocsp_stapling(true)
                .enable_signed_cert_timestamps(true)
                .curves(val.curves)
                .sigalgs_list(val.sigalgs_list)
                .cipher_list(val.cipher_list)
                .min_tls_version(TlsVersion::TLS_1_2)
                .max_tls_version(TlsVersion::TLS_1_3)
                .permute_extensions(val.permute_extensions)
                .pre_shared_key(val.pre_shared_key)
                .enable_ech_grease(val.enable_ech_grease)
                .alpn_protos(AlpnProtos::ALL)
                .alps_protos(AlpsProtos::HTTP2)
                .cert_compression_algorithms(CERT_COMPRESSION_ALGORITHM)
                .build()
        }
    }
}

mod http2 {
    use crate::mimic::http2_imports::*;

    pub(super) const HEADER_PRIORITY: (u32, u8, bool) = (0, 255, true);

    pub(super) const HEADERS_PSEUDO_ORDER: [PseudoOrder; 4] = [Method, Authority, Scheme, Path];

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
    v116,
    tls_options!(1),
    http2_settings!(),
    header_initializer,
    [
        (
            MacOs,
            r#""Chromium";v="116", "Not)A;Brand";v="24", "Google Chrome";v="116""#,
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/116.0.0.0 Safari/537.36"
        ),
        (
            Windows,
            r#""Chromium";v="116", "Not)A;Brand";v="24", "Google Chrome";v="116""#,
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/116.0.0.0 Safari/537.36"
        ),
        (
            Linux,
            r#""Chromium";v="116", "Not)A;Brand";v="24", "Google Chrome";v="116""#,
            "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/116.0.0.0 Safari/537.36"
        )
    ]
);

mod_generator!(
    v120,
    tls_options!(2),
    http2_settings!(),
    header_initializer,
    [
        (
            MacOs,
            r#""Not_A Brand";v="8", "Chromium";v="120", "Google Chrome";v="120""#,
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
        ),
        (
            Windows,
            r#""Not_A Brand";v="8", "Chromium";v="120", "Google Chrome";v="120""#,
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
        ),
        (
            Linux,
            r#""Not_A Brand";v="8", "Chromium";v="120", "Google Chrome";v="120""#,
            "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
        )
    ]
);

mod_generator!(
    v124,
    tls_options!(3, CURVES_2),
    http2_settings!(),
    header_initializer_with_priority,
    [
        (
            MacOs,
            r#""Chromium";v="124", "Google Chrome";v="124", "Not-A.Brand";v="99""#,
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36"
        ),
        (
            Windows,
            r#""Chromium";v="124", "Google Chrome";v="124", "Not-A.Brand";v="99""#,
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36"
        ),
        (
            Android,
            r#""Chromium";v="124", "Google Chrome";v="124", "Not-A.Brand";v="99""#,
            "Mozilla/5.0 (Linux; Android 10; K) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Mobile Safari/537.36"
        )
    ]
);

mod_generator!(
    v131,
    tls_options!(3, CURVES_3),
    http2_settings!(),
    header_initializer_with_priority,
    [
        (
            MacOs,
            r#""Google Chrome";v="131", "Chromium";v="131", "Not_A Brand";v="24""#,
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36"
        ),
        (
            Windows,
            r#""Google Chrome";v="131", "Chromium";v="131", "Not_A Brand";v="24""#,
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36"
        ),
        (
            Linux,
            r#""Google Chrome";v="131", "Chromium";v="131", "Not_A Brand";v="24""#,
            "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36"
        ),
        (
            Android,
            r#""Google Chrome";v="131", "Chromium";v="131", "Not_A Brand";v="24""#,
            "Mozilla/5.0 (Linux; Android 10; K) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Mobile Safari/537.36"
        )
    ]
);

mod_generator!(
    edge131,
    tls_options!(3, CURVES_3),
    http2_settings!(),
    header_initializer_with_priority,
    [
        (
            Windows,
            r#""Microsoft Edge";v="131", "Chromium";v="131", "Not_A Brand";v="24""#,
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36 Edg/131.0.0.0"
        ),
        (
            MacOs,
            r#""Microsoft Edge";v="131", "Chromium";v="131", "Not_A Brand";v="24""#,
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36 Edg/131.0.0.0"
        )
    ]
);
