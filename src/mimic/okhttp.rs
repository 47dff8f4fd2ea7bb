//! OkHttp (Android app stack) presets.

use super::emulation_imports::*;
use http2::*;
use tls::*;

macro_rules! mod_generator {
    (
        $mod_name:ident,
        $tls_options:expr,
        $http2_settings:expr,
        $ua:tt
    ) => {
        pub(crate) mod $mod_name {
            use super::*;

            #[inline(always)]
            pub(crate) fn settings(_os: Os) -> EmulationSettings {
                EmulationSettings::builder()
                    .tls($tls_options)
                    .http2($http2_settings)
                    .headers(header_initializer($ua))
                    .header_order(header_order())
                    .multipart_boundary(BoundaryGenerator::WebKit)
                    .build()
            }
        }
    };
}

fn header_order() -> HeaderOrderTable {
    const REGULAR: &[&str] = &[
        "host",
        "content-type",
        "content-length",
        "user-agent",
        "accept-encoding",
    ];

    let h2: Vec<&str> = [":method", ":path", ":authority", ":scheme"]
        .into_iter()
        .chain(REGULAR.iter().copied())
        .collect();

    HeaderOrderTable::new().with_default(OrderFamily::Http1Or2, h2)
}

#[inline]
fn header_initializer(ua: &'static str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(ua));
    headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
    headers
}

mod tls {
    use crate::mimic::tls_imports::*;

    pub(super) const CURVES: &[SslCurve] =
        &[SslCurve::X25519, SslCurve::SECP256R1, SslCurve::SECP384R1];

    pub(super) const SIGALGS_LIST: &str = join!(
        ":",
        "ecdsa_secp256r1_sha256",
        "rsa_pss_rsae_sha256",
        "rsa_pkcs1_sha256",
        "ecdsa_secp384r1_sha384",
        "rsa_pss_rsae_sha384",
        "rsa_pkcs1_sha384",
        "rsa_pss_rsae_sha512",
        "rsa_pkcs1_sha512",
        "rsa_pkcs1_sha1"
    );

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
        "TLS_RSA_WITH_AES_256_CBC_SHA",
        "TLS_RSA_WITH_3DES_EDE_CBC_SHA"
    );

    pub(super) fn tls_options() -> TlsOptions {
        TlsOptions::builder()
            .grease_enabled(true)
            .curves(CURVES)
            .sigalgs_list(SIGALGS_LIST)
            .cipher_list(CIPHER_LIST)
            .min_tls_version(TlsVersion::TLS_1_2)
            .max_tls_version(TlsVersion::TLS_1_3)
            .alpn_protos(AlpnProtos::ALL)
            .build()
    }
}

mod http2 {
    use crate::mimic::http2_imports::*;

    pub(super) const HEADER_PRIORITY: (u32, u8, bool) = (0, 255, true);

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

    pub(super) fn http2_settings() -> Http2Settings {
        Http2Settings::builder()
            .initial_stream_window_size(6291456)
            .initial_connection_window_size(15728640)
            .max_concurrent_streams(1000)
            .max_header_list_size(262144)
            .header_table_size(65536)
            .headers_priority(HEADER_PRIORITY)
            .headers_pseudo_order(HEADERS_PSEUDO_ORDER)
            .settings_order(SETTINGS_ORDER)
            .build()
    }
}

mod_generator!(
    okhttp4_9,
    tls_options(),
    http2_settings(),
    "okhttp/4.9.3"
);

mod_generator!(okhttp5, tls_options(), http2_settings(), "okhttp/5.0.0");
