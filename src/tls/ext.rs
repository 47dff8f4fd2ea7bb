#![allow(clippy::result_large_err)]
//! Applies [`TlsOptions`] and [`ClientHelloSpec`] onto a BoringSSL builder.

use std::os::raw::c_int;

use boring::error::ErrorStack;
use boring::ssl::{ConnectConfiguration, SslConnectorBuilder, SslCurve, SslOptions};
use foreign_types::ForeignTypeRef;

use super::hello::{is_grease, ClientHelloSpec, TlsExtension, EXT_APPLICATION_SETTINGS};
use super::{AlpsProtos, CertCompressionAlgorithm, TlsOptions, TlsVersion};

/// Error handler for raw boringssl calls.
fn sv_handler(r: c_int) -> Result<c_int, ErrorStack> {
    if r == 0 {
        Err(ErrorStack::get())
    } else {
        Ok(r)
    }
}

pub(super) trait TlsBuilderExt {
    fn apply_tls_options(&mut self, options: &TlsOptions) -> Result<(), ErrorStack>;
    fn apply_hello_spec(&mut self, spec: &ClientHelloSpec) -> Result<(), ErrorStack>;
    fn add_cert_decompressors(
        &mut self,
        algorithms: &[CertCompressionAlgorithm],
    ) -> Result<(), ErrorStack>;
}

impl TlsBuilderExt for SslConnectorBuilder {
    fn apply_tls_options(&mut self, options: &TlsOptions) -> Result<(), ErrorStack> {
        self.set_grease_enabled(options.grease_enabled);
        self.set_permute_extensions(options.permute_extensions);

        if let Some(version) = options.min_tls_version {
            self.set_min_proto_version(Some(version.0))?;
        }
        if let Some(version) = options.max_tls_version {
            self.set_max_proto_version(Some(version.0))?;
        }

        if let Some(cipher_list) = options.cipher_list {
            self.set_cipher_list(cipher_list)?;
        }
        if let Some(curves) = options.curves {
            self.set_curves(curves)?;
        }
        if let Some(sigalgs_list) = options.sigalgs_list {
            self.set_sigalgs_list(sigalgs_list)?;
        }

        if !options.session_ticket {
            self.set_options(SslOptions::NO_TICKET);
        }
        if !options.renegotiation {
            self.set_options(SslOptions::NO_RENEGOTIATION);
        }

        if options.enable_ocsp_stapling {
            self.enable_ocsp_stapling();
        }
        if options.enable_signed_cert_timestamps {
            self.enable_signed_cert_timestamps();
        }
        if let Some(limit) = options.record_size_limit {
            self.set_record_size_limit(limit);
        }
        if let Some(limit) = options.key_shares_limit {
            self.set_key_shares_limit(limit);
        }
        if let Some(credentials) = options.delegated_credentials {
            self.set_delegated_credentials(credentials)?;
        }

        if let Some(algorithms) = options.cert_compression_algorithms {
            self.add_cert_decompressors(algorithms)?;
        }

        // The spec-level hello overrides the knob-level fields it carries.
        if let Some(hello) = &options.hello {
            self.apply_hello_spec(hello)?;
        } else {
            self.set_alpn_protos(options.alpn_protos.0)?;
        }

        Ok(())
    }

    fn apply_hello_spec(&mut self, spec: &ClientHelloSpec) -> Result<(), ErrorStack> {
        if let Some(version) = TlsVersion::from_wire(spec.tls_vers_min) {
            self.set_min_proto_version(Some(version.0))?;
        }
        if let Some(version) = TlsVersion::from_wire(spec.tls_vers_max) {
            self.set_max_proto_version(Some(version.0))?;
        }

        let cipher_list = cipher_names(&spec.cipher_suites);
        if !cipher_list.is_empty() {
            self.set_cipher_list(&cipher_list.join(":"))?;
        }

        let mut wants_grease = spec.cipher_suites.iter().any(|&c| is_grease(c));

        for extension in &spec.extensions {
            match extension {
                TlsExtension::SupportedCurves(ids) => {
                    let curves = curve_list(ids);
                    if !curves.is_empty() {
                        self.set_curves(&curves)?;
                    }
                    wants_grease |= ids.iter().any(|&c| is_grease(c));
                }
                TlsExtension::SignatureAlgorithms(ids) => {
                    let names = sigalg_names(ids);
                    if !names.is_empty() {
                        self.set_sigalgs_list(&names.join(":"))?;
                    }
                }
                TlsExtension::Alpn(protos) => {
                    let mut wire = Vec::new();
                    for proto in protos {
                        wire.push(proto.len() as u8);
                        wire.extend_from_slice(proto.as_bytes());
                    }
                    self.set_alpn_protos(&wire)?;
                }
                TlsExtension::CompressCertificate(algs) => {
                    let algs: Vec<CertCompressionAlgorithm> = algs
                        .iter()
                        .filter_map(|&alg| match alg {
                            1 => Some(CertCompressionAlgorithm::Zlib),
                            2 => Some(CertCompressionAlgorithm::Brotli),
                            3 => Some(CertCompressionAlgorithm::Zstd),
                            _ => None,
                        })
                        .collect();
                    self.add_cert_decompressors(&algs)?;
                }
                TlsExtension::RecordSizeLimit(limit) => {
                    self.set_record_size_limit(*limit);
                }
                TlsExtension::StatusRequest => {
                    self.enable_ocsp_stapling();
                }
                TlsExtension::Sct => {
                    self.enable_signed_cert_timestamps();
                }
                TlsExtension::KeyShare(shares) => {
                    let real = shares.iter().filter(|s| !is_grease(s.group)).count();
                    if real > 0 {
                        self.set_key_shares_limit(real as u8);
                    }
                }
                TlsExtension::Grease { .. } => {
                    wants_grease = true;
                }
                _ => {}
            }
        }

        if spec.extension(35).is_none() {
            self.set_options(SslOptions::NO_TICKET);
        }
        if spec.extension(65281).is_none() {
            self.set_options(SslOptions::NO_RENEGOTIATION);
        }
        self.set_grease_enabled(wants_grease);

        Ok(())
    }

    fn add_cert_decompressors(
        &mut self,
        algorithms: &[CertCompressionAlgorithm],
    ) -> Result<(), ErrorStack> {
        use super::cert_compression::{
            BrotliCertCompressor, ZlibCertCompressor, ZstdCertCompressor,
        };

        for algorithm in algorithms {
            match algorithm {
                CertCompressionAlgorithm::Zlib => {
                    self.add_certificate_compression_algorithm(ZlibCertCompressor)?
                }
                CertCompressionAlgorithm::Brotli => {
                    self.add_certificate_compression_algorithm(BrotliCertCompressor)?
                }
                CertCompressionAlgorithm::Zstd => {
                    self.add_certificate_compression_algorithm(ZstdCertCompressor)?
                }
            }
        }
        Ok(())
    }
}

pub(super) trait TlsConnectExt {
    fn configure_ech_grease(&mut self, enable: bool) -> Result<(), ErrorStack>;
    fn configure_application_settings(&mut self, alps: AlpsProtos) -> Result<(), ErrorStack>;
}

impl TlsConnectExt for ConnectConfiguration {
    fn configure_ech_grease(&mut self, enable: bool) -> Result<(), ErrorStack> {
        if enable {
            unsafe { boring_sys::SSL_set_enable_ech_grease(self.as_ptr(), 1) }
        }
        Ok(())
    }

    fn configure_application_settings(&mut self, alps: AlpsProtos) -> Result<(), ErrorStack> {
        unsafe {
            sv_handler(boring_sys::SSL_add_application_settings(
                self.as_ptr(),
                alps.0.as_ptr(),
                alps.0.len(),
                std::ptr::null(),
                0,
            ))
            .map(|_| ())
        }
    }
}

/// RFC names for the cipher suites the profile tables and JA3 strings use.
/// GREASE and unrecognized ids are skipped; BoringSSL accepts the RFC
/// spelling in `set_cipher_list`.
fn cipher_names(ids: &[u16]) -> Vec<&'static str> {
    ids.iter()
        .filter_map(|&id| match id {
            0x1301 => Some("TLS_AES_128_GCM_SHA256"),
            0x1302 => Some("TLS_AES_256_GCM_SHA384"),
            0x1303 => Some("TLS_CHACHA20_POLY1305_SHA256"),
            0xc02b => Some("TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256"),
            0xc02f => Some("TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256"),
            0xc02c => Some("TLS_ECDHE_ECDSA_WITH_AES_256_GCM_SHA384"),
            0xc030 => Some("TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384"),
            0xcca9 => Some("TLS_ECDHE_ECDSA_WITH_CHACHA20_POLY1305_SHA256"),
            0xcca8 => Some("TLS_ECDHE_RSA_WITH_CHACHA20_POLY1305_SHA256"),
            0xc009 => Some("TLS_ECDHE_ECDSA_WITH_AES_128_CBC_SHA"),
            0xc00a => Some("TLS_ECDHE_ECDSA_WITH_AES_256_CBC_SHA"),
            0xc013 => Some("TLS_ECDHE_RSA_WITH_AES_128_CBC_SHA"),
            0xc014 => Some("TLS_ECDHE_RSA_WITH_AES_256_CBC_SHA"),
            0x009c => Some("TLS_RSA_WITH_AES_128_GCM_SHA256"),
            0x009d => Some("TLS_RSA_WITH_AES_256_GCM_SHA384"),
            0x002f => Some("TLS_RSA_WITH_AES_128_CBC_SHA"),
            0x0035 => Some("TLS_RSA_WITH_AES_256_CBC_SHA"),
            0x000a => Some("TLS_RSA_WITH_3DES_EDE_CBC_SHA"),
            _ => {
                if !is_grease(id) {
                    log::debug!("unknown cipher suite id {id:#06x}, skipped");
                }
                None
            }
        })
        .collect()
}

fn curve_list(ids: &[u16]) -> Vec<SslCurve> {
    ids.iter()
        .filter_map(|&id| match id {
            23 => Some(SslCurve::SECP256R1),
            24 => Some(SslCurve::SECP384R1),
            25 => Some(SslCurve::SECP521R1),
            29 => Some(SslCurve::X25519),
            0x6399 => Some(SslCurve::X25519_KYBER768_DRAFT00),
            0x11ec => Some(SslCurve::X25519_MLKEM768),
            _ => {
                if !is_grease(id) {
                    log::debug!("unknown curve id {id}, skipped");
                }
                None
            }
        })
        .collect()
}

fn sigalg_names(ids: &[u16]) -> Vec<&'static str> {
    ids.iter()
        .filter_map(|&id| match id {
            0x0403 => Some("ecdsa_secp256r1_sha256"),
            0x0503 => Some("ecdsa_secp384r1_sha384"),
            0x0603 => Some("ecdsa_secp521r1_sha512"),
            0x0804 => Some("rsa_pss_rsae_sha256"),
            0x0805 => Some("rsa_pss_rsae_sha384"),
            0x0806 => Some("rsa_pss_rsae_sha512"),
            0x0401 => Some("rsa_pkcs1_sha256"),
            0x0501 => Some("rsa_pkcs1_sha384"),
            0x0601 => Some("rsa_pkcs1_sha512"),
            0x0201 => Some("rsa_pkcs1_sha1"),
            0x0203 => Some("ecdsa_sha1"),
            _ => {
                log::debug!("unknown signature algorithm id {id:#06x}, skipped");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_ids_are_skipped_not_fatal() {
        assert!(cipher_names(&[0x1301, 0xffff]).len() == 1);
        assert!(curve_list(&[29, 9999]).len() == 1);
        assert!(sigalg_names(&[0x0403, 0x7777]).len() == 1);
    }

    #[test]
    fn grease_ids_do_not_log_or_map() {
        assert!(cipher_names(&[0x0a0a]).is_empty());
        assert!(curve_list(&[0x2a2a]).is_empty());
    }

    // `EXT_APPLICATION_SETTINGS` rides through `configure_application_settings`,
    // not the builder; keep the constant referenced so the wire id stays in
    // one place.
    #[test]
    fn alps_extension_id() {
        assert_eq!(EXT_APPLICATION_SETTINGS, 17513);
    }
}
