//! A deterministic description of a TLS ClientHello.
//!
//! The spec models the full extension list in order, including GREASE
//! placeholders. [`ClientHelloSpec::marshal`] produces the hello body bytes
//! and [`ClientHelloSpec::parse`] recovers a spec from them; the two agree
//! modulo GREASE value randomization and per-hello randoms.

use crate::util::fast_random;

/// TLS 1.0 protocol version.
pub const VERSION_TLS10: u16 = 0x0301;
/// TLS 1.1 protocol version.
pub const VERSION_TLS11: u16 = 0x0302;
/// TLS 1.2 protocol version.
pub const VERSION_TLS12: u16 = 0x0303;
/// TLS 1.3 protocol version.
pub const VERSION_TLS13: u16 = 0x0304;

/// The reserved GREASE values (RFC 8701). The low and high byte of each value
/// are equal and end in 0xA.
pub const GREASE_VALUES: [u16; 16] = [
    0x0a0a, 0x1a1a, 0x2a2a, 0x3a3a, 0x4a4a, 0x5a5a, 0x6a6a, 0x7a7a, 0x8a8a, 0x9a9a, 0xaaaa,
    0xbaba, 0xcaca, 0xdada, 0xeaea, 0xfafa,
];

/// Placeholder value substituted for a randomly-chosen GREASE value at
/// marshal time.
pub const GREASE_PLACEHOLDER: u16 = 0x0a0a;

/// Returns true if `v` is one of the sixteen reserved GREASE values.
pub fn is_grease(v: u16) -> bool {
    v & 0x0f0f == 0x0a0a && v >> 8 == v & 0xff
}

fn pick_grease(seed: usize) -> u16 {
    GREASE_VALUES[(fast_random() as usize + seed) % GREASE_VALUES.len()]
}

/// A key share entry offered in the `key_share` extension.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyShareEntry {
    /// Named group identifier; may be [`GREASE_PLACEHOLDER`].
    pub group: u16,
    /// Raw key exchange data. Empty data marshals as a single zero byte the
    /// way browsers pad GREASE key shares.
    pub data: Vec<u8>,
}

/// One extension slot in a ClientHello, in wire order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TlsExtension {
    /// `server_name` (0); the name itself is supplied at handshake time.
    ServerName,
    /// `status_request` (5).
    StatusRequest,
    /// `supported_groups` (10); entries may be GREASE placeholders.
    SupportedCurves(Vec<u16>),
    /// `ec_point_formats` (11).
    SupportedPoints(Vec<u8>),
    /// `signature_algorithms` (13).
    SignatureAlgorithms(Vec<u16>),
    /// `application_layer_protocol_negotiation` (16).
    Alpn(Vec<String>),
    /// `signed_certificate_timestamp` (18).
    Sct,
    /// `padding` (21), zero-filled to the target hello length.
    Padding,
    /// `extended_master_secret` (23).
    ExtendedMasterSecret,
    /// `compress_certificate` (27) with its algorithm list.
    CompressCertificate(Vec<u16>),
    /// `record_size_limit` (28).
    RecordSizeLimit(u16),
    /// `session_ticket` (35), empty on a fresh connection.
    SessionTicket,
    /// `pre_shared_key` (41); must be last on the wire.
    PreSharedKey,
    /// `supported_versions` (43); entries may be GREASE placeholders.
    SupportedVersions(Vec<u16>),
    /// `psk_key_exchange_modes` (45).
    PskKeyExchangeModes(Vec<u8>),
    /// `key_share` (51).
    KeyShare(Vec<KeyShareEntry>),
    /// `application_settings` (ALPS, 17513).
    ApplicationSettings(Vec<String>),
    /// `renegotiation_info` (65281).
    RenegotiationInfo(u8),
    /// A GREASE extension slot at a fixed position in the list.
    Grease {
        /// Payload length; browsers use 0 for the leading slot and 1 for the
        /// trailing one.
        payload_len: usize,
    },
    /// Any extension the model does not know by shape.
    Generic {
        /// Extension identifier.
        id: u16,
        /// Raw extension payload.
        data: Vec<u8>,
    },
}

/// `application_settings` codepoint used by Chrome (ALPS draft).
pub const EXT_APPLICATION_SETTINGS: u16 = 17513;

impl TlsExtension {
    /// The extension's wire identifier. GREASE slots report the placeholder.
    pub fn id(&self) -> u16 {
        match self {
            TlsExtension::ServerName => 0,
            TlsExtension::StatusRequest => 5,
            TlsExtension::SupportedCurves(_) => 10,
            TlsExtension::SupportedPoints(_) => 11,
            TlsExtension::SignatureAlgorithms(_) => 13,
            TlsExtension::Alpn(_) => 16,
            TlsExtension::Sct => 18,
            TlsExtension::Padding => 21,
            TlsExtension::ExtendedMasterSecret => 23,
            TlsExtension::CompressCertificate(_) => 27,
            TlsExtension::RecordSizeLimit(_) => 28,
            TlsExtension::SessionTicket => 35,
            TlsExtension::PreSharedKey => 41,
            TlsExtension::SupportedVersions(_) => 43,
            TlsExtension::PskKeyExchangeModes(_) => 45,
            TlsExtension::KeyShare(_) => 51,
            TlsExtension::ApplicationSettings(_) => EXT_APPLICATION_SETTINGS,
            TlsExtension::RenegotiationInfo(_) => 65281,
            TlsExtension::Grease { .. } => GREASE_PLACEHOLDER,
            TlsExtension::Generic { id, .. } => *id,
        }
    }
}

/// Ordered description of a ClientHello.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClientHelloSpec {
    /// Lowest protocol version offered.
    pub tls_vers_min: u16,
    /// Highest protocol version offered.
    pub tls_vers_max: u16,
    /// Cipher suites in offer order; may contain GREASE placeholders.
    pub cipher_suites: Vec<u16>,
    /// Compression methods; browsers send only null compression.
    pub compression_methods: Vec<u8>,
    /// Extensions in wire order.
    pub extensions: Vec<TlsExtension>,
}

impl ClientHelloSpec {
    /// Looks up the first extension with the given wire id.
    pub fn extension(&self, id: u16) -> Option<&TlsExtension> {
        self.extensions.iter().find(|ext| ext.id() == id)
    }

    /// True when the spec offers what TLS session resumption requires:
    /// all of `session_ticket`, `psk_key_exchange_modes` and `pre_shared_key`
    /// for TLS 1.3, or a `session_ticket` extension alone for TLS 1.2.
    pub fn offers_resumption(&self) -> bool {
        let ticket = self.extension(35).is_some();
        if self.tls_vers_max >= VERSION_TLS13 {
            ticket && self.extension(45).is_some() && self.extension(41).is_some()
        } else {
            ticket
        }
    }

    /// Serializes the hello body (everything after the handshake header) for
    /// the given SNI host name.
    ///
    /// A `pre_shared_key` extension is always emitted last regardless of its
    /// position in [`extensions`](Self::extensions).
    pub fn marshal(&self, server_name: &str) -> Vec<u8> {
        let mut out = Vec::with_capacity(512);

        // legacy_version is frozen at TLS 1.2; the real version rides in
        // supported_versions.
        put_u16(&mut out, self.tls_vers_max.min(VERSION_TLS12));

        // random
        for _ in 0..4 {
            out.extend_from_slice(&fast_random().to_be_bytes());
        }

        // legacy_session_id
        out.push(32);
        for _ in 0..4 {
            out.extend_from_slice(&fast_random().to_be_bytes());
        }

        // cipher_suites
        put_u16(&mut out, (self.cipher_suites.len() * 2) as u16);
        for (i, &suite) in self.cipher_suites.iter().enumerate() {
            let suite = if is_grease(suite) { pick_grease(i) } else { suite };
            put_u16(&mut out, suite);
        }

        // compression_methods
        out.push(self.compression_methods.len() as u8);
        out.extend_from_slice(&self.compression_methods);

        // extensions, PSK forced last
        let mut body = Vec::with_capacity(256);
        let mut psk = None;
        for (i, ext) in self.extensions.iter().enumerate() {
            if matches!(ext, TlsExtension::PreSharedKey) {
                psk = Some(ext);
                continue;
            }
            marshal_extension(&mut body, ext, i, server_name);
        }
        if let Some(ext) = psk {
            marshal_extension(&mut body, ext, self.extensions.len(), server_name);
        }

        put_u16(&mut out, body.len() as u16);
        out.extend_from_slice(&body);
        out
    }

    /// Parses a hello body produced by [`marshal`](Self::marshal) (or any
    /// syntactically well-formed ClientHello body) back into a spec.
    ///
    /// GREASE values fold back into placeholders, so a marshal/parse
    /// round-trip is equality modulo randomization.
    pub fn parse(bytes: &[u8]) -> Result<ClientHelloSpec, HelloParseError> {
        let mut cur = Cursor { buf: bytes, pos: 0 };

        let legacy_version = cur.u16()?;
        cur.skip(32)?; // random
        let session_id_len = cur.u8()? as usize;
        cur.skip(session_id_len)?;

        let suites_len = cur.u16()? as usize;
        if suites_len % 2 != 0 {
            return Err(HelloParseError::Malformed("cipher suite length"));
        }
        let mut cipher_suites = Vec::with_capacity(suites_len / 2);
        for _ in 0..suites_len / 2 {
            let suite = cur.u16()?;
            cipher_suites.push(if is_grease(suite) { GREASE_PLACEHOLDER } else { suite });
        }

        let compression_len = cur.u8()? as usize;
        let compression_methods = cur.take(compression_len)?.to_vec();

        let mut spec = ClientHelloSpec {
            tls_vers_min: legacy_version,
            tls_vers_max: legacy_version,
            cipher_suites,
            compression_methods,
            extensions: Vec::new(),
        };

        let ext_len = cur.u16()? as usize;
        let ext_bytes = cur.take(ext_len)?;
        let mut ext_cur = Cursor { buf: ext_bytes, pos: 0 };
        while !ext_cur.is_empty() {
            let id = ext_cur.u16()?;
            let len = ext_cur.u16()? as usize;
            let data = ext_cur.take(len)?;
            spec.extensions.push(parse_extension(id, data)?);
        }

        // Recover the version range from supported_versions when present.
        if let Some(TlsExtension::SupportedVersions(versions)) = spec.extension(43) {
            let real: Vec<u16> = versions.iter().copied().filter(|v| !is_grease(*v)).collect();
            if let (Some(max), Some(min)) = (real.iter().max(), real.iter().min()) {
                spec.tls_vers_max = *max;
                spec.tls_vers_min = *min;
            }
        }

        Ok(spec)
    }
}

/// Error produced when a ClientHello body cannot be parsed.
#[derive(Debug, PartialEq, Eq)]
pub enum HelloParseError {
    /// The input ended before a length-prefixed field completed.
    Truncated,
    /// A field carried a structurally impossible value.
    Malformed(&'static str),
}

impl std::fmt::Display for HelloParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HelloParseError::Truncated => f.write_str("client hello truncated"),
            HelloParseError::Malformed(what) => write!(f, "malformed client hello: {what}"),
        }
    }
}

impl std::error::Error for HelloParseError {}

fn put_u16(out: &mut Vec<u8>, v: u16) {
    out.extend_from_slice(&v.to_be_bytes());
}

fn marshal_extension(out: &mut Vec<u8>, ext: &TlsExtension, slot: usize, server_name: &str) {
    let id = match ext {
        TlsExtension::Grease { .. } => pick_grease(slot),
        other => other.id(),
    };
    put_u16(out, id);

    let mut data = Vec::new();
    match ext {
        TlsExtension::ServerName => {
            // server_name_list with one host_name entry
            let name = server_name.as_bytes();
            put_u16(&mut data, (name.len() + 3) as u16);
            data.push(0); // host_name
            put_u16(&mut data, name.len() as u16);
            data.extend_from_slice(name);
        }
        TlsExtension::StatusRequest => {
            data.push(1); // ocsp
            put_u16(&mut data, 0);
            put_u16(&mut data, 0);
        }
        TlsExtension::SupportedCurves(curves) => {
            put_u16(&mut data, (curves.len() * 2) as u16);
            for (i, &curve) in curves.iter().enumerate() {
                let curve = if is_grease(curve) { pick_grease(slot + i) } else { curve };
                put_u16(&mut data, curve);
            }
        }
        TlsExtension::SupportedPoints(points) => {
            data.push(points.len() as u8);
            data.extend_from_slice(points);
        }
        TlsExtension::SignatureAlgorithms(algs) => {
            put_u16(&mut data, (algs.len() * 2) as u16);
            for &alg in algs {
                put_u16(&mut data, alg);
            }
        }
        TlsExtension::Alpn(protos) => {
            let mut list = Vec::new();
            for proto in protos {
                list.push(proto.len() as u8);
                list.extend_from_slice(proto.as_bytes());
            }
            put_u16(&mut data, list.len() as u16);
            data.extend_from_slice(&list);
        }
        TlsExtension::Sct | TlsExtension::SessionTicket | TlsExtension::ExtendedMasterSecret => {}
        TlsExtension::Padding => {
            // Fixed-size filler; real stacks size this to round the hello to
            // 512 bytes.
            data.resize(16, 0);
        }
        TlsExtension::CompressCertificate(algs) => {
            data.push((algs.len() * 2) as u8);
            for &alg in algs {
                put_u16(&mut data, alg);
            }
        }
        TlsExtension::RecordSizeLimit(limit) => {
            put_u16(&mut data, *limit);
        }
        TlsExtension::PreSharedKey => {
            // Placeholder body: one zero-length identity with obfuscated age
            // and a 32-byte binder. A live stack overwrites this.
            put_u16(&mut data, 6);
            put_u16(&mut data, 0);
            data.extend_from_slice(&[0; 4]);
            put_u16(&mut data, 33);
            data.push(32);
            data.extend_from_slice(&[0; 32]);
        }
        TlsExtension::SupportedVersions(versions) => {
            data.push((versions.len() * 2) as u8);
            for (i, &version) in versions.iter().enumerate() {
                let version = if is_grease(version) { pick_grease(slot + i) } else { version };
                put_u16(&mut data, version);
            }
        }
        TlsExtension::PskKeyExchangeModes(modes) => {
            data.push(modes.len() as u8);
            data.extend_from_slice(modes);
        }
        TlsExtension::KeyShare(shares) => {
            let mut list = Vec::new();
            for (i, share) in shares.iter().enumerate() {
                let group = if is_grease(share.group) { pick_grease(slot + i) } else { share.group };
                put_u16(&mut list, group);
                if share.data.is_empty() {
                    put_u16(&mut list, 1);
                    list.push(0);
                } else {
                    put_u16(&mut list, share.data.len() as u16);
                    list.extend_from_slice(&share.data);
                }
            }
            put_u16(&mut data, list.len() as u16);
            data.extend_from_slice(&list);
        }
        TlsExtension::ApplicationSettings(protos) => {
            let mut list = Vec::new();
            for proto in protos {
                list.push(proto.len() as u8);
                list.extend_from_slice(proto.as_bytes());
            }
            put_u16(&mut data, list.len() as u16);
            data.extend_from_slice(&list);
        }
        TlsExtension::RenegotiationInfo(_) => {
            // Initial handshake: empty renegotiated_connection field.
            data.push(0);
        }
        TlsExtension::Grease { payload_len } => {
            data.resize(*payload_len, 0);
        }
        TlsExtension::Generic { data: raw, .. } => {
            data.extend_from_slice(raw);
        }
    }

    put_u16(out, data.len() as u16);
    out.extend_from_slice(&data);
}

fn parse_extension(id: u16, data: &[u8]) -> Result<TlsExtension, HelloParseError> {
    let mut cur = Cursor { buf: data, pos: 0 };
    let ext = match id {
        _ if is_grease(id) => TlsExtension::Grease {
            payload_len: data.len(),
        },
        0 => TlsExtension::ServerName,
        5 => TlsExtension::StatusRequest,
        10 => {
            let len = cur.u16()? as usize;
            let mut curves = Vec::with_capacity(len / 2);
            for _ in 0..len / 2 {
                let curve = cur.u16()?;
                curves.push(if is_grease(curve) { GREASE_PLACEHOLDER } else { curve });
            }
            TlsExtension::SupportedCurves(curves)
        }
        11 => {
            let len = cur.u8()? as usize;
            TlsExtension::SupportedPoints(cur.take(len)?.to_vec())
        }
        13 => {
            let len = cur.u16()? as usize;
            let mut algs = Vec::with_capacity(len / 2);
            for _ in 0..len / 2 {
                algs.push(cur.u16()?);
            }
            TlsExtension::SignatureAlgorithms(algs)
        }
        16 => {
            let len = cur.u16()? as usize;
            let list = cur.take(len)?;
            TlsExtension::Alpn(parse_proto_list(list)?)
        }
        18 => TlsExtension::Sct,
        21 => TlsExtension::Padding,
        23 => TlsExtension::ExtendedMasterSecret,
        27 => {
            let len = cur.u8()? as usize;
            let mut algs = Vec::with_capacity(len / 2);
            for _ in 0..len / 2 {
                algs.push(cur.u16()?);
            }
            TlsExtension::CompressCertificate(algs)
        }
        28 => TlsExtension::RecordSizeLimit(cur.u16()?),
        35 => TlsExtension::SessionTicket,
        41 => TlsExtension::PreSharedKey,
        43 => {
            let len = cur.u8()? as usize;
            let mut versions = Vec::with_capacity(len / 2);
            for _ in 0..len / 2 {
                let version = cur.u16()?;
                versions.push(if is_grease(version) { GREASE_PLACEHOLDER } else { version });
            }
            TlsExtension::SupportedVersions(versions)
        }
        45 => {
            let len = cur.u8()? as usize;
            TlsExtension::PskKeyExchangeModes(cur.take(len)?.to_vec())
        }
        51 => {
            let len = cur.u16()? as usize;
            let list = cur.take(len)?;
            let mut list_cur = Cursor { buf: list, pos: 0 };
            let mut shares = Vec::new();
            while !list_cur.is_empty() {
                let group = list_cur.u16()?;
                let data_len = list_cur.u16()? as usize;
                let data = list_cur.take(data_len)?;
                let grease = is_grease(group);
                shares.push(KeyShareEntry {
                    group: if grease { GREASE_PLACEHOLDER } else { group },
                    // Single zero byte is the empty-share padding form.
                    data: if data == [0] { Vec::new() } else { data.to_vec() },
                });
            }
            TlsExtension::KeyShare(shares)
        }
        EXT_APPLICATION_SETTINGS => {
            let len = cur.u16()? as usize;
            let list = cur.take(len)?;
            TlsExtension::ApplicationSettings(parse_proto_list(list)?)
        }
        65281 => TlsExtension::RenegotiationInfo(cur.u8().unwrap_or(0)),
        _ => TlsExtension::Generic {
            id,
            data: data.to_vec(),
        },
    };
    Ok(ext)
}

fn parse_proto_list(list: &[u8]) -> Result<Vec<String>, HelloParseError> {
    let mut cur = Cursor { buf: list, pos: 0 };
    let mut protos = Vec::new();
    while !cur.is_empty() {
        let len = cur.u8()? as usize;
        let raw = cur.take(len)?;
        protos.push(
            String::from_utf8(raw.to_vec())
                .map_err(|_| HelloParseError::Malformed("alpn protocol name"))?,
        );
    }
    Ok(protos)
}

struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn is_empty(&self) -> bool {
        self.pos >= self.buf.len()
    }

    fn u8(&mut self) -> Result<u8, HelloParseError> {
        let b = *self.buf.get(self.pos).ok_or(HelloParseError::Truncated)?;
        self.pos += 1;
        Ok(b)
    }

    fn u16(&mut self) -> Result<u16, HelloParseError> {
        let hi = self.u8()? as u16;
        let lo = self.u8()? as u16;
        Ok(hi << 8 | lo)
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], HelloParseError> {
        if self.pos + n > self.buf.len() {
            return Err(HelloParseError::Truncated);
        }
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    fn skip(&mut self, n: usize) -> Result<(), HelloParseError> {
        self.take(n).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chrome_like_spec() -> ClientHelloSpec {
        ClientHelloSpec {
            tls_vers_min: VERSION_TLS12,
            tls_vers_max: VERSION_TLS13,
            cipher_suites: vec![
                GREASE_PLACEHOLDER,
                0x1301,
                0x1302,
                0x1303,
                0xc02b,
                0xc02f,
                0xc02c,
                0xc030,
                0xcca9,
                0xcca8,
            ],
            compression_methods: vec![0],
            extensions: vec![
                TlsExtension::Grease { payload_len: 0 },
                TlsExtension::ServerName,
                TlsExtension::ExtendedMasterSecret,
                TlsExtension::RenegotiationInfo(0),
                TlsExtension::SupportedCurves(vec![GREASE_PLACEHOLDER, 29, 23, 24]),
                TlsExtension::SupportedPoints(vec![0]),
                TlsExtension::SessionTicket,
                TlsExtension::Alpn(vec!["h2".into(), "http/1.1".into()]),
                TlsExtension::StatusRequest,
                TlsExtension::SignatureAlgorithms(vec![
                    0x0403, 0x0804, 0x0401, 0x0503, 0x0805, 0x0501, 0x0806, 0x0601,
                ]),
                TlsExtension::Sct,
                TlsExtension::KeyShare(vec![
                    KeyShareEntry {
                        group: GREASE_PLACEHOLDER,
                        data: Vec::new(),
                    },
                    KeyShareEntry {
                        group: 29,
                        data: vec![0xab; 32],
                    },
                ]),
                TlsExtension::PskKeyExchangeModes(vec![1]),
                TlsExtension::SupportedVersions(vec![
                    GREASE_PLACEHOLDER,
                    VERSION_TLS13,
                    VERSION_TLS12,
                ]),
                TlsExtension::CompressCertificate(vec![2]),
                TlsExtension::ApplicationSettings(vec!["h2".into()]),
                TlsExtension::Grease { payload_len: 1 },
            ],
        }
    }

    #[test]
    fn marshal_parse_round_trip() {
        let spec = chrome_like_spec();
        let bytes = spec.marshal("example.com");
        let parsed = ClientHelloSpec::parse(&bytes).unwrap();

        assert_eq!(parsed.tls_vers_max, VERSION_TLS13);
        assert_eq!(parsed.tls_vers_min, VERSION_TLS12);
        assert_eq!(parsed.cipher_suites, spec.cipher_suites);
        assert_eq!(parsed.compression_methods, spec.compression_methods);
        assert_eq!(parsed.extensions.len(), spec.extensions.len());
        for (got, want) in parsed.extensions.iter().zip(&spec.extensions) {
            assert_eq!(got.id(), want.id(), "extension order drifted");
        }
        // Typed payloads survive except for per-hello randomized key data.
        assert_eq!(parsed.extension(16), spec.extension(16));
        assert_eq!(parsed.extension(10), spec.extension(10));
        assert_eq!(parsed.extension(13), spec.extension(13));
        assert_eq!(parsed.extension(43), spec.extension(43));
    }

    #[test]
    fn psk_marshals_last() {
        let mut spec = chrome_like_spec();
        // Permute PSK into the middle; the wire must still end with it.
        spec.extensions.insert(4, TlsExtension::PreSharedKey);
        let bytes = spec.marshal("example.com");
        let parsed = ClientHelloSpec::parse(&bytes).unwrap();
        assert_eq!(parsed.extensions.last().map(TlsExtension::id), Some(41));
    }

    #[test]
    fn grease_values_randomize_but_fold_back() {
        let spec = chrome_like_spec();
        let a = ClientHelloSpec::parse(&spec.marshal("example.com")).unwrap();
        let b = ClientHelloSpec::parse(&spec.marshal("example.com")).unwrap();
        assert_eq!(a.cipher_suites, b.cipher_suites);
        assert_eq!(a.cipher_suites[0], GREASE_PLACEHOLDER);
        assert!(matches!(a.extensions[0], TlsExtension::Grease { .. }));
    }

    #[test]
    fn grease_predicate() {
        for v in GREASE_VALUES {
            assert!(is_grease(v));
        }
        assert!(!is_grease(0x1301));
        assert!(!is_grease(0x0a1a));
    }

    #[test]
    fn resumption_gating() {
        let mut spec = chrome_like_spec();
        // TLS 1.3 with ticket + modes but no PSK extension: not resumable.
        assert!(!spec.offers_resumption());
        spec.extensions.push(TlsExtension::PreSharedKey);
        assert!(spec.offers_resumption());

        // TLS 1.2: the ticket alone suffices.
        let mut spec12 = chrome_like_spec();
        spec12.tls_vers_max = VERSION_TLS12;
        assert!(spec12.offers_resumption());
        spec12.extensions.retain(|e| e.id() != 35);
        assert!(!spec12.offers_resumption());
    }

    #[test]
    fn truncated_input_is_rejected() {
        let spec = chrome_like_spec();
        let bytes = spec.marshal("example.com");
        assert_eq!(
            ClientHelloSpec::parse(&bytes[..bytes.len() - 3]).unwrap_err(),
            HelloParseError::Truncated
        );
    }
}
