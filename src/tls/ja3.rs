//! JA3 fingerprint strings.
//!
//! A JA3 string is `TLSVersion,Ciphers,Extensions,Curves,PointFormats` with
//! `-`-separated decimal fields. Parsing materializes a full
//! [`ClientHelloSpec`] with browser-typical payloads for extensions the
//! string only names by id.

use super::hello::{
    ClientHelloSpec, KeyShareEntry, TlsExtension, EXT_APPLICATION_SETTINGS, GREASE_PLACEHOLDER,
    VERSION_TLS12, VERSION_TLS13, is_grease,
};

/// Parses a JA3 string into a [`ClientHelloSpec`].
///
/// A leading GREASE placeholder is injected into the cipher and curve lists
/// when the string does not carry one, matching how browsers that GREASE
/// always lead with it.
pub fn spec_from_ja3(ja3: &str) -> crate::Result<ClientHelloSpec> {
    let mut fields = ja3.split(',');
    let (version, ciphers, extensions, curves, points) = match (
        fields.next(),
        fields.next(),
        fields.next(),
        fields.next(),
        fields.next(),
    ) {
        (Some(a), Some(b), Some(c), Some(d), Some(e)) if fields.next().is_none() => {
            (a, b, c, d, e)
        }
        _ => return Err(crate::error::Error::builder("ja3 must have 5 fields")),
    };

    let version: u16 = parse_num(version)?;
    if version != VERSION_TLS12 && version != VERSION_TLS13 && version != 0x0301 && version != 0x0302
    {
        return Err(crate::error::Error::builder("unknown ja3 tls version"));
    }

    let mut cipher_suites = parse_list(ciphers)?;
    if cipher_suites.is_empty() {
        return Err(crate::error::Error::builder("ja3 cipher list is empty"));
    }
    if !cipher_suites.iter().any(|&c| is_grease(c)) {
        cipher_suites.insert(0, GREASE_PLACEHOLDER);
    }

    let mut curve_ids = parse_list(curves)?;
    if !curve_ids.iter().any(|&c| is_grease(c)) {
        curve_ids.insert(0, GREASE_PLACEHOLDER);
    }

    let point_formats: Vec<u8> = if points.is_empty() {
        vec![0]
    } else {
        points
            .split('-')
            .map(|p| p.parse::<u8>().map_err(|_| crate::error::Error::builder("ja3 point format")))
            .collect::<crate::Result<_>>()?
    };

    let ext_ids = parse_list(extensions)?;

    // JA3 carries the legacy version field; the presence of
    // supported_versions (43) is what marks a TLS 1.3 hello.
    let max_version = if ext_ids.contains(&43) {
        VERSION_TLS13
    } else {
        version
    };
    let mut spec = ClientHelloSpec {
        tls_vers_min: VERSION_TLS12.min(version),
        tls_vers_max: max_version,
        cipher_suites,
        compression_methods: vec![0],
        extensions: Vec::new(),
    };

    for id in ext_ids {
        spec.extensions.push(materialize(id, &curve_ids, &point_formats, max_version));
    }

    Ok(spec)
}

/// Renders the JA3 string of a spec. GREASE values are excluded from every
/// field, per the JA3 rules.
pub fn ja3_of(spec: &ClientHelloSpec) -> String {
    let join = |ids: &mut dyn Iterator<Item = u16>| {
        ids.filter(|&id| !is_grease(id))
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join("-")
    };

    let ciphers = join(&mut spec.cipher_suites.iter().copied());
    let extensions = join(&mut spec.extensions.iter().map(TlsExtension::id));

    let curves = match spec.extension(10) {
        Some(TlsExtension::SupportedCurves(curves)) => join(&mut curves.iter().copied()),
        _ => String::new(),
    };
    let points = match spec.extension(11) {
        Some(TlsExtension::SupportedPoints(points)) => points
            .iter()
            .map(|p| p.to_string())
            .collect::<Vec<_>>()
            .join("-"),
        _ => String::new(),
    };

    // JA3 records the hello's legacy version field, frozen at TLS 1.2 for
    // modern stacks.
    let version = spec.tls_vers_max.min(VERSION_TLS12);
    format!("{version},{ciphers},{extensions},{curves},{points}")
}

fn parse_num(raw: &str) -> crate::Result<u16> {
    raw.trim()
        .parse::<u16>()
        .map_err(|_| crate::error::Error::builder("ja3 numeric field"))
}

fn parse_list(raw: &str) -> crate::Result<Vec<u16>> {
    if raw.is_empty() {
        return Ok(Vec::new());
    }
    raw.split('-').map(parse_num).collect()
}

/// The switch table of recognized extension constructors. Ids the table does
/// not know become empty [`TlsExtension::Generic`] slots.
fn materialize(id: u16, curves: &[u16], points: &[u8], max_version: u16) -> TlsExtension {
    match id {
        _ if is_grease(id) => TlsExtension::Grease { payload_len: 0 },
        0 => TlsExtension::ServerName,
        5 => TlsExtension::StatusRequest,
        10 => TlsExtension::SupportedCurves(curves.to_vec()),
        11 => TlsExtension::SupportedPoints(points.to_vec()),
        13 => TlsExtension::SignatureAlgorithms(vec![
            0x0403, 0x0804, 0x0401, 0x0503, 0x0805, 0x0501, 0x0806, 0x0601,
        ]),
        16 => TlsExtension::Alpn(vec!["h2".into(), "http/1.1".into()]),
        18 => TlsExtension::Sct,
        21 => TlsExtension::Padding,
        23 => TlsExtension::ExtendedMasterSecret,
        27 => TlsExtension::CompressCertificate(vec![2]),
        28 => TlsExtension::RecordSizeLimit(0x4001),
        35 => TlsExtension::SessionTicket,
        41 => TlsExtension::PreSharedKey,
        43 => {
            let mut versions = vec![GREASE_PLACEHOLDER];
            if max_version >= VERSION_TLS13 {
                versions.push(VERSION_TLS13);
            }
            versions.push(VERSION_TLS12);
            TlsExtension::SupportedVersions(versions)
        }
        45 => TlsExtension::PskKeyExchangeModes(vec![1]),
        51 => {
            let mut shares = vec![KeyShareEntry {
                group: GREASE_PLACEHOLDER,
                data: Vec::new(),
            }];
            if let Some(&group) = curves.iter().find(|&&c| !is_grease(c)) {
                shares.push(KeyShareEntry {
                    group,
                    data: Vec::new(),
                });
            }
            TlsExtension::KeyShare(shares)
        }
        EXT_APPLICATION_SETTINGS => TlsExtension::ApplicationSettings(vec!["h2".into()]),
        65281 => TlsExtension::RenegotiationInfo(0),
        other => TlsExtension::Generic {
            id: other,
            data: Vec::new(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHROME_JA3: &str = "771,4865-4866-4867-49195-49199-49196-49200-52393-52392-49171-49172-156-157-47-53,0-23-65281-10-11-35-16-5-13-18-51-45-43-27-17513,29-23-24,0";

    #[test]
    fn parses_chrome_ja3() {
        let spec = spec_from_ja3(CHROME_JA3).unwrap();

        assert_eq!(spec.tls_vers_max, VERSION_TLS13);
        // Leading GREASE injected into ciphers and curves.
        assert_eq!(spec.cipher_suites[0], GREASE_PLACEHOLDER);
        assert_eq!(spec.cipher_suites[1], 4865);
        match spec.extension(10) {
            Some(TlsExtension::SupportedCurves(curves)) => {
                assert_eq!(curves[0], GREASE_PLACEHOLDER);
                assert_eq!(&curves[1..], &[29, 23, 24]);
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert_eq!(spec.extensions.len(), 15);
        assert_eq!(spec.extensions[0].id(), 0);
        assert!(spec.extension(EXT_APPLICATION_SETTINGS).is_some());
    }

    #[test]
    fn ja3_round_trips_modulo_grease() {
        let spec = spec_from_ja3(CHROME_JA3).unwrap();
        assert_eq!(ja3_of(&spec), CHROME_JA3);
    }

    #[test]
    fn marshal_parse_preserves_ja3() {
        let spec = spec_from_ja3(CHROME_JA3).unwrap();
        let parsed = ClientHelloSpec::parse(&spec.marshal("example.com")).unwrap();
        assert_eq!(ja3_of(&parsed), CHROME_JA3);
    }

    #[test]
    fn unknown_extension_becomes_generic() {
        let spec = spec_from_ja3("771,4865,0-62000,29,0").unwrap();
        match spec.extension(62000) {
            Some(TlsExtension::Generic { id, data }) => {
                assert_eq!(*id, 62000);
                assert!(data.is_empty());
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn rejects_malformed_strings() {
        assert!(spec_from_ja3("771,4865,0,29").is_err());
        assert!(spec_from_ja3("9999,4865,0,29,0").is_err());
        assert!(spec_from_ja3("771,,0,29,0").is_err());
        assert!(spec_from_ja3("771,banana,0,29,0").is_err());
    }
}
