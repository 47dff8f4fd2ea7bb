use http::header::{Entry, HeaderMap, HeaderValue, OccupiedEntry};

/// xor-shift based pseudo-random number generator, seeded once per process.
///
/// Not cryptographically secure; used for GREASE picks, multipart boundaries
/// and rotating-proxy selection.
pub(crate) fn fast_random() -> u64 {
    use once_cell::sync::Lazy;
    use std::cell::Cell;
    use std::collections::hash_map::RandomState;
    use std::hash::{BuildHasher, Hasher};

    thread_local! {
        static RNG: Cell<u64> = Cell::new(seed());
    }

    fn seed() -> u64 {
        static SEED: Lazy<RandomState> = Lazy::new(RandomState::new);
        let mut hasher = SEED.build_hasher();
        hasher.write_usize(0);
        hasher.finish()
    }

    RNG.with(|rng| {
        let mut n = rng.get();
        debug_assert_ne!(n, 0);
        n ^= n << 13;
        n ^= n >> 7;
        n ^= n << 17;
        rng.set(n);
        n
    })
}

pub(crate) fn basic_auth<U, P>(username: U, password: Option<P>) -> HeaderValue
where
    U: std::fmt::Display,
    P: std::fmt::Display,
{
    use base64::prelude::BASE64_STANDARD;
    use base64::write::EncoderWriter;
    use std::io::Write;

    let mut buf = b"Basic ".to_vec();
    {
        let mut encoder = EncoderWriter::new(&mut buf, &BASE64_STANDARD);
        let _ = write!(encoder, "{username}:");
        if let Some(password) = password {
            let _ = write!(encoder, "{password}");
        }
    }
    let mut header = HeaderValue::from_bytes(&buf).expect("base64 is always valid HeaderValue");
    header.set_sensitive(true);
    header
}

/// Replaces the default headers of a request with the provided ones, keeping
/// any header the request already set.
pub(crate) fn replace_headers(dst: &mut HeaderMap, src: HeaderMap) {
    // The first time a name is yielded, it will be Some(name), and if
    // there are more values with the same name, the next yield will be
    // None.
    let mut prev_entry: Option<OccupiedEntry<_>> = None;
    for (key, value) in src {
        match key {
            Some(key) => match dst.entry(key) {
                Entry::Occupied(mut e) => {
                    e.insert(value);
                    prev_entry = Some(e);
                }
                Entry::Vacant(e) => {
                    let e = e.insert_entry(value);
                    prev_entry = Some(e);
                }
            },
            None => match prev_entry {
                Some(ref mut entry) => {
                    entry.append(value);
                }
                None => unreachable!("HeaderMap::into_iter yields None first"),
            },
        }
    }
}

/// Escapes bytes for wire-level trace logging.
pub(crate) struct Escape<'a>(pub(crate) &'a [u8]);

impl std::fmt::Debug for Escape<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "b\"")?;
        for &c in self.0 {
            // https://doc.rust-lang.org/reference.html#byte-escapes
            if c == b'\n' {
                write!(f, "\\n")?;
            } else if c == b'\r' {
                write!(f, "\\r")?;
            } else if c == b'\t' {
                write!(f, "\\t")?;
            } else if c == b'\\' || c == b'"' {
                write!(f, "\\{}", c as char)?;
            } else if c == b'\0' {
                write!(f, "\\0")?;
                // ASCII printable
            } else if (0x20..0x7f).contains(&c) {
                write!(f, "{}", c as char)?;
            } else {
                write!(f, "\\x{c:02x}")?;
            }
        }
        write!(f, "\"")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fast_random_is_nonzero() {
        assert_ne!(fast_random(), 0);
        assert_ne!(fast_random(), fast_random());
    }

    #[test]
    fn basic_auth_header() {
        let header = basic_auth("Aladdin", Some("open sesame"));
        assert_eq!(header.as_bytes(), b"Basic QWxhZGRpbjpvcGVuIHNlc2FtZQ==");
        assert!(header.is_sensitive());
    }

    #[test]
    fn replace_keeps_multi_values(){
        let mut dst = HeaderMap::new();
        dst.insert("accept", HeaderValue::from_static("*/*"));

        let mut src = HeaderMap::new();
        src.append("cookie", HeaderValue::from_static("a=1"));
        src.append("cookie", HeaderValue::from_static("b=2"));

        replace_headers(&mut dst, src);
        assert_eq!(dst.get_all("cookie").iter().count(), 2);
        assert_eq!(dst.get("accept").unwrap(), "*/*");
    }
}
