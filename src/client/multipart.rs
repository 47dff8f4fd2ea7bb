//! Multipart form bodies, with browser-faithful boundary generation.

use std::borrow::Cow;
use std::fmt;

use bytes::Bytes;

use super::body::Body;
use crate::util::fast_random;

/// How a boundary string is generated, matching the browser a profile
/// imitates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BoundaryGenerator {
    /// `----WebKitFormBoundary` followed by 16 alphanumerics (Chrome,
    /// Safari, Edge).
    #[default]
    WebKit,
    /// 27 dashes followed by three decimal-encoded random 32-bit values
    /// (Firefox).
    Firefox,
}

impl BoundaryGenerator {
    /// Produces one fresh boundary string.
    pub fn generate(self) -> String {
        match self {
            BoundaryGenerator::WebKit => {
                const ALPHABET: &[u8] =
                    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
                let mut out = String::from("----WebKitFormBoundary");
                for _ in 0..16 {
                    let idx = (fast_random() as usize) % ALPHABET.len();
                    out.push(ALPHABET[idx] as char);
                }
                out
            }
            BoundaryGenerator::Firefox => {
                format!(
                    "---------------------------{}{}{}",
                    fast_random() as u32,
                    fast_random() as u32,
                    fast_random() as u32
                )
            }
        }
    }
}

/// An async multipart/form-data request body.
pub struct Form {
    boundary: String,
    parts: Vec<Part>,
}

/// A field in a multipart form.
pub struct Part {
    name: Cow<'static, str>,
    value: Bytes,
    mime: Option<mime::Mime>,
    file_name: Option<Cow<'static, str>>,
}

impl Form {
    /// Creates a new Form with a WebKit-style boundary.
    pub fn new() -> Form {
        Form::with_boundary(BoundaryGenerator::WebKit)
    }

    /// Creates a new Form using the given boundary generator.
    pub fn with_boundary(generator: BoundaryGenerator) -> Form {
        Form {
            boundary: generator.generate(),
            parts: Vec::new(),
        }
    }

    /// Get the boundary that this form will use.
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Add a data field with supplied name and value.
    pub fn text<T, U>(mut self, name: T, value: U) -> Form
    where
        T: Into<Cow<'static, str>>,
        U: Into<Cow<'static, str>>,
    {
        self.parts.push(Part {
            name: name.into(),
            value: match value.into() {
                Cow::Borrowed(s) => Bytes::from_static(s.as_bytes()),
                Cow::Owned(s) => Bytes::from(s),
            },
            mime: None,
            file_name: None,
        });
        self
    }

    /// Adds a customized Part.
    pub fn part<T>(mut self, name: T, part: Part) -> Form
    where
        T: Into<Cow<'static, str>>,
    {
        self.parts.push(Part {
            name: name.into(),
            ..part
        });
        self
    }

    /// Serializes the form into its body bytes. Parts are emitted in
    /// insertion order.
    pub(crate) fn into_body(self) -> Body {
        let mut out = Vec::new();
        for part in &self.parts {
            out.extend_from_slice(b"--");
            out.extend_from_slice(self.boundary.as_bytes());
            out.extend_from_slice(b"\r\n");
            out.extend_from_slice(b"Content-Disposition: form-data; name=\"");
            out.extend_from_slice(part.name.as_bytes());
            out.extend_from_slice(b"\"");
            if let Some(file_name) = &part.file_name {
                out.extend_from_slice(b"; filename=\"");
                out.extend_from_slice(file_name.as_bytes());
                out.extend_from_slice(b"\"");
            }
            out.extend_from_slice(b"\r\n");
            if let Some(mime) = &part.mime {
                out.extend_from_slice(b"Content-Type: ");
                out.extend_from_slice(mime.as_ref().as_bytes());
                out.extend_from_slice(b"\r\n");
            }
            out.extend_from_slice(b"\r\n");
            out.extend_from_slice(&part.value);
            out.extend_from_slice(b"\r\n");
        }
        out.extend_from_slice(b"--");
        out.extend_from_slice(self.boundary.as_bytes());
        out.extend_from_slice(b"--\r\n");
        Body::from(out)
    }
}

impl Default for Form {
    fn default() -> Self {
        Form::new()
    }
}

impl fmt::Debug for Form {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Form")
            .field("boundary", &self.boundary)
            .field("parts", &self.parts.len())
            .finish()
    }
}

impl Part {
    /// Makes a new parameter from arbitrary bytes.
    pub fn bytes<T: Into<Bytes>>(value: T) -> Part {
        Part {
            name: Cow::Borrowed(""),
            value: value.into(),
            mime: None,
            file_name: None,
        }
    }

    /// Tries to set the MIME of this part.
    pub fn mime_str(mut self, mime: &str) -> crate::Result<Part> {
        self.mime = Some(mime.parse().map_err(crate::error::Error::builder)?);
        Ok(self)
    }

    /// Sets the filename, building a `filename=` parameter.
    pub fn file_name<T: Into<Cow<'static, str>>>(mut self, filename: T) -> Part {
        self.file_name = Some(filename.into());
        self
    }

    /// Guesses the MIME from the filename extension.
    #[cfg(feature = "multipart")]
    pub fn guess_mime(mut self) -> Part {
        if let Some(file_name) = &self.file_name {
            self.mime = Some(mime_guess::from_path(file_name.as_ref()).first_or_octet_stream());
        }
        self
    }
}

impl fmt::Debug for Part {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Part")
            .field("name", &self.name)
            .field("file_name", &self.file_name)
            .finish()
    }
}
