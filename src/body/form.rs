use bytes::{Bytes, BytesMut};
use std::{
    io,
    path::Path,
    sync::atomic::{AtomicU64, Ordering},
    time::{SystemTime, UNIX_EPOCH},
};

use super::{Body, BodyAggregate};
use crate::headers::HeaderValue;

/// `application/x-www-form-urlencoded` body.
///
/// ```rust
/// use ferry::body::Form;
///
/// let form = Form::new().field("name", "ferry").field("q", "a b&c");
/// assert_eq!(form.encode(), "name=ferry&q=a+b%26c");
/// ```
#[derive(Clone, Debug, Default)]
pub struct Form {
    fields: Vec<(String, String)>,
}

impl Form {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field, duplicate names are kept.
    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.append(name, value);
        self
    }

    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.push((name.into(), value.into()));
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns the urlencoded body.
    pub fn encode(&self) -> Bytes {
        let mut buffer = BytesMut::new();
        for (i, (name, value)) in self.fields.iter().enumerate() {
            if i != 0 {
                buffer.extend_from_slice(b"&");
            }
            urlencode(name.as_bytes(), &mut buffer);
            buffer.extend_from_slice(b"=");
            urlencode(value.as_bytes(), &mut buffer);
        }
        buffer.freeze()
    }
}

impl BodyAggregate for Form {
    fn content_type(&self) -> HeaderValue {
        HeaderValue::from_static("application/x-www-form-urlencoded")
    }

    fn into_body(self: Box<Self>) -> Body {
        Body::Full(self.encode())
    }
}

fn urlencode(input: &[u8], buffer: &mut BytesMut) {
    const HEX: &[u8; 16] = b"0123456789ABCDEF";

    for &byte in input {
        match byte {
            b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'-' | b'_' | b'.' => {
                buffer.extend_from_slice(&[byte])
            }
            b' ' => buffer.extend_from_slice(b"+"),
            _ => buffer.extend_from_slice(&[
                b'%',
                HEX[(byte >> 4) as usize],
                HEX[(byte & 0xf) as usize],
            ]),
        }
    }
}

// ===== Multipart =====

/// `multipart/form-data` body with text and file parts.
#[derive(Clone, Debug)]
pub struct Multipart {
    boundary: String,
    parts: Vec<Part>,
}

#[derive(Clone, Debug)]
struct Part {
    name: String,
    filename: Option<String>,
    content_type: Option<String>,
    data: Bytes,
}

impl Default for Multipart {
    fn default() -> Self {
        Self::new()
    }
}

impl Multipart {
    /// Create empty multipart body with a generated boundary.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);

        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|e| e.as_nanos() as u64)
            .unwrap_or_default();
        let count = COUNTER.fetch_add(1, Ordering::Relaxed);

        Self {
            boundary: format!("ferry-{nanos:016x}{count:08x}"),
            parts: Vec::new(),
        }
    }

    #[inline]
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Add a text field.
    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parts.push(Part {
            name: name.into(),
            filename: None,
            content_type: None,
            data: Bytes::from(value.into()),
        });
        self
    }

    /// Add a file part from memory.
    pub fn file(
        mut self,
        name: impl Into<String>,
        filename: impl Into<String>,
        content_type: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        self.parts.push(Part {
            name: name.into(),
            filename: Some(filename.into()),
            content_type: Some(content_type.into()),
            data: data.into(),
        });
        self
    }

    /// Add a file part by reading the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read.
    pub fn file_path(self, name: impl Into<String>, path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path)?;
        let filename = path
            .file_name()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(self.file(name, filename, "application/octet-stream", data))
    }

    /// Returns the encoded body.
    pub fn encode(&self) -> Bytes {
        let mut buffer = BytesMut::new();
        for part in &self.parts {
            buffer.extend_from_slice(b"--");
            buffer.extend_from_slice(self.boundary.as_bytes());
            buffer.extend_from_slice(b"\r\nContent-Disposition: form-data; name=\"");
            buffer.extend_from_slice(escape_quoted(&part.name).as_bytes());
            buffer.extend_from_slice(b"\"");
            if let Some(filename) = &part.filename {
                buffer.extend_from_slice(b"; filename=\"");
                buffer.extend_from_slice(escape_quoted(filename).as_bytes());
                buffer.extend_from_slice(b"\"");
            }
            buffer.extend_from_slice(b"\r\n");
            if let Some(content_type) = &part.content_type {
                buffer.extend_from_slice(b"Content-Type: ");
                buffer.extend_from_slice(content_type.as_bytes());
                buffer.extend_from_slice(b"\r\nContent-Transfer-Encoding: binary\r\n");
            }
            buffer.extend_from_slice(b"\r\n");
            buffer.extend_from_slice(&part.data);
            buffer.extend_from_slice(b"\r\n");
        }
        buffer.extend_from_slice(b"--");
        buffer.extend_from_slice(self.boundary.as_bytes());
        buffer.extend_from_slice(b"--\r\n");
        buffer.freeze()
    }
}

impl BodyAggregate for Multipart {
    fn content_type(&self) -> HeaderValue {
        HeaderValue::from_string(format!("multipart/form-data; boundary={}", self.boundary))
    }

    fn into_body(self: Box<Self>) -> Body {
        Body::Full(self.encode())
    }
}

fn escape_quoted(value: &str) -> String {
    value
        .chars()
        .filter(|c| !c.is_control())
        .flat_map(|c| match c {
            '"' | '\\' => ['\\', c].into_iter().take(2),
            c => [c, c].into_iter().take(1),
        })
        .collect()
}
