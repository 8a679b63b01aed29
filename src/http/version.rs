/// HTTP Version.
///
/// Only the HTTP/1.x family is spoken on the wire.
///
/// [httpwg](https://httpwg.org/specs/rfc9112.html#http.version)
#[derive(Copy, Clone, PartialEq, PartialOrd, Eq, Ord, Hash)]
pub struct Version(Inner);

#[derive(PartialEq, PartialOrd, Copy, Clone, Eq, Ord, Hash)]
enum Inner {
    Http10,
    Http11,
}

impl Version {
    /// `HTTP/1.0`
    pub const HTTP_10: Version = Version(Inner::Http10);

    /// `HTTP/1.1`
    pub const HTTP_11: Version = Version(Inner::Http11);

    /// Parse the protocol number alone, e.g: `1.1`.
    ///
    /// # Errors
    ///
    /// Returns error for anything other than `1.0` and `1.1`.
    pub fn from_protocol(protocol: &str) -> Result<Self, UnsupportedVersion> {
        match protocol.trim() {
            "1.0" => Ok(Self::HTTP_10),
            "1.1" => Ok(Self::HTTP_11),
            _ => Err(UnsupportedVersion),
        }
    }

    /// Parse the version as it appears on the wire, e.g: `HTTP/1.1`.
    pub const fn from_bytes(bytes: &[u8]) -> Option<Self> {
        match bytes {
            b"HTTP/1.0" => Some(Self::HTTP_10),
            b"HTTP/1.1" => Some(Self::HTTP_11),
            _ => None,
        }
    }

    /// Returns string representation of HTTP version, e.g: `HTTP/1.1`
    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self.0 {
            Inner::Http10 => "HTTP/1.0",
            Inner::Http11 => "HTTP/1.1",
        }
    }

    /// Returns the protocol number, e.g: `1.1`
    #[inline]
    pub const fn protocol(&self) -> &'static str {
        match self.0 {
            Inner::Http10 => "1.0",
            Inner::Http11 => "1.1",
        }
    }
}

impl Default for Version {
    #[inline]
    fn default() -> Version {
        Version::HTTP_11
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::fmt::Debug for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "\"{self}\"")
    }
}

/// Protocol version other than HTTP/1.0 or HTTP/1.1.
#[derive(Debug, thiserror::Error)]
#[error("unsupported protocol version")]
pub struct UnsupportedVersion;
