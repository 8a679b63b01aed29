use bytes::Bytes;

use super::HeaderError;

/// HTTP Header Value.
///
/// Value may contain `obs-text` received from a peer, use [`to_str`][HeaderValue::to_str] to
/// get a string view when it is valid UTF-8.
#[derive(Clone)]
pub struct HeaderValue {
    /// contains no control character other than HTAB
    bytes: Bytes,
}

impl HeaderValue {
    /// Parse header value from static string.
    ///
    /// # Panics
    ///
    /// Panics if the input is not a valid header value.
    #[inline]
    pub const fn from_static(value: &'static str) -> Self {
        match validate_header_value(value.as_bytes()) {
            Ok(()) => Self {
                bytes: Bytes::from_static(value.as_bytes()),
            },
            Err(err) => err.panic_const(),
        }
    }

    /// Parse header value from [`Bytes`].
    ///
    /// # Errors
    ///
    /// Returns error if the input is not a valid header value.
    #[inline]
    pub fn from_bytes<B: Into<Bytes>>(value: B) -> Result<Self, HeaderError> {
        let bytes = value.into();
        validate_header_value(&bytes)?;
        Ok(Self { bytes })
    }

    /// Parse [`HeaderValue`] from string.
    ///
    /// # Panics
    ///
    /// This function will panic if header contains invalid character.
    #[inline]
    pub fn from_string<S: Into<String>>(value: S) -> HeaderValue {
        match Self::from_bytes(value.into()) {
            Ok(value) => value,
            Err(err) => err.panic_const(),
        }
    }

    /// Create header value from an integer.
    #[inline]
    pub fn from_u64(value: u64) -> HeaderValue {
        let mut buffer = itoa::Buffer::new();
        Self {
            bytes: Bytes::copy_from_slice(buffer.format(value).as_bytes()),
        }
    }

    /// Returns header value as a byte slice.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns header value as `str` if it is valid UTF-8.
    #[inline]
    pub fn to_str(&self) -> Option<&str> {
        str::from_utf8(&self.bytes).ok()
    }

    /// Returns `true` if the comma separated value contains `token`, ignoring ASCII case.
    pub fn contains_token(&self, token: &str) -> bool {
        self.bytes
            .split(|&b| b == b',')
            .any(|item| item.trim_ascii().eq_ignore_ascii_case(token.as_bytes()))
    }
}

// ===== Parsing =====

const MAX_HEADER_VALUE_LEN: usize = 1 << 16;

const fn validate_header_value(mut bytes: &[u8]) -> Result<(), HeaderError> {
    if bytes.len() > MAX_HEADER_VALUE_LEN {
        return Err(HeaderError::TooLong);
    }
    while let [byte, rest @ ..] = bytes {
        if (*byte < b' ' && *byte != b'\t') || *byte == 0x7f {
            return Err(HeaderError::InvalidValue);
        }
        bytes = rest;
    }
    Ok(())
}

// ===== Traits =====

impl std::fmt::Debug for HeaderValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.to_str() {
            Some(value) => std::fmt::Debug::fmt(value, f),
            None => std::fmt::Debug::fmt(&self.bytes, f),
        }
    }
}

impl std::str::FromStr for HeaderValue {
    type Err = HeaderError;

    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_bytes(Bytes::copy_from_slice(s.as_bytes()))
    }
}

impl From<u64> for HeaderValue {
    #[inline]
    fn from(value: u64) -> Self {
        Self::from_u64(value)
    }
}

impl From<&'static str> for HeaderValue {
    #[inline]
    fn from(value: &'static str) -> Self {
        Self::from_static(value)
    }
}

impl From<String> for HeaderValue {
    #[inline]
    fn from(value: String) -> Self {
        Self::from_string(value)
    }
}

impl PartialEq for HeaderValue {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.bytes == other.bytes
    }
}

impl PartialEq<str> for HeaderValue {
    #[inline]
    fn eq(&self, other: &str) -> bool {
        self.bytes == other.as_bytes()
    }
}

impl PartialEq<&str> for HeaderValue {
    #[inline]
    fn eq(&self, other: &&str) -> bool {
        self.bytes == other.as_bytes()
    }
}

impl From<HeaderValue> for Bytes {
    #[inline]
    fn from(value: HeaderValue) -> Self {
        value.bytes
    }
}
