use bytes::Bytes;

use super::HeaderError;

/// HTTP Header name.
///
/// # Case Preservation
///
/// The name is kept exactly as given so it can be transmitted as written, while comparison
/// against other names is ASCII case-insensitive.
#[derive(Clone)]
pub struct HeaderName {
    /// is valid token
    bytes: Bytes,
}

impl HeaderName {
    /// Parse header name from static string.
    ///
    /// # Panics
    ///
    /// Panics if the input is not a valid header name.
    #[inline]
    pub const fn from_static(name: &'static str) -> Self {
        match validate_header_name(name.as_bytes()) {
            Ok(()) => Self {
                bytes: Bytes::from_static(name.as_bytes()),
            },
            Err(err) => err.panic_const(),
        }
    }

    /// Parse header name from [`Bytes`].
    ///
    /// # Errors
    ///
    /// Returns error if the input is not a valid header name.
    #[inline]
    pub fn from_bytes<B: Into<Bytes>>(name: B) -> Result<Self, HeaderError> {
        let bytes = name.into();
        validate_header_name(&bytes)?;
        Ok(Self { bytes })
    }

    /// Parse header name by copying from slice of bytes.
    ///
    /// # Errors
    ///
    /// Returns error if the input is not a valid header name.
    #[inline]
    pub fn from_slice<A: AsRef<[u8]>>(name: A) -> Result<Self, HeaderError> {
        validate_header_name(name.as_ref())?;
        Ok(Self {
            bytes: Bytes::copy_from_slice(name.as_ref()),
        })
    }

    /// Returns header name as `str`, in its original case.
    #[inline]
    pub fn as_str(&self) -> &str {
        // SAFETY: `bytes` is a valid token, which is a subset of ASCII
        unsafe { str::from_utf8_unchecked(&self.bytes) }
    }

    /// Returns `true` if both names are equal ignoring ASCII case.
    #[inline]
    pub fn matches(&self, name: &str) -> bool {
        self.bytes.eq_ignore_ascii_case(name.as_bytes())
    }
}

/// [RFC9110 token](https://www.rfc-editor.org/rfc/rfc9110.html#name-tokens)
const fn is_token(byte: u8) -> bool {
    matches!(
        byte,
        b'!' | b'#' | b'$' | b'%' | b'&' | b'\'' | b'*' | b'+' | b'-' | b'.' | b'^' | b'_'
        | b'`' | b'|' | b'~' | b'0'..=b'9' | b'a'..=b'z' | b'A'..=b'Z'
    )
}

const fn validate_header_name(mut bytes: &[u8]) -> Result<(), HeaderError> {
    if bytes.is_empty() {
        return Err(HeaderError::InvalidName);
    }
    while let [byte, rest @ ..] = bytes {
        if !is_token(*byte) {
            return Err(HeaderError::InvalidName);
        }
        bytes = rest;
    }
    Ok(())
}

// ===== Traits =====

/// A type that can be used to lookup a header field.
pub trait AsHeaderName {
    fn as_header_str(&self) -> &str;
}

impl AsHeaderName for HeaderName {
    #[inline]
    fn as_header_str(&self) -> &str {
        self.as_str()
    }
}

impl AsHeaderName for &HeaderName {
    #[inline]
    fn as_header_str(&self) -> &str {
        self.as_str()
    }
}

impl AsHeaderName for &str {
    #[inline]
    fn as_header_str(&self) -> &str {
        self
    }
}

impl AsHeaderName for &String {
    #[inline]
    fn as_header_str(&self) -> &str {
        self.as_str()
    }
}

/// A type that can be converted into [`HeaderName`] for insertion.
///
/// # Panics
///
/// Conversion from static str panics if it is not a valid header name.
pub trait IntoHeaderName {
    fn into_header_name(self) -> HeaderName;
}

impl IntoHeaderName for HeaderName {
    #[inline]
    fn into_header_name(self) -> HeaderName {
        self
    }
}

impl IntoHeaderName for &'static str {
    #[inline]
    fn into_header_name(self) -> HeaderName {
        HeaderName::from_static(self)
    }
}

impl TryFrom<String> for HeaderName {
    type Error = HeaderError;

    #[inline]
    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_bytes(value)
    }
}

impl std::fmt::Display for HeaderName {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::fmt::Debug for HeaderName {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self.as_str(), f)
    }
}

impl PartialEq for HeaderName {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.bytes.eq_ignore_ascii_case(&other.bytes)
    }
}

impl Eq for HeaderName { }

impl PartialEq<str> for HeaderName {
    #[inline]
    fn eq(&self, other: &str) -> bool {
        self.matches(other)
    }
}

impl PartialEq<&str> for HeaderName {
    #[inline]
    fn eq(&self, other: &&str) -> bool {
        self.matches(other)
    }
}

// ===== Standard =====

/// Header names used by the client, in their canonical case.
pub mod standard {
    use super::HeaderName;

    macro_rules! standard {
        ($($(#[$doc:meta])* $id:ident = $name:literal;)*) => {
            $(
                $(#[$doc])*
                pub const $id: HeaderName = HeaderName::from_static($name);
            )*
        };
    }

    standard! {
        ACCEPT_ENCODING = "Accept-Encoding";
        CONNECTION = "Connection";
        CONTENT_ENCODING = "Content-Encoding";
        CONTENT_LENGTH = "Content-Length";
        CONTENT_TYPE = "Content-Type";
        EXPECT = "Expect";
        HOST = "Host";
        LOCATION = "Location";
        REFERER = "Referer";
        TRANSFER_ENCODING = "Transfer-Encoding";
        USER_AGENT = "User-Agent";
    }
}
