/// HTTP [Status Code][rfc].
///
/// Any three digit code from a peer is accepted, the constants cover the codes the client acts
/// upon.
///
/// [rfc]: <https://datatracker.ietf.org/doc/html/rfc9110#name-status-codes>
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StatusCode(u16);

impl Default for StatusCode {
    #[inline]
    fn default() -> Self {
        Self::OK
    }
}

/// Status code outside of `100..=599`.
#[derive(Debug, thiserror::Error)]
#[error("invalid status code")]
pub struct InvalidStatusCode;

impl StatusCode {
    /// Create status code from integer.
    ///
    /// # Errors
    ///
    /// Returns error if `code` is not in `100..=599`.
    #[inline]
    pub const fn from_u16(code: u16) -> Result<Self, InvalidStatusCode> {
        match code {
            100..=599 => Ok(Self(code)),
            _ => Err(InvalidStatusCode),
        }
    }

    /// Parse status code from exactly three ASCII digits.
    pub(crate) fn from_bytes(bytes: &[u8]) -> Result<Self, InvalidStatusCode> {
        let [a, b, c] = bytes else {
            return Err(InvalidStatusCode);
        };
        if !(a.is_ascii_digit() && b.is_ascii_digit() && c.is_ascii_digit()) {
            return Err(InvalidStatusCode);
        }
        let code = (a - b'0') as u16 * 100 + (b - b'0') as u16 * 10 + (c - b'0') as u16;
        Self::from_u16(code)
    }

    /// Returns status code value, e.g: `200`.
    #[inline]
    pub const fn as_u16(&self) -> u16 {
        self.0
    }

    /// Returns `true` for `1xx` codes.
    #[inline]
    pub const fn is_informational(&self) -> bool {
        self.0 < 200
    }

    /// Returns `true` for `2xx` codes.
    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self.0, 200..=299)
    }

    /// Returns `true` for `3xx` codes.
    #[inline]
    pub const fn is_redirection(&self) -> bool {
        matches!(self.0, 300..=399)
    }

    /// Returns `true` for `4xx` and `5xx` codes.
    #[inline]
    pub const fn is_error(&self) -> bool {
        self.0 >= 400
    }

    /// Returns `true` if a response with this status never carries a body.
    #[inline]
    pub const fn is_bodyless(&self) -> bool {
        self.is_informational() || self.0 == 204 || self.0 == 304
    }
}

macro_rules! status_codes {
    (
        $(
            $(#[$doc:meta])*
            $int:literal $id:ident $msg:literal;
        )*
    ) => {
        impl StatusCode {
            $(
                $(#[$doc])*
                pub const $id: Self = Self($int);
            )*

            /// Returns the registered reason phrase, e.g: `"OK"`.
            pub const fn canonical_reason(&self) -> Option<&'static str> {
                match self.0 {
                    $(
                        $int => Some($msg),
                    )*
                    _ => None,
                }
            }
        }
    };
}

status_codes! {
    /// `100`, the client should continue sending the request body.
    100 CONTINUE "Continue";
    101 SWITCHING_PROTOCOLS "Switching Protocols";
    /// `200`, the request succeeded.
    200 OK "OK";
    201 CREATED "Created";
    202 ACCEPTED "Accepted";
    /// `204`, there is no content to send for this request.
    204 NO_CONTENT "No Content";
    206 PARTIAL_CONTENT "Partial Content";
    300 MULTIPLE_CHOICES "Multiple Choices";
    301 MOVED_PERMANENTLY "Moved Permanently";
    302 FOUND "Found";
    303 SEE_OTHER "See Other";
    /// `304`, the cached response is still valid, never redirected.
    304 NOT_MODIFIED "Not Modified";
    307 TEMPORARY_REDIRECT "Temporary Redirect";
    308 PERMANENT_REDIRECT "Permanent Redirect";
    400 BAD_REQUEST "Bad Request";
    401 UNAUTHORIZED "Unauthorized";
    403 FORBIDDEN "Forbidden";
    404 NOT_FOUND "Not Found";
    405 METHOD_NOT_ALLOWED "Method Not Allowed";
    408 REQUEST_TIMEOUT "Request Timeout";
    413 CONTENT_TOO_LARGE "Content Too Large";
    417 EXPECTATION_FAILED "Expectation Failed";
    500 INTERNAL_SERVER_ERROR "Internal Server Error";
    502 BAD_GATEWAY "Bad Gateway";
    503 SERVICE_UNAVAILABLE "Service Unavailable";
    504 GATEWAY_TIMEOUT "Gateway Timeout";
}

impl std::fmt::Display for StatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

impl std::fmt::Debug for StatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

impl PartialEq<u16> for StatusCode {
    #[inline]
    fn eq(&self, other: &u16) -> bool {
        self.0 == *other
    }
}
