/// HTTP Method.
///
/// This API follows the [RFC9110] and the PATCH method from [RFC5789].
///
/// Arbitrary method is not supported.
///
/// [RFC5789]: https://www.rfc-editor.org/rfc/rfc5789
/// [RFC9110]: <https://www.rfc-editor.org/rfc/rfc9110.html#name-methods>
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Method(u8);

struct Props {
    value: &'static [u8],
    /// Body length is assumed zero when the request carries no body.
    sends_body: bool,
    /// Request body is never transmitted.
    strips_body: bool,
}

props! {
    static PROPS: [9];

    /// The [GET] method requests transfer of a current selected representation for the target
    /// resource.
    ///
    /// [GET]: <https://www.rfc-editor.org/rfc/rfc9110.html#name-get>
    pub const GET = (0, b"GET", , );
    /// Same as GET, except that the server does not send content in the response.
    ///
    /// [HEAD]: <https://www.rfc-editor.org/rfc/rfc9110.html#name-head>
    pub const HEAD = (1, b"HEAD", , strips_body);
    /// The [POST] method requests that the target resource process the enclosed representation.
    ///
    /// [POST]: <https://www.rfc-editor.org/rfc/rfc9110.html#name-post>
    pub const POST = (2, b"POST", sends_body, );
    /// The [PUT] method requests that the state of the target resource be replaced.
    ///
    /// [PUT]: <https://www.rfc-editor.org/rfc/rfc9110.html#name-put>
    pub const PUT = (3, b"PUT", sends_body, );
    /// The [DELETE] method requests that the origin server remove the target resource.
    ///
    /// [DELETE]: <https://www.rfc-editor.org/rfc/rfc9110.html#name-delete>
    pub const DELETE = (4, b"DELETE", , );
    /// The [CONNECT] method requests a tunnel to the destination origin server.
    ///
    /// [CONNECT]: <https://www.rfc-editor.org/rfc/rfc9110.html#name-connect>
    pub const CONNECT = (5, b"CONNECT", , );
    /// The [OPTIONS] method requests the communication options available for the target.
    ///
    /// [OPTIONS]: <https://www.rfc-editor.org/rfc/rfc9110.html#name-options>
    pub const OPTIONS = (6, b"OPTIONS", , strips_body);
    /// The [TRACE] method requests a remote, application-level loop-back of the request message.
    ///
    /// [TRACE]: <https://www.rfc-editor.org/rfc/rfc9110.html#name-trace>
    pub const TRACE = (7, b"TRACE", , strips_body);
    /// The [PATCH] method requests that a set of changes be applied to the target resource.
    ///
    /// [PATCH]: <https://www.rfc-editor.org/rfc/rfc5789#section-2>
    pub const PATCH = (8, b"PATCH", sends_body, );
}

impl Method {
    /// Returns `true` if a request without body must still declare `Content-Length: 0`.
    ///
    /// These are POST, PUT and PATCH.
    #[inline]
    pub const fn expects_body(&self) -> bool {
        PROPS[self.0 as usize].sends_body
    }

    /// Returns `true` if the request body is dropped before transmission.
    ///
    /// These are HEAD, OPTIONS and TRACE.
    #[inline]
    pub const fn strips_body(&self) -> bool {
        PROPS[self.0 as usize].strips_body
    }

    /// Returns `true` if a redirect response may be followed automatically.
    #[inline]
    pub const fn is_redirectable(&self) -> bool {
        matches!(self.0, 0 | 1)
    }

    /// Returns string representation of the method.
    #[inline]
    pub const fn as_str(&self) -> &'static str {
        // SAFETY: all method values are ASCII literals
        unsafe { str::from_utf8_unchecked(PROPS[self.0 as usize].value) }
    }
}

impl std::str::FromStr for Method {
    type Err = UnknownMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_bytes(s.as_bytes()).ok_or(UnknownMethod)
    }
}

impl std::fmt::Debug for Method {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        str::fmt(self.as_str(), f)
    }
}

impl std::fmt::Display for Method {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        str::fmt(self.as_str(), f)
    }
}

// ===== Error =====

/// Method is not one of the supported methods.
#[derive(Debug, thiserror::Error)]
#[error("unknown method")]
pub struct UnknownMethod;

// ===== Macros =====

macro_rules! props {
    (
        static $props:ident: [$len:literal];
        $(
           $(#[$doc:meta])*
           pub const $name:ident = ($idx:literal, $val:literal, $($send:ident)?, $($strip:ident)?);
        )*
    ) => {
        impl Method {
            $(
               $(#[$doc])*
               pub const $name: Self = Self($idx);
            )*

            /// Create [`Method`] from bytes.
            #[inline]
            pub const fn from_bytes(src: &[u8]) -> Option<Method> {
                match src {
                    $(
                        $val => Some(Self::$name),
                    )*
                    _ => None,
                }
            }
        }

        static $props: [Props; $len] = [
            $(
                Props { value: $val, sends_body: prop!($($send)?), strips_body: prop!($($strip)?) },
            )*
        ];
    };
}

macro_rules! prop {
    (sends_body) => { true };
    (strips_body) => { true };
    () => { false };
}

use {props, prop};
