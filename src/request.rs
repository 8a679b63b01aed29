//! HTTP Request
use crate::{
    body::Body,
    error::Error,
    headers::{HeaderMap, HeaderValue, IntoHeaderName},
    http::{Method, Uri, Version},
};

/// HTTP Request.
///
/// A request is normalized before it is sent, so missing `Host`, `User-Agent`, and body framing
/// headers are filled in by the client. Across redirects the same request is rewritten in place.
#[derive(Debug)]
pub struct Request {
    method: Method,
    uri: Uri,
    version: Version,
    headers: HeaderMap,
    body: Body,
}

/// Constructor
impl Request {
    /// Create [`Request`] with empty headers and body.
    #[inline]
    pub fn new(method: Method, uri: Uri) -> Self {
        Self {
            method,
            uri,
            version: Version::HTTP_11,
            headers: HeaderMap::new(),
            body: Body::Empty,
        }
    }

    /// Create `GET` request.
    #[inline]
    pub fn get(uri: Uri) -> Self {
        Self::new(Method::GET, uri)
    }

    /// Create `POST` request with given body.
    #[inline]
    pub fn post(uri: Uri, body: impl Into<Body>) -> Self {
        Self::new(Method::POST, uri).with_body(body)
    }

    /// Set the protocol version.
    #[inline]
    pub fn with_version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }

    /// Append a header field.
    #[inline]
    pub fn with_header<K: IntoHeaderName>(mut self, name: K, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Set the body.
    #[inline]
    pub fn with_body(mut self, body: impl Into<Body>) -> Self {
        self.body = body.into();
        self
    }
}

impl Request {
    delegate! {
        /// Returns shared reference to [`Method`].
        method(),
        /// Returns mutable reference to [`Method`].
        method_mut() -> Method;

        /// Returns shared reference to [`Uri`].
        uri(),
        /// Returns mutable reference to [`Uri`].
        uri_mut() -> Uri;

        /// Returns shared reference to [`Version`].
        version(),
        /// Returns mutable reference to [`Version`].
        version_mut() -> Version;

        /// Returns shared reference to [`HeaderMap`].
        headers(),
        /// Returns mutable reference to [`HeaderMap`].
        headers_mut() -> HeaderMap;

        /// Returns shared reference to [`Body`].
        body(),
        /// Returns mutable reference to [`Body`].
        body_mut() -> Body;
    }

    /// Take the body, leaving [`Body::Empty`].
    #[inline]
    pub fn take_body(&mut self) -> Body {
        std::mem::take(&mut self.body)
    }

    /// Copy of the request line and headers, without the body.
    ///
    /// This is what lifecycle observers receive.
    pub fn head(&self) -> Request {
        Self {
            method: self.method,
            uri: self.uri.clone(),
            version: self.version,
            headers: self.headers.clone(),
            body: Body::Empty,
        }
    }
}

/// Destructor
impl Request {
    /// Destruct request into [`Body`].
    #[inline]
    pub fn into_body(self) -> Body {
        self.body
    }
}

// ===== Conversion =====

/// Types that can be submitted to a client.
///
/// Implemented for absolute URI strings, [`Uri`], and [`Request`].
pub trait IntoRequest {
    /// # Errors
    ///
    /// Returns [`Error::InvalidRequest`] if the input is not a valid request.
    fn into_request(self) -> Result<Request, Error>;
}

impl IntoRequest for Request {
    #[inline]
    fn into_request(self) -> Result<Request, Error> {
        Ok(self)
    }
}

impl IntoRequest for Uri {
    #[inline]
    fn into_request(self) -> Result<Request, Error> {
        Ok(Request::get(self))
    }
}

impl IntoRequest for &str {
    fn into_request(self) -> Result<Request, Error> {
        match Uri::parse(self) {
            Ok(uri) => Ok(Request::get(uri)),
            Err(err) => Err(Error::InvalidRequest(format!("invalid uri {self:?}: {err}"))),
        }
    }
}

impl IntoRequest for String {
    #[inline]
    fn into_request(self) -> Result<Request, Error> {
        self.as_str().into_request()
    }
}

impl IntoRequest for &String {
    #[inline]
    fn into_request(self) -> Result<Request, Error> {
        self.as_str().into_request()
    }
}

// ===== Macros =====

macro_rules! delegate {
    (@CORE
        $(#[$rdoc:meta])*
        $mref:ident(),
        $(#[$mdoc:meta])*
        $mmut:ident() -> $ty:ty
    ) => {
        $(#[$rdoc])*
        #[inline]
        pub fn $mref(&self) -> &$ty {
            &self.$mref
        }

        $(#[$mdoc])*
        #[inline]
        pub fn $mmut(&mut self) -> &mut $ty {
            &mut self.$mref
        }
    };
    (
        $(
            $(#[$rdoc:meta])*
            $mref:ident(),
            $(#[$mdoc:meta])*
            $mmut:ident() -> $ty:ty;
        )*
    ) => {
        $(
            delegate! {
                @CORE
                $(#[$rdoc])*
                $mref(),
                $(#[$mdoc])*
                $mmut() -> $ty
            }
        )*
    };
}

pub(crate) use delegate;
