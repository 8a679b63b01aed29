//! Absolute URI and reference resolution.
//!
//! Only the parts of [RFC3986] needed by an HTTP client are supported: absolute URIs with an
//! authority, and resolution of (possibly relative) references against them, which is how
//! `Location` headers are followed.
//!
//! [RFC3986]: <https://www.rfc-editor.org/rfc/rfc3986>
mod parser;
mod resolve;


use std::net::IpAddr;

use parser::Parts;

const HTTP_PORT: u16 = 80;
const HTTPS_PORT: u16 = 443;

/// An absolute URI with an authority component.
///
/// Scheme and host are normalized to lowercase at construction time.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Uri {
    scheme: String,
    userinfo: Option<String>,
    host: String,
    port: Option<u16>,
    path: String,
    query: Option<String>,
    fragment: Option<String>,
}

impl Uri {
    /// Parse an absolute URI.
    ///
    /// # Errors
    ///
    /// Returns error if the input is not an absolute URI with an authority.
    pub fn parse(input: &str) -> Result<Self, UriError> {
        let parts = Parts::parse(input)?;
        Self::from_parts(parts)
    }

    fn from_parts(parts: Parts<'_>) -> Result<Self, UriError> {
        let Some(scheme) = parts.scheme else {
            return Err(UriError::MissingScheme);
        };
        let Some(authority) = parts.authority else {
            return Err(UriError::MissingHost);
        };
        let authority = parser::Authority::parse(authority)?;
        if authority.host.is_empty() {
            return Err(UriError::MissingHost);
        }
        Ok(Self {
            scheme: scheme.to_ascii_lowercase(),
            userinfo: authority.userinfo.map(str::to_owned),
            host: authority.host.to_ascii_lowercase(),
            port: authority.port,
            path: parts.path.into_owned(),
            query: parts.query.map(str::to_owned),
            fragment: parts.fragment.map(str::to_owned),
        })
    }

    /// Returns the lowercase scheme, e.g: `https`.
    #[inline]
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Returns `true` if the scheme is `http` or `https`.
    #[inline]
    pub fn is_http(&self) -> bool {
        matches!(self.scheme.as_str(), "http" | "https")
    }

    /// Returns `true` if the scheme is `https`.
    #[inline]
    pub fn is_https(&self) -> bool {
        self.scheme == "https"
    }

    /// Returns the lowercase host, IPv6 literals keep their brackets.
    #[inline]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the host as an IP address if it is an IP literal.
    pub fn host_ip(&self) -> Option<IpAddr> {
        let host = self
            .host
            .strip_prefix('[')
            .and_then(|h| h.strip_suffix(']'))
            .unwrap_or(self.host.as_str());
        host.parse().ok()
    }

    /// Returns the explicit port, if any.
    #[inline]
    pub fn port(&self) -> Option<u16> {
        self.port
    }

    /// Returns the scheme default port, `443` for https and `80` otherwise.
    #[inline]
    pub fn default_port(&self) -> u16 {
        if self.is_https() { HTTPS_PORT } else { HTTP_PORT }
    }

    /// Returns the explicit port or the scheme default port.
    #[inline]
    pub fn port_or_default(&self) -> u16 {
        self.port.unwrap_or_else(|| self.default_port())
    }

    /// Returns `host:port` with the port always present.
    pub fn authority(&self) -> String {
        format!("{}:{}", self.host, self.port_or_default())
    }

    /// Returns the value for the `Host` header, the default port is elided.
    pub fn host_header(&self) -> String {
        match self.port {
            Some(port) if port != self.default_port() => format!("{}:{port}", self.host),
            _ => self.host.clone(),
        }
    }

    /// Returns the path component, may be empty.
    #[inline]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the query component without the leading `?`.
    #[inline]
    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    /// Returns the fragment component without the leading `#`.
    #[inline]
    pub fn fragment(&self) -> Option<&str> {
        self.fragment.as_deref()
    }

    /// Returns the origin-form request target, e.g: `/search?q=1`.
    ///
    /// Empty path is sent as `/`.
    pub fn request_target(&self) -> String {
        let path = if self.path.is_empty() { "/" } else { &self.path };
        match &self.query {
            Some(query) => format!("{path}?{query}"),
            None => path.to_owned(),
        }
    }

    /// Resolve a reference against this URI.
    ///
    /// # Errors
    ///
    /// Returns error if the reference cannot be parsed, or the result is not an absolute URI
    /// with a host.
    pub fn resolve(&self, reference: &str) -> Result<Uri, UriError> {
        resolve::resolve(self, reference)
    }
}

impl std::str::FromStr for Uri {
    type Err = UriError;

    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl std::fmt::Display for Uri {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}://", self.scheme)?;
        if let Some(userinfo) = &self.userinfo {
            write!(f, "{userinfo}@")?;
        }
        f.write_str(&self.host)?;
        if let Some(port) = self.port {
            write!(f, ":{port}")?;
        }
        f.write_str(&self.path)?;
        if let Some(query) = &self.query {
            write!(f, "?{query}")?;
        }
        if let Some(fragment) = &self.fragment {
            write!(f, "#{fragment}")?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for Uri {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "\"{self}\"")
    }
}

// ===== Error =====

/// URI parsing error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UriError {
    /// The input has no scheme.
    #[error("missing scheme")]
    MissingScheme,
    /// The scheme contains invalid character.
    #[error("invalid scheme")]
    InvalidScheme,
    /// The input has no authority or an empty host.
    #[error("missing host")]
    MissingHost,
    /// The authority component is malformed.
    #[error("invalid authority")]
    InvalidAuthority,
    /// The input contains whitespace or control characters.
    #[error("invalid character")]
    InvalidChar,
}
