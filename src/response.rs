//! HTTP Response
use bytes::Bytes;
use std::{
    fs::File,
    io::{self, Read, Seek, SeekFrom},
};

use crate::{
    headers::HeaderMap,
    http::{StatusCode, Uri, Version},
    request::delegate,
};

/// HTTP Response.
#[derive(Debug)]
pub struct Response {
    version: Version,
    status: StatusCode,
    reason: String,
    headers: HeaderMap,
    body: ResponseBody,
    uri: Option<Uri>,
    previous: Option<Box<Response>>,
}

impl Response {
    pub(crate) fn new(version: Version, status: StatusCode, reason: String, headers: HeaderMap) -> Self {
        Self {
            version,
            status,
            reason,
            headers,
            body: ResponseBody::Empty,
            uri: None,
            previous: None,
        }
    }

    /// Copy of the status line and headers, without the body.
    pub(crate) fn head(&self) -> Response {
        Response::new(self.version, self.status, self.reason.clone(), self.headers.clone())
    }

    pub(crate) fn set_uri(&mut self, uri: Uri) {
        self.uri = Some(uri);
    }

    pub(crate) fn set_previous(&mut self, previous: Response) {
        self.previous = Some(Box::new(previous));
    }
}

impl Response {
    /// Returns the status code.
    #[inline]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the reason phrase as sent by the peer.
    #[inline]
    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// Returns the URI of the request that produced this response, after any redirects.
    #[inline]
    pub fn uri(&self) -> Option<&Uri> {
        self.uri.as_ref()
    }

    /// Returns the redirect response that led to this one, if redirects were followed.
    #[inline]
    pub fn previous_response(&self) -> Option<&Response> {
        self.previous.as_deref()
    }

    delegate! {
        /// Returns shared reference to [`Version`].
        version(),
        /// Returns mutable reference to [`Version`].
        version_mut() -> Version;

        /// Returns shared reference to [`HeaderMap`].
        headers(),
        /// Returns mutable reference to [`HeaderMap`].
        headers_mut() -> HeaderMap;

        /// Returns shared reference to [`ResponseBody`].
        body(),
        /// Returns mutable reference to [`ResponseBody`].
        body_mut() -> ResponseBody;
    }

    /// Destruct response into [`ResponseBody`].
    #[inline]
    pub fn into_body(self) -> ResponseBody {
        self.body
    }
}

// ===== Body =====

/// Received response body.
///
/// Bodies larger than the configured spill threshold are stored in an anonymous temporary file
/// unless the client buffers response bodies.
#[derive(Debug, Default)]
pub enum ResponseBody {
    /// No body, or the body was not stored.
    #[default]
    Empty,
    /// Body in memory.
    Bytes(Bytes),
    /// Body in a temporary file, positioned at the start.
    File(File),
}

impl ResponseBody {
    /// Returns `true` if the body is [`ResponseBody::Empty`] or zero length bytes.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Bytes(bytes) => bytes.is_empty(),
            Self::File(_) => false,
        }
    }

    /// Returns the body if it is in memory.
    #[inline]
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Self::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Read the whole body into memory.
    ///
    /// # Errors
    ///
    /// Returns error if reading the temporary file fails.
    pub fn into_bytes(self) -> io::Result<Bytes> {
        match self {
            Self::Empty => Ok(Bytes::new()),
            Self::Bytes(bytes) => Ok(bytes),
            Self::File(mut file) => {
                file.seek(SeekFrom::Start(0))?;
                let mut buffer = Vec::new();
                file.read_to_end(&mut buffer)?;
                Ok(buffer.into())
            }
        }
    }

    /// Read the whole body as UTF-8 text, replacing invalid sequences.
    ///
    /// # Errors
    ///
    /// Returns error if reading the temporary file fails.
    pub fn into_text(self) -> io::Result<String> {
        let bytes = self.into_bytes()?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}
