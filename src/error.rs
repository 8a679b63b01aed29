//! Client errors.
use std::io;

use crate::config::ConfigError;
use crate::proto::ParseError;

/// Error of a single request.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The request cannot be sent, e.g. the URI is not an absolute `http` or `https` URI.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    /// Host name resolution failed, no connection was attempted.
    #[error("dns resolution failed for {host}")]
    Dns {
        host: String,
        #[source]
        source: io::Error,
    },
    /// The connection was not established within the connect timeout.
    #[error("connect timeout to {0}")]
    ConnectTimeout(String),
    /// The exchange did not complete within the transfer timeout.
    #[error("transfer timeout")]
    TransferTimeout,
    /// The connection failed or was closed before the response was complete.
    #[error("transport error: {0}")]
    Transport(#[source] io::Error),
    /// Reading the request body failed.
    #[error("request body error: {0}")]
    Body(#[source] io::Error),
    /// The response is malformed.
    #[error(transparent)]
    Parse(#[from] ParseError),
    /// The response body cannot be decompressed.
    #[error("decompression failed: {0}")]
    Decompress(#[source] io::Error),
    /// Invalid client option.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The request was cancelled.
    #[error("request cancelled")]
    Cancelled,
    /// The client was dropped or its runtime shut down.
    #[error("client closed")]
    Closed,
}

impl Error {
    /// Returns `true` for connect and transfer timeouts.
    #[inline]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::ConnectTimeout(_) | Self::TransferTimeout)
    }

    /// Returns `true` if the request was cancelled.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
