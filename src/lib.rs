//! Asynchronous HTTP/1.1 Client
//!
//! Requests are driven by a single engine task which pools connections per authority, follows
//! redirects, negotiates `100-continue`, and decodes `gzip` bodies.
//!
//! - [`Client`] asynchronous client
//! - [`blocking::Client`] synchronous client
//! - [`Options`] client configuration
//! - [`Request`] / [`Response`] message types
//! - [`Event`] / [`Observer`] request lifecycle observation
#![warn(missing_debug_implementations)]

pub mod http;
pub mod headers;
pub mod body;
pub mod request;
pub mod response;
pub mod config;
pub mod event;
pub mod blocking;

mod client;
mod common;
mod error;
mod log;
mod normalize;
mod pool;
mod proto;
mod transport;

pub use body::{Body, BodyStream, Form, Multipart};
pub use client::{Client, RequestId, ResponseFuture};
pub use config::{ConfigError, OptionValue, Options, TlsOptions};
pub use error::Error;
pub use event::{Event, ObservationId, Observer};
pub use headers::{HeaderMap, HeaderName, HeaderValue};
pub use http::{Method, StatusCode, Uri, Version};
pub use proto::ParseError;
pub use request::{IntoRequest, Request};
pub use response::{Response, ResponseBody};
