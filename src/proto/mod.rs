//! HTTP/1.x wire protocol of the client side.
//!
//! - [`encode_head`] serializes a request line and header block
//! - [`ResponseParser`] incrementally parses responses fed from a connection
//! - [`BodySink`] stores received body bytes in memory or a temporary file
mod encode;
mod parser;
mod sink;

pub use parser::ParseError;
pub(crate) use encode::encode_head;
pub(crate) use parser::{Frame, Limits, ResponseParser};
pub(crate) use sink::BodySink;
