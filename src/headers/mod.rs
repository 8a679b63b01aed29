//! HTTP Header Multimap.
//!
//! Field names are matched case-insensitively, but kept as written so the request is transmitted
//! exactly as the caller built it. Duplicate fields are preserved in insertion order.
mod name;
mod value;
mod map;
mod error;

#[cfg(test)]
mod test;

pub use name::{HeaderName, AsHeaderName, IntoHeaderName, standard};
pub use value::HeaderValue;
pub use map::{HeaderMap, GetAll, Iter};
pub use error::HeaderError;
