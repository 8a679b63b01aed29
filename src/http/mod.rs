//! HTTP Protocol vocabulary.
mod method;
mod status;
mod version;

pub mod uri;

pub use method::{Method, UnknownMethod};
pub use status::{InvalidStatusCode, StatusCode};
#[doc(inline)]
pub use uri::Uri;
pub use version::{UnsupportedVersion, Version};
