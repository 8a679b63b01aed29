/// Header name or value validation error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum HeaderError {
    /// Name is empty or contains a non token character.
    #[error("invalid header name")]
    InvalidName,
    /// Value contains a control character.
    #[error("invalid header value")]
    InvalidValue,
    /// Value exceeds the maximum length.
    #[error("header value too long")]
    TooLong,
}

impl HeaderError {
    pub(crate) const fn panic_const(self) -> ! {
        match self {
            Self::InvalidName => panic!("invalid header name"),
            Self::InvalidValue => panic!("invalid header value"),
            Self::TooLong => panic!("header value too long"),
        }
    }
}
