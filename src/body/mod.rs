//! HTTP Request Body.
//!
//! - [`Body`] the tagged request body
//! - [`BodyStream`] streamed body, optionally with a known length
//! - [`BodyAggregate`] body that resolves to a content type and a flattened body, e.g. [`Form`]
//!   or [`Multipart`]
mod chunked;
mod form;

pub use chunked::Chunked;
pub(crate) use chunked::ChunkedDecoder;
pub use form::{Form, Multipart};

use bytes::{Bytes, BytesMut};
use futures_core::Stream;
use std::{
    io,
    pin::Pin,
    task::{Context, Poll, ready},
};
use tokio::io::{AsyncRead, ReadBuf};

use crate::headers::HeaderValue;

/// Request message body.
#[derive(Default)]
pub enum Body {
    /// No body.
    #[default]
    Empty,
    /// Buffered body, sent in one write.
    Full(Bytes),
    /// Streamed body, sent one chunk at a time.
    Stream(BodyStream),
    /// Body that resolves to its own content type and a nested body.
    Aggregate(Box<dyn BodyAggregate>),
}

impl Body {
    /// Returns `true` if this is [`Body::Empty`].
    #[inline]
    pub const fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Returns the body length if it is known without consuming the body.
    pub fn len(&self) -> Option<u64> {
        match self {
            Self::Empty => Some(0),
            Self::Full(bytes) => Some(bytes.len() as u64),
            Self::Stream(stream) => stream.len(),
            Self::Aggregate(_) => None,
        }
    }

    /// Clone the body if it can be sent again.
    ///
    /// Streamed bodies are consumed while sending and cannot be rewound.
    pub fn try_clone(&self) -> Option<Body> {
        match self {
            Self::Empty => Some(Self::Empty),
            Self::Full(bytes) => Some(Self::Full(bytes.clone())),
            Self::Stream(_) | Self::Aggregate(_) => None,
        }
    }
}

impl std::fmt::Debug for Body {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => f.write_str("Empty"),
            Self::Full(bytes) => f.debug_tuple("Full").field(&bytes.len()).finish(),
            Self::Stream(stream) => f.debug_tuple("Stream").field(stream).finish(),
            Self::Aggregate(_) => f.write_str("Aggregate"),
        }
    }
}

impl From<Bytes> for Body {
    #[inline]
    fn from(value: Bytes) -> Self {
        Self::Full(value)
    }
}

impl From<&'static str> for Body {
    #[inline]
    fn from(value: &'static str) -> Self {
        Self::Full(Bytes::from_static(value.as_bytes()))
    }
}

impl From<&'static [u8]> for Body {
    #[inline]
    fn from(value: &'static [u8]) -> Self {
        Self::Full(Bytes::from_static(value))
    }
}

impl From<String> for Body {
    #[inline]
    fn from(value: String) -> Self {
        Self::Full(value.into())
    }
}

impl From<Vec<u8>> for Body {
    #[inline]
    fn from(value: Vec<u8>) -> Self {
        Self::Full(value.into())
    }
}

impl From<BodyStream> for Body {
    #[inline]
    fn from(value: BodyStream) -> Self {
        Self::Stream(value)
    }
}

impl From<Form> for Body {
    #[inline]
    fn from(value: Form) -> Self {
        Self::Aggregate(Box::new(value))
    }
}

impl From<Multipart> for Body {
    #[inline]
    fn from(value: Multipart) -> Self {
        Self::Aggregate(Box::new(value))
    }
}

// ===== Aggregate =====

/// A body that knows its own content type, such as an encoded form.
pub trait BodyAggregate: Send {
    /// Value for the `Content-Type` header.
    fn content_type(&self) -> HeaderValue;

    /// Flatten into the body that is actually sent.
    fn into_body(self: Box<Self>) -> Body;
}

// ===== Stream =====

type BoxStream = Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send>>;

/// Streamed body.
///
/// When the length is known, it is sent with `Content-Length`, otherwise with chunked transfer
/// coding, or buffered entirely for HTTP/1.0.
pub struct BodyStream {
    inner: BoxStream,
    len: Option<u64>,
}

impl BodyStream {
    /// Create body stream with unknown length.
    pub fn new<S>(stream: S) -> Self
    where
        S: Stream<Item = io::Result<Bytes>> + Send + 'static,
    {
        Self {
            inner: Box::pin(stream),
            len: None,
        }
    }

    /// Create body stream that yields exactly `len` bytes.
    pub fn with_len<S>(stream: S, len: u64) -> Self
    where
        S: Stream<Item = io::Result<Bytes>> + Send + 'static,
    {
        Self {
            inner: Box::pin(stream),
            len: Some(len),
        }
    }

    /// Create body stream from chunks in memory.
    ///
    /// The length is left unknown, so the chunks are sent as they are yielded.
    pub fn from_chunks<I>(chunks: I) -> Self
    where
        I: IntoIterator<Item = Bytes>,
        I::IntoIter: Send + 'static,
    {
        Self::new(Chunks {
            iter: chunks.into_iter(),
        })
    }

    /// Create body stream that reads from an [`AsyncRead`], such as a file.
    pub fn from_reader<R>(reader: R) -> Self
    where
        R: AsyncRead + Send + 'static,
    {
        Self::new(Reader {
            reader: Box::pin(reader),
            buffer: BytesMut::new(),
        })
    }

    /// Returns the body length if it is known.
    #[inline]
    pub const fn len(&self) -> Option<u64> {
        self.len
    }

    /// Poll for the next chunk, returns `None` when the stream is exhausted.
    #[inline]
    pub fn poll_chunk(&mut self, cx: &mut Context) -> Poll<Option<io::Result<Bytes>>> {
        self.inner.as_mut().poll_next(cx)
    }

    /// Read the whole stream into memory.
    pub async fn collect(mut self) -> io::Result<Bytes> {
        let mut buffer = BytesMut::new();
        while let Some(chunk) = std::future::poll_fn(|cx| self.poll_chunk(cx)).await {
            buffer.extend_from_slice(&chunk?);
        }
        Ok(buffer.freeze())
    }
}

impl Stream for BodyStream {
    type Item = io::Result<Bytes>;

    #[inline]
    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().poll_chunk(cx)
    }
}

impl std::fmt::Debug for BodyStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BodyStream").field("len", &self.len).finish_non_exhaustive()
    }
}

struct Chunks<I> {
    iter: I,
}

impl<I> Unpin for Chunks<I> { }

impl<I: Iterator<Item = Bytes>> Stream for Chunks<I> {
    type Item = io::Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Poll::Ready(self.get_mut().iter.next().map(Ok))
    }
}

const READ_CHUNK: usize = 0x2000;

struct Reader<R> {
    reader: Pin<Box<R>>,
    buffer: BytesMut,
}

impl<R: AsyncRead> Stream for Reader<R> {
    type Item = io::Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let me = self.get_mut();
        me.buffer.resize(READ_CHUNK, 0);

        let mut read = ReadBuf::new(&mut me.buffer);
        if let Err(err) = ready!(me.reader.as_mut().poll_read(cx, &mut read)) {
            return Poll::Ready(Some(Err(err)));
        }

        let filled = read.filled().len();
        if filled == 0 {
            return Poll::Ready(None);
        }
        Poll::Ready(Some(Ok(me.buffer.split_to(filled).freeze())))
    }
}
