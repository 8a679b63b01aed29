use bytes::{Buf, Bytes, BytesMut};
use futures_core::Stream;
use std::{
    fmt::Write,
    pin::Pin,
    task::{Context, Poll, ready},
};

use super::BodyStream;
use crate::common::ParseResult;
use crate::headers::{HeaderMap, HeaderName, HeaderValue};
use crate::proto::ParseError;

const MAX_CHUNKED_SIZE: u64 = u64::MAX >> 1;

/// Longest accepted chunk size line or trailer line.
const MAX_LINE: usize = 0x2000;

const LAST_CHUNK: &[u8] = b"0\r\n\r\n";

// ===== Encoder =====

/// Chunked transfer coding of a [`BodyStream`].
///
/// Every non empty chunk of the inner stream is framed as `size CRLF data CRLF`, and the stream
/// ends with the last chunk `0 CRLF CRLF`.
#[derive(Debug)]
pub struct Chunked {
    inner: BodyStream,
    finished: bool,
}

impl Chunked {
    pub fn new(inner: BodyStream) -> Self {
        Self {
            inner,
            finished: false,
        }
    }

    pub(crate) fn encode_chunk(chunk: &[u8]) -> Bytes {
        let mut buffer = BytesMut::with_capacity(chunk.len() + 20);
        // writing into `BytesMut` cannot fail
        let _ = write!(buffer, "{:x}\r\n", chunk.len());
        buffer.extend_from_slice(chunk);
        buffer.extend_from_slice(b"\r\n");
        buffer.freeze()
    }
}

impl Stream for Chunked {
    type Item = std::io::Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let me = self.get_mut();
        loop {
            if me.finished {
                return Poll::Ready(None);
            }

            return match ready!(me.inner.poll_chunk(cx)) {
                Some(Ok(chunk)) if chunk.is_empty() => continue,
                Some(Ok(chunk)) => Poll::Ready(Some(Ok(Self::encode_chunk(&chunk)))),
                Some(Err(err)) => Poll::Ready(Some(Err(err))),
                None => {
                    me.finished = true;
                    Poll::Ready(Some(Ok(Bytes::from_static(LAST_CHUNK))))
                }
            };
        }
    }
}

// ===== Decoder =====

/// Incremental decoder for chunked transfer coding.
#[derive(Debug)]
pub(crate) struct ChunkedDecoder {
    state: State,
    trailers: HeaderMap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Size,
    Data(u64),
    DataEnd,
    Trailer,
    Done,
}

impl ChunkedDecoder {
    pub(crate) fn new() -> Self {
        Self {
            state: State::Size,
            trailers: HeaderMap::new(),
        }
    }

    /// Returns `true` if the last chunk and trailers have been consumed.
    #[cfg(test)]
    pub(crate) fn is_done(&self) -> bool {
        self.state == State::Done
    }

    /// Take trailer fields received after the last chunk.
    pub(crate) fn take_trailers(&mut self) -> HeaderMap {
        std::mem::take(&mut self.trailers)
    }

    /// Decode the next chunk of data.
    ///
    /// Returns `Ok(None)` when the body is complete, the bytes following the body are left in
    /// `buffer`.
    pub(crate) fn decode(&mut self, buffer: &mut BytesMut) -> ParseResult<Option<Bytes>, ParseError> {
        loop {
            match self.state {
                State::Size => {
                    let line = match take_line(buffer) {
                        ParseResult::Ok(line) => line,
                        ParseResult::Pending => return ParseResult::Pending,
                        ParseResult::Err(err) => return ParseResult::Err(err),
                    };
                    let size = line[..].split(|&b| b == b';').next().unwrap_or_default().trim_ascii();
                    if size.is_empty() || size.len() > 16 || !size.iter().all(u8::is_ascii_hexdigit) {
                        return ParseResult::Err(ParseError::InvalidChunked);
                    }
                    // SAFETY: `is_ascii_hexdigit` is subset of ASCII
                    let digits = unsafe { str::from_utf8_unchecked(size) };
                    let Ok(len) = u64::from_str_radix(digits, 16) else {
                        return ParseResult::Err(ParseError::InvalidChunked);
                    };
                    if len > MAX_CHUNKED_SIZE {
                        return ParseResult::Err(ParseError::ChunkTooLarge);
                    }
                    self.state = match len {
                        0 => State::Trailer,
                        len => State::Data(len),
                    };
                }
                State::Data(remaining) => {
                    if buffer.is_empty() {
                        return ParseResult::Pending;
                    }
                    let read = remaining.min(buffer.len() as u64);
                    self.state = match remaining - read {
                        0 => State::DataEnd,
                        leftover => State::Data(leftover),
                    };
                    return ParseResult::Ok(Some(buffer.split_to(read as usize).freeze()));
                }
                State::DataEnd => {
                    match buffer.first_chunk::<2>() {
                        Some(b"\r\n") => buffer.advance(2),
                        Some(_) => return ParseResult::Err(ParseError::InvalidChunked),
                        None => return ParseResult::Pending,
                    }
                    self.state = State::Size;
                }
                State::Trailer => {
                    let line = match take_line(buffer) {
                        ParseResult::Ok(line) => line,
                        ParseResult::Pending => return ParseResult::Pending,
                        ParseResult::Err(err) => return ParseResult::Err(err),
                    };
                    if line.is_empty() {
                        self.state = State::Done;
                        continue;
                    }
                    let Some(colon) = line.iter().position(|&b| b == b':') else {
                        return ParseResult::Err(ParseError::InvalidChunked);
                    };
                    let (Ok(name), Ok(value)) = (
                        HeaderName::from_slice(&line[..colon]),
                        HeaderValue::from_bytes(Bytes::copy_from_slice(line[colon + 1..].trim_ascii())),
                    ) else {
                        return ParseResult::Err(ParseError::InvalidChunked);
                    };
                    self.trailers.append(name, value);
                }
                State::Done => return ParseResult::Ok(None),
            }
        }
    }
}

/// Split one line off the buffer, without its line terminator.
fn take_line(buffer: &mut BytesMut) -> ParseResult<BytesMut, ParseError> {
    let Some(lf) = buffer.iter().position(|&b| b == b'\n') else {
        if buffer.len() > MAX_LINE {
            return ParseResult::Err(ParseError::InvalidChunked);
        }
        return ParseResult::Pending;
    };
    let mut line = buffer.split_to(lf + 1);
    line.truncate(lf);
    if line.last() == Some(&b'\r') {
        line.truncate(lf - 1);
    }
    ParseResult::Ok(line)
}
