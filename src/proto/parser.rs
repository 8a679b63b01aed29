use bytes::{Buf, Bytes, BytesMut};

use crate::body::ChunkedDecoder;
use crate::common::ParseResult;
use crate::headers::{HeaderMap, HeaderName, HeaderValue, standard::{CONTENT_LENGTH, TRANSFER_ENCODING}};
use crate::http::{Method, StatusCode, Version};
use crate::response::Response;

macro_rules! ready {
    ($e:expr) => {
        match $e {
            ParseResult::Ok(ok) => ok,
            ParseResult::Pending => return ParseResult::Pending,
            ParseResult::Err(err) => return ParseResult::Err(err),
        }
    };
}

/// Response parsing error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// Status line is malformed.
    #[error("invalid status line")]
    InvalidStatusLine,
    /// Protocol other than `HTTP/1.0` and `HTTP/1.1`.
    #[error("unsupported version")]
    UnsupportedVersion,
    /// Status code is not three digits in `100..=599`.
    #[error("invalid status code")]
    InvalidStatus,
    /// Header line is malformed.
    #[error("invalid header")]
    InvalidHeader,
    /// `Content-Length` is not a number, or multiple values disagree.
    #[error("invalid content length")]
    InvalidContentLength,
    /// Chunked body is malformed.
    #[error("invalid chunked body")]
    InvalidChunked,
    /// Chunk size does not fit.
    #[error("chunk too large")]
    ChunkTooLarge,
    /// Response head exceeds the configured limit.
    #[error("response header too large")]
    HeaderTooLarge,
    /// Response body exceeds the configured limit.
    #[error("response body too large")]
    BodyTooLarge,
}

/// Parser size limits, `None` is unlimited.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Limits {
    pub(crate) max_header_bytes: Option<usize>,
    pub(crate) max_body_bytes: Option<u64>,
}

/// Parsed unit of a response.
#[derive(Debug)]
pub(crate) enum Frame {
    /// Status line and headers, either an interim `1xx` response or the final one.
    Head(Response),
    /// Body bytes, already stripped of transfer coding.
    Data(Bytes),
    /// Final response is complete, with trailer fields if any.
    End(HeaderMap),
}

#[derive(Debug)]
enum State {
    Head,
    Length(u64),
    Chunked(ChunkedDecoder),
    Eof,
    Done,
}

/// Incremental response parser for one request.
#[derive(Debug)]
pub(crate) struct ResponseParser {
    method: Method,
    limits: Limits,
    state: State,
    body_read: u64,
}

impl ResponseParser {
    /// Create parser for the response of a request with `method`.
    pub(crate) fn new(method: Method, limits: Limits) -> Self {
        Self {
            method,
            limits,
            state: State::Head,
            body_read: 0,
        }
    }

    /// Returns `true` if the body is delimited by connection closure and is being read.
    pub(crate) fn is_eof_body(&self) -> bool {
        matches!(self.state, State::Eof)
    }

    /// Returns `true` once the final response is complete.
    #[cfg(test)]
    pub(crate) fn is_done(&self) -> bool {
        matches!(self.state, State::Done)
    }

    /// Complete a close delimited body after the peer closed the connection.
    pub(crate) fn finish_eof(&mut self) -> Option<Frame> {
        if self.is_eof_body() {
            self.state = State::Done;
            Some(Frame::End(HeaderMap::new()))
        } else {
            None
        }
    }

    /// Parse the next frame from `buffer`.
    ///
    /// A single buffer may hold several frames, including multiple messages, so this should be
    /// called until it returns [`ParseResult::Pending`].
    pub(crate) fn parse(&mut self, buffer: &mut BytesMut) -> ParseResult<Frame, ParseError> {
        match &mut self.state {
            State::Head => {
                let head = ready!(self.parse_head(buffer));
                if !head.status().is_informational() {
                    self.state = ready!(ParseResult::from(self.body_state(&head)));
                }
                ParseResult::Ok(Frame::Head(head))
            }
            State::Length(0) => {
                self.state = State::Done;
                ParseResult::Ok(Frame::End(HeaderMap::new()))
            }
            State::Length(remaining) => {
                if buffer.is_empty() {
                    return ParseResult::Pending;
                }
                let read = (*remaining).min(buffer.len() as u64);
                *remaining -= read;
                let data = buffer.split_to(read as usize).freeze();
                self.data(data)
            }
            State::Chunked(decoder) => match ready!(decoder.decode(buffer)) {
                Some(data) => self.data(data),
                None => {
                    let trailers = decoder.take_trailers();
                    self.state = State::Done;
                    ParseResult::Ok(Frame::End(trailers))
                }
            },
            State::Eof => {
                if buffer.is_empty() {
                    return ParseResult::Pending;
                }
                let data = buffer.split().freeze();
                self.data(data)
            }
            State::Done => ParseResult::Pending,
        }
    }

    fn data(&mut self, data: Bytes) -> ParseResult<Frame, ParseError> {
        self.body_read += data.len() as u64;
        match self.limits.max_body_bytes {
            Some(max) if self.body_read > max => ParseResult::Err(ParseError::BodyTooLarge),
            _ => ParseResult::Ok(Frame::Data(data)),
        }
    }

    /// [RFC9112 Message Body Length](https://www.rfc-editor.org/rfc/rfc9112#name-message-body-length)
    fn body_state(&self, head: &Response) -> Result<State, ParseError> {
        if self.method == Method::HEAD || head.status().is_bodyless() {
            return Ok(State::Length(0));
        }
        let headers = head.headers();
        if headers.contains_key(TRANSFER_ENCODING) {
            let chunked = headers
                .get_all(TRANSFER_ENCODING)
                .last()
                .and_then(|value| value.as_bytes().rsplit(|&b| b == b',').next())
                .is_some_and(|coding| coding.trim_ascii().eq_ignore_ascii_case(b"chunked"));
            return match chunked {
                true => Ok(State::Chunked(ChunkedDecoder::new())),
                false => Ok(State::Eof),
            };
        }
        match content_length(headers)? {
            Some(len) => Ok(State::Length(len)),
            None => Ok(State::Eof),
        }
    }

    fn parse_head(&mut self, buffer: &mut BytesMut) -> ParseResult<Response, ParseError> {
        // leading empty lines are ignored
        while let Some(b'\r' | b'\n') = buffer.first() {
            buffer.advance(1);
        }

        let Some(len) = find_head_end(buffer) else {
            if self.limits.max_header_bytes.is_some_and(|max| buffer.len() > max) {
                return ParseResult::Err(ParseError::HeaderTooLarge);
            }
            return ParseResult::Pending;
        };
        if self.limits.max_header_bytes.is_some_and(|max| len > max) {
            return ParseResult::Err(ParseError::HeaderTooLarge);
        }

        let head = buffer.split_to(len).freeze();
        let mut lines = head
            .split(|&b| b == b'\n')
            .map(|line| line.strip_suffix(b"\r").unwrap_or(line))
            .take_while(|line| !line.is_empty());

        let Some(status_line) = lines.next() else {
            return ParseResult::Err(ParseError::InvalidStatusLine);
        };
        let (version, status, reason) = ready!(parse_status_line(status_line));

        let mut headers = HeaderMap::new();
        for line in lines {
            let (name, value) = ready!(parse_header(&head, line));
            headers.append(name, value);
        }

        self.body_read = 0;
        ParseResult::Ok(Response::new(version, status, reason, headers))
    }
}

/// Returns the length of the head including the terminating empty line.
fn find_head_end(buffer: &[u8]) -> Option<usize> {
    let mut offset = 0;
    while let Some(lf) = buffer[offset..].iter().position(|&b| b == b'\n') {
        let next = offset + lf + 1;
        match &buffer[next..] {
            [b'\n', ..] => return Some(next + 1),
            [b'\r', b'\n', ..] => return Some(next + 2),
            _ => offset = next,
        }
    }
    None
}

fn parse_status_line(line: &[u8]) -> ParseResult<(Version, StatusCode, String), ParseError> {
    let mut parts = line.splitn(3, |&b| b == b' ');
    let (Some(version), Some(status)) = (parts.next(), parts.next()) else {
        return ParseResult::Err(ParseError::InvalidStatusLine);
    };
    let reason = parts.next().unwrap_or_default();

    let Some(version) = Version::from_bytes(version) else {
        return match version.starts_with(b"HTTP/") {
            true => ParseResult::Err(ParseError::UnsupportedVersion),
            false => ParseResult::Err(ParseError::InvalidStatusLine),
        };
    };
    let Ok(status) = StatusCode::from_bytes(status) else {
        return ParseResult::Err(ParseError::InvalidStatus);
    };

    let reason = String::from_utf8_lossy(reason.trim_ascii()).into_owned();
    ParseResult::Ok((version, status, reason))
}

fn parse_header(head: &Bytes, line: &[u8]) -> ParseResult<(HeaderName, HeaderValue), ParseError> {
    let Some(colon) = line.iter().position(|&b| b == b':') else {
        return ParseResult::Err(ParseError::InvalidHeader);
    };
    let Ok(name) = HeaderName::from_bytes(head.slice_ref(&line[..colon])) else {
        return ParseResult::Err(ParseError::InvalidHeader);
    };
    let Ok(value) = HeaderValue::from_bytes(head.slice_ref(line[colon + 1..].trim_ascii())) else {
        return ParseResult::Err(ParseError::InvalidHeader);
    };
    ParseResult::Ok((name, value))
}

/// Duplicate values are accepted only if they are all equal.
fn content_length(headers: &HeaderMap) -> Result<Option<u64>, ParseError> {
    let mut length = None;
    for value in headers.get_all(CONTENT_LENGTH) {
        for item in value.as_bytes().split(|&b| b == b',') {
            let item = item.trim_ascii();
            if item.is_empty() || !item.iter().all(u8::is_ascii_digit) {
                return Err(ParseError::InvalidContentLength);
            }
            // SAFETY: `is_ascii_digit` is subset of ASCII
            let digits = unsafe { str::from_utf8_unchecked(item) };
            let Ok(len) = digits.parse::<u64>() else {
                return Err(ParseError::InvalidContentLength);
            };
            if length.is_some_and(|prev| prev != len) {
                return Err(ParseError::InvalidContentLength);
            }
            length = Some(len);
        }
    }
    Ok(length)
}
