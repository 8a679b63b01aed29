//! Request canonicalization before a request enters the engine.
use crate::{
    body::{Body, BodyStream, Chunked},
    config::Options,
    error::Error,
    headers::{
        HeaderValue,
        standard::{
            ACCEPT_ENCODING, CONNECTION, CONTENT_LENGTH, CONTENT_TYPE, EXPECT, HOST,
            TRANSFER_ENCODING, USER_AGENT,
        },
    },
    http::Version,
    log::debug,
    request::Request,
};

#[cfg(test)]
mod test;

/// Whether this build can decode `gzip` response bodies.
pub(crate) const GZIP_SUPPORT: bool = cfg!(feature = "gzip");

/// Fill in defaults and derive framing headers.
///
/// Only an HTTP/1.0 request with a stream body of unknown length awaits, as that body has to be
/// buffered to learn its length.
pub(crate) async fn normalize(mut req: Request, options: &Options) -> Result<Request, Error> {
    let uri = req.uri();
    if !(uri.is_http() || uri.is_https()) {
        return Err(Error::InvalidRequest(format!(
            "unsupported scheme {:?}, expected http or https",
            uri.scheme()
        )));
    }

    if !req.headers().contains_key(HOST) {
        let host = HeaderValue::from_string(req.uri().host_header());
        req.headers_mut().insert(HOST, host);
    }

    if !req.headers().contains_key(USER_AGENT) {
        let agent = options.user_agent.clone();
        req.headers_mut().insert(USER_AGENT, agent);
    }

    let mut body = req.take_body();
    if req.method().strips_body() {
        body = Body::Empty;
    }

    while let Body::Aggregate(aggregate) = body {
        req.headers_mut().insert(CONTENT_TYPE, aggregate.content_type());
        body = aggregate.into_body();
    }

    let body = match body {
        Body::Empty => {
            if req.method().expects_body() {
                set_length(&mut req, 0);
            }
            Body::Empty
        }
        Body::Full(bytes) if bytes.is_empty() => {
            if req.method().expects_body() {
                set_length(&mut req, 0);
            }
            Body::Empty
        }
        Body::Full(bytes) => {
            set_length(&mut req, bytes.len() as u64);
            Body::Full(bytes)
        }
        Body::Stream(stream) => match stream.len() {
            Some(len) => {
                set_length(&mut req, len);
                Body::Stream(stream)
            }
            None if *req.version() >= Version::HTTP_11 => {
                let headers = req.headers_mut();
                headers.remove(CONTENT_LENGTH);
                headers.insert(TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
                Body::Stream(BodyStream::new(Chunked::new(stream)))
            }
            None => {
                debug!("buffering stream body of HTTP/1.0 request to {}", req.uri());
                let bytes = stream.collect().await.map_err(Error::Body)?;
                set_length(&mut req, bytes.len() as u64);
                match bytes.is_empty() {
                    true => Body::Empty,
                    false => Body::Full(bytes),
                }
            }
        },
        // flattened above
        Body::Aggregate(_) => Body::Empty,
    };

    if !body.is_empty() && options.send_expect_continue && !req.headers().contains_key(EXPECT) {
        req.headers_mut()
            .insert(EXPECT, HeaderValue::from_static("100-continue"));
    }
    *req.body_mut() = body;

    if !options.keep_alive {
        req.headers_mut()
            .insert(CONNECTION, HeaderValue::from_static("close"));
    }

    if options.auto_accept_encoding && GZIP_SUPPORT {
        req.headers_mut()
            .insert(ACCEPT_ENCODING, HeaderValue::from_static("gzip, identity"));
    } else if options.auto_accept_encoding {
        req.headers_mut().remove(ACCEPT_ENCODING);
    }

    Ok(req)
}

fn set_length(req: &mut Request, len: u64) {
    let headers = req.headers_mut();
    headers.insert(CONTENT_LENGTH, HeaderValue::from_u64(len));
    headers.remove(TRANSFER_ENCODING);
}
