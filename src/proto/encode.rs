use bytes::{BufMut, BytesMut};

use crate::request::Request;

/// Write request line and headers in insertion order, terminated by an empty line.
pub(crate) fn encode_head(req: &Request, bufm: &mut BytesMut) {
    let target = req.uri().request_target();

    bufm.reserve(64 + target.len());
    bufm.put_slice(req.method().as_str().as_bytes());
    bufm.put_slice(b" ");
    bufm.put_slice(target.as_bytes());
    bufm.put_slice(b" ");
    bufm.put_slice(req.version().as_str().as_bytes());
    bufm.put_slice(b"\r\n");

    for (name, value) in req.headers() {
        bufm.put_slice(name.as_str().as_bytes());
        bufm.put_slice(b": ");
        bufm.put_slice(value.as_bytes());
        bufm.put_slice(b"\r\n");
    }

    bufm.put_slice(b"\r\n");
}
