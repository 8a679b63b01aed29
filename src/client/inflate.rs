//! `gzip` response body decoding.
use flate2::read::GzDecoder;
use std::io::{self, Read, Seek, SeekFrom};

use crate::response::ResponseBody;

/// Decode a `gzip` encoded body.
///
/// A body in memory is decoded in memory, a body in a temporary file is decoded into a new
/// temporary file.
pub(crate) fn inflate(body: ResponseBody) -> io::Result<ResponseBody> {
    match body {
        ResponseBody::Empty => Ok(ResponseBody::Empty),
        ResponseBody::Bytes(bytes) => {
            let mut decoded = Vec::with_capacity(bytes.len() * 2);
            GzDecoder::new(&bytes[..]).read_to_end(&mut decoded)?;
            Ok(ResponseBody::Bytes(decoded.into()))
        }
        ResponseBody::File(mut file) => {
            file.seek(SeekFrom::Start(0))?;
            let mut decoded = tempfile::tempfile()?;
            io::copy(&mut GzDecoder::new(file), &mut decoded)?;
            decoded.seek(SeekFrom::Start(0))?;
            Ok(ResponseBody::File(decoded))
        }
    }
}

#[cfg(test)]
mod test {
    use flate2::{Compression, write::GzEncoder};
    use std::io::{Seek, SeekFrom, Write};

    use super::inflate;
    use crate::response::ResponseBody;

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn inflate_memory() {
        let body = ResponseBody::Bytes(gzip(b"hello gzip").into());
        let body = inflate(body).unwrap();
        assert_eq!(body.as_bytes().unwrap(), &b"hello gzip"[..]);

        let err = inflate(ResponseBody::Bytes("not gzip".into()));
        assert!(err.is_err());
    }

    #[test]
    fn inflate_file() {
        let data = b"spilled ".repeat(1024);
        let mut file = tempfile::tempfile().unwrap();
        file.write_all(&gzip(&data)).unwrap();
        file.seek(SeekFrom::End(0)).unwrap();

        let body = inflate(ResponseBody::File(file)).unwrap();
        assert!(matches!(body, ResponseBody::File(_)));
        assert_eq!(body.into_bytes().unwrap(), data);
    }
}
