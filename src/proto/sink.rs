use bytes::BytesMut;
use std::{
    fs::File,
    io::{self, Seek, SeekFrom, Write},
};

use crate::response::ResponseBody;

/// Destination of received body bytes.
///
/// Bytes are kept in memory until the spill threshold is exceeded, after which everything is
/// moved into an anonymous temporary file.
#[derive(Debug)]
pub(crate) struct BodySink {
    store: bool,
    spill_threshold: u64,
    memory: BytesMut,
    file: Option<File>,
}

impl BodySink {
    pub(crate) fn new(store: bool, spill_threshold: u64) -> Self {
        Self {
            store,
            spill_threshold,
            memory: BytesMut::new(),
            file: None,
        }
    }

    pub(crate) fn write(&mut self, chunk: &[u8]) -> io::Result<()> {
        if !self.store {
            return Ok(());
        }
        if let Some(file) = &mut self.file {
            return file.write_all(chunk);
        }
        if (self.memory.len() + chunk.len()) as u64 > self.spill_threshold {
            let mut file = tempfile::tempfile()?;
            file.write_all(&self.memory)?;
            file.write_all(chunk)?;
            self.memory = BytesMut::new();
            self.file = Some(file);
            return Ok(());
        }
        self.memory.extend_from_slice(chunk);
        Ok(())
    }

    pub(crate) fn finish(self) -> io::Result<ResponseBody> {
        match self.file {
            Some(mut file) => {
                file.flush()?;
                file.seek(SeekFrom::Start(0))?;
                Ok(ResponseBody::File(file))
            }
            None if self.memory.is_empty() => Ok(ResponseBody::Empty),
            None => Ok(ResponseBody::Bytes(self.memory.freeze())),
        }
    }
}
