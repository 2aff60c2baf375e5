//! Frame decoding: raw byte chunks to complete text lines.
//!
//! The wire protocol is line-oriented, but network chunks arrive at
//! arbitrary boundaries. A single pending buffer carries the trailing
//! partial line between feeds. Splitting happens in byte space on `\n`
//! (an ASCII byte), so a multi-byte UTF-8 scalar broken across chunks
//! stays buffered until its line completes and is never corrupted.

use crate::error::{StreamError, StreamResult};
use bytes::BytesMut;

const MAX_BUFFER_SIZE: usize = 1024 * 1024;

/// Incremental line decoder over a chunked byte stream.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: BytesMut,
}

impl FrameDecoder {
    /// Create a new frame decoder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one network chunk, returning every line it completes.
    ///
    /// A trailing `\r` is stripped from each line. Blank lines are
    /// emitted as empty strings; the parser above decides what to ignore.
    pub fn feed(&mut self, chunk: &[u8]) -> StreamResult<Vec<String>> {
        self.buffer.extend_from_slice(chunk);

        if self.buffer.len() > MAX_BUFFER_SIZE {
            return Err(StreamError::BufferOverflow);
        }

        let mut lines = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let mut line = self.buffer.split_to(pos + 1);
            line.truncate(line.len() - 1);
            if line.last() == Some(&b'\r') {
                line.truncate(line.len() - 1);
            }
            lines.push(String::from_utf8_lossy(&line).into_owned());
        }

        Ok(lines)
    }

    /// Call when the source completes.
    ///
    /// Terminal events are always line-terminated, so an unterminated
    /// tail is not a line and is discarded.
    pub fn finish(&mut self) {
        if !self.buffer.is_empty() {
            tracing::debug!(len = self.buffer.len(), "discarding unterminated tail");
            self.buffer.clear();
        }
    }

    /// Number of buffered bytes still awaiting a line break.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}
