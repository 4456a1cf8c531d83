//! Line reader for captured child process output.
//!
//! Scrapers print whatever their HTML parsers hand them, so invalid UTF-8 is
//! replaced instead of ending the stream.

use std::io;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};

pub struct OutputLines<R> {
    reader: BufReader<R>,
    buf: Vec<u8>,
}

impl<R: AsyncRead + Unpin> OutputLines<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
            buf: Vec::with_capacity(256),
        }
    }

    /// Next line without its terminator, or `None` at EOF
    pub async fn next_line(&mut self) -> io::Result<Option<String>> {
        self.buf.clear();
        let read = self.reader.read_until(b'\n', &mut self.buf).await?;
        if read == 0 {
            return Ok(None);
        }
        if self.buf.last() == Some(&b'\n') {
            self.buf.pop();
        }
        if self.buf.last() == Some(&b'\r') {
            self.buf.pop();
        }
        Ok(Some(String::from_utf8_lossy(&self.buf).into_owned()))
    }
}
