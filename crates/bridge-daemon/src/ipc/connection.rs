//! Newline-delimited JSON over a Unix stream

use serde::Serialize;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter, ReadHalf, WriteHalf};
use tokio::net::UnixStream;

#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Connection closed")]
    Closed,
}

pub type Result<T> = std::result::Result<T, ConnectionError>;

pub struct MessageReader {
    reader: BufReader<ReadHalf<UnixStream>>,
    // partial line survives a cancelled read
    buffer: Vec<u8>,
}

pub struct MessageWriter {
    writer: BufWriter<WriteHalf<UnixStream>>,
}

pub fn split(stream: UnixStream) -> (MessageReader, MessageWriter) {
    let (read_half, write_half) = tokio::io::split(stream);
    (
        MessageReader {
            reader: BufReader::new(read_half),
            buffer: Vec::new(),
        },
        MessageWriter {
            writer: BufWriter::new(write_half),
        },
    )
}

impl MessageReader {
    /// Next JSON value. Blank lines are skipped. Safe to use in `select!`.
    pub async fn read_message(&mut self) -> Result<Value> {
        loop {
            let bytes_read = self.reader.read_until(b'\n', &mut self.buffer).await?;
            if bytes_read == 0 {
                return Err(ConnectionError::Closed);
            }
            if self.buffer.last() != Some(&b'\n') {
                // EOF in the middle of a line, keep reading until it is reported
                continue;
            }

            let line = std::mem::take(&mut self.buffer);
            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }

            return Ok(serde_json::from_slice(&line)?);
        }
    }
}

impl MessageWriter {
    pub async fn write_message<T: Serialize>(&mut self, message: &T) -> Result<()> {
        let json = serde_json::to_string(message)?;

        self.writer.write_all(json.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await?;

        Ok(())
    }
}
