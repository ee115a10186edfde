// src/exec/stream.rs

//! Line sources over plugin pipes and the relay tasks that drain them.

use std::fmt;
use std::io;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tracing::{trace, warn};

/// Capacity of each relay channel.
pub const RELAY_CAPACITY: usize = 64;

/// Consecutive read errors after which a relay gives up on its pipe.
const MAX_READ_ERRORS: usize = 16;

type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;

/// Sequential source of text lines read from one pipe.
///
/// Lines come back without their trailing `\n` / `\r\n`; everything else,
/// leading whitespace included, is kept. Bytes that are not valid UTF-8 are
/// replaced with `U+FFFD` rather than failing the read. The source ends when
/// the pipe closes (child exit or crash).
pub struct LineSource {
    reader: BufReader<BoxedReader>,
    buf: Vec<u8>,
}

impl LineSource {
    pub fn new<R>(reader: R) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        let boxed: BoxedReader = Box::new(reader);
        Self {
            reader: BufReader::new(boxed),
            buf: Vec::new(),
        }
    }

    /// Next line, or `None` once the pipe is exhausted.
    ///
    /// Cancel safe: a partially read line stays buffered for the next call.
    pub async fn next_line(&mut self) -> io::Result<Option<String>> {
        self.reader.read_until(b'\n', &mut self.buf).await?;
        if self.buf.is_empty() {
            return Ok(None);
        }

        let line = decode_line(&self.buf);
        self.buf.clear();
        Ok(Some(line))
    }
}

impl fmt::Debug for LineSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LineSource")
            .field("buffered", &self.buf.len())
            .finish_non_exhaustive()
    }
}

fn decode_line(raw: &[u8]) -> String {
    let raw = match raw.strip_suffix(b"\n") {
        Some(line) => line.strip_suffix(b"\r").unwrap_or(line),
        None => raw,
    };
    String::from_utf8_lossy(raw).into_owned()
}

/// Spawn a relay task that drains `source` into a channel.
///
/// Lines are forwarded unchanged, in the order the pipe produced them, until
/// the source is exhausted. If the receiver is dropped first, the task keeps
/// reading and discards the remaining output so the child never blocks on a
/// full pipe. A read error is logged and reading continues.
pub fn attach_stream(mut source: LineSource, stream: &'static str) -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel::<String>(RELAY_CAPACITY);

    tokio::spawn(async move {
        let mut forwarding = true;
        let mut errors = 0;

        loop {
            match source.next_line().await {
                Ok(Some(line)) => {
                    errors = 0;
                    if forwarding && tx.send(line).await.is_err() {
                        trace!(stream, "relay receiver dropped; discarding further output");
                        forwarding = false;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    errors += 1;
                    warn!(stream, error = %e, "scanning plugin stream");
                    if errors >= MAX_READ_ERRORS {
                        warn!(stream, "too many read errors; abandoning plugin stream");
                        break;
                    }
                }
            }
        }

        trace!(stream, "relay finished");
    });

    rx
}
