//! Async output readers (non-UTF8-safe).
//!
//! Dev servers and bundlers can emit arbitrary bytes (ANSI sequences, partial
//! multi-byte characters). `BufReader::lines()` would end the reader task on
//! invalid UTF-8, so lines are framed on raw bytes and decoded lossily.

use std::sync::Arc;

use devconsole_core::LogOrigin;
use devconsole_core::ports::LogSinkPort;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::task::JoinHandle;
use tracing::{debug, trace};

/// Decode one framed line, dropping the line terminator.
///
/// Returns `None` for lines that are empty or whitespace only.
pub(crate) fn decode_line(mut bytes: &[u8]) -> Option<String> {
    if let Some(rest) = bytes.strip_suffix(b"\n") {
        bytes = rest;
    }
    if let Some(rest) = bytes.strip_suffix(b"\r") {
        bytes = rest;
    }

    let line = String::from_utf8_lossy(bytes);
    if line.trim().is_empty() {
        None
    } else {
        Some(line.into_owned())
    }
}

/// Read `stream` until EOF, appending each complete line to `sink`.
///
/// A trailing line without a newline is flushed when the stream closes.
pub(crate) fn spawn_stream_reader(
    stream: impl AsyncRead + Unpin + Send + 'static,
    pid: u32,
    origin: LogOrigin,
    sink: Arc<dyn LogSinkPort>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut reader = BufReader::new(stream);
        let mut buf: Vec<u8> = Vec::with_capacity(1024);

        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {
                    if let Some(line) = decode_line(&buf) {
                        trace!(pid, stream = %origin, "{}", line);
                        sink.append(origin, line);
                    }
                }
                Err(e) => {
                    debug!(pid, stream = %origin, error = %e, "output reader exiting due to read error");
                    break;
                }
            }
        }

        debug!(pid, stream = %origin, "output reader task exiting");
    })
}
