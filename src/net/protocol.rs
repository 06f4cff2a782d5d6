//! Line protocol: `<key>\n` in, `OK\n` or `ERROR\n` out, then close.

#![allow(missing_docs)]

use std::io::{BufRead, Read};

/// Server reply to a valid heartbeat.
pub const ACK: &[u8] = b"OK\n";
/// Server reply to anything else.
pub const REJECT: &[u8] = b"ERROR\n";
/// Longest heartbeat line accepted, newline included.
pub const MAX_LINE_BYTES: usize = 4096;

/// Outcome of reading the single request line.
#[derive(Debug, PartialEq, Eq)]
pub enum LineRead {
    /// Bytes up to and including the newline.
    Line(Vec<u8>),
    /// No newline within [`MAX_LINE_BYTES`].
    TooLong,
    /// Stream ended before a newline.
    Eof,
}

/// Read one newline-terminated line, bounded by [`MAX_LINE_BYTES`].
pub fn read_line(reader: &mut impl BufRead) -> std::io::Result<LineRead> {
    let mut buf = Vec::new();
    let limit = u64::try_from(MAX_LINE_BYTES).unwrap_or(u64::MAX);
    reader.by_ref().take(limit).read_until(b'\n', &mut buf)?;
    if buf.last() == Some(&b'\n') {
        Ok(LineRead::Line(buf))
    } else if buf.len() >= MAX_LINE_BYTES {
        Ok(LineRead::TooLong)
    } else {
        Ok(LineRead::Eof)
    }
}

/// Exact comparison after trimming trailing whitespace from the line.
#[must_use]
pub fn key_matches(line: &[u8], key: &str) -> bool {
    line.trim_ascii_end() == key.as_bytes()
}

/// Bytes a client sends for `key`.
#[must_use]
pub fn encode_heartbeat(key: &str) -> Vec<u8> {
    let mut line = Vec::with_capacity(key.len() + 1);
    line.extend_from_slice(key.trim().as_bytes());
    line.push(b'\n');
    line
}

/// Server reply as seen by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Ok,
    Error,
    Other(String),
}

impl Response {
    #[must_use]
    pub fn parse(line: &[u8]) -> Self {
        match line.trim_ascii() {
            b"OK" => Self::Ok,
            b"ERROR" => Self::Error,
            other => Self::Other(String::from_utf8_lossy(other).into_owned()),
        }
    }
}
