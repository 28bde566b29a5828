//! Scripted command wire codec
//!
//! Commands travel as single text lines. Replies are length-prefixed with
//! no terminator:
//! ```text
//! client: getChannelCount id:view0\n
//! viewer: 1:1
//! ```
//! A zero-length reply (`0:`) is legal and carries meaning (no data). The
//! length counts UTF-16 code units, so `1:é` is a complete reply.

use std::io;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::common::Error;

/// Longest command line the viewer's listener reads in one go
pub const MAX_COMMAND_LEN: usize = 4096;

/// Sanity limit on reply payloads
pub const MAX_REPLY_LEN: usize = 16 * 1024 * 1024;

/// Digits allowed in a length prefix before we give up on the stream
const MAX_PREFIX_DIGITS: usize = 12;

fn map_eof(e: io::Error) -> Error {
    if e.kind() == io::ErrorKind::UnexpectedEof {
        Error::ConnectionClosed
    } else {
        Error::Io(e)
    }
}

/// Write one command line
pub async fn write_command<W: AsyncWrite + Unpin>(writer: &mut W, line: &str) -> Result<(), Error> {
    if line.contains('\n') || line.contains('\r') {
        return Err(Error::ScriptedProtocol(format!(
            "Command contains a line break: {:?}",
            line
        )));
    }
    if line.len() + 1 > MAX_COMMAND_LEN {
        return Err(Error::ScriptedProtocol(format!(
            "Command too long: {} bytes (limit {})",
            line.len() + 1,
            MAX_COMMAND_LEN
        )));
    }

    writer.write_all(line.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;
    Ok(())
}

/// Read one length-prefixed reply.
///
/// The prefix counts UTF-16 code units of the payload, not bytes, so the
/// body is decoded character by character until that many units are read.
pub async fn read_reply<R: AsyncBufRead + Unpin>(reader: &mut R) -> Result<String, Error> {
    let mut prefix = Vec::new();
    let mut limited = (&mut *reader).take(MAX_PREFIX_DIGITS as u64 + 1);
    let read = limited.read_until(b':', &mut prefix).await.map_err(map_eof)?;

    if read == 0 {
        return Err(Error::ConnectionClosed);
    }
    if prefix.last() != Some(&b':') {
        if prefix.len() > MAX_PREFIX_DIGITS {
            return Err(Error::ScriptedProtocol(format!(
                "Length prefix longer than {} digits",
                MAX_PREFIX_DIGITS
            )));
        }
        return Err(Error::ConnectionClosed);
    }
    prefix.pop();

    let len: usize = std::str::from_utf8(&prefix)
        .ok()
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| {
            Error::ScriptedProtocol(format!(
                "Invalid length prefix: {:?}",
                String::from_utf8_lossy(&prefix)
            ))
        })?;

    if len > MAX_REPLY_LEN {
        return Err(Error::ScriptedProtocol(format!(
            "Reply too large: {} characters",
            len
        )));
    }

    read_units(reader, len).await
}

/// Width of a UTF-8 sequence from its leading byte
fn utf8_width(lead: u8) -> Option<usize> {
    match lead {
        0x00..=0x7F => Some(1),
        0xC2..=0xDF => Some(2),
        0xE0..=0xEF => Some(3),
        0xF0..=0xF4 => Some(4),
        _ => None,
    }
}

/// Decode characters until `units` UTF-16 code units have been read
async fn read_units<R: AsyncBufRead + Unpin>(reader: &mut R, units: usize) -> Result<String, Error> {
    let mut payload = String::with_capacity(units);
    let mut seen = 0;
    let mut buf = [0u8; 4];

    while seen < units {
        reader.read_exact(&mut buf[..1]).await.map_err(map_eof)?;
        let width = utf8_width(buf[0]).ok_or_else(|| {
            Error::ScriptedProtocol(format!("Invalid UTF-8 lead byte 0x{:02x}", buf[0]))
        })?;
        if width > 1 {
            reader.read_exact(&mut buf[1..width]).await.map_err(map_eof)?;
        }
        let text = std::str::from_utf8(&buf[..width])
            .map_err(|e| Error::ScriptedProtocol(format!("Invalid UTF-8: {}", e)))?;
        for c in text.chars() {
            seen += c.len_utf16();
            payload.push(c);
        }
    }

    if seen > units {
        return Err(Error::ScriptedProtocol(format!(
            "Reply splits a character: prefix {} but read {} units",
            units, seen
        )));
    }
    Ok(payload)
}

/// Read one command line (viewer side). Returns `None` at end of stream.
pub async fn read_command<R: AsyncBufRead + Unpin>(reader: &mut R) -> Result<Option<String>, Error> {
    let mut line = String::new();
    let read = reader.read_line(&mut line).await?;
    if read == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

/// Write one length-prefixed reply (viewer side)
pub async fn write_reply<W: AsyncWrite + Unpin>(writer: &mut W, payload: &str) -> Result<(), Error> {
    let framed = format!("{}:{}", payload.encode_utf16().count(), payload);
    writer.write_all(framed.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}
