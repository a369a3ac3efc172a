//! HTTP upgrade handshake for both ends of a connection
//!
//! The server reads the request header block, computes the accept token and
//! answers `101 Switching Protocols`. The client sends the upgrade request and
//! consumes the response header block without checking the accept token.

use base64::prelude::*;
use log::debug;
use sha1::{Digest, Sha1};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::constants::{MAX_HANDSHAKE_BYTES, WEBSOCKET_GUID, WEBSOCKET_VERSION};
use crate::error::{Result, RustyChatError};

const KEY_HEADER: &str = "Sec-WebSocket-Key";
const BAD_REQUEST_RESPONSE: &str = "HTTP/1.1 400 Bad Request\r\nConnection: close\r\n\r\n";

/// Compute the `Sec-WebSocket-Accept` value for a client key
pub fn accept_token(key: &str) -> String {
    let mut sha1 = Sha1::new();
    sha1.update(key.as_bytes());
    sha1.update(WEBSOCKET_GUID.as_bytes());
    BASE64_STANDARD.encode(sha1.finalize())
}

/// Random client key: 16 bytes, base64 encoded
pub fn generate_key() -> String {
    let nonce: [u8; 16] = rand::random();
    BASE64_STANDARD.encode(nonce)
}

/// Read a header block line by line until the blank line that ends it.
///
/// The first line (request or status line) is returned as the first element.
/// Only the header block is consumed; bytes after the blank line stay buffered
/// in `reader` for the frame decoder.
async fn read_header_block<R>(reader: &mut R) -> Result<Vec<String>>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = Vec::new();
    let mut consumed = 0usize;

    loop {
        // One byte past the remaining budget tells an overrun from a line
        // that ends exactly at the limit
        let budget = (MAX_HANDSHAKE_BYTES - consumed + 1) as u64;
        let mut buf = Vec::new();
        let read = (&mut *reader).take(budget).read_until(b'\n', &mut buf).await?;
        if read == 0 {
            return Err(RustyChatError::ConnectionClosed);
        }

        consumed += read;
        if consumed > MAX_HANDSHAKE_BYTES {
            return Err(RustyChatError::HandshakeError(format!(
                "header block exceeds {} bytes",
                MAX_HANDSHAKE_BYTES
            )));
        }
        if buf.last() != Some(&b'\n') {
            return Err(RustyChatError::ConnectionClosed);
        }

        let line = std::str::from_utf8(&buf).map_err(|_| {
            RustyChatError::HandshakeError("header line is not valid UTF-8".to_string())
        })?;
        let line = line.trim_end_matches(&['\r', '\n'][..]);
        if line.is_empty() {
            return Ok(lines);
        }
        lines.push(line.to_string());
    }
}

/// Find the value of `name` among `Name: value` header lines, ignoring case
fn header_value<'a>(lines: &'a [String], name: &str) -> Option<&'a str> {
    lines.iter().find_map(|line| {
        let (header, value) = line.split_once(':')?;
        header
            .trim()
            .eq_ignore_ascii_case(name)
            .then(|| value.trim())
    })
}

/// Server side of the handshake.
///
/// Returns the client key once the `101` response has been written. Fails with
/// `MissingKey` when the request carries no usable `Sec-WebSocket-Key`; nothing
/// is written in that case.
pub async fn accept<R, W>(reader: &mut R, writer: &mut W) -> Result<String>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let lines = read_header_block(reader).await?;
    if let Some(request_line) = lines.first() {
        debug!("Upgrade request: {}", request_line);
    }

    let key = match header_value(&lines, KEY_HEADER) {
        Some(key) if !key.is_empty() => key.to_string(),
        _ => return Err(RustyChatError::MissingKey),
    };

    let response = format!(
        "HTTP/1.1 101 Switching Protocols\r\n\
         Upgrade: websocket\r\n\
         Connection: Upgrade\r\n\
         Sec-WebSocket-Accept: {}\r\n\r\n",
        accept_token(&key)
    );
    writer.write_all(response.as_bytes()).await?;
    writer.flush().await?;

    Ok(key)
}

/// Answer a failed upgrade attempt before the connection is dropped
pub async fn reject<W>(writer: &mut W) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(BAD_REQUEST_RESPONSE.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}

/// Client side of the handshake.
///
/// Sends the upgrade request with a fresh key and waits for a `101` status.
/// The server's accept token is not verified.
pub async fn request<R, W>(reader: &mut R, writer: &mut W, host: &str, path: &str) -> Result<String>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let key = generate_key();
    let request = format!(
        "GET {} HTTP/1.1\r\n\
         Host: {}\r\n\
         Upgrade: websocket\r\n\
         Connection: Upgrade\r\n\
         Sec-WebSocket-Key: {}\r\n\
         Sec-WebSocket-Version: {}\r\n\r\n",
        path, host, key, WEBSOCKET_VERSION
    );
    writer.write_all(request.as_bytes()).await?;
    writer.flush().await?;

    let lines = read_header_block(reader).await?;
    let status = lines.first().map(String::as_str).unwrap_or_default();
    if status.split_whitespace().nth(1) != Some("101") {
        return Err(RustyChatError::HandshakeError(format!(
            "unexpected response: {}",
            status
        )));
    }

    Ok(key)
}
