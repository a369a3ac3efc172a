//! WebSocket frame codec
//!
//! Encodes single unfragmented frames and decodes frames whose payload length
//! fits the 7-bit or the 16-bit length form. Frames announcing a 64-bit length
//! are rejected rather than truncated.

use log::trace;
use std::io::ErrorKind;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::constants::{
    EXTENDED_LENGTH_16, EXTENDED_LENGTH_64, FIN_BIT, MASK_BIT, MAX_PAYLOAD_SIZE,
    MAX_SHORT_PAYLOAD, OPCODE_CLOSE, OPCODE_TEXT,
};
use crate::error::{Result, RustyChatError};

/// Frame opcode, the low nibble of the first header byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpCode {
    Continuation,
    Text,
    Binary,
    Close,
    Ping,
    Pong,
    Reserved(u8),
}

impl OpCode {
    pub fn from_u8(byte: u8) -> Self {
        match byte & 0x0F {
            0x0 => Self::Continuation,
            OPCODE_TEXT => Self::Text,
            0x2 => Self::Binary,
            OPCODE_CLOSE => Self::Close,
            0x9 => Self::Ping,
            0xA => Self::Pong,
            other => Self::Reserved(other),
        }
    }

    pub fn as_u8(self) -> u8 {
        match self {
            Self::Continuation => 0x0,
            Self::Text => OPCODE_TEXT,
            Self::Binary => 0x2,
            Self::Close => OPCODE_CLOSE,
            Self::Ping => 0x9,
            Self::Pong => 0xA,
            Self::Reserved(other) => other & 0x0F,
        }
    }

    pub fn is_control(self) -> bool {
        matches!(self, Self::Close | Self::Ping | Self::Pong)
    }
}

/// A decoded frame; the payload is always unmasked
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub fin: bool,
    pub opcode: OpCode,
    pub payload: Vec<u8>,
}

impl Frame {
    /// Single unfragmented text frame
    pub fn text(payload: impl Into<Vec<u8>>) -> Self {
        Self {
            fin: true,
            opcode: OpCode::Text,
            payload: payload.into(),
        }
    }

    /// Bare close frame without status code
    pub fn close() -> Self {
        Self {
            fin: true,
            opcode: OpCode::Close,
            payload: Vec::new(),
        }
    }

    pub fn is_close(&self) -> bool {
        self.opcode == OpCode::Close
    }

    /// Payload as text. Invalid UTF-8 sequences are replaced.
    pub fn into_text(self) -> String {
        match String::from_utf8(self.payload) {
            Ok(text) => text,
            Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
        }
    }

    /// Serialize the frame, masking the payload with a fresh random key when
    /// `masked` is set (client to server direction).
    pub fn encode(&self, masked: bool) -> Result<Vec<u8>> {
        let len = self.payload.len();
        if len > MAX_PAYLOAD_SIZE {
            return Err(RustyChatError::MessageTooLarge(len));
        }

        let mut buf = Vec::with_capacity(len + 8);
        let first = (if self.fin { FIN_BIT } else { 0 }) | self.opcode.as_u8();
        buf.push(first);

        let mask_flag = if masked { MASK_BIT } else { 0 };
        if len <= MAX_SHORT_PAYLOAD {
            buf.push(mask_flag | len as u8);
        } else {
            buf.push(mask_flag | EXTENDED_LENGTH_16);
            buf.extend_from_slice(&(len as u16).to_be_bytes());
        }

        if masked {
            let mask: [u8; 4] = rand::random();
            buf.extend_from_slice(&mask);
            let start = buf.len();
            buf.extend_from_slice(&self.payload);
            apply_mask(&mut buf[start..], mask);
        } else {
            buf.extend_from_slice(&self.payload);
        }

        Ok(buf)
    }
}

/// Encode `payload` as a text frame
pub fn encode(payload: &[u8], masked: bool) -> Result<Vec<u8>> {
    Frame::text(payload).encode(masked)
}

/// XOR `payload` in place with the 4-byte masking key
pub fn apply_mask(payload: &mut [u8], mask: [u8; 4]) {
    for (i, byte) in payload.iter_mut().enumerate() {
        *byte ^= mask[i % 4];
    }
}

/// Read one frame from `reader`.
///
/// Returns `Ok(None)` when the stream is closed before the first header byte.
/// Every later read is exact: a stream that ends inside a frame yields
/// `ConnectionClosed` instead of a short payload.
pub async fn decode<R>(reader: &mut R) -> Result<Option<Frame>>
where
    R: AsyncRead + Unpin,
{
    let first = match reader.read_u8().await {
        Ok(byte) => byte,
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let second = reader.read_u8().await?;
    let masked = second & MASK_BIT != 0;

    let payload_len = match second & !MASK_BIT {
        EXTENDED_LENGTH_16 => reader.read_u16().await? as usize,
        EXTENDED_LENGTH_64 => return Err(RustyChatError::UnsupportedPayloadSize),
        len => len as usize,
    };

    let mask = if masked {
        let mut mask = [0u8; 4];
        reader.read_exact(&mut mask).await?;
        Some(mask)
    } else {
        None
    };

    let mut payload = vec![0u8; payload_len];
    reader.read_exact(&mut payload).await?;

    if let Some(mask) = mask {
        apply_mask(&mut payload, mask);
    }

    let frame = Frame {
        fin: first & FIN_BIT != 0,
        opcode: OpCode::from_u8(first),
        payload,
    };
    trace!("Decoded {:?} frame with {} payload bytes", frame.opcode, frame.payload.len());

    Ok(Some(frame))
}

/// Encode `frame` and write it out in full
pub async fn write_frame<W>(writer: &mut W, frame: &Frame, masked: bool) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let bytes = frame.encode(masked)?;
    writer.write_all(&bytes).await?;
    writer.flush().await?;
    Ok(())
}
