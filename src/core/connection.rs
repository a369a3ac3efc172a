//! WebSocket connection records
//! Tracks the identity of a client connection and a weak handle to its transport

use log::warn;
use std::sync::{Arc, Weak};
use tokio::io::AsyncWrite;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::core::frame::{self, Frame};

pub type ConnectionId = Uuid;

/// Write half of a connection, owned by its handler and shared with the registry
pub type SharedWriter<W> = Arc<Mutex<W>>;

/// Create a shared writer from the write half of a transport
pub fn shared_writer<W>(writer: W) -> SharedWriter<W> {
    Arc::new(Mutex::new(writer))
}

/// Who is on the other end of a connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    /// Handshake done, first message not yet received
    Unidentified,
    Named(String),
}

impl Identity {
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Unidentified => None,
            Self::Named(name) => Some(name),
        }
    }
}

/// Represents the state of a single registered connection
pub struct ConnectionRecord<W> {
    pub id: ConnectionId,
    pub identity: Identity,
    writer: Weak<Mutex<W>>,
}

impl<W> ConnectionRecord<W> {
    pub fn new(writer: &SharedWriter<W>) -> Self {
        Self::with_id(Uuid::new_v4(), writer)
    }

    pub fn with_id(id: ConnectionId, writer: &SharedWriter<W>) -> Self {
        Self {
            id,
            identity: Identity::Unidentified,
            writer: Arc::downgrade(writer),
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.identity.name()
    }

    /// True when this connection was named `name`
    pub fn is_named(&self, name: &str) -> bool {
        self.name() == Some(name)
    }

    /// The transport is open as long as its handler still holds the writer
    pub fn is_open(&self) -> bool {
        self.writer.strong_count() > 0
    }
}

impl<W> ConnectionRecord<W>
where
    W: AsyncWrite + Unpin,
{
    /// Write an already encoded frame to this connection
    pub async fn send_bytes(&self, bytes: &[u8]) -> bool {
        let Some(writer) = self.writer.upgrade() else {
            warn!("Connection {} is closed, dropping message", self.id);
            return false;
        };

        let mut writer = writer.lock().await;
        match write_all_flush(&mut *writer, bytes).await {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to send message to client {}: {}", self.id, e);
                false
            }
        }
    }

    /// Send a text message through this connection
    pub async fn send_text(&self, text: &str) -> bool {
        match Frame::text(text).encode(false) {
            Ok(bytes) => self.send_bytes(&bytes).await,
            Err(e) => {
                warn!("Failed to encode message for client {}: {}", self.id, e);
                false
            }
        }
    }
}

/// Send a text message straight through a writer the caller owns
pub async fn send_text<W>(writer: &SharedWriter<W>, text: &str) -> crate::error::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut writer = writer.lock().await;
    frame::write_frame(&mut *writer, &Frame::text(text), false).await
}

async fn write_all_flush<W>(writer: &mut W, bytes: &[u8]) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    use tokio::io::AsyncWriteExt;

    writer.write_all(bytes).await?;
    writer.flush().await
}
