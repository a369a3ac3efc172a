//! Core functionality for the chat server and client

pub mod connection;
pub mod frame;
pub mod handshake;
pub mod message;
pub mod registry;
pub mod router;
pub mod server;

// Re-export main components for convenience
pub use connection::{ConnectionId, ConnectionRecord, Identity, SharedWriter};
pub use frame::{Frame, OpCode};
pub use message::ChatMessage;
pub use registry::{create_registry, Registry, SharedRegistry};
pub use server::{ChatServer, TcpRegistry};
