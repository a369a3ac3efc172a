use std::error::Error;
use std::fmt;
use std::io;

#[derive(Debug)]
pub enum RustyChatError {
    // Protocol errors
    UnsupportedPayloadSize,
    MessageTooLarge(usize),
    MissingKey,
    HandshakeError(String),

    // Connections errors
    ConnectionError(String),
    ConnectionClosed,

    // Registry errors
    SessionNotFound(String),
    NameAlreadyAssigned(String),

    // Configuration errors
    ConfigError(String),
}

impl RustyChatError {
    /// Errors caused by a peer breaking the wire protocol, as opposed to
    /// transport failures or local misuse.
    pub fn is_protocol_violation(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedPayloadSize | Self::MissingKey | Self::HandshakeError(_)
        )
    }
}

impl fmt::Display for RustyChatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedPayloadSize => {
                write!(f, "Unsupported payload size: 64-bit frame lengths are not supported")
            }
            Self::MessageTooLarge(size) => write!(f, "Message too large: {} bytes", size),
            Self::MissingKey => write!(f, "Handshake error: missing Sec-WebSocket-Key header"),
            Self::HandshakeError(msg) => write!(f, "Handshake error: {}", msg),
            Self::ConnectionError(msg) => write!(f, "Connection error: {}", msg),
            Self::ConnectionClosed => write!(f, "Connection closed unexpectedly"),
            Self::SessionNotFound(id) => write!(f, "Session not found: {}", id),
            Self::NameAlreadyAssigned(name) => {
                write!(f, "Connection is already named: {}", name)
            }
            Self::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl Error for RustyChatError {}

// A stream that ends inside a frame or a handshake is reported as closed
impl From<io::Error> for RustyChatError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::UnexpectedEof => RustyChatError::ConnectionClosed,
            _ => RustyChatError::ConnectionError(err.to_string()),
        }
    }
}

// Generic result type for RustyChat
pub type Result<T> = std::result::Result<T, RustyChatError>;
