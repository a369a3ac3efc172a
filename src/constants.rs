// Fundamental configuration constants
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_SERVER_HOST: &str = "localhost";
pub const CHAT_PATH: &str = "/chat";

// Handshake constants
pub const WEBSOCKET_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";
pub const WEBSOCKET_VERSION: &str = "13";
pub const MAX_HANDSHAKE_BYTES: usize = 8 * 1024;

// Frame constants
pub const FIN_BIT: u8 = 0x80;
pub const MASK_BIT: u8 = 0x80;
pub const OPCODE_TEXT: u8 = 0x1;
pub const OPCODE_CLOSE: u8 = 0x8;
pub const MAX_SHORT_PAYLOAD: usize = 125;
pub const EXTENDED_LENGTH_16: u8 = 126;
pub const EXTENDED_LENGTH_64: u8 = 127;
pub const MAX_PAYLOAD_SIZE: usize = u16::MAX as usize;
