//! Request handlers for accepted connections

pub mod websocket;

// Re-export the websocket handler
pub use websocket::handle_ws_client;
