//! Rusty Chat - A minimal real-time chat over a hand-written WebSocket subset
//!
//! This library provides the frame codec and upgrade handshake shared by
//! the server and the console client, the connection registry with its
//! broadcast and private routing, and the per-connection handler.

pub mod client;
pub mod config;
pub mod constants;
pub mod core;
pub mod error;
pub mod handlers;

// Re-export main components
pub use config::*;
pub use constants::*;
