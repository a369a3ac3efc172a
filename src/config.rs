//! Server and client configuration module
//! Handles the connection parameters of the chat server and its console client

use crate::constants::{CHAT_PATH, DEFAULT_HOST, DEFAULT_PORT, DEFAULT_SERVER_HOST};
use crate::error::{Result, RustyChatError};
use std::env;

/// Server configuration parameters
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables if available
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("RUSTY_CHAT_HOST").unwrap_or(DEFAULT_HOST.to_string());
        let port = parse_port(lookup("RUSTY_CHAT_PORT"), "RUSTY_CHAT_PORT")?;

        Ok(Self { host, port })
    }

    /// Address string suitable for `TcpListener::bind`
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Client configuration parameters
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    /// Request path sent in the upgrade request
    pub path: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_SERVER_HOST.to_string(),
            port: DEFAULT_PORT,
            path: CHAT_PATH.to_string(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables if available
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("RUSTY_CHAT_SERVER_HOST").unwrap_or(DEFAULT_SERVER_HOST.to_string());
        let port = parse_port(lookup("RUSTY_CHAT_SERVER_PORT"), "RUSTY_CHAT_SERVER_PORT")?;
        let path = lookup("RUSTY_CHAT_PATH").unwrap_or(CHAT_PATH.to_string());

        if !path.starts_with('/') {
            return Err(RustyChatError::ConfigError(format!(
                "RUSTY_CHAT_PATH must start with '/': {}",
                path
            )));
        }

        Ok(Self { host, port, path })
    }
}

fn parse_port(value: Option<String>, name: &str) -> Result<u16> {
    match value {
        None => Ok(DEFAULT_PORT),
        Some(raw) => raw.trim().parse().map_err(|_| {
            RustyChatError::ConfigError(format!("{} is not a valid port: {}", name, raw))
        }),
    }
}
