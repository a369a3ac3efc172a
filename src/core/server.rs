//! Listening socket and accept loop

use log::{debug, error, info};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::WriteHalf;
use tokio::net::{TcpListener, TcpStream};

use crate::config::ServerConfig;
use crate::core::registry::{create_registry, SharedRegistry};
use crate::error::{Result, RustyChatError};
use crate::handlers::websocket::handle_ws_client;

/// Registry of connections accepted over TCP
pub type TcpRegistry = SharedRegistry<WriteHalf<TcpStream>>;

/// Chat server owning the listener and the connection registry
pub struct ChatServer {
    listener: TcpListener,
    registry: TcpRegistry,
}

impl ChatServer {
    /// Bind the listener described by `config`
    pub async fn bind(config: &ServerConfig) -> Result<Self> {
        let address = config.bind_address();
        let listener = TcpListener::bind(&address).await.map_err(|e| {
            RustyChatError::ConfigError(format!("Failed to bind {}: {}", address, e))
        })?;

        Ok(Self::with_registry(listener, create_registry()))
    }

    pub fn with_registry(listener: TcpListener, registry: TcpRegistry) -> Self {
        Self { listener, registry }
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn registry(&self) -> TcpRegistry {
        self.registry.clone()
    }

    /// Accept connections forever, one task per connection
    pub async fn run(self) {
        loop {
            match self.listener.accept().await {
                Ok((stream, peer)) => {
                    debug!("Accepted connection from {}", peer);
                    if let Err(e) = stream.set_nodelay(true) {
                        debug!("Failed to set TCP_NODELAY for {}: {}", peer, e);
                    }
                    tokio::spawn(handle_ws_client(
                        stream,
                        self.registry.clone(),
                        peer.to_string(),
                    ));
                }
                Err(e) => {
                    error!("Failed to accept connection: {}", e);
                    // Back off briefly, e.g. when out of file descriptors
                    tokio::time::sleep(Duration::from_millis(100)).await;
                }
            }
        }
    }

    /// Run the accept loop on a background task
    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        match self.local_addr() {
            Ok(addr) => info!("Server started on {}", addr),
            Err(e) => error!("Server started on an unknown address: {}", e),
        }
        tokio::spawn(self.run())
    }
}
