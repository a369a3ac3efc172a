use log::{debug, error, info, warn};
use tokio::io::{split, AsyncBufRead, AsyncRead, AsyncWrite, BufReader, WriteHalf};

use crate::core::connection::{self, shared_writer, ConnectionId, SharedWriter};
use crate::core::frame::{self, OpCode};
use crate::core::handshake;
use crate::core::message::{self, ChatMessage};
use crate::core::registry::SharedRegistry;
use crate::error::Result;

/// Lifecycle of one connection once the handshake has succeeded
#[derive(Debug, Clone, PartialEq, Eq)]
enum ConnectionState {
    AwaitingName,
    Active { name: String },
}

// Handle a raw connection from handshake to cleanup
pub async fn handle_ws_client<S>(stream: S, registry: SharedRegistry<WriteHalf<S>>, peer: String)
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (read_half, write_half) = split(stream);
    let mut reader = BufReader::new(read_half);
    let writer = shared_writer(write_half);

    // Upgrade the connection
    {
        let mut writer_guard = writer.lock().await;
        if let Err(e) = handshake::accept(&mut reader, &mut *writer_guard).await {
            warn!("Handshake with {} failed: {}", peer, e);
            if e.is_protocol_violation() {
                if let Err(e) = handshake::reject(&mut *writer_guard).await {
                    debug!("Failed to reject {}: {}", peer, e);
                }
            }
            return;
        }
    }

    // Register the client
    let client_id = {
        let mut registry_guard = registry.lock().await;
        let id = registry_guard.register(&writer);
        debug!("Client {} connected from {}", id, peer);
        debug!("Current connections: {}", registry_guard.connection_count());
        id
    };

    // The message loop runs in its own task so that a panic still reaches cleanup
    let session = tokio::spawn(process_frames(
        reader,
        writer.clone(),
        registry.clone(),
        client_id,
    ));

    match session.await {
        Ok(Ok(())) => debug!("Client {} closed the connection", client_id),
        Ok(Err(e)) => warn!("Client {} terminated: {}", client_id, e),
        Err(e) => error!("Handler for client {} failed: {}", client_id, e),
    }

    // Client disconnected
    let mut registry_guard = registry.lock().await;
    let Some(record) = registry_guard.unregister(&client_id) else {
        error!("Client {} was already unregistered", client_id);
        return;
    };
    debug!("Current connections: {}", registry_guard.connection_count());

    match record.name() {
        Some(name) => {
            info!("{} has disconnected.", name);
            registry_guard
                .broadcast(&message::disconnected(name), Some(&client_id))
                .await;
        }
        None => debug!("Client {} left before choosing a name", client_id),
    }
}

// Read frames until the peer closes, routing each message
async fn process_frames<R, W>(
    mut reader: R,
    writer: SharedWriter<W>,
    registry: SharedRegistry<W>,
    client_id: ConnectionId,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut state = ConnectionState::AwaitingName;

    while let Some(frame) = frame::decode(&mut reader).await? {
        match frame.opcode {
            OpCode::Close => break,
            OpCode::Ping | OpCode::Pong => {
                debug!("Ignoring {:?} frame from client {}", frame.opcode, client_id);
                continue;
            }
            _ => {}
        }

        let text = frame.into_text();
        state = match state {
            ConnectionState::AwaitingName => {
                let name = text.trim().to_string();
                register_name(&writer, &registry, &client_id, &name).await?;
                ConnectionState::Active { name }
            }
            ConnectionState::Active { name } => {
                route_message(&registry, &client_id, &name, &text).await;
                ConnectionState::Active { name }
            }
        };
    }

    Ok(())
}

// First message: the display name
async fn register_name<W>(
    writer: &SharedWriter<W>,
    registry: &SharedRegistry<W>,
    client_id: &ConnectionId,
    name: &str,
) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut registry_guard = registry.lock().await;
    registry_guard.assign_name(client_id, name)?;
    info!("{} joined", name);

    if let Err(e) = connection::send_text(writer, &message::welcome(name)).await {
        warn!("Failed to send welcome message to {}: {}", name, e);
    }
    registry_guard
        .broadcast(&message::joined(name), Some(client_id))
        .await;

    Ok(())
}

// Subsequent messages: private when addressed, public otherwise
async fn route_message<W>(
    registry: &SharedRegistry<W>,
    client_id: &ConnectionId,
    sender: &str,
    text: &str,
) where
    W: AsyncWrite + Unpin,
{
    let registry_guard = registry.lock().await;
    match ChatMessage::parse(text) {
        ChatMessage::Private {
            recipient,
            text: body,
        } => {
            registry_guard
                .deliver_private(client_id, sender, recipient, body)
                .await;
        }
        ChatMessage::Public(body) => {
            registry_guard
                .broadcast(&message::public(sender, body), Some(client_id))
                .await;
        }
    }
}
