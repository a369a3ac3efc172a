//! Message routing over the connection registry
//!
//! Both operations run on a locked registry, so a whole delivery happens under
//! one critical section. A failed write to one peer is logged by the record and
//! does not stop delivery to the others.

use log::{debug, warn};
use tokio::io::AsyncWrite;

use crate::core::connection::ConnectionId;
use crate::core::frame;
use crate::core::message;
use crate::core::registry::Registry;

impl<W> Registry<W>
where
    W: AsyncWrite + Unpin,
{
    /// Send `text` to every open connection except `exclude`.
    ///
    /// Returns the number of connections the frame was written to.
    pub async fn broadcast(&self, text: &str, exclude: Option<&ConnectionId>) -> usize {
        let bytes = match frame::encode(text.as_bytes(), false) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Failed to encode broadcast message: {}", e);
                return 0;
            }
        };

        let mut delivered = 0;
        for record in self.iter() {
            if Some(&record.id) == exclude || !record.is_open() {
                continue;
            }
            if record.send_bytes(&bytes).await {
                delivered += 1;
            }
        }

        debug!("Broadcast message to {} clients", delivered);
        delivered
    }

    /// Deliver `text` to every connection named `recipient`.
    ///
    /// Each recipient reached earns the sender one confirmation. When nobody
    /// carries that name the sender alone gets an error message. Returns the
    /// number of matching connections.
    pub async fn deliver_private(
        &self,
        sender: &ConnectionId,
        sender_name: &str,
        recipient: &str,
        text: &str,
    ) -> usize {
        let sender_record = self.get(sender);
        if sender_record.is_none() {
            warn!("Private message from unregistered connection {}", sender);
        }

        let formatted = message::private(sender_name, text);
        let confirmation = message::private_confirmation(recipient, text);

        let recipients: Vec<_> = self.find_named(recipient).collect();
        let matched = recipients.len();
        for record in recipients {
            if !record.send_text(&formatted).await {
                continue;
            }
            if let Some(sender_record) = sender_record {
                sender_record.send_text(&confirmation).await;
            }
        }

        if matched == 0 {
            debug!("Private message recipient '{}' not found", recipient);
            if let Some(sender_record) = sender_record {
                sender_record
                    .send_text(&message::recipient_not_found(recipient))
                    .await;
            }
        }

        matched
    }
}
