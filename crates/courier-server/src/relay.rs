//! Blind fan-out of opaque payloads between connected clients.

use std::sync::Arc;

use courier_core::{ClientId, ServerFrame};

use crate::client::ClientRegistry;

/// Forwards an opaque payload from one client to every other registered
/// client, tagged with the sender's id. The server never looks inside the
/// payload.
pub struct Relay {
    registry: Arc<ClientRegistry>,
}

impl Relay {
    pub fn new(registry: Arc<ClientRegistry>) -> Self {
        Self { registry }
    }

    /// Deliver `payload` to every registered client except the sender.
    ///
    /// Best-effort: the frame is serialized once, recipients come from a
    /// point-in-time snapshot, and each delivery is a non-blocking queue
    /// push. A failure for one recipient is skipped without retry and
    /// never reported to the sender or the other recipients. Returns how
    /// many recipients the frame was queued for.
    pub fn dispatch(&self, from: &ClientId, payload: String) -> usize {
        let frame = ServerFrame::ReceiveEncryptedMessage {
            sender_id: from.clone(),
            encrypted_message: payload,
        };
        let json = match serde_json::to_string(&frame) {
            Ok(json) => json,
            Err(error) => {
                tracing::error!(%error, "Failed to serialize relay frame");
                return 0;
            }
        };

        let recipients = self.registry.snapshot_except(from);
        let mut delivered = 0usize;
        let mut skipped = 0usize;
        for recipient in &recipients {
            match recipient.push(json.clone()) {
                Ok(()) => delivered += 1,
                Err(error) => {
                    skipped += 1;
                    tracing::trace!(
                        sender_id = %from,
                        recipient_id = %recipient.id,
                        reason = error.kind(),
                        "Skipped relay delivery"
                    );
                }
            }
        }

        tracing::debug!(sender_id = %from, delivered, skipped, "Relayed encrypted message");
        delivered
    }
}
