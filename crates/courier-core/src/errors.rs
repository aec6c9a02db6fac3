/// Why a single relay delivery was skipped.
///
/// Every variant is skippable: the relay drops the delivery, leaves a
/// trace log, and moves on to the next recipient. Nothing is retried and
/// nothing is reported back to the sender.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    /// Target id was not in the registry at delivery time.
    #[error("recipient is not registered")]
    UnknownRecipient,

    /// Recipient's outbound queue is full (backpressure drop).
    #[error("recipient send queue is full")]
    QueueFull,

    /// Recipient's connection closed between snapshot and delivery.
    #[error("recipient transport already closed")]
    TransportClosed,
}

impl DeliveryError {
    /// Short classification string for log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnknownRecipient => "unknown_recipient",
            Self::QueueFull => "queue_full",
            Self::TransportClosed => "transport_closed",
        }
    }
}
