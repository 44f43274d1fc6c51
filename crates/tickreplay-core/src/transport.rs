//! Outbound side of one connected consumer.
//!
//! The engine never talks to a socket directly. It hands framed text
//! messages to a [`TransportSession`], which must accept them without
//! blocking so the emission timer keeps its cadence. Lifecycle events
//! (connect, disconnect) reach the engine through
//! [`ReplayController`](crate::controller::ReplayController).

use tokio::sync::mpsc;

/// Errors returned when delivering a message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The consumer has gone away.
    #[error("transport closed")]
    Closed,
}

/// Non-blocking sink for outbound messages of one connection.
pub trait TransportSession: Send + Sync + 'static {
    /// Queue `message` for delivery to the consumer.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Closed`] if the consumer is gone.
    fn send(&self, message: String) -> Result<(), TransportError>;
}

/// [`TransportSession`] backed by an unbounded channel.
///
/// The receiving half is drained by whatever owns the actual connection
/// (the `WebSocket` writer loop in production, the test body in tests).
#[derive(Debug, Clone)]
pub struct ChannelTransport {
    tx: mpsc::UnboundedSender<String>,
}

impl ChannelTransport {
    /// Create a transport and the receiver that drains it.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl TransportSession for ChannelTransport {
    fn send(&self, message: String) -> Result<(), TransportError> {
        self.tx.send(message).map_err(|_closed| TransportError::Closed)
    }
}
