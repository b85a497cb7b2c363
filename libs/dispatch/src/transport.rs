//! Boundary contract toward the physical transport.

use async_trait::async_trait;
use envelope::{Address, TransportMessage};
use std::fmt::Debug;

/// Transport-level failures reported by a send collaborator.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    #[error("send failed: {0}")]
    SendFailed(String),

    #[error("transport disconnected: {0}")]
    Disconnected(String),
}

impl TransportError {
    pub fn send_failed(reason: impl Into<String>) -> Self {
        TransportError::SendFailed(reason.into())
    }

    /// Disconnects are worth retrying after the transport reconnects; a
    /// rejected send is not.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, TransportError::Disconnected(_))
    }
}

/// Transport-send collaborator: accepts a fully-populated message and the
/// resolved destination, returns success or a transport-level failure.
/// Implementations are external (a broker SDK binding, an in-memory queue);
/// the core only ever talks to this trait.
#[async_trait]
pub trait TransportSender: Send + Sync + Debug {
    async fn send(
        &self,
        message: TransportMessage,
        destination: Address,
    ) -> Result<(), TransportError>;
}
