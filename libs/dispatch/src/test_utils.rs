//! Test doubles for the transport boundary.

use crate::transport::{TransportError, TransportSender};
use async_trait::async_trait;
use envelope::{Address, TransportMessage};
use std::sync::Mutex;

/// A transport sender that collects every message it is asked to send,
/// and can be scripted to fail the next send.
#[derive(Debug, Default)]
pub struct CollectorTransport {
    sent: Mutex<Vec<(TransportMessage, Address)>>,
    fail_next: Mutex<Option<TransportError>>,
}

impl CollectorTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<(TransportMessage, Address)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    /// Reject the next send outright (unrecoverable).
    pub fn fail_next_send(&self) {
        *self.fail_next.lock().unwrap() =
            Some(TransportError::send_failed("induced transport failure"));
    }

    /// Drop the connection for the next send (recoverable).
    pub fn disconnect_next_send(&self) {
        *self.fail_next.lock().unwrap() =
            Some(TransportError::Disconnected("induced disconnect".to_string()));
    }
}

#[async_trait]
impl TransportSender for CollectorTransport {
    async fn send(
        &self,
        message: TransportMessage,
        destination: Address,
    ) -> Result<(), TransportError> {
        if let Some(error) = self.fail_next.lock().unwrap().take() {
            return Err(error);
        }
        self.sent.lock().unwrap().push((message, destination));
        Ok(())
    }
}
